//! Schema and model data structures.
//!
//! This module provides the declarative side of a form:
//!
//! - Field schema parsing and classification into groups, choices and inputs
//! - Conversion of JSON Schema documents (e.g. from `schemars`) into fields
//! - The key-value model a form edits, and slots addressing values inside it
//!
//! ## Architecture
//!
//! - [`schema`] - Field schema types and loading
//! - `json_schema` - JSON Schema import
//! - [`item`] - Input kinds and leaf value conversion
//! - [`model`] - Model and slot accessors

/// Field schema types and loading.
pub mod schema;

// JSON Schema import (`SchemaRoot::from_json_schema`).
mod json_schema;

/// Input kinds and leaf value conversion.
pub mod item;

/// Model and slot accessors.
pub mod model;

pub use item::InputKind;
pub use model::{Model, Slot};
pub use schema::{FieldSchema, SchemaError, SchemaRoot};
