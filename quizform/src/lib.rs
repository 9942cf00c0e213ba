//! # quizform
//!
//! A Cursive-based form renderer driven by declarative field schemas.
//!
//! A schema is an ordered list of fields. Each field is classified once, when
//! the schema is loaded, as a group of nested fields, a choice over a fixed
//! list of values, or a primitive input of some kind. A form binds the schema
//! to a key-value model, writes edits into it, and notifies its owner after
//! the edits of a UI tick have settled.
//!
//! ## Features
//!
//! - Terminal UI built with [Cursive](https://github.com/gyscos/cursive)
//! - Recursive rendering of nested groups
//! - Deferred change notification (settle before notify)
//! - Schemas from JSON/TOML files or from JSON Schema (`schemars`)
//! - Typed configuration editing for any `JsonSchema` type
//!
//! ## Quick Start
//!
//! ```rust
//! use quizform::data::{Model, SchemaRoot, Slot};
//! use quizform::form::{Form, on_change};
//!
//! let schema = SchemaRoot::from_json(&serde_json::json!([
//!     {"id": "name", "name": "Name"},
//!     {"id": "prefs", "name": "Preferences", "schema": [
//!         {"id": "grade", "name": "Grade", "type": "number"}
//!     ]}
//! ])).unwrap();
//!
//! let mut form = Form::new(&schema, Model::new(), on_change(|m| println!("{m:?}")));
//! form.edit_text(&Slot::parse("prefs.grade"), "4").unwrap();
//! assert_eq!(form.flush(), 1);
//! ```
//!
//! ## Modules
//!
//! - [`data`] - Schema and model data structures
//! - [`form`] - Form renderer and change notification
//! - [`ui`] - Cursive widgets for forms
//! - [`run`] - Typed configuration editor

#[macro_use]
extern crate log;

/// Schema and model data structures.
///
/// This module provides field schema parsing, JSON Schema import, the model
/// a form edits and slot accessors into it.
pub mod data;

/// Form renderer and change notification.
pub mod form;

/// TUI configuration editor entry point.
pub mod run;

/// Cursive widgets for forms.
pub mod ui;

pub use run::*;
pub use serde_json::Value;
