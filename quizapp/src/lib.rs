//! # quizapp
//!
//! A terminal quiz client. The user fills in a profile form rendered from a
//! declarative schema, then answers multiple-choice questions served over
//! HTTP. The profile and the current page are kept in a local store.
//!
//! ## Modules
//!
//! - [`app`] - Command implementations
//! - [`client`] - HTTP client for the quiz server
//! - [`config`] - Application configuration
//! - [`ctx`] - Session state
//! - [`store`] - Persistent key-value storage
//! - [`ui`] - Terminal pages

#[macro_use]
extern crate log;

pub mod app;
pub mod client;
pub mod config;
pub mod ctx;
pub mod store;
pub mod ui;
