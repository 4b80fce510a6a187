//! Domain logic for the casework backend.
//!
//! This crate has no database dependencies. Everything here operates on
//! pre-loaded data handed in by the `db` and `api` crates, which keeps the
//! workflow rules and the dependency-expression language unit-testable.

pub mod dependency;
pub mod error;
pub mod form_export;
pub mod forms;
pub mod rules;
pub mod types;
pub mod workflow;
