//! Domain model structs and DTOs.
//!
//! Each submodule contains:
//! - `FromRow` + `Serialize` entity structs matching database rows
//! - `Deserialize` DTOs for inserts where the API creates rows

pub mod document;
pub mod form;
pub mod project;
pub mod workflow_step;
