pub mod admin;
pub mod document;
pub mod form;
pub mod project;
pub mod workflow;
