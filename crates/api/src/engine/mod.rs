//! Workflow engine.
//!
//! [`steps`] loads a project's step tree and applies direct start/complete
//! requests; [`evaluator`] runs the rule-driven evaluation pass triggered
//! after document uploads and section submissions.

pub mod evaluator;
pub mod steps;

pub use evaluator::{
    evaluate_after_write, evaluate_in_transaction, evaluate_project, CompletedStep,
    EvaluationOutcome,
};
pub use steps::{complete_step, load_tree, resolve_step, start_step, StepChange};
