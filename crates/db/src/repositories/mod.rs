//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async query methods.
//! Plain reads and inserts accept `&PgPool`; methods the workflow evaluator
//! calls inside its transaction accept `&mut PgConnection` so they compose
//! with a caller-owned `Transaction`.

pub mod document_repo;
pub mod document_type_repo;
pub mod form_repo;
pub mod form_template_repo;
pub mod project_repo;
pub mod project_type_repo;
pub mod project_workflow_step_repo;
pub mod workflow_step_repo;

pub use document_repo::DocumentRepo;
pub use document_type_repo::DocumentTypeRepo;
pub use form_repo::FormRepo;
pub use form_template_repo::FormTemplateRepo;
pub use project_repo::ProjectRepo;
pub use project_type_repo::ProjectTypeRepo;
pub use project_workflow_step_repo::ProjectWorkflowStepRepo;
pub use workflow_step_repo::WorkflowStepRepo;
