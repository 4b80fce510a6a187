//! Domain rules deciding which workflow steps are done.
//!
//! Each project type maps to a rule set describing which form sections
//! complete which information-collection child steps and which step tracks
//! document gathering. Only H-1B petitions have a rule set today; other
//! project types are evaluated as a no-op.

use std::collections::BTreeSet;

use crate::types::DbId;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Seeded project type names.
pub const PROJECT_TYPE_H1B: &str = "H-1B Specialty Occupation";
pub const PROJECT_TYPE_FAMILY_GREEN_CARD: &str = "Family-Based Green Card";

/// Form template names.
pub const TEMPLATE_I129: &str = "I-129";
pub const TEMPLATE_I130: &str = "I-130";

/// Keys of the H-1B top-level steps.
pub const H1B_DOCUMENT_GATHERING: &str = "H1B_DOCUMENT_GATHERING";
pub const H1B_INFORMATION_COLLECTION: &str = "H1B_INFORMATION_COLLECTION";

/// I-129 section name -> child step name under information collection.
pub const H1B_SECTION_STEPS: &[(&str, &str)] = &[
    ("Beneficiary_Information", "Beneficiary Information"),
    ("Employer_Information", "Employer Information"),
    ("Job_Information", "Job Information"),
];

/// Project type -> form template created with every new project.
const PROJECT_TYPE_TEMPLATES: &[(&str, &str)] = &[
    (PROJECT_TYPE_H1B, TEMPLATE_I129),
    (PROJECT_TYPE_FAMILY_GREEN_CARD, TEMPLATE_I130),
];

// ---------------------------------------------------------------------------
// Rule sets
// ---------------------------------------------------------------------------

/// The completion rules applicable to a project type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleSet {
    H1b,
}

impl RuleSet {
    /// The rule set for a project type name, if one is implemented.
    pub fn for_project_type(project_type_name: &str) -> Option<Self> {
        match project_type_name {
            PROJECT_TYPE_H1B => Some(Self::H1b),
            _ => None,
        }
    }

    /// Form template whose sections drive information collection.
    pub fn information_template(&self) -> &'static str {
        match self {
            Self::H1b => TEMPLATE_I129,
        }
    }

    /// Key of the top-level step owning the per-section child steps.
    pub fn information_step_key(&self) -> &'static str {
        match self {
            Self::H1b => H1B_INFORMATION_COLLECTION,
        }
    }

    /// Key of the step completed once every required document is present.
    pub fn document_step_key(&self) -> &'static str {
        match self {
            Self::H1b => H1B_DOCUMENT_GATHERING,
        }
    }

    /// `(section name, child step name)` pairs checked on every pass.
    pub fn section_steps(&self) -> &'static [(&'static str, &'static str)] {
        match self {
            Self::H1b => H1B_SECTION_STEPS,
        }
    }

    /// Child step completed by the named section, if any.
    pub fn step_for_section(&self, section_name: &str) -> Option<&'static str> {
        self.section_steps()
            .iter()
            .find(|(section, _)| *section == section_name)
            .map(|(_, step)| *step)
    }
}

/// The form template auto-created for a new project of this type.
pub fn template_for_project_type(project_type_name: &str) -> Option<&'static str> {
    PROJECT_TYPE_TEMPLATES
        .iter()
        .find(|(project_type, _)| *project_type == project_type_name)
        .map(|(_, template)| *template)
}

// ---------------------------------------------------------------------------
// Document requirement
// ---------------------------------------------------------------------------

/// Outcome of comparing required document types with uploaded ones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentRequirement {
    /// Every required type is represented among classified documents.
    Satisfied,
    /// Required types not yet uploaded (or not yet classified).
    Missing(Vec<DbId>),
    /// No document type is flagged required; the step is left alone.
    NothingRequired,
}

impl DocumentRequirement {
    pub fn is_satisfied(&self) -> bool {
        matches!(self, Self::Satisfied)
    }
}

/// Check the required document type ids against the classified types of
/// the project's documents. Extra uploaded types are ignored.
pub fn check_required_documents(
    required: &BTreeSet<DbId>,
    uploaded: &BTreeSet<DbId>,
) -> DocumentRequirement {
    if required.is_empty() {
        return DocumentRequirement::NothingRequired;
    }
    let missing: Vec<DbId> = required.difference(uploaded).copied().collect();
    if missing.is_empty() {
        DocumentRequirement::Satisfied
    } else {
        DocumentRequirement::Missing(missing)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
