//! Two-level workflow step tree and per-project progress.
//!
//! Step definitions belong to a project type and form a hierarchy exactly
//! two levels deep: top-level steps and their direct children. The depth
//! limit lives in the types ([`TopLevelStep`] owns [`ChildStep`]s, and a
//! child cannot own anything), and [`WorkflowTree::build`] rejects
//! definitions that would need a third level.
//!
//! Progress (started/completed timestamps) is loaded per project and merged
//! into the tree; everything here is pure and operates on pre-loaded data.

use std::collections::HashMap;
use std::str::FromStr;

use serde::Serialize;

use crate::error::CoreError;
use crate::types::{DbId, Timestamp};

// ---------------------------------------------------------------------------
// Definitions and progress
// ---------------------------------------------------------------------------

/// Immutable step definition for a project type.
#[derive(Debug, Clone, PartialEq)]
pub struct StepDefinition {
    pub id: DbId,
    pub name: String,
    pub key: Option<String>,
    pub description: Option<String>,
    pub sequence: i32,
    pub parent_step_id: Option<DbId>,
    pub estimated_duration_min: Option<i32>,
    pub estimated_duration_max: Option<i32>,
}

/// Per-project progress of one step. Absent state means "not started".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepProgress {
    pub started_at: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
}

impl StepProgress {
    pub fn is_completed(&self) -> bool {
        self.completed_at.is_some()
    }
}

/// A direct child of a top-level step. Children never have children.
#[derive(Debug, Clone)]
pub struct ChildStep {
    pub definition: StepDefinition,
    pub progress: StepProgress,
}

/// A top-level step with its children in sequence order.
#[derive(Debug, Clone)]
pub struct TopLevelStep {
    pub definition: StepDefinition,
    pub progress: StepProgress,
    pub children: Vec<ChildStep>,
}

impl TopLevelStep {
    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    /// True when the step has children and every one of them is complete.
    pub fn all_children_completed(&self) -> bool {
        self.has_children() && self.children.iter().all(|c| c.progress.is_completed())
    }
}

// ---------------------------------------------------------------------------
// Step references
// ---------------------------------------------------------------------------

/// How a caller names a step: by stable key or by numeric id.
///
/// Child steps are not required to carry keys, so they are usually
/// addressed by id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepReference {
    Id(DbId),
    Key(String),
}

impl FromStr for StepReference {
    type Err = CoreError;

    /// All-digit input is an id; anything else non-blank is a key.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(CoreError::Validation(
                "Step reference must not be empty".to_string(),
            ));
        }
        if s.chars().all(|c| c.is_ascii_digit()) {
            return s
                .parse::<DbId>()
                .map(StepReference::Id)
                .map_err(|_| CoreError::Validation(format!("Step id '{s}' is out of range")));
        }
        Ok(StepReference::Key(s.to_string()))
    }
}

impl std::fmt::Display for StepReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StepReference::Id(id) => write!(f, "{id}"),
            StepReference::Key(key) => f.write_str(key),
        }
    }
}

/// Identity of a step, returned when steps are found or completed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepSummary {
    pub id: DbId,
    pub key: Option<String>,
    pub name: String,
    pub parent_step_id: Option<DbId>,
    pub completed: bool,
}

impl StepSummary {
    fn of(definition: &StepDefinition, progress: &StepProgress) -> Self {
        Self {
            id: definition.id,
            key: definition.key.clone(),
            name: definition.name.clone(),
            parent_step_id: definition.parent_step_id,
            completed: progress.is_completed(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tree
// ---------------------------------------------------------------------------

/// The step hierarchy of one project type, merged with one project's progress.
#[derive(Debug, Clone, Default)]
pub struct WorkflowTree {
    steps: Vec<TopLevelStep>,
}

impl WorkflowTree {
    /// Assemble the tree from flat definitions and progress keyed by step id.
    ///
    /// Steps are ordered by `(sequence, id)` at both levels. Fails when a
    /// child names a parent that is missing or is itself a child.
    pub fn build(
        mut definitions: Vec<StepDefinition>,
        progress: &HashMap<DbId, StepProgress>,
    ) -> Result<Self, CoreError> {
        definitions.sort_by_key(|d| (d.sequence, d.id));

        let parent_of: HashMap<DbId, Option<DbId>> = definitions
            .iter()
            .map(|d| (d.id, d.parent_step_id))
            .collect();

        let mut steps: Vec<TopLevelStep> = Vec::new();
        let mut children: Vec<StepDefinition> = Vec::new();

        for definition in definitions {
            match definition.parent_step_id {
                None => {
                    let state = progress.get(&definition.id).copied().unwrap_or_default();
                    steps.push(TopLevelStep {
                        definition,
                        progress: state,
                        children: Vec::new(),
                    });
                }
                Some(parent_id) => match parent_of.get(&parent_id) {
                    None => {
                        return Err(CoreError::Validation(format!(
                            "Workflow step {} references missing parent {parent_id}",
                            definition.id
                        )));
                    }
                    Some(Some(_)) => {
                        return Err(CoreError::Validation(format!(
                            "Workflow step {} is nested deeper than two levels",
                            definition.id
                        )));
                    }
                    Some(None) => children.push(definition),
                },
            }
        }

        for definition in children {
            let state = progress.get(&definition.id).copied().unwrap_or_default();
            if let Some(parent) = steps
                .iter_mut()
                .find(|s| Some(s.definition.id) == definition.parent_step_id)
            {
                parent.children.push(ChildStep {
                    definition,
                    progress: state,
                });
            }
        }

        Ok(Self { steps })
    }

    pub fn steps(&self) -> &[TopLevelStep] {
        &self.steps
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// The first incomplete step in depth-first sequence order.
    ///
    /// Children are checked before their parent. Returns `None` when every
    /// step is complete.
    pub fn active_step_id(&self) -> Option<DbId> {
        for step in &self.steps {
            if let Some(child) = step.children.iter().find(|c| !c.progress.is_completed()) {
                return Some(child.definition.id);
            }
            if !step.progress.is_completed() {
                return Some(step.definition.id);
            }
        }
        None
    }

    fn iter_all(&self) -> impl Iterator<Item = (&StepDefinition, &StepProgress)> {
        self.steps.iter().flat_map(|s| {
            std::iter::once((&s.definition, &s.progress))
                .chain(s.children.iter().map(|c| (&c.definition, &c.progress)))
        })
    }

    fn progress_mut(&mut self, step_id: DbId) -> Option<&mut StepProgress> {
        for step in &mut self.steps {
            if step.definition.id == step_id {
                return Some(&mut step.progress);
            }
            if let Some(child) = step.children.iter_mut().find(|c| c.definition.id == step_id) {
                return Some(&mut child.progress);
            }
        }
        None
    }

    /// Locate a step at either level by id or key.
    pub fn find(&self, reference: &StepReference) -> Option<StepSummary> {
        self.iter_all()
            .find(|(d, _)| match reference {
                StepReference::Id(id) => d.id == *id,
                StepReference::Key(key) => d.key.as_deref() == Some(key.as_str()),
            })
            .map(|(d, p)| StepSummary::of(d, p))
    }

    /// Locate a child by name under the top-level step with `parent_key`.
    pub fn find_child_by_name(&self, parent_key: &str, child_name: &str) -> Option<StepSummary> {
        self.steps
            .iter()
            .find(|s| s.definition.key.as_deref() == Some(parent_key))?
            .children
            .iter()
            .find(|c| c.definition.name == child_name)
            .map(|c| StepSummary::of(&c.definition, &c.progress))
    }

    pub fn is_completed(&self, step_id: DbId) -> bool {
        self.iter_all()
            .any(|(d, p)| d.id == step_id && p.is_completed())
    }

    /// Record completion in memory. Returns `true` only when the step was
    /// previously incomplete; completing twice keeps the first timestamp.
    pub fn mark_completed(&mut self, step_id: DbId, at: Timestamp) -> bool {
        match self.progress_mut(step_id) {
            Some(progress) if progress.completed_at.is_none() => {
                progress.completed_at = Some(at);
                if progress.started_at.is_none() {
                    progress.started_at = Some(at);
                }
                true
            }
            _ => false,
        }
    }

    /// Record a start in memory. Returns `true` when the step had not started.
    pub fn mark_started(&mut self, step_id: DbId, at: Timestamp) -> bool {
        match self.progress_mut(step_id) {
            Some(progress) if progress.started_at.is_none() => {
                progress.started_at = Some(at);
                true
            }
            _ => false,
        }
    }

    /// Incomplete top-level steps whose children are all complete.
    ///
    /// Steps without children never qualify.
    pub fn parents_ready_for_completion(&self) -> Vec<StepSummary> {
        self.steps
            .iter()
            .filter(|s| !s.progress.is_completed() && s.all_children_completed())
            .map(|s| StepSummary::of(&s.definition, &s.progress))
            .collect()
    }

    /// Serializable view with the derived `is_active` flag.
    pub fn to_views(&self) -> Vec<WorkflowStepView> {
        let active = self.active_step_id();
        self.steps
            .iter()
            .map(|s| {
                let mut view = WorkflowStepView::of(&s.definition, &s.progress, active);
                view.child_steps = s
                    .children
                    .iter()
                    .map(|c| WorkflowStepView::of(&c.definition, &c.progress, active))
                    .collect();
                view
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Views
// ---------------------------------------------------------------------------

/// A step as returned to callers.
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowStepView {
    pub id: DbId,
    pub key: Option<String>,
    pub name: String,
    pub description: Option<String>,
    pub sequence: i32,
    pub estimated_duration_min: Option<i32>,
    pub estimated_duration_max: Option<i32>,
    pub started_at: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
    pub is_active: bool,
    pub child_steps: Vec<WorkflowStepView>,
}

impl WorkflowStepView {
    fn of(definition: &StepDefinition, progress: &StepProgress, active: Option<DbId>) -> Self {
        Self {
            id: definition.id,
            key: definition.key.clone(),
            name: definition.name.clone(),
            description: definition.description.clone(),
            sequence: definition.sequence,
            estimated_duration_min: definition.estimated_duration_min,
            estimated_duration_max: definition.estimated_duration_max,
            started_at: progress.started_at,
            completed_at: progress.completed_at,
            is_active: active == Some(definition.id),
            child_steps: Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use chrono::{TimeZone, Utc};

    use super::*;

    fn def(id: DbId, key: Option<&str>, name: &str, sequence: i32, parent: Option<DbId>) -> StepDefinition {
        StepDefinition {
            id,
            name: name.to_string(),
            key: key.map(str::to_string),
            description: None,
            sequence,
            parent_step_id: parent,
            estimated_duration_min: None,
            estimated_duration_max: None,
        }
    }

    fn ts(day: u32) -> Timestamp {
        Utc.with_ymd_and_hms(2025, 1, day, 12, 0, 0).unwrap()
    }

    fn done(day: u32) -> StepProgress {
        StepProgress {
            started_at: Some(ts(day)),
            completed_at: Some(ts(day)),
        }
    }

    /// Docs(1) -> Info(2) [Beneficiary(21), Employer(22), Job(23)] -> Review(3)
    fn sample_definitions() -> Vec<StepDefinition> {
        vec![
            def(3, Some("REVIEW"), "Review", 3, None),
            def(23, None, "Job Information", 3, Some(2)),
            def(1, Some("DOCS"), "Document Gathering", 1, None),
            def(21, None, "Beneficiary Information", 1, Some(2)),
            def(2, Some("INFO"), "Information Collection", 2, None),
            def(22, None, "Employer Information", 2, Some(2)),
        ]
    }

    #[test]
    fn build_orders_levels_by_sequence() {
        let tree = WorkflowTree::build(sample_definitions(), &HashMap::new()).unwrap();
        let ids: Vec<_> = tree.steps().iter().map(|s| s.definition.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        let child_ids: Vec<_> = tree.steps()[1]
            .children
            .iter()
            .map(|c| c.definition.id)
            .collect();
        assert_eq!(child_ids, vec![21, 22, 23]);
    }

    #[test]
    fn build_rejects_grandchildren() {
        let mut defs = sample_definitions();
        defs.push(def(99, None, "Too Deep", 1, Some(21)));
        assert_matches!(
            WorkflowTree::build(defs, &HashMap::new()),
            Err(CoreError::Validation(msg)) if msg.contains("deeper")
        );
    }

    #[test]
    fn build_rejects_missing_parent() {
        let defs = vec![def(5, None, "Orphan", 1, Some(404))];
        assert_matches!(
            WorkflowTree::build(defs, &HashMap::new()),
            Err(CoreError::Validation(_))
        );
    }

    #[test]
    fn active_step_is_first_incomplete_top_level_without_progress() {
        let tree = WorkflowTree::build(sample_definitions(), &HashMap::new()).unwrap();
        assert_eq!(tree.active_step_id(), Some(1));
    }

    #[test]
    fn active_step_descends_into_children() {
        let progress = HashMap::from([(1, done(1)), (21, done(2))]);
        let tree = WorkflowTree::build(sample_definitions(), &progress).unwrap();
        assert_eq!(tree.active_step_id(), Some(22));
    }

    #[test]
    fn active_step_is_parent_when_children_done() {
        let progress = HashMap::from([(1, done(1)), (21, done(2)), (22, done(2)), (23, done(2))]);
        let tree = WorkflowTree::build(sample_definitions(), &progress).unwrap();
        assert_eq!(tree.active_step_id(), Some(2));
    }

    #[test]
    fn no_active_step_when_all_complete() {
        let progress: HashMap<_, _> = [1, 2, 3, 21, 22, 23].into_iter().map(|id| (id, done(3))).collect();
        let tree = WorkflowTree::build(sample_definitions(), &progress).unwrap();
        assert_eq!(tree.active_step_id(), None);
        assert!(tree.to_views().iter().all(|v| !v.is_active));
    }

    #[test]
    fn views_flag_exactly_one_active_step() {
        let progress = HashMap::from([(1, done(1))]);
        let tree = WorkflowTree::build(sample_definitions(), &progress).unwrap();
        let views = tree.to_views();
        let active: Vec<_> = views
            .iter()
            .flat_map(|v| std::iter::once(v).chain(v.child_steps.iter()))
            .filter(|v| v.is_active)
            .map(|v| v.id)
            .collect();
        assert_eq!(active, vec![21]);
        assert_eq!(views[0].completed_at, Some(ts(1)));
        assert_eq!(views[1].child_steps.len(), 3);
    }

    #[test]
    fn step_reference_parsing() {
        assert_eq!("42".parse::<StepReference>().unwrap(), StepReference::Id(42));
        assert_eq!(
            "H1B_DOCUMENT_GATHERING".parse::<StepReference>().unwrap(),
            StepReference::Key("H1B_DOCUMENT_GATHERING".to_string())
        );
        assert!("  ".parse::<StepReference>().is_err());
    }

    #[test]
    fn find_by_key_id_and_child_name() {
        let tree = WorkflowTree::build(sample_definitions(), &HashMap::new()).unwrap();
        assert_eq!(tree.find(&StepReference::Key("INFO".into())).unwrap().id, 2);
        assert_eq!(tree.find(&StepReference::Id(22)).unwrap().parent_step_id, Some(2));
        assert!(tree.find(&StepReference::Key("NOPE".into())).is_none());
        assert_eq!(
            tree.find_child_by_name("INFO", "Job Information").unwrap().id,
            23
        );
        assert!(tree.find_child_by_name("DOCS", "Job Information").is_none());
    }

    #[test]
    fn mark_completed_is_idempotent() {
        let mut tree = WorkflowTree::build(sample_definitions(), &HashMap::new()).unwrap();
        assert!(tree.mark_completed(1, ts(1)));
        assert!(!tree.mark_completed(1, ts(5)));
        assert_eq!(tree.steps()[0].progress.completed_at, Some(ts(1)));
        assert!(!tree.mark_completed(404, ts(1)));
    }

    #[test]
    fn mark_started_only_once() {
        let mut tree = WorkflowTree::build(sample_definitions(), &HashMap::new()).unwrap();
        assert!(tree.mark_started(21, ts(1)));
        assert!(!tree.mark_started(21, ts(2)));
        assert!(!tree.is_completed(21));
    }

    #[test]
    fn parent_ready_only_after_every_child() {
        let mut tree = WorkflowTree::build(sample_definitions(), &HashMap::new()).unwrap();
        tree.mark_completed(21, ts(1));
        tree.mark_completed(22, ts(1));
        assert!(tree.parents_ready_for_completion().is_empty());

        tree.mark_completed(23, ts(1));
        let ready: Vec<_> = tree.parents_ready_for_completion().into_iter().map(|s| s.id).collect();
        assert_eq!(ready, vec![2]);

        tree.mark_completed(2, ts(1));
        assert!(tree.parents_ready_for_completion().is_empty());
    }

    #[test]
    fn childless_steps_are_never_propagated() {
        let tree = WorkflowTree::build(sample_definitions(), &HashMap::new()).unwrap();
        let ready = tree.parents_ready_for_completion();
        assert!(ready.iter().all(|s| s.id != 1 && s.id != 3));
    }
}
