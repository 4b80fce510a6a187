//! Mapping form responses onto PDF form elements.
//!
//! Responses are first flattened into `pdf_field_name -> value` pairs
//! ([`build_field_value_pairs`]). A [`FormFiller`], chosen by template
//! identity, then decides which PDF element receives which value. Writing
//! the bytes of the PDF belongs to an external renderer.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::forms::FieldType;
use crate::rules::{TEMPLATE_I129, TEMPLATE_I130};
use crate::types::DbId;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Check box value for the chosen option.
pub const CHECKBOX_ON: &str = "/Y";

/// Check box value for every other option.
pub const CHECKBOX_OFF: &str = "/Off";

/// Index suffix PDF authoring tools append to AcroForm widget names.
const WIDGET_INDEX_SUFFIX: &str = "[0]";

/// `pdf_field_name -> value`, ordered for stable output.
pub type FieldValuePairs = BTreeMap<String, String>;

// ---------------------------------------------------------------------------
// Field value pairs
// ---------------------------------------------------------------------------

/// Export-relevant attributes of a template field.
#[derive(Debug, Clone)]
pub struct ExportField<'a> {
    pub id: DbId,
    pub field_type: FieldType,
    pub pdf_field_name: Option<&'a str>,
    pub should_fill_on_form: bool,
}

/// An option of a select field and the check box it drives.
#[derive(Debug, Clone)]
pub struct ExportOption<'a> {
    pub id: DbId,
    pub pdf_field_name: Option<&'a str>,
}

/// Flatten stored responses into PDF field/value pairs.
///
/// - `select_one`: the response holds the chosen option id; every option
///   with a PDF name becomes a check box set to `/Y` or `/Off`.
/// - `select_many`: not exported.
/// - everything else: the field's own PDF name gets the raw value, when the
///   field is marked for filling.
///
/// `responses` maps template field id to stored value; `options` maps
/// template field id to its options.
pub fn build_field_value_pairs(
    fields: &[ExportField<'_>],
    options: &HashMap<DbId, Vec<ExportOption<'_>>>,
    responses: &HashMap<DbId, String>,
) -> FieldValuePairs {
    let mut pairs = FieldValuePairs::new();

    for field in fields {
        let Some(value) = responses.get(&field.id) else {
            continue;
        };

        match field.field_type {
            FieldType::SelectOne => {
                let chosen = value.trim();
                for option in options.get(&field.id).into_iter().flatten() {
                    if let Some(name) = option.pdf_field_name {
                        let mark = if option.id.to_string() == chosen {
                            CHECKBOX_ON
                        } else {
                            CHECKBOX_OFF
                        };
                        pairs.insert(name.to_string(), mark.to_string());
                    }
                }
            }
            FieldType::SelectMany => {}
            _ => {
                if let (true, Some(name)) = (field.should_fill_on_form, field.pdf_field_name) {
                    pairs.insert(name.to_string(), value.clone());
                }
            }
        }
    }

    pairs
}

// ---------------------------------------------------------------------------
// Filling strategies
// ---------------------------------------------------------------------------

/// PDF form technology a template is filled with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FillStrategy {
    /// Widget annotations addressed by field name.
    AcroForm,
    /// XML datasets addressed by element tag.
    Xfa,
}

impl FillStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AcroForm => "acro_form",
            Self::Xfa => "xfa",
        }
    }
}

/// One value destined for one PDF element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldAssignment {
    pub target: String,
    pub value: String,
}

/// Resolves field/value pairs against the elements a PDF actually has.
pub trait FormFiller: Send + Sync {
    fn strategy(&self) -> FillStrategy;

    /// The value `target` should receive, if any.
    fn value_for<'p>(&self, pairs: &'p FieldValuePairs, target: &str) -> Option<&'p str>;

    /// Assignments for every target that receives a value, in target order.
    fn assign(&self, pairs: &FieldValuePairs, targets: &[String]) -> Vec<FieldAssignment> {
        targets
            .iter()
            .filter_map(|target| {
                self.value_for(pairs, target).map(|value| FieldAssignment {
                    target: target.clone(),
                    value: value.to_string(),
                })
            })
            .collect()
    }
}

/// AcroForm widgets: exact name first, then the name without its `[0]`
/// index suffix.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcroFormFiller;

impl FormFiller for AcroFormFiller {
    fn strategy(&self) -> FillStrategy {
        FillStrategy::AcroForm
    }

    fn value_for<'p>(&self, pairs: &'p FieldValuePairs, target: &str) -> Option<&'p str> {
        if let Some(value) = pairs.get(target) {
            return Some(value);
        }
        let base = target.replace(WIDGET_INDEX_SUFFIX, "");
        pairs.get(&base).map(String::as_str)
    }
}

/// XFA datasets: exact tag match; blank values leave the tag untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct XfaFiller;

impl FormFiller for XfaFiller {
    fn strategy(&self) -> FillStrategy {
        FillStrategy::Xfa
    }

    fn value_for<'p>(&self, pairs: &'p FieldValuePairs, target: &str) -> Option<&'p str> {
        pairs
            .get(target)
            .map(String::as_str)
            .filter(|v| !v.trim().is_empty())
    }
}

/// The filler used for a form template, by template name.
pub fn filler_for_template(template_name: &str) -> Option<Box<dyn FormFiller>> {
    match template_name {
        TEMPLATE_I129 => Some(Box::new(XfaFiller)),
        TEMPLATE_I130 => Some(Box::new(AcroFormFiller)),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
