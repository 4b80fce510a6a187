//! Form field vocabulary and section completion.
//!
//! A section is complete when every visible, non-optional field
//! has a non-blank response. Visibility comes from the field's dependency
//! expression (see [`crate::dependency`]); hidden fields never block
//! completion.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::dependency::is_visible;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

pub const FIELD_TYPE_TEXT: &str = "text";
pub const FIELD_TYPE_NUMBER: &str = "number";
pub const FIELD_TYPE_DATE: &str = "date";
pub const FIELD_TYPE_BOOLEAN: &str = "boolean";
pub const FIELD_TYPE_SELECT_ONE: &str = "select_one";
pub const FIELD_TYPE_SELECT_MANY: &str = "select_many";
pub const FIELD_TYPE_SIGNATURE: &str = "signature";

/// All accepted field type strings.
pub const VALID_FIELD_TYPES: &[&str] = &[
    FIELD_TYPE_TEXT,
    FIELD_TYPE_NUMBER,
    FIELD_TYPE_DATE,
    FIELD_TYPE_BOOLEAN,
    FIELD_TYPE_SELECT_ONE,
    FIELD_TYPE_SELECT_MANY,
    FIELD_TYPE_SIGNATURE,
];

pub const ROLE_USER: &str = "user";
pub const ROLE_ASSISTANT: &str = "assistant";

/// All accepted response role strings.
pub const VALID_RESPONSE_ROLES: &[&str] = &[ROLE_USER, ROLE_ASSISTANT];

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Input kind of a template field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Text,
    Number,
    Date,
    Boolean,
    SelectOne,
    SelectMany,
    Signature,
}

impl FieldType {
    /// Convert from a database string value.
    pub fn from_str_value(s: &str) -> Result<Self, String> {
        match s {
            FIELD_TYPE_TEXT => Ok(Self::Text),
            FIELD_TYPE_NUMBER => Ok(Self::Number),
            FIELD_TYPE_DATE => Ok(Self::Date),
            FIELD_TYPE_BOOLEAN => Ok(Self::Boolean),
            FIELD_TYPE_SELECT_ONE => Ok(Self::SelectOne),
            FIELD_TYPE_SELECT_MANY => Ok(Self::SelectMany),
            FIELD_TYPE_SIGNATURE => Ok(Self::Signature),
            _ => Err(format!(
                "Invalid field type '{s}'. Must be one of: {}",
                VALID_FIELD_TYPES.join(", ")
            )),
        }
    }

    /// Convert to the database string value.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => FIELD_TYPE_TEXT,
            Self::Number => FIELD_TYPE_NUMBER,
            Self::Date => FIELD_TYPE_DATE,
            Self::Boolean => FIELD_TYPE_BOOLEAN,
            Self::SelectOne => FIELD_TYPE_SELECT_ONE,
            Self::SelectMany => FIELD_TYPE_SELECT_MANY,
            Self::Signature => FIELD_TYPE_SIGNATURE,
        }
    }

    /// Whether the field draws its answers from a fixed option list.
    pub fn has_options(&self) -> bool {
        matches!(self, Self::SelectOne | Self::SelectMany)
    }
}

/// Who produced a response value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseRole {
    User,
    Assistant,
}

impl ResponseRole {
    pub fn from_str_value(s: &str) -> Result<Self, String> {
        match s {
            ROLE_USER => Ok(Self::User),
            ROLE_ASSISTANT => Ok(Self::Assistant),
            _ => Err(format!(
                "Invalid response role '{s}'. Must be one of: {}",
                VALID_RESPONSE_ROLES.join(", ")
            )),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => ROLE_USER,
            Self::Assistant => ROLE_ASSISTANT,
        }
    }
}

// ---------------------------------------------------------------------------
// Section completion
// ---------------------------------------------------------------------------

/// Current response values of one form, keyed by field key.
pub type ResponseValues = HashMap<String, String>;

/// The parts of a template field that decide completion.
#[derive(Debug, Clone, Copy)]
pub struct FieldRequirement<'a> {
    pub key: &'a str,
    pub optional: bool,
    pub dependency_expression: Option<&'a str>,
}

/// Result of checking one section against current responses.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SectionCompletion {
    pub complete: bool,
    /// Visible non-optional fields still lacking a value.
    pub missing_keys: Vec<String>,
    /// Fields hidden by their dependency expression.
    pub hidden_keys: Vec<String>,
}

/// True when a response value counts as answered.
pub fn has_value(value: Option<&str>) -> bool {
    value.is_some_and(|v| !v.trim().is_empty())
}

/// Check whether every visible, non-optional field of a section is answered.
///
/// A section with no visible non-optional fields is complete.
pub fn check_section_completion<'a, I>(fields: I, responses: &ResponseValues) -> SectionCompletion
where
    I: IntoIterator<Item = FieldRequirement<'a>>,
{
    let mut result = SectionCompletion::default();

    for field in fields {
        if !is_visible(field.dependency_expression, responses) {
            result.hidden_keys.push(field.key.to_string());
            continue;
        }
        if field.optional {
            continue;
        }
        if !has_value(responses.get(field.key).map(String::as_str)) {
            result.missing_keys.push(field.key.to_string());
        }
    }

    result.complete = result.missing_keys.is_empty();
    result
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
