//! Declarative field schema shared by draft merging and completion scoring.
//!
//! Every scalar the form collects is one [`FieldSpec`] row: its path, the step
//! it belongs to, how raw payload values are normalized, and whether it gates
//! step completion. Adding a field is a table edit, not a new branch.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde_json::Value;

use super::domain::{Category, FieldValue, FormStep, SubjectGrade};

pub const GENDERS: &[&str] = &["male", "female"];
pub const APPLICATION_TYPES: &[&str] = &["undergraduate", "postgraduate"];
pub const LEVELS_OF_STUDY: &[&str] = &["foundation", "undergraduate", "masters", "doctorate"];
pub const STUDY_MODES: &[&str] = &["full_time", "part_time"];

/// How a raw payload value becomes a stored [`FieldValue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Normalizer {
    /// Trimmed free text; a blank string clears the field.
    Text,
    /// ISO `YYYY-MM-DD` date.
    Date,
    /// Boolean checkbox.
    Flag,
    /// Case-insensitive match against a fixed allowed set, stored canonical.
    Enumerated(&'static [&'static str]),
    /// Four-digit calendar year kept as text.
    Year,
    /// Ordered subject/grade rows.
    Subjects,
}

/// One row of the form schema.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub path: &'static str,
    pub step: FormStep,
    pub normalizer: Normalizer,
    /// Gates completion of `step`. Required flags must additionally be true.
    pub required: bool,
    /// `Some(category)` scopes the field (and its requirement) to one flow.
    pub category: Option<Category>,
}

const fn spec(path: &'static str, step: FormStep, normalizer: Normalizer) -> FieldSpec {
    FieldSpec {
        path,
        step,
        normalizer,
        required: true,
        category: None,
    }
}

const fn optional(path: &'static str, step: FormStep, normalizer: Normalizer) -> FieldSpec {
    FieldSpec {
        required: false,
        ..spec(path, step, normalizer)
    }
}

const fn postgraduate(mut base: FieldSpec) -> FieldSpec {
    base.category = Some(Category::Postgraduate);
    base
}

/// The full scalar schema, in form order.
pub const SCHEMA: &[FieldSpec] = &[
    // Step 1: identity
    spec("identity.surname", FormStep::Identity, Normalizer::Text),
    spec("identity.first_name", FormStep::Identity, Normalizer::Text),
    optional("identity.middle_name", FormStep::Identity, Normalizer::Text),
    spec(
        "identity.gender",
        FormStep::Identity,
        Normalizer::Enumerated(GENDERS),
    ),
    spec("identity.date_of_birth", FormStep::Identity, Normalizer::Date),
    spec("identity.nationality", FormStep::Identity, Normalizer::Text),
    optional("identity.state_of_origin", FormStep::Identity, Normalizer::Text),
    spec("identity.home_address", FormStep::Identity, Normalizer::Text),
    spec("identity.email", FormStep::Identity, Normalizer::Text),
    spec("identity.phone", FormStep::Identity, Normalizer::Text),
    spec(
        "identity.passport_photo_path",
        FormStep::Identity,
        Normalizer::Text,
    ),
    optional("identity.marital_status", FormStep::Identity, Normalizer::Text),
    // Step 2: programme choice
    spec(
        "programme.application_type",
        FormStep::Programme,
        Normalizer::Enumerated(APPLICATION_TYPES),
    ),
    spec(
        "programme.level_of_study",
        FormStep::Programme,
        Normalizer::Enumerated(LEVELS_OF_STUDY),
    ),
    spec("programme.first_choice", FormStep::Programme, Normalizer::Text),
    optional("programme.second_choice", FormStep::Programme, Normalizer::Text),
    optional(
        "programme.preferred_campus",
        FormStep::Programme,
        Normalizer::Text,
    ),
    spec("programme.entry_year", FormStep::Programme, Normalizer::Year),
    optional(
        "programme.study_mode",
        FormStep::Programme,
        Normalizer::Enumerated(STUDY_MODES),
    ),
    // Step 3: education history
    spec(
        "education.secondary_school_name",
        FormStep::Education,
        Normalizer::Text,
    ),
    optional(
        "education.secondary_school_location",
        FormStep::Education,
        Normalizer::Text,
    ),
    spec("education.exam_board", FormStep::Education, Normalizer::Text),
    spec("education.exam_year", FormStep::Education, Normalizer::Year),
    spec("education.exam_number", FormStep::Education, Normalizer::Text),
    spec("education.subjects", FormStep::Education, Normalizer::Subjects),
    postgraduate(spec(
        "education.previous_institution",
        FormStep::Education,
        Normalizer::Text,
    )),
    postgraduate(spec(
        "education.previous_qualification",
        FormStep::Education,
        Normalizer::Text,
    )),
    postgraduate(optional(
        "education.previous_grade",
        FormStep::Education,
        Normalizer::Text,
    )),
    // Step 4: motivation and work history (postgraduate only)
    postgraduate(spec("motivation.essay", FormStep::Motivation, Normalizer::Text)),
    postgraduate(optional(
        "motivation.research_interest",
        FormStep::Motivation,
        Normalizer::Text,
    )),
    // Step 5: referees and declaration
    spec(
        "referees.payment_reference",
        FormStep::Referees,
        Normalizer::Text,
    ),
    spec(
        "referees.declaration_truthful",
        FormStep::Referees,
        Normalizer::Flag,
    ),
    spec(
        "referees.declaration_terms",
        FormStep::Referees,
        Normalizer::Flag,
    ),
    optional(
        "referees.declaration_date",
        FormStep::Referees,
        Normalizer::Date,
    ),
];

pub fn lookup(path: &str) -> Option<&'static FieldSpec> {
    SCHEMA.iter().find(|field| field.path == path)
}

/// Schema rows that participate in `step` for `category`.
pub fn step_specs(
    step: FormStep,
    category: Category,
) -> impl Iterator<Item = &'static FieldSpec> {
    SCHEMA.iter().filter(move |field| {
        field.step == step && field.category.map(|scope| scope == category).unwrap_or(true)
    })
}

/// Rejection raised while normalizing an incoming field payload.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FieldError {
    #[error("unknown field '{0}'")]
    UnknownField(String),
    #[error("field '{path}' does not apply to {category} applications")]
    WrongCategory { path: String, category: &'static str },
    #[error("field '{path}' is invalid: {reason}")]
    InvalidValue { path: String, reason: String },
    #[error("field '{path}' must be one of [{}]", allowed.join(", "))]
    OutsideAllowedSet {
        path: String,
        allowed: Vec<String>,
    },
}

/// Merge a sparse payload of `path → raw value` into the stored field map.
///
/// JSON `null` (or a blank string for text fields) deletes the stored value;
/// anything else replaces it after normalization. The merge is all-or-nothing:
/// the map is only touched once every incoming entry has normalized cleanly.
pub fn merge_fields(
    fields: &mut BTreeMap<String, FieldValue>,
    incoming: &BTreeMap<String, Value>,
    category: Category,
) -> Result<(), FieldError> {
    let mut staged: Vec<(&'static str, Option<FieldValue>)> = Vec::with_capacity(incoming.len());

    for (path, raw) in incoming {
        let field = lookup(path).ok_or_else(|| FieldError::UnknownField(path.clone()))?;
        if let Some(scope) = field.category {
            if scope != category {
                return Err(FieldError::WrongCategory {
                    path: path.clone(),
                    category: category.label(),
                });
            }
        }
        staged.push((field.path, normalize(field, raw)?));
    }

    for (path, value) in staged {
        match value {
            Some(value) => {
                fields.insert(path.to_string(), value);
            }
            None => {
                fields.remove(path);
            }
        }
    }

    Ok(())
}

fn normalize(field: &FieldSpec, raw: &Value) -> Result<Option<FieldValue>, FieldError> {
    if raw.is_null() {
        return Ok(None);
    }

    match field.normalizer {
        Normalizer::Text => {
            let text = expect_str(field, raw)?.trim().to_string();
            Ok((!text.is_empty()).then_some(FieldValue::Text(text)))
        }
        Normalizer::Date => {
            let text = expect_str(field, raw)?.trim();
            if text.is_empty() {
                return Ok(None);
            }
            let date = NaiveDate::parse_from_str(text, "%Y-%m-%d").map_err(|_| {
                FieldError::InvalidValue {
                    path: field.path.to_string(),
                    reason: "expected an ISO date (YYYY-MM-DD)".to_string(),
                }
            })?;
            Ok(Some(FieldValue::Date(date)))
        }
        Normalizer::Flag => {
            let flag = raw.as_bool().ok_or_else(|| FieldError::InvalidValue {
                path: field.path.to_string(),
                reason: "expected a boolean".to_string(),
            })?;
            Ok(Some(FieldValue::Flag(flag)))
        }
        Normalizer::Enumerated(allowed) => {
            let text = expect_str(field, raw)?.trim().to_ascii_lowercase();
            if text.is_empty() {
                return Ok(None);
            }
            let canonical = allowed.iter().find(|candidate| **candidate == text);
            match canonical {
                Some(canonical) => Ok(Some(FieldValue::Text((*canonical).to_string()))),
                None => Err(FieldError::OutsideAllowedSet {
                    path: field.path.to_string(),
                    allowed: allowed.iter().map(|value| value.to_string()).collect(),
                }),
            }
        }
        Normalizer::Year => {
            let text = expect_str(field, raw)?.trim();
            if text.is_empty() {
                return Ok(None);
            }
            if text.len() != 4 || !text.bytes().all(|byte| byte.is_ascii_digit()) {
                return Err(FieldError::InvalidValue {
                    path: field.path.to_string(),
                    reason: "expected a four-digit year".to_string(),
                });
            }
            Ok(Some(FieldValue::Text(text.to_string())))
        }
        Normalizer::Subjects => {
            let rows: Vec<SubjectGrade> =
                serde_json::from_value(raw.clone()).map_err(|_| FieldError::InvalidValue {
                    path: field.path.to_string(),
                    reason: "expected a list of {subject, grade} rows".to_string(),
                })?;
            let rows: Vec<SubjectGrade> = rows
                .into_iter()
                .map(|row| SubjectGrade {
                    subject: row.subject.trim().to_string(),
                    grade: row.grade.trim().to_string(),
                })
                .collect();
            Ok((!rows.is_empty()).then_some(FieldValue::Subjects(rows)))
        }
    }
}

fn expect_str<'a>(field: &FieldSpec, raw: &'a Value) -> Result<&'a str, FieldError> {
    raw.as_str().ok_or_else(|| FieldError::InvalidValue {
        path: field.path.to_string(),
        reason: "expected a string".to_string(),
    })
}
