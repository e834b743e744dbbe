use std::collections::BTreeSet;

use super::super::domain::{DraftRecord, FieldValue, FormStep};
use super::super::fields::{self, Normalizer};
use super::config::CompletionConfig;

/// Outcome of checking a single requirement within a step.
pub(crate) struct RequirementCheck {
    pub satisfied: bool,
    pub detail: Option<String>,
}

fn met() -> RequirementCheck {
    RequirementCheck {
        satisfied: true,
        detail: None,
    }
}

fn missing(detail: impl Into<String>) -> RequirementCheck {
    RequirementCheck {
        satisfied: false,
        detail: Some(detail.into()),
    }
}

/// Evaluate every requirement contributing to `step` for the draft's category.
pub(crate) fn step_requirements(
    draft: &DraftRecord,
    step: FormStep,
    config: &CompletionConfig,
) -> Vec<RequirementCheck> {
    let mut checks: Vec<RequirementCheck> = fields::step_specs(step, draft.category)
        .filter(|field| field.required)
        .map(|field| check_field(draft, field.path, field.normalizer, config))
        .collect();

    match step {
        FormStep::Referees => {
            let populated = draft
                .referees
                .iter()
                .filter(|referee| referee.is_populated())
                .count();
            if populated >= config.min_referees {
                checks.push(met());
            } else {
                checks.push(missing(format!(
                    "at least {} fully populated referees required, found {}",
                    config.min_referees, populated
                )));
            }
        }
        FormStep::Motivation => {
            // Work history rows are optional; the essay check happens per field.
        }
        _ => {}
    }

    checks
}

fn check_field(
    draft: &DraftRecord,
    path: &str,
    normalizer: Normalizer,
    config: &CompletionConfig,
) -> RequirementCheck {
    let value = match draft.fields.get(path) {
        Some(value) => value,
        None => return missing(format!("'{path}' is missing")),
    };

    match (normalizer, value) {
        (Normalizer::Flag, FieldValue::Flag(true)) => met(),
        (Normalizer::Flag, FieldValue::Flag(false)) => {
            missing(format!("'{path}' must be accepted"))
        }
        (Normalizer::Subjects, FieldValue::Subjects(rows)) => {
            let distinct: BTreeSet<&str> = rows
                .iter()
                .filter(|row| !row.subject.is_empty() && !row.grade.is_empty())
                .map(|row| row.subject.as_str())
                .collect();
            if distinct.len() >= config.min_subject_grades {
                met()
            } else {
                missing(format!(
                    "at least {} distinct subject/grade pairs required, found {}",
                    config.min_subject_grades,
                    distinct.len()
                ))
            }
        }
        (_, FieldValue::Text(text)) if path == "referees.payment_reference" => {
            if text.trim().len() >= config.min_reference_length {
                met()
            } else {
                missing(format!(
                    "payment reference must be at least {} characters",
                    config.min_reference_length
                ))
            }
        }
        (_, FieldValue::Text(text)) if path == "motivation.essay" => {
            let words = text.split_whitespace().count();
            if (config.essay_min_words..=config.essay_max_words).contains(&words) {
                met()
            } else {
                missing(format!(
                    "essay must be {}-{} words, found {}",
                    config.essay_min_words, config.essay_max_words, words
                ))
            }
        }
        (_, FieldValue::Text(text)) if text.trim().is_empty() => {
            missing(format!("'{path}' is blank"))
        }
        _ => met(),
    }
}
