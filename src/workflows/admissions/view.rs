use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{
    ApplicationId, Category, DraftRecord, FieldValue, FormStep, RefereeEntry, SubmissionRecord,
    WorkExperienceEntry,
};
use super::fields;

/// Lifecycle stage the view was built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStage {
    Draft,
    Submission,
}

/// Uniform nested rendering of an application, step by step, shaped the same
/// whether the source is a mutable draft or a committed submission so callers
/// never branch on lifecycle stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationView {
    pub stage: ApplicationStage,
    pub category: Category,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completion_percentage: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub application_id: Option<ApplicationId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submitted_at: Option<DateTime<Utc>>,
    pub steps: Vec<StepView>,
}

/// One step's fields plus the child rows that live under it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepView {
    pub step: FormStep,
    pub fields: BTreeMap<String, FieldValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub work_experiences: Option<Vec<WorkExperienceEntry>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub referees: Option<Vec<RefereeEntry>>,
}

fn step_views(
    category: Category,
    fields_map: &BTreeMap<String, FieldValue>,
    work_experiences: &[WorkExperienceEntry],
    referees: &[RefereeEntry],
) -> Vec<StepView> {
    category
        .steps()
        .iter()
        .map(|step| {
            let step_fields: BTreeMap<String, FieldValue> = fields::step_specs(*step, category)
                .filter_map(|spec| {
                    fields_map.get(spec.path).map(|value| {
                        // Field names are nested under their step, so drop
                        // the step prefix from the schema path.
                        let name = spec
                            .path
                            .split_once('.')
                            .map(|(_, rest)| rest)
                            .unwrap_or(spec.path);
                        (name.to_string(), value.clone())
                    })
                })
                .collect();

            StepView {
                step: *step,
                fields: step_fields,
                work_experiences: (*step == FormStep::Motivation)
                    .then(|| work_experiences.to_vec()),
                referees: (*step == FormStep::Referees).then(|| referees.to_vec()),
            }
        })
        .collect()
}

impl ApplicationView {
    pub fn from_draft(record: &DraftRecord) -> Self {
        Self {
            stage: ApplicationStage::Draft,
            category: record.category,
            completion_percentage: Some(record.completion_percentage),
            application_id: None,
            status: None,
            submitted_at: None,
            steps: step_views(
                record.category,
                &record.fields,
                &record.work_experiences,
                &record.referees,
            ),
        }
    }

    pub fn from_submission(record: &SubmissionRecord) -> Self {
        Self {
            stage: ApplicationStage::Submission,
            category: record.category,
            completion_percentage: None,
            application_id: Some(record.application_id.clone()),
            status: Some(record.status.label().to_string()),
            submitted_at: Some(record.submitted_at),
            steps: step_views(
                record.category,
                &record.fields,
                &record.work_experiences,
                &record.referees,
            ),
        }
    }
}
