use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Authenticated applicant identity, supplied by the identity provider at the edge.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(pub String);

/// Human-readable identifier minted at commit time, distinct from the storage key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ApplicationId(pub String);

/// Storage key for a draft row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftId(pub u64);

/// Storage key for a submission row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionId(pub u64);

/// Application category selecting which form steps apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Undergraduate,
    Postgraduate,
}

impl Category {
    pub const fn label(self) -> &'static str {
        match self {
            Category::Undergraduate => "undergraduate",
            Category::Postgraduate => "postgraduate",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "undergraduate" => Some(Category::Undergraduate),
            "postgraduate" => Some(Category::Postgraduate),
            _ => None,
        }
    }

    /// Steps evaluated for this category, in form order.
    pub fn steps(self) -> &'static [FormStep] {
        match self {
            Category::Undergraduate => &[
                FormStep::Identity,
                FormStep::Programme,
                FormStep::Education,
                FormStep::Referees,
            ],
            Category::Postgraduate => &[
                FormStep::Identity,
                FormStep::Programme,
                FormStep::Education,
                FormStep::Motivation,
                FormStep::Referees,
            ],
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Logical form steps; `Motivation` only applies to postgraduate applications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormStep {
    Identity,
    Programme,
    Education,
    Motivation,
    Referees,
}

impl FormStep {
    pub const fn label(self) -> &'static str {
        match self {
            FormStep::Identity => "identity",
            FormStep::Programme => "programme",
            FormStep::Education => "education",
            FormStep::Motivation => "motivation",
            FormStep::Referees => "referees",
        }
    }
}

/// Normalized scalar stored for one schema field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    Flag(bool),
    Date(NaiveDate),
    Subjects(Vec<SubjectGrade>),
}

impl FieldValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_flag(&self) -> Option<bool> {
        match self {
            FieldValue::Flag(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_subjects(&self) -> Option<&[SubjectGrade]> {
        match self {
            FieldValue::Subjects(rows) => Some(rows),
            _ => None,
        }
    }
}

/// One secondary-education result row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectGrade {
    pub subject: String,
    pub grade: String,
}

/// Employment history row owned by exactly one draft or submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkExperienceEntry {
    pub employer: String,
    pub role: String,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub responsibilities: String,
}

impl WorkExperienceEntry {
    pub fn is_populated(&self) -> bool {
        !self.employer.trim().is_empty() && !self.role.trim().is_empty()
    }
}

/// Referee contact row owned by exactly one draft or submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefereeEntry {
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub institution: String,
    pub position: String,
}

impl RefereeEntry {
    /// A referee counts toward completion only when every contact field is filled in.
    pub fn is_populated(&self) -> bool {
        [
            &self.full_name,
            &self.email,
            &self.phone,
            &self.institution,
            &self.position,
        ]
        .iter()
        .all(|field| !field.trim().is_empty())
    }
}

/// Mutable staging record for an in-progress application.
///
/// Scalars live in the `fields` map keyed by schema path so sparse merges and
/// step evaluation both run off the same declarative table. Child rows carry
/// their order implicitly through `Vec` position; the store assigns explicit
/// order indices when persisting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftRecord {
    pub id: DraftId,
    pub user: UserId,
    pub category: Category,
    pub fields: BTreeMap<String, FieldValue>,
    pub work_experiences: Vec<WorkExperienceEntry>,
    pub referees: Vec<RefereeEntry>,
    pub completion_percentage: u8,
    pub last_saved_at: DateTime<Utc>,
    pub version: u32,
}

impl DraftRecord {
    pub fn text_field(&self, path: &str) -> Option<&str> {
        self.fields.get(path).and_then(FieldValue::as_text)
    }

    pub fn payment_reference(&self) -> Option<&str> {
        self.text_field("referees.payment_reference")
    }
}

/// Immutable record created by committing a complete draft. Only the review
/// fields (`status`, `review_comments`, `decision_date`) change afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionRecord {
    pub id: SubmissionId,
    pub application_id: ApplicationId,
    pub user: UserId,
    pub category: Category,
    pub fields: BTreeMap<String, FieldValue>,
    pub work_experiences: Vec<WorkExperienceEntry>,
    pub referees: Vec<RefereeEntry>,
    pub payment_reference: String,
    pub payment_verified: bool,
    pub submitted_at: DateTime<Utc>,
    pub status: SubmissionStatus,
    pub review_comments: Option<String>,
    pub decision_date: Option<NaiveDate>,
}

/// Review lifecycle of a committed submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    Submitted,
    UnderReview,
    Accepted,
    Rejected,
}

impl SubmissionStatus {
    pub const fn label(self) -> &'static str {
        match self {
            SubmissionStatus::Submitted => "submitted",
            SubmissionStatus::UnderReview => "under_review",
            SubmissionStatus::Accepted => "accepted",
            SubmissionStatus::Rejected => "rejected",
        }
    }
}

/// Administrative review update; never touches applicant-supplied fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewUpdate {
    pub status: SubmissionStatus,
    #[serde(default)]
    pub review_comments: Option<String>,
    #[serde(default)]
    pub decision_date: Option<NaiveDate>,
}

/// Ledger row for a single-use payment-verification token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentReferenceRecord {
    pub reference: String,
    pub status: ReferenceStatus,
    pub used_by: Option<UserId>,
    pub used_at: Option<DateTime<Utc>>,
}

/// Lifecycle of a payment reference: `unused → used` exactly once at commit
/// time, or flagged out of band by an administrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceStatus {
    Unused,
    Used,
    Flagged,
}

impl ReferenceStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ReferenceStatus::Unused => "unused",
            ReferenceStatus::Used => "used",
            ReferenceStatus::Flagged => "flagged",
        }
    }
}
