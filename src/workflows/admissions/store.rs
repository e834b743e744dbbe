use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{
    ApplicationId, Category, DraftRecord, PaymentReferenceRecord, ReviewUpdate, SubmissionRecord,
    UserId,
};

/// Storage failure taxonomy shared by every seam.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,
    #[error("a {existing} draft already exists for this user")]
    CategoryConflict { existing: Category },
    #[error("draft was modified concurrently (stored version {stored})")]
    StaleDraft { stored: u32 },
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Mutable per-user draft storage; enforces the one-draft invariant.
pub trait DraftStore: Send + Sync {
    /// The user's draft regardless of category, if any.
    fn fetch(&self, user: &UserId) -> Result<Option<DraftRecord>, StoreError>;

    /// The user's draft only when it matches `category`.
    fn fetch_category(
        &self,
        user: &UserId,
        category: Category,
    ) -> Result<Option<DraftRecord>, StoreError>;

    /// Insert or replace the user's draft, assigning the id and bumping the
    /// version. Rejects with [`StoreError::CategoryConflict`] when a draft of
    /// another category exists, and with [`StoreError::StaleDraft`] when
    /// `expected_version` no longer matches the stored row. `None` keeps the
    /// autosave last-write-wins behavior.
    fn upsert(
        &self,
        record: DraftRecord,
        expected_version: Option<u32>,
    ) -> Result<DraftRecord, StoreError>;

    fn delete(&self, user: &UserId, category: Category) -> Result<(), StoreError>;
}

/// Append-only submission storage; only review fields are ever rewritten.
pub trait SubmissionRepository: Send + Sync {
    fn for_user(&self, user: &UserId) -> Result<Option<SubmissionRecord>, StoreError>;

    fn find(&self, id: &ApplicationId) -> Result<Option<SubmissionRecord>, StoreError>;

    /// Apply an administrative review decision. Applicant-supplied fields are
    /// never touched.
    fn update_review(
        &self,
        id: &ApplicationId,
        update: ReviewUpdate,
    ) -> Result<SubmissionRecord, StoreError>;
}

/// Result of attempting to claim a payment reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ClaimOutcome {
    Claimed(PaymentReferenceRecord),
    AlreadyUsed,
    Flagged,
    NotFound,
}

/// Counts reported by an idempotent bulk import.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ImportSummary {
    pub inserted: usize,
    pub existing: usize,
}

/// Owner of single-use payment-verification tokens.
pub trait ReferenceLedger: Send + Sync {
    /// Idempotent upsert: unknown references become `unused` rows, known ones
    /// are left untouched whatever their status.
    fn import(&self, references: &[String]) -> Result<ImportSummary, StoreError>;

    fn lookup(&self, reference: &str) -> Result<Option<PaymentReferenceRecord>, StoreError>;

    /// The atomic `unused → used` transition. Implementations must express
    /// this as a single conditional write whose effect decides the outcome;
    /// a read followed by an unconditional write would let two concurrent
    /// commits both believe they won.
    fn claim(
        &self,
        reference: &str,
        user: &UserId,
        at: DateTime<Utc>,
    ) -> Result<ClaimOutcome, StoreError>;

    /// Administrative out-of-band flagging; valid from `unused` or `used`.
    fn flag(&self, reference: &str) -> Result<PaymentReferenceRecord, StoreError>;
}

/// Everything the committer writes inside the atomic unit of work.
#[derive(Debug, Clone)]
pub struct CommitPlan {
    pub user: UserId,
    pub category: Category,
    pub payment_reference: String,
    pub submitted_at: DateTime<Utc>,
}

/// Refusals the store can raise while applying a [`CommitPlan`]. Each one
/// leaves the tables exactly as they were.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommitRefusal {
    #[error("user has already submitted an application")]
    AlreadySubmitted,
    #[error("no {0} draft to commit")]
    DraftMissing(Category),
    #[error("payment reference not found")]
    ReferenceNotFound,
    #[error("payment reference has already been used")]
    ReferenceAlreadyUsed,
    #[error("payment reference has been flagged")]
    ReferenceFlagged,
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Combined storage surface plus the single-transaction commit.
pub trait AdmissionsStore: DraftStore + SubmissionRepository + ReferenceLedger {
    /// Convert the user's draft into a submission atomically: claim the
    /// payment reference, insert the submission with its ordered children,
    /// delete the draft. Either every write lands or none does; in
    /// particular no submission row may survive a failed claim.
    fn commit(&self, plan: CommitPlan) -> Result<SubmissionRecord, CommitRefusal>;
}
