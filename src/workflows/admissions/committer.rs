use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::completion::{CompletionEvaluator, OutstandingRequirement};
use super::domain::{
    ApplicationId, Category, ReferenceStatus, SubmissionId, SubmissionStatus, UserId,
};
use super::store::{AdmissionsStore, CommitPlan, CommitRefusal, StoreError};

/// Wire-level error codes for payment-reference refusals.
pub const CODE_REFERENCE_REQUIRED: &str = "PAYMENT_REFERENCE_REQUIRED";
pub const CODE_REFERENCE_INVALID: &str = "PAYMENT_REFERENCE_INVALID";
pub const CODE_REFERENCE_ALREADY_USED: &str = "PAYMENT_REFERENCE_ALREADY_USED";
pub const CODE_REFERENCE_FLAGGED: &str = "PAYMENT_REFERENCE_FLAGGED";

/// Success payload for a committed submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionReceipt {
    pub application_id: ApplicationId,
    pub submission_id: SubmissionId,
    pub status: SubmissionStatus,
    pub submitted_at: DateTime<Utc>,
}

/// Every way a submit can be refused. No variant leaves partial writes: the
/// precondition failures happen before any mutation, and store refusals roll
/// the whole unit of work back.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SubmitError {
    #[error("an application has already been submitted for this user")]
    AlreadySubmitted,
    #[error("no {0} draft found")]
    DraftNotFound(Category),
    #[error("application is {percentage}% complete; all steps must be complete before submitting")]
    Incomplete {
        percentage: u8,
        outstanding: Vec<OutstandingRequirement>,
    },
    #[error("a payment reference is required before submitting")]
    ReferenceRequired,
    #[error("payment reference was not recognised")]
    ReferenceInvalid,
    #[error("payment reference has already been used")]
    ReferenceAlreadyUsed,
    #[error("payment reference has been flagged; contact the admissions office")]
    ReferenceFlagged,
    #[error("submission could not be persisted: {0}")]
    Persistence(StoreError),
}

impl SubmitError {
    /// Machine-readable code for payment-reference refusals.
    pub fn code(&self) -> Option<&'static str> {
        match self {
            SubmitError::ReferenceRequired => Some(CODE_REFERENCE_REQUIRED),
            SubmitError::ReferenceInvalid => Some(CODE_REFERENCE_INVALID),
            SubmitError::ReferenceAlreadyUsed => Some(CODE_REFERENCE_ALREADY_USED),
            SubmitError::ReferenceFlagged => Some(CODE_REFERENCE_FLAGGED),
            _ => None,
        }
    }
}

impl From<StoreError> for SubmitError {
    fn from(error: StoreError) -> Self {
        SubmitError::Persistence(error)
    }
}

/// Orchestrates the draft → submission transition.
///
/// Preconditions are checked read-only and in order; the writes themselves
/// are delegated to [`AdmissionsStore::commit`], whose conditional reference
/// claim is the sole arbiter when two submits race. Its refusals map back
/// into the same taxonomy, so the pre-checks only improve error latency,
/// never correctness.
pub struct SubmissionCommitter<S> {
    store: Arc<S>,
    evaluator: Arc<CompletionEvaluator>,
}

impl<S: AdmissionsStore> SubmissionCommitter<S> {
    pub fn new(store: Arc<S>, evaluator: Arc<CompletionEvaluator>) -> Self {
        Self { store, evaluator }
    }

    pub fn submit(
        &self,
        user: &UserId,
        category: Category,
    ) -> Result<SubmissionReceipt, SubmitError> {
        if self.store.for_user(user)?.is_some() {
            return Err(SubmitError::AlreadySubmitted);
        }

        let draft = self
            .store
            .fetch_category(user, category)?
            .ok_or(SubmitError::DraftNotFound(category))?;

        let report = self.evaluator.evaluate(&draft);
        if !report.is_complete() {
            return Err(SubmitError::Incomplete {
                percentage: report.percentage,
                outstanding: report.outstanding,
            });
        }

        let payment_reference = draft
            .payment_reference()
            .map(str::trim)
            .unwrap_or_default()
            .to_string();
        if payment_reference.is_empty() {
            return Err(SubmitError::ReferenceRequired);
        }

        match self.store.lookup(&payment_reference)? {
            None => return Err(SubmitError::ReferenceInvalid),
            Some(row) if row.status == ReferenceStatus::Used => {
                return Err(SubmitError::ReferenceAlreadyUsed)
            }
            Some(row) if row.status == ReferenceStatus::Flagged => {
                return Err(SubmitError::ReferenceFlagged)
            }
            Some(_) => {}
        }

        let plan = CommitPlan {
            user: user.clone(),
            category,
            payment_reference,
            submitted_at: Utc::now(),
        };

        let record = self.store.commit(plan).map_err(|refusal| {
            warn!(user = %user.0, %category, %refusal, "submission commit refused");
            match refusal {
                CommitRefusal::AlreadySubmitted => SubmitError::AlreadySubmitted,
                CommitRefusal::DraftMissing(category) => SubmitError::DraftNotFound(category),
                CommitRefusal::ReferenceNotFound => SubmitError::ReferenceInvalid,
                CommitRefusal::ReferenceAlreadyUsed => SubmitError::ReferenceAlreadyUsed,
                CommitRefusal::ReferenceFlagged => SubmitError::ReferenceFlagged,
                CommitRefusal::Store(error) => SubmitError::Persistence(error),
            }
        })?;

        info!(
            user = %user.0,
            application_id = %record.application_id.0,
            "draft committed to submission"
        );

        Ok(SubmissionReceipt {
            application_id: record.application_id,
            submission_id: record.id,
            status: record.status,
            submitted_at: record.submitted_at,
        })
    }
}
