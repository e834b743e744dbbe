//! Admissions draft intake and the one-shot draft → submission commit.
//!
//! Applicants assemble a draft over many saves; once the completion evaluator
//! reports 100% the committer converts it into an immutable submission while
//! consuming a single-use payment reference. The storage seams are traits so
//! the services can be exercised against doubles; [`memory::MemoryStore`] is
//! the process-shared implementation wired in by the binary.

pub mod committer;
pub mod completion;
pub mod domain;
pub mod fields;
pub mod memory;
pub mod router;
pub mod store;
pub mod view;

pub mod draft;

#[cfg(test)]
mod tests;

pub use committer::{SubmissionCommitter, SubmissionReceipt, SubmitError};
pub use completion::{CompletionConfig, CompletionEvaluator, CompletionReport};
pub use domain::{
    ApplicationId, Category, DraftId, DraftRecord, FieldValue, FormStep, PaymentReferenceRecord,
    RefereeEntry, ReferenceStatus, ReviewUpdate, SubjectGrade, SubmissionId, SubmissionRecord,
    SubmissionStatus, UserId, WorkExperienceEntry,
};
pub use draft::{DraftError, DraftPayload, DraftSaveReceipt, DraftService};
pub use memory::MemoryStore;
pub use router::{admissions_router, AdmissionsState};
pub use store::{
    AdmissionsStore, ClaimOutcome, CommitPlan, CommitRefusal, DraftStore, ImportSummary,
    ReferenceLedger, StoreError, SubmissionRepository,
};
pub use view::{ApplicationStage, ApplicationView, StepView};
