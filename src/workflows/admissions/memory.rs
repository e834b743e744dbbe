//! Process-shared store backing the admissions workflow.
//!
//! Tables mirror the relational layout (`draft`, `draft_work_experience`,
//! `draft_referee`, `submission`, `submission_work_experience`,
//! `submission_referee`, `payment_reference`) behind a single mutex, so every
//! [`AdmissionsStore::commit`] runs as one isolated unit of work: nothing is
//! mutated until every check has passed, and the conditional reference claim
//! is decided under the same lock that applies the writes.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Datelike, Utc};

use super::domain::{
    ApplicationId, Category, DraftId, DraftRecord, PaymentReferenceRecord, RefereeEntry,
    ReferenceStatus, ReviewUpdate, SubmissionId, SubmissionRecord, SubmissionStatus, UserId,
    WorkExperienceEntry,
};
use super::store::{
    AdmissionsStore, ClaimOutcome, CommitPlan, CommitRefusal, DraftStore, ImportSummary,
    ReferenceLedger, StoreError, SubmissionRepository,
};

/// Child-table row; `order_index` preserves form order explicitly.
#[derive(Debug, Clone)]
struct ChildRow<T> {
    order_index: u32,
    entry: T,
}

fn to_child_rows<T: Clone>(entries: &[T]) -> Vec<ChildRow<T>> {
    entries
        .iter()
        .cloned()
        .enumerate()
        .map(|(index, entry)| ChildRow {
            order_index: index as u32,
            entry,
        })
        .collect()
}

fn from_child_rows<T: Clone>(rows: &[ChildRow<T>]) -> Vec<T> {
    let mut rows: Vec<&ChildRow<T>> = rows.iter().collect();
    rows.sort_by_key(|row| row.order_index);
    rows.into_iter().map(|row| row.entry.clone()).collect()
}

#[derive(Debug, Clone)]
struct DraftRow {
    id: DraftId,
    user: UserId,
    category: Category,
    fields: std::collections::BTreeMap<String, super::domain::FieldValue>,
    completion_percentage: u8,
    last_saved_at: DateTime<Utc>,
    version: u32,
}

#[derive(Debug, Clone)]
struct SubmissionRow {
    id: SubmissionId,
    application_id: ApplicationId,
    user: UserId,
    category: Category,
    fields: std::collections::BTreeMap<String, super::domain::FieldValue>,
    payment_reference: String,
    payment_verified: bool,
    submitted_at: DateTime<Utc>,
    status: SubmissionStatus,
    review_comments: Option<String>,
    decision_date: Option<chrono::NaiveDate>,
}

#[derive(Default)]
struct Tables {
    drafts: HashMap<UserId, DraftRow>,
    draft_work_experience: HashMap<u64, Vec<ChildRow<WorkExperienceEntry>>>,
    draft_referees: HashMap<u64, Vec<ChildRow<RefereeEntry>>>,
    submissions: HashMap<ApplicationId, SubmissionRow>,
    submission_by_user: HashMap<UserId, ApplicationId>,
    submission_work_experience: HashMap<u64, Vec<ChildRow<WorkExperienceEntry>>>,
    submission_referees: HashMap<u64, Vec<ChildRow<RefereeEntry>>>,
    payment_references: HashMap<String, PaymentReferenceRecord>,
    next_draft_id: u64,
    next_submission_id: u64,
    next_application_seq: u64,
}

/// Shared in-memory implementation of every storage seam.
pub struct MemoryStore {
    application_id_prefix: String,
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new(application_id_prefix: impl Into<String>) -> Self {
        Self {
            application_id_prefix: application_id_prefix.into(),
            tables: Mutex::new(Tables::default()),
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Tables>, StoreError> {
        self.tables
            .lock()
            .map_err(|_| StoreError::Unavailable("store lock poisoned".to_string()))
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new("ADM")
    }
}

impl Tables {
    fn assemble_draft(&self, row: &DraftRow) -> DraftRecord {
        DraftRecord {
            id: row.id,
            user: row.user.clone(),
            category: row.category,
            fields: row.fields.clone(),
            work_experiences: self
                .draft_work_experience
                .get(&row.id.0)
                .map(|rows| from_child_rows(rows))
                .unwrap_or_default(),
            referees: self
                .draft_referees
                .get(&row.id.0)
                .map(|rows| from_child_rows(rows))
                .unwrap_or_default(),
            completion_percentage: row.completion_percentage,
            last_saved_at: row.last_saved_at,
            version: row.version,
        }
    }

    fn assemble_submission(&self, row: &SubmissionRow) -> SubmissionRecord {
        SubmissionRecord {
            id: row.id,
            application_id: row.application_id.clone(),
            user: row.user.clone(),
            category: row.category,
            fields: row.fields.clone(),
            work_experiences: self
                .submission_work_experience
                .get(&row.id.0)
                .map(|rows| from_child_rows(rows))
                .unwrap_or_default(),
            referees: self
                .submission_referees
                .get(&row.id.0)
                .map(|rows| from_child_rows(rows))
                .unwrap_or_default(),
            payment_reference: row.payment_reference.clone(),
            payment_verified: row.payment_verified,
            submitted_at: row.submitted_at,
            status: row.status,
            review_comments: row.review_comments.clone(),
            decision_date: row.decision_date,
        }
    }

    fn next_application_id(&mut self, prefix: &str, year: i32) -> ApplicationId {
        loop {
            self.next_application_seq += 1;
            let candidate = ApplicationId(format!(
                "{prefix}-{year}-{seq:06}",
                seq = self.next_application_seq
            ));
            if !self.submissions.contains_key(&candidate) {
                return candidate;
            }
        }
    }
}

impl DraftStore for MemoryStore {
    fn fetch(&self, user: &UserId) -> Result<Option<DraftRecord>, StoreError> {
        let tables = self.lock()?;
        Ok(tables.drafts.get(user).map(|row| tables.assemble_draft(row)))
    }

    fn fetch_category(
        &self,
        user: &UserId,
        category: Category,
    ) -> Result<Option<DraftRecord>, StoreError> {
        let tables = self.lock()?;
        Ok(tables
            .drafts
            .get(user)
            .filter(|row| row.category == category)
            .map(|row| tables.assemble_draft(row)))
    }

    fn upsert(
        &self,
        record: DraftRecord,
        expected_version: Option<u32>,
    ) -> Result<DraftRecord, StoreError> {
        let mut tables = self.lock()?;

        let (id, version) = match tables.drafts.get(&record.user) {
            Some(existing) => {
                if existing.category != record.category {
                    return Err(StoreError::CategoryConflict {
                        existing: existing.category,
                    });
                }
                if let Some(expected) = expected_version {
                    if existing.version != expected {
                        return Err(StoreError::StaleDraft {
                            stored: existing.version,
                        });
                    }
                }
                (existing.id, existing.version + 1)
            }
            None => {
                tables.next_draft_id += 1;
                (DraftId(tables.next_draft_id), 1)
            }
        };

        let row = DraftRow {
            id,
            user: record.user.clone(),
            category: record.category,
            fields: record.fields.clone(),
            completion_percentage: record.completion_percentage,
            last_saved_at: record.last_saved_at,
            version,
        };

        // Children are replaced wholesale with fresh order indices, in the
        // same locked section that rewrites the parent row.
        tables
            .draft_work_experience
            .insert(id.0, to_child_rows(&record.work_experiences));
        tables
            .draft_referees
            .insert(id.0, to_child_rows(&record.referees));
        tables.drafts.insert(record.user.clone(), row);

        Ok(DraftRecord {
            id,
            version,
            ..record
        })
    }

    fn delete(&self, user: &UserId, category: Category) -> Result<(), StoreError> {
        let mut tables = self.lock()?;
        match tables.drafts.get(user) {
            Some(row) if row.category == category => {
                let id = row.id.0;
                tables.drafts.remove(user);
                tables.draft_work_experience.remove(&id);
                tables.draft_referees.remove(&id);
                Ok(())
            }
            _ => Err(StoreError::NotFound),
        }
    }
}

impl SubmissionRepository for MemoryStore {
    fn for_user(&self, user: &UserId) -> Result<Option<SubmissionRecord>, StoreError> {
        let tables = self.lock()?;
        Ok(tables
            .submission_by_user
            .get(user)
            .and_then(|id| tables.submissions.get(id))
            .map(|row| tables.assemble_submission(row)))
    }

    fn find(&self, id: &ApplicationId) -> Result<Option<SubmissionRecord>, StoreError> {
        let tables = self.lock()?;
        Ok(tables
            .submissions
            .get(id)
            .map(|row| tables.assemble_submission(row)))
    }

    fn update_review(
        &self,
        id: &ApplicationId,
        update: ReviewUpdate,
    ) -> Result<SubmissionRecord, StoreError> {
        let mut tables = self.lock()?;
        let row = tables.submissions.get_mut(id).ok_or(StoreError::NotFound)?;
        row.status = update.status;
        row.review_comments = update.review_comments;
        row.decision_date = update.decision_date;
        let row = row.clone();
        Ok(tables.assemble_submission(&row))
    }
}

impl ReferenceLedger for MemoryStore {
    fn import(&self, references: &[String]) -> Result<ImportSummary, StoreError> {
        let mut tables = self.lock()?;
        let mut summary = ImportSummary::default();
        for reference in references {
            let reference = reference.trim();
            if reference.is_empty() {
                continue;
            }
            if tables.payment_references.contains_key(reference) {
                summary.existing += 1;
            } else {
                tables.payment_references.insert(
                    reference.to_string(),
                    PaymentReferenceRecord {
                        reference: reference.to_string(),
                        status: ReferenceStatus::Unused,
                        used_by: None,
                        used_at: None,
                    },
                );
                summary.inserted += 1;
            }
        }
        Ok(summary)
    }

    fn lookup(&self, reference: &str) -> Result<Option<PaymentReferenceRecord>, StoreError> {
        let tables = self.lock()?;
        Ok(tables.payment_references.get(reference).cloned())
    }

    fn claim(
        &self,
        reference: &str,
        user: &UserId,
        at: DateTime<Utc>,
    ) -> Result<ClaimOutcome, StoreError> {
        let mut tables = self.lock()?;
        let Some(row) = tables.payment_references.get_mut(reference) else {
            return Ok(ClaimOutcome::NotFound);
        };
        // Condition and write share one critical section; the transition
        // happens exactly once no matter how requests interleave.
        match row.status {
            ReferenceStatus::Unused => {
                row.status = ReferenceStatus::Used;
                row.used_by = Some(user.clone());
                row.used_at = Some(at);
                Ok(ClaimOutcome::Claimed(row.clone()))
            }
            ReferenceStatus::Used => Ok(ClaimOutcome::AlreadyUsed),
            ReferenceStatus::Flagged => Ok(ClaimOutcome::Flagged),
        }
    }

    fn flag(&self, reference: &str) -> Result<PaymentReferenceRecord, StoreError> {
        let mut tables = self.lock()?;
        let row = tables
            .payment_references
            .get_mut(reference)
            .ok_or(StoreError::NotFound)?;
        row.status = ReferenceStatus::Flagged;
        Ok(row.clone())
    }
}

impl AdmissionsStore for MemoryStore {
    fn commit(&self, plan: CommitPlan) -> Result<SubmissionRecord, CommitRefusal> {
        let mut tables = self.lock().map_err(CommitRefusal::Store)?;

        // Every precondition is re-checked under the lock before the first
        // mutation, so a refusal leaves all seven tables untouched.
        if tables.submission_by_user.contains_key(&plan.user) {
            return Err(CommitRefusal::AlreadySubmitted);
        }

        let draft = match tables.drafts.get(&plan.user) {
            Some(row) if row.category == plan.category => tables.assemble_draft(row),
            _ => return Err(CommitRefusal::DraftMissing(plan.category)),
        };

        match tables.payment_references.get(&plan.payment_reference) {
            None => return Err(CommitRefusal::ReferenceNotFound),
            Some(row) if row.status == ReferenceStatus::Used => {
                return Err(CommitRefusal::ReferenceAlreadyUsed)
            }
            Some(row) if row.status == ReferenceStatus::Flagged => {
                return Err(CommitRefusal::ReferenceFlagged)
            }
            Some(_) => {}
        }

        // Claim: the unused check above and this write are one atomic step.
        let reference = tables
            .payment_references
            .get_mut(&plan.payment_reference)
            .ok_or(CommitRefusal::ReferenceNotFound)?;
        reference.status = ReferenceStatus::Used;
        reference.used_by = Some(plan.user.clone());
        reference.used_at = Some(plan.submitted_at);

        tables.next_submission_id += 1;
        let submission_id = SubmissionId(tables.next_submission_id);
        let application_id = tables.next_application_id(
            &self.application_id_prefix,
            plan.submitted_at.year(),
        );

        let row = SubmissionRow {
            id: submission_id,
            application_id: application_id.clone(),
            user: plan.user.clone(),
            category: plan.category,
            fields: draft.fields.clone(),
            payment_reference: plan.payment_reference.clone(),
            payment_verified: true,
            submitted_at: plan.submitted_at,
            status: SubmissionStatus::Submitted,
            review_comments: None,
            decision_date: None,
        };

        tables
            .submission_work_experience
            .insert(submission_id.0, to_child_rows(&draft.work_experiences));
        tables
            .submission_referees
            .insert(submission_id.0, to_child_rows(&draft.referees));
        tables.submissions.insert(application_id.clone(), row);
        tables
            .submission_by_user
            .insert(plan.user.clone(), application_id.clone());

        tables.drafts.remove(&plan.user);
        tables.draft_work_experience.remove(&draft.id.0);
        tables.draft_referees.remove(&draft.id.0);

        let row = tables
            .submissions
            .get(&application_id)
            .cloned()
            .ok_or_else(|| {
                CommitRefusal::Store(StoreError::Unavailable(
                    "submission row vanished during commit".to_string(),
                ))
            })?;
        Ok(tables.assemble_submission(&row))
    }
}
