use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::completion::CompletionEvaluator;
use super::domain::{
    Category, DraftId, DraftRecord, RefereeEntry, UserId, WorkExperienceEntry,
};
use super::fields::{merge_fields, FieldError};
use super::store::{DraftStore, StoreError};
use super::view::ApplicationView;

/// Sparse save payload: any subset of schema fields, plus optional wholesale
/// replacements of the two child collections. A collection that is present
/// replaces every stored row; one that is absent is left alone.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DraftPayload {
    #[serde(default)]
    pub fields: BTreeMap<String, Value>,
    #[serde(default)]
    pub work_experiences: Option<Vec<WorkExperienceEntry>>,
    #[serde(default)]
    pub referees: Option<Vec<RefereeEntry>>,
    /// When set, the save only applies if the stored draft still has this
    /// version; autosaves leave it unset and accept last-write-wins.
    #[serde(default)]
    pub expected_version: Option<u32>,
}

/// What the caller gets back from a successful save.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftSaveReceipt {
    pub draft_id: DraftId,
    pub completion_percentage: u8,
    pub last_saved_at: DateTime<Utc>,
    pub version: u32,
}

/// Failures surfaced by draft operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DraftError {
    #[error(transparent)]
    Validation(#[from] FieldError),
    #[error("a {existing} draft already exists; delete it before starting a {requested} one")]
    CategoryConflict {
        existing: Category,
        requested: Category,
    },
    #[error("draft changed since it was read (stored version {stored})")]
    Stale { stored: u32 },
    #[error("no {0} draft found")]
    NotFound(Category),
    #[error("draft storage failed: {0}")]
    Store(StoreError),
}

/// Owns the mutable per-user draft and its child collections.
pub struct DraftService<S> {
    store: Arc<S>,
    evaluator: Arc<CompletionEvaluator>,
}

impl<S: DraftStore> DraftService<S> {
    pub fn new(store: Arc<S>, evaluator: Arc<CompletionEvaluator>) -> Self {
        Self { store, evaluator }
    }

    /// Merge a sparse payload into the user's draft, creating it on first
    /// save, and recompute completion. Matches against the declarative field
    /// schema; a draft of another category is a conflict, never silently
    /// replaced.
    pub fn save(
        &self,
        user: &UserId,
        category: Category,
        payload: DraftPayload,
    ) -> Result<DraftSaveReceipt, DraftError> {
        let existing = self.store.fetch(user).map_err(DraftError::Store)?;
        if let Some(existing) = &existing {
            if existing.category != category {
                return Err(DraftError::CategoryConflict {
                    existing: existing.category,
                    requested: category,
                });
            }
        }

        let mut record = existing.unwrap_or_else(|| DraftRecord {
            id: DraftId(0),
            user: user.clone(),
            category,
            fields: BTreeMap::new(),
            work_experiences: Vec::new(),
            referees: Vec::new(),
            completion_percentage: 0,
            last_saved_at: Utc::now(),
            version: 0,
        });

        merge_fields(&mut record.fields, &payload.fields, category)?;
        if let Some(work_experiences) = payload.work_experiences {
            record.work_experiences = work_experiences;
        }
        if let Some(referees) = payload.referees {
            record.referees = referees;
        }

        record.completion_percentage = self.evaluator.evaluate(&record).percentage;
        record.last_saved_at = Utc::now();

        let stored = self
            .store
            .upsert(record, payload.expected_version)
            .map_err(|error| match error {
                StoreError::CategoryConflict { existing } => DraftError::CategoryConflict {
                    existing,
                    requested: category,
                },
                StoreError::StaleDraft { stored } => DraftError::Stale { stored },
                other => DraftError::Store(other),
            })?;

        Ok(DraftSaveReceipt {
            draft_id: stored.id,
            completion_percentage: stored.completion_percentage,
            last_saved_at: stored.last_saved_at,
            version: stored.version,
        })
    }

    /// The draft rendered as the uniform nested step view.
    pub fn view(&self, user: &UserId, category: Category) -> Result<ApplicationView, DraftError> {
        let record = self
            .store
            .fetch_category(user, category)
            .map_err(DraftError::Store)?
            .ok_or(DraftError::NotFound(category))?;
        Ok(ApplicationView::from_draft(&record))
    }

    pub fn discard(&self, user: &UserId, category: Category) -> Result<(), DraftError> {
        self.store
            .delete(user, category)
            .map_err(|error| match error {
                StoreError::NotFound => DraftError::NotFound(category),
                other => DraftError::Store(other),
            })
    }
}
