use std::collections::BTreeMap;
use std::sync::Arc;

use axum::response::Response;
use chrono::{DateTime, NaiveDate, Utc};
use serde_json::{json, Value};

use crate::workflows::admissions::committer::SubmissionCommitter;
use crate::workflows::admissions::completion::{CompletionConfig, CompletionEvaluator};
use crate::workflows::admissions::domain::{
    ApplicationId, Category, DraftRecord, PaymentReferenceRecord, RefereeEntry, ReviewUpdate,
    SubmissionRecord, UserId, WorkExperienceEntry,
};
use crate::workflows::admissions::draft::{DraftPayload, DraftService};
use crate::workflows::admissions::memory::MemoryStore;
use crate::workflows::admissions::router::{admissions_router, AdmissionsState};
use crate::workflows::admissions::store::{
    AdmissionsStore, ClaimOutcome, CommitPlan, CommitRefusal, DraftStore, ImportSummary,
    ReferenceLedger, StoreError, SubmissionRepository,
};

pub(super) const REFERENCE: &str = "ABC1234567";

pub(super) fn user(id: &str) -> UserId {
    UserId(id.to_string())
}

pub(super) fn store() -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::default());
    store
        .import(&[REFERENCE.to_string()])
        .expect("reference import succeeds");
    store
}

pub(super) fn evaluator() -> Arc<CompletionEvaluator> {
    Arc::new(CompletionEvaluator::new(CompletionConfig::admissions()))
}

pub(super) fn draft_service(store: Arc<MemoryStore>) -> DraftService<MemoryStore> {
    DraftService::new(store, evaluator())
}

pub(super) fn committer(store: Arc<MemoryStore>) -> SubmissionCommitter<MemoryStore> {
    SubmissionCommitter::new(store, evaluator())
}

pub(super) fn build_state(store: Arc<MemoryStore>) -> AdmissionsState<MemoryStore> {
    AdmissionsState {
        drafts: Arc::new(draft_service(store.clone())),
        committer: Arc::new(committer(store.clone())),
        store,
    }
}

pub(super) fn router_with_store(store: Arc<MemoryStore>) -> axum::Router {
    admissions_router(build_state(store))
}

pub(super) fn field_map(pairs: Vec<(&str, Value)>) -> BTreeMap<String, Value> {
    pairs
        .into_iter()
        .map(|(path, value)| (path.to_string(), value))
        .collect()
}

pub(super) fn subjects_json(count: usize) -> Value {
    let subjects = [
        "Mathematics",
        "English Language",
        "Physics",
        "Chemistry",
        "Biology",
        "Economics",
        "Geography",
        "Further Mathematics",
    ];
    let rows: Vec<Value> = subjects
        .iter()
        .take(count)
        .map(|subject| json!({ "subject": subject, "grade": "A" }))
        .collect();
    Value::Array(rows)
}

pub(super) fn referee(name: &str) -> RefereeEntry {
    RefereeEntry {
        full_name: name.to_string(),
        email: format!("{}@example.edu", name.to_ascii_lowercase().replace(' ', ".")),
        phone: "+2348012345678".to_string(),
        institution: "Riverside College".to_string(),
        position: "Head of Department".to_string(),
    }
}

pub(super) fn referees_two() -> Vec<RefereeEntry> {
    vec![referee("Ada Obi"), referee("Chidi Eze")]
}

pub(super) fn work_history() -> Vec<WorkExperienceEntry> {
    vec![
        WorkExperienceEntry {
            employer: "Harbor Analytics".to_string(),
            role: "Data Analyst".to_string(),
            start_date: NaiveDate::from_ymd_opt(2021, 6, 1).expect("valid date"),
            end_date: Some(NaiveDate::from_ymd_opt(2023, 8, 31).expect("valid date")),
            responsibilities: "Built reporting pipelines".to_string(),
        },
        WorkExperienceEntry {
            employer: "Crestline Energy".to_string(),
            role: "Operations Officer".to_string(),
            start_date: NaiveDate::from_ymd_opt(2023, 9, 1).expect("valid date"),
            end_date: None,
            responsibilities: "Coordinated field operations".to_string(),
        },
    ]
}

pub(super) fn essay(words: usize) -> String {
    vec!["dedication"; words].join(" ")
}

fn shared_required_fields(application_type: &str, level: &str) -> Vec<(&'static str, Value)> {
    let mut pairs = vec![
        ("identity.surname", json!("Okafor")),
        ("identity.first_name", json!("Amara")),
        ("identity.gender", json!("female")),
        ("identity.date_of_birth", json!("2001-03-14")),
        ("identity.nationality", json!("Nigerian")),
        ("identity.home_address", json!("12 Marina Road, Lagos")),
        ("identity.email", json!("amara.okafor@example.com")),
        ("identity.phone", json!("+2348098765432")),
        (
            "identity.passport_photo_path",
            json!("uploads/photos/amara.jpg"),
        ),
        ("programme.first_choice", json!("Computer Science")),
        ("programme.entry_year", json!("2027")),
        (
            "education.secondary_school_name",
            json!("Riverside College"),
        ),
        ("education.exam_board", json!("WAEC")),
        ("education.exam_year", json!("2019")),
        ("education.exam_number", json!("4250901234")),
        ("education.subjects", json!(null)),
        ("referees.payment_reference", json!(REFERENCE)),
        ("referees.declaration_truthful", json!(true)),
        ("referees.declaration_terms", json!(true)),
    ];
    pairs.push(("programme.application_type", json!(application_type)));
    pairs.push(("programme.level_of_study", json!(level)));
    pairs
        .iter_mut()
        .find(|(path, _)| *path == "education.subjects")
        .expect("subjects entry present")
        .1 = subjects_json(6);
    pairs
}

/// Payload that takes a fresh undergraduate draft straight to 100%.
pub(super) fn complete_undergraduate_payload() -> DraftPayload {
    DraftPayload {
        fields: field_map(shared_required_fields("undergraduate", "undergraduate")),
        work_experiences: None,
        referees: Some(referees_two()),
        expected_version: None,
    }
}

/// Payload that takes a fresh postgraduate draft straight to 100%.
pub(super) fn complete_postgraduate_payload() -> DraftPayload {
    let mut pairs = shared_required_fields("postgraduate", "masters");
    pairs.push(("education.previous_institution", json!("State University")));
    pairs.push((
        "education.previous_qualification",
        json!("BSc Computer Science"),
    ));
    pairs.push(("motivation.essay", json!(essay(600))));
    DraftPayload {
        fields: field_map(pairs),
        work_experiences: Some(work_history()),
        referees: Some(referees_two()),
        expected_version: None,
    }
}

/// Save a payload and hand back the stored record for direct inspection.
pub(super) fn saved_draft(
    store: &Arc<MemoryStore>,
    user_id: &UserId,
    category: Category,
    payload: DraftPayload,
) -> DraftRecord {
    draft_service(store.clone())
        .save(user_id, category, payload)
        .expect("draft saves");
    store
        .fetch(user_id)
        .expect("fetch succeeds")
        .expect("draft present")
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 256 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

/// Store double that fails every operation, for persistence-error paths.
pub(super) struct UnavailableStore;

fn unavailable() -> StoreError {
    StoreError::Unavailable("database offline".to_string())
}

impl DraftStore for UnavailableStore {
    fn fetch(&self, _user: &UserId) -> Result<Option<DraftRecord>, StoreError> {
        Err(unavailable())
    }

    fn fetch_category(
        &self,
        _user: &UserId,
        _category: Category,
    ) -> Result<Option<DraftRecord>, StoreError> {
        Err(unavailable())
    }

    fn upsert(
        &self,
        _record: DraftRecord,
        _expected_version: Option<u32>,
    ) -> Result<DraftRecord, StoreError> {
        Err(unavailable())
    }

    fn delete(&self, _user: &UserId, _category: Category) -> Result<(), StoreError> {
        Err(unavailable())
    }
}

impl SubmissionRepository for UnavailableStore {
    fn for_user(&self, _user: &UserId) -> Result<Option<SubmissionRecord>, StoreError> {
        Err(unavailable())
    }

    fn find(&self, _id: &ApplicationId) -> Result<Option<SubmissionRecord>, StoreError> {
        Err(unavailable())
    }

    fn update_review(
        &self,
        _id: &ApplicationId,
        _update: ReviewUpdate,
    ) -> Result<SubmissionRecord, StoreError> {
        Err(unavailable())
    }
}

impl ReferenceLedger for UnavailableStore {
    fn import(&self, _references: &[String]) -> Result<ImportSummary, StoreError> {
        Err(unavailable())
    }

    fn lookup(&self, _reference: &str) -> Result<Option<PaymentReferenceRecord>, StoreError> {
        Err(unavailable())
    }

    fn claim(
        &self,
        _reference: &str,
        _user: &UserId,
        _at: DateTime<Utc>,
    ) -> Result<ClaimOutcome, StoreError> {
        Err(unavailable())
    }

    fn flag(&self, _reference: &str) -> Result<PaymentReferenceRecord, StoreError> {
        Err(unavailable())
    }
}

impl AdmissionsStore for UnavailableStore {
    fn commit(&self, _plan: CommitPlan) -> Result<SubmissionRecord, CommitRefusal> {
        Err(CommitRefusal::Store(unavailable()))
    }
}
