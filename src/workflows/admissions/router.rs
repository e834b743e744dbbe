use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use super::committer::{SubmissionCommitter, SubmitError};
use super::domain::{ApplicationId, Category, ReviewUpdate, UserId};
use super::draft::{DraftError, DraftPayload, DraftService};
use super::store::{AdmissionsStore, StoreError};
use super::view::ApplicationView;

/// Shared handler state. The draft service and committer cover applicant
/// traffic; the raw store backs the administrative surfaces.
pub struct AdmissionsState<S> {
    pub drafts: Arc<DraftService<S>>,
    pub committer: Arc<SubmissionCommitter<S>>,
    pub store: Arc<S>,
}

impl<S> Clone for AdmissionsState<S> {
    fn clone(&self) -> Self {
        Self {
            drafts: self.drafts.clone(),
            committer: self.committer.clone(),
            store: self.store.clone(),
        }
    }
}

/// Router exposing draft CRUD, submission commit, and the admin surfaces.
pub fn admissions_router<S: AdmissionsStore + 'static>(state: AdmissionsState<S>) -> Router {
    Router::new()
        .route(
            "/api/v1/admissions/drafts/:category",
            put(save_draft_handler::<S>)
                .get(draft_view_handler::<S>)
                .delete(discard_draft_handler::<S>),
        )
        .route("/api/v1/admissions/submissions", post(submit_handler::<S>))
        .route(
            "/api/v1/admissions/submissions/:application_id",
            get(submission_view_handler::<S>),
        )
        .route(
            "/api/v1/admissions/submissions/:application_id/review",
            axum::routing::patch(review_handler::<S>),
        )
        .route(
            "/api/v1/admissions/references/import",
            post(import_references_handler::<S>),
        )
        .route(
            "/api/v1/admissions/references/:reference/flag",
            post(flag_reference_handler::<S>),
        )
        .with_state(state)
}

/// The identity provider terminates upstream and forwards the subject here.
fn authenticated_user(headers: &HeaderMap) -> Result<UserId, Response> {
    headers
        .get("x-user-id")
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(|value| UserId(value.to_string()))
        .ok_or_else(|| {
            let payload = json!({ "error": "missing x-user-id header" });
            (StatusCode::UNAUTHORIZED, Json(payload)).into_response()
        })
}

fn parse_category(raw: &str) -> Result<Category, Response> {
    Category::parse(raw).ok_or_else(|| {
        let payload = json!({
            "error": format!("unknown category '{raw}'; expected undergraduate or postgraduate"),
        });
        (StatusCode::UNPROCESSABLE_ENTITY, Json(payload)).into_response()
    })
}

fn draft_error_response(error: DraftError) -> Response {
    let payload = json!({ "error": error.to_string() });
    let status = match error {
        DraftError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        DraftError::CategoryConflict { .. } | DraftError::Stale { .. } => StatusCode::CONFLICT,
        DraftError::NotFound(_) => StatusCode::NOT_FOUND,
        DraftError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(payload)).into_response()
}

pub(crate) async fn save_draft_handler<S: AdmissionsStore + 'static>(
    State(state): State<AdmissionsState<S>>,
    Path(category): Path<String>,
    headers: HeaderMap,
    Json(payload): Json<DraftPayload>,
) -> Response {
    let user = match authenticated_user(&headers) {
        Ok(user) => user,
        Err(response) => return response,
    };
    let category = match parse_category(&category) {
        Ok(category) => category,
        Err(response) => return response,
    };

    match state.drafts.save(&user, category, payload) {
        Ok(receipt) => (StatusCode::OK, Json(receipt)).into_response(),
        Err(error) => draft_error_response(error),
    }
}

pub(crate) async fn draft_view_handler<S: AdmissionsStore + 'static>(
    State(state): State<AdmissionsState<S>>,
    Path(category): Path<String>,
    headers: HeaderMap,
) -> Response {
    let user = match authenticated_user(&headers) {
        Ok(user) => user,
        Err(response) => return response,
    };
    let category = match parse_category(&category) {
        Ok(category) => category,
        Err(response) => return response,
    };

    match state.drafts.view(&user, category) {
        Ok(view) => (StatusCode::OK, Json(view)).into_response(),
        Err(error) => draft_error_response(error),
    }
}

pub(crate) async fn discard_draft_handler<S: AdmissionsStore + 'static>(
    State(state): State<AdmissionsState<S>>,
    Path(category): Path<String>,
    headers: HeaderMap,
) -> Response {
    let user = match authenticated_user(&headers) {
        Ok(user) => user,
        Err(response) => return response,
    };
    let category = match parse_category(&category) {
        Ok(category) => category,
        Err(response) => return response,
    };

    match state.drafts.discard(&user, category) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(error) => draft_error_response(error),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct SubmitRequest {
    pub category: Category,
}

pub(crate) async fn submit_handler<S: AdmissionsStore + 'static>(
    State(state): State<AdmissionsState<S>>,
    headers: HeaderMap,
    Json(request): Json<SubmitRequest>,
) -> Response {
    let user = match authenticated_user(&headers) {
        Ok(user) => user,
        Err(response) => return response,
    };

    match state.committer.submit(&user, request.category) {
        Ok(receipt) => (StatusCode::CREATED, Json(receipt)).into_response(),
        Err(error) => submit_error_response(error),
    }
}

fn submit_error_response(error: SubmitError) -> Response {
    let status = match &error {
        SubmitError::DraftNotFound(_) => StatusCode::NOT_FOUND,
        SubmitError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
        _ => StatusCode::UNPROCESSABLE_ENTITY,
    };

    let mut payload = json!({
        "success": false,
        "message": error.to_string(),
    });
    if let Some(code) = error.code() {
        payload["code"] = json!(code);
    }
    if let SubmitError::Incomplete {
        percentage,
        outstanding,
    } = &error
    {
        payload["completion_percentage"] = json!(percentage);
        payload["outstanding"] = json!(outstanding);
    }

    (status, Json(payload)).into_response()
}

pub(crate) async fn submission_view_handler<S: AdmissionsStore + 'static>(
    State(state): State<AdmissionsState<S>>,
    Path(application_id): Path<String>,
) -> Response {
    let id = ApplicationId(application_id);
    match state.store.find(&id) {
        Ok(Some(record)) => {
            (StatusCode::OK, Json(ApplicationView::from_submission(&record))).into_response()
        }
        Ok(None) => not_found_response("submission not found"),
        Err(error) => store_error_response(error),
    }
}

pub(crate) async fn review_handler<S: AdmissionsStore + 'static>(
    State(state): State<AdmissionsState<S>>,
    Path(application_id): Path<String>,
    Json(update): Json<ReviewUpdate>,
) -> Response {
    let id = ApplicationId(application_id);
    match state.store.update_review(&id, update) {
        Ok(record) => {
            let payload = json!({
                "application_id": record.application_id,
                "status": record.status.label(),
                "review_comments": record.review_comments,
                "decision_date": record.decision_date,
            });
            (StatusCode::OK, Json(payload)).into_response()
        }
        Err(StoreError::NotFound) => not_found_response("submission not found"),
        Err(error) => store_error_response(error),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ImportRequest {
    pub references: Vec<String>,
}

pub(crate) async fn import_references_handler<S: AdmissionsStore + 'static>(
    State(state): State<AdmissionsState<S>>,
    Json(request): Json<ImportRequest>,
) -> Response {
    match state.store.import(&request.references) {
        Ok(summary) => (StatusCode::OK, Json(summary)).into_response(),
        Err(error) => store_error_response(error),
    }
}

pub(crate) async fn flag_reference_handler<S: AdmissionsStore + 'static>(
    State(state): State<AdmissionsState<S>>,
    Path(reference): Path<String>,
) -> Response {
    match state.store.flag(&reference) {
        Ok(record) => {
            let payload = json!({
                "reference": record.reference,
                "status": record.status.label(),
            });
            (StatusCode::OK, Json(payload)).into_response()
        }
        Err(StoreError::NotFound) => not_found_response("payment reference not found"),
        Err(error) => store_error_response(error),
    }
}

fn not_found_response(message: &str) -> Response {
    let payload = json!({ "error": message });
    (StatusCode::NOT_FOUND, Json(payload)).into_response()
}

fn store_error_response(error: StoreError) -> Response {
    let payload = json!({ "error": error.to_string() });
    (StatusCode::INTERNAL_SERVER_ERROR, Json(payload)).into_response()
}
