//! REST endpoints for contacts.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use tracing::{error, info};

use super::extract::{JsonOrForm, SelectedIds};
use super::model::{Contact, ContactForm};
use super::store::{ContactStore, PAGE_SIZE, SaveOutcome};
use crate::archive::Archiver;
use crate::error::StoreError;

/// Shared state for contact routes.
#[derive(Clone)]
pub struct ContactRouteState {
    pub store: Arc<dyn ContactStore>,
    /// Listing pages embed the archive snapshot so clients can render it inline.
    pub archiver: Archiver,
}

/// Build the contact routes.
pub fn contact_routes(state: ContactRouteState) -> Router {
    Router::new()
        .route("/contacts", get(list_contacts).delete(delete_selected))
        .route("/contacts/new", post(create_contact))
        .route("/contacts/count", get(count_contacts))
        .route("/contacts/{id}", get(show_contact).delete(delete_contact))
        .route("/contacts/{id}/edit", post(edit_contact))
        .route("/contacts/{id}/email", get(check_email))
        .with_state(state)
}

fn parse_id(raw: &str) -> Result<u64, Response> {
    raw.parse().map_err(|_| {
        (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({"error": "Invalid ID"})),
        )
            .into_response()
    })
}

fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({"error": "Record not found"})),
    )
        .into_response()
}

fn store_failure(e: StoreError) -> Response {
    if let StoreError::NotFound { id } = e {
        info!(id, "Contact not found");
        return not_found();
    }
    error!(error = %e, "Contact store operation failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(serde_json::json!({"error": "Failed to persist contacts"})),
    )
        .into_response()
}

fn save_response(outcome: SaveOutcome, created: StatusCode) -> Response {
    match outcome {
        SaveOutcome::Saved(contact) => (created, Json(serde_json::json!(contact))).into_response(),
        SaveOutcome::Invalid(errors) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(serde_json::json!({"errors": errors})),
        )
            .into_response(),
    }
}

// ── Listing ─────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct ListParams {
    q: Option<String>,
    page: Option<String>,
}

/// GET /contacts?q=&page=
///
/// A non-empty `q` returns search results instead of a page. An empty `q`
/// (cleared search box) falls back to the normal page.
async fn list_contacts(
    State(state): State<ContactRouteState>,
    Query(params): Query<ListParams>,
) -> impl IntoResponse {
    let page = params
        .page
        .as_deref()
        .and_then(|p| p.parse::<usize>().ok())
        .filter(|p| *p >= 1)
        .unwrap_or(1);
    let query = params.q.unwrap_or_default();

    let contacts = if query.is_empty() {
        state.store.all(page).await
    } else {
        state.store.search(&query).await
    };

    Json(serde_json::json!({
        "page": page,
        "page_size": PAGE_SIZE,
        "query": query,
        "contacts": contacts,
        "archive": state.archiver.snapshot(),
    }))
}

/// DELETE /contacts
///
/// Ids that fail to parse are skipped. Responds with the first page.
async fn delete_selected(
    State(state): State<ContactRouteState>,
    SelectedIds(selected): SelectedIds,
) -> Response {
    let ids: Vec<u64> = selected
        .iter()
        .filter_map(|raw| match raw.parse::<u64>() {
            Ok(id) => Some(id),
            Err(_) => {
                info!(id = %raw, "Skipping unparseable contact id");
                None
            }
        })
        .collect();

    if let Err(e) = state.store.delete_many(&ids).await {
        return store_failure(e);
    }

    Json(serde_json::json!({
        "page": 1,
        "page_size": PAGE_SIZE,
        "query": "",
        "contacts": state.store.all(1).await,
    }))
    .into_response()
}

async fn count_contacts(State(state): State<ContactRouteState>) -> impl IntoResponse {
    Json(serde_json::json!({"count": state.store.count().await}))
}

// ── Single contact ──────────────────────────────────────────────────────

/// POST /contacts/new
///
/// Accepts a JSON body or a form post.
async fn create_contact(
    State(state): State<ContactRouteState>,
    JsonOrForm(form): JsonOrForm<ContactForm>,
) -> Response {
    match state.store.save(Contact::from(form)).await {
        Ok(outcome) => save_response(outcome, StatusCode::CREATED),
        Err(e) => store_failure(e),
    }
}

async fn show_contact(State(state): State<ContactRouteState>, Path(id): Path<String>) -> Response {
    let id = match parse_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    match state.store.find(id).await {
        Some(contact) => Json(contact).into_response(),
        None => not_found(),
    }
}

async fn edit_contact(
    State(state): State<ContactRouteState>,
    Path(id): Path<String>,
    JsonOrForm(form): JsonOrForm<ContactForm>,
) -> Response {
    let id = match parse_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    match state.store.update(id, form).await {
        Ok(outcome) => save_response(outcome, StatusCode::OK),
        Err(e) => store_failure(e),
    }
}

/// DELETE /contacts/{id}
///
/// Deleting an unknown id still answers 204.
async fn delete_contact(
    State(state): State<ContactRouteState>,
    Path(id): Path<String>,
) -> Response {
    let id = match parse_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    match state.store.delete(id).await {
        Ok(_) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => store_failure(e),
    }
}

#[derive(Deserialize)]
struct EmailParams {
    #[serde(default)]
    email: String,
}

/// GET /contacts/{id}/email?email=
///
/// Inline validation while the user types. An unknown id validates as a new contact.
async fn check_email(
    State(state): State<ContactRouteState>,
    Path(id): Path<String>,
    Query(params): Query<EmailParams>,
) -> Response {
    let id = match parse_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let mut contact = state.store.find(id).await.unwrap_or_default();
    contact.email = params.email;

    let errors = state.store.validate(&contact).await;
    Json(serde_json::json!({"error": errors.get("email")})).into_response()
}
