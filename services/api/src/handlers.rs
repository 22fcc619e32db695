//! Axum Handlers for the REST API
//!
//! Health check and glossary management. The glossary endpoints write through
//! the shared `GlossaryCache`, so new sessions pick up edits immediately.
//! It uses `utoipa` doc comments to generate OpenAPI documentation.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use std::{collections::BTreeMap, sync::Arc};
use tracing::{error, info};

use taskvoice_core::glossary::{Glossary, GlossaryCache, GlossaryError};

use crate::{
    models::{
        DeleteTermPayload, ErrorResponse, GlossaryBulkPayload, GlossaryTermPayload,
        HealthResponse,
    },
    state::AppState,
};

pub enum ApiError {
    BadRequest(String),
    InternalServerError(anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(message) => {
                (StatusCode::BAD_REQUEST, Json(ErrorResponse { message })).into_response()
            }
            ApiError::InternalServerError(err) => {
                error!("Internal Server Error: {:?}", err);
                let message = "An internal server error occurred.".to_string();
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorResponse { message }),
                )
                    .into_response()
            }
        }
    }
}

impl<E> From<E> for ApiError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self::InternalServerError(err.into())
    }
}

/// Runs a glossary operation on the blocking pool; the cache does file I/O.
async fn with_glossary<T, F>(state: &AppState, op: F) -> Result<T, ApiError>
where
    F: FnOnce(&GlossaryCache) -> Result<T, GlossaryError> + Send + 'static,
    T: Send + 'static,
{
    let glossary = Arc::clone(&state.glossary);
    Ok(tokio::task::spawn_blocking(move || op(&glossary)).await??)
}

fn required_term(term: &str) -> Result<&str, ApiError> {
    let term = term.trim();
    if term.is_empty() {
        return Err(ApiError::BadRequest("term must not be empty".to_string()));
    }
    Ok(term)
}

/// Liveness probe.
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is up", body = HealthResponse))
)]
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

/// Return the full phonetic glossary.
#[utoipa::path(
    get,
    path = "/api/v1/glossary",
    responses(
        (status = 200, description = "Canonical term -> misheard variants", body = BTreeMap<String, Vec<String>>),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn get_glossary(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Glossary>, ApiError> {
    let glossary = with_glossary(&state, |g| Ok(g.load())).await?;
    Ok(Json(glossary))
}

/// Overwrite the entire glossary with the provided data.
#[utoipa::path(
    post,
    path = "/api/v1/glossary",
    request_body = GlossaryBulkPayload,
    responses(
        (status = 200, description = "Glossary saved", body = BTreeMap<String, Vec<String>>),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn save_glossary(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<GlossaryBulkPayload>,
) -> Result<Json<Glossary>, ApiError> {
    info!(terms = payload.data.len(), "Replacing glossary");
    let glossary = with_glossary(&state, move |g| {
        g.save(payload.data)?;
        Ok(g.load())
    })
    .await?;
    Ok(Json(glossary))
}

/// Add or update a single glossary term.
#[utoipa::path(
    post,
    path = "/api/v1/glossary/term",
    request_body = GlossaryTermPayload,
    responses(
        (status = 200, description = "Term stored", body = BTreeMap<String, Vec<String>>),
        (status = 400, description = "Bad request", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn add_term(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<GlossaryTermPayload>,
) -> Result<Json<Glossary>, ApiError> {
    let term = required_term(&payload.term)?;
    info!(%term, variations = payload.variations.len(), "Adding glossary term");
    let term = term.to_string();
    let glossary = with_glossary(&state, move |g| g.add_term(&term, payload.variations)).await?;
    Ok(Json(glossary))
}

/// Remove a single glossary term by key.
#[utoipa::path(
    delete,
    path = "/api/v1/glossary/term",
    request_body = DeleteTermPayload,
    responses(
        (status = 200, description = "Term removed", body = BTreeMap<String, Vec<String>>),
        (status = 400, description = "Bad request", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn delete_term(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<DeleteTermPayload>,
) -> Result<Json<Glossary>, ApiError> {
    let term = required_term(&payload.term)?;
    info!(%term, "Removing glossary term");
    let term = term.to_string();
    let glossary = with_glossary(&state, move |g| g.remove_term(&term)).await?;
    Ok(Json(glossary))
}
