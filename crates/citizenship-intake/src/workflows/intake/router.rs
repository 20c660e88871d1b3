use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, patch, post, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tracing::error;

use super::domain::{DocumentAttachment, DocumentSlot, FieldName};
use super::form::{FieldEdit, FormError, StepError, SubmitError};
use super::repository::{SessionId, SessionStore, StoreError};
use super::service::{IntakeService, IntakeServiceError};
use super::submission::SubmissionSink;
use super::transliteration::Transliterator;

const SUBMIT_FAILED: &str = "Error submitting form";

#[derive(Debug, Deserialize)]
pub(crate) struct BlurRequest {
    field: FieldName,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TransliterateRequest {
    field: FieldName,
    text: String,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct UploadQuery {
    file_name: Option<String>,
}

/// Router exposing the intake session endpoints.
///
/// `max_upload_bytes` bounds request bodies; keep it above the document size
/// ceiling so oversize scans come back as field errors.
pub fn intake_router<S, K, T>(
    service: Arc<IntakeService<S, K, T>>,
    max_upload_bytes: usize,
) -> Router
where
    S: SessionStore + 'static,
    K: SubmissionSink + 'static,
    T: Transliterator + 'static,
{
    Router::new()
        .route("/api/v1/intake/sessions", post(create_handler::<S, K, T>))
        .route(
            "/api/v1/intake/sessions/:session_id",
            get(view_handler::<S, K, T>),
        )
        .route(
            "/api/v1/intake/sessions/:session_id/fields",
            patch(edit_handler::<S, K, T>),
        )
        .route(
            "/api/v1/intake/sessions/:session_id/blur",
            post(blur_handler::<S, K, T>),
        )
        .route(
            "/api/v1/intake/sessions/:session_id/transliterate",
            post(transliterate_handler::<S, K, T>),
        )
        .route(
            "/api/v1/intake/sessions/:session_id/documents/:slot",
            put(upload_handler::<S, K, T>),
        )
        .route(
            "/api/v1/intake/sessions/:session_id/documents/:slot/preview",
            get(preview_handler::<S, K, T>),
        )
        .route(
            "/api/v1/intake/sessions/:session_id/continue",
            post(continue_handler::<S, K, T>),
        )
        .route(
            "/api/v1/intake/sessions/:session_id/back",
            post(back_handler::<S, K, T>),
        )
        .route(
            "/api/v1/intake/sessions/:session_id/submit",
            post(submit_handler::<S, K, T>),
        )
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .with_state(service)
}

pub(crate) async fn create_handler<S, K, T>(
    State(service): State<Arc<IntakeService<S, K, T>>>,
) -> Response
where
    S: SessionStore + 'static,
    K: SubmissionSink + 'static,
    T: Transliterator + 'static,
{
    match service.create().await {
        Ok(view) => (StatusCode::CREATED, Json(view)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn view_handler<S, K, T>(
    State(service): State<Arc<IntakeService<S, K, T>>>,
    Path(session_id): Path<String>,
) -> Response
where
    S: SessionStore + 'static,
    K: SubmissionSink + 'static,
    T: Transliterator + 'static,
{
    ok_or_error(service.get(&SessionId(session_id)).await)
}

pub(crate) async fn edit_handler<S, K, T>(
    State(service): State<Arc<IntakeService<S, K, T>>>,
    Path(session_id): Path<String>,
    Json(edit): Json<FieldEdit>,
) -> Response
where
    S: SessionStore + 'static,
    K: SubmissionSink + 'static,
    T: Transliterator + 'static,
{
    ok_or_error(service.apply(&SessionId(session_id), edit).await)
}

pub(crate) async fn blur_handler<S, K, T>(
    State(service): State<Arc<IntakeService<S, K, T>>>,
    Path(session_id): Path<String>,
    Json(request): Json<BlurRequest>,
) -> Response
where
    S: SessionStore + 'static,
    K: SubmissionSink + 'static,
    T: Transliterator + 'static,
{
    ok_or_error(service.blur(&SessionId(session_id), request.field).await)
}

pub(crate) async fn transliterate_handler<S, K, T>(
    State(service): State<Arc<IntakeService<S, K, T>>>,
    Path(session_id): Path<String>,
    Json(request): Json<TransliterateRequest>,
) -> Response
where
    S: SessionStore + 'static,
    K: SubmissionSink + 'static,
    T: Transliterator + 'static,
{
    ok_or_error(
        service
            .transliterate(&SessionId(session_id), request.field, &request.text)
            .await,
    )
}

pub(crate) async fn upload_handler<S, K, T>(
    State(service): State<Arc<IntakeService<S, K, T>>>,
    Path((session_id, slot)): Path<(String, DocumentSlot)>,
    Query(query): Query<UploadQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> Response
where
    S: SessionStore + 'static,
    K: SubmissionSink + 'static,
    T: Transliterator + 'static,
{
    let file_name = query
        .file_name
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| slot.label().to_string());
    let media_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| DocumentAttachment::guess_media_type(&file_name));

    let attachment = DocumentAttachment::from_bytes(file_name, media_type, body.to_vec());
    ok_or_error(
        service
            .attach(&SessionId(session_id), slot, attachment)
            .await,
    )
}

pub(crate) async fn preview_handler<S, K, T>(
    State(service): State<Arc<IntakeService<S, K, T>>>,
    Path((session_id, slot)): Path<(String, DocumentSlot)>,
) -> Response
where
    S: SessionStore + 'static,
    K: SubmissionSink + 'static,
    T: Transliterator + 'static,
{
    ok_or_error(service.preview(&SessionId(session_id), slot).await)
}

pub(crate) async fn continue_handler<S, K, T>(
    State(service): State<Arc<IntakeService<S, K, T>>>,
    Path(session_id): Path<String>,
) -> Response
where
    S: SessionStore + 'static,
    K: SubmissionSink + 'static,
    T: Transliterator + 'static,
{
    ok_or_error(
        service
            .continue_to_documents(&SessionId(session_id))
            .await,
    )
}

pub(crate) async fn back_handler<S, K, T>(
    State(service): State<Arc<IntakeService<S, K, T>>>,
    Path(session_id): Path<String>,
) -> Response
where
    S: SessionStore + 'static,
    K: SubmissionSink + 'static,
    T: Transliterator + 'static,
{
    ok_or_error(service.back(&SessionId(session_id)).await)
}

pub(crate) async fn submit_handler<S, K, T>(
    State(service): State<Arc<IntakeService<S, K, T>>>,
    Path(session_id): Path<String>,
) -> Response
where
    S: SessionStore + 'static,
    K: SubmissionSink + 'static,
    T: Transliterator + 'static,
{
    ok_or_error(service.submit(&SessionId(session_id)).await)
}

fn ok_or_error<V: serde::Serialize>(result: Result<V, IntakeServiceError>) -> Response {
    match result {
        Ok(value) => (StatusCode::OK, Json(value)).into_response(),
        Err(err) => error_response(err),
    }
}

fn error_response(err: IntakeServiceError) -> Response {
    match err {
        IntakeServiceError::Store(StoreError::NotFound) => {
            message_response(StatusCode::NOT_FOUND, "session not found")
        }
        IntakeServiceError::Store(StoreError::Conflict) => {
            message_response(StatusCode::CONFLICT, "session already exists")
        }
        IntakeServiceError::Step(step) | IntakeServiceError::Submit(SubmitError::Step(step)) => {
            step_response(step)
        }
        IntakeServiceError::Form(FormError::AlreadySubmitted) => {
            message_response(StatusCode::CONFLICT, &FormError::AlreadySubmitted.to_string())
        }
        IntakeServiceError::Form(err @ FormError::NotTransliterable(_)) => {
            message_response(StatusCode::BAD_REQUEST, &err.to_string())
        }
        IntakeServiceError::MissingDocument(slot) => message_response(
            StatusCode::NOT_FOUND,
            &IntakeServiceError::MissingDocument(slot).to_string(),
        ),
        IntakeServiceError::Submit(err) => {
            error!(error = %err, "submission failed");
            message_response(StatusCode::INTERNAL_SERVER_ERROR, SUBMIT_FAILED)
        }
        other => {
            error!(error = %other, "intake request failed");
            message_response(StatusCode::INTERNAL_SERVER_ERROR, &other.to_string())
        }
    }
}

fn step_response(err: StepError) -> Response {
    match err {
        StepError::Invalid(errors) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "errors": errors })),
        )
            .into_response(),
        wrong_step @ StepError::WrongStep { .. } => {
            message_response(StatusCode::CONFLICT, &wrong_step.to_string())
        }
    }
}

fn message_response(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}
