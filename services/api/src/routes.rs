use crate::infra::AppState;
use axum::extract::Query;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use chrono::NaiveDate;
use citizenship_intake::error::AppError;
use citizenship_intake::workflows::intake::calendar::{self, BsDate};
use citizenship_intake::workflows::intake::{
    intake_router, IntakeService, SessionStore, SubmissionSink, Transliterator,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub(crate) struct CalendarQuery {
    pub(crate) date: String,
}

/// The same day in both calendars.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct CalendarConversion {
    pub(crate) ad: NaiveDate,
    pub(crate) bs: BsDate,
}

pub(crate) fn with_intake_routes<S, K, T>(
    service: Arc<IntakeService<S, K, T>>,
    max_upload_bytes: usize,
) -> axum::Router
where
    S: SessionStore + 'static,
    K: SubmissionSink + 'static,
    T: Transliterator + 'static,
{
    intake_router(service, max_upload_bytes)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
        .route("/api/v1/calendar/bs", axum::routing::get(to_bs_endpoint))
        .route("/api/v1/calendar/ad", axum::routing::get(to_ad_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

/// `?date=` is a Gregorian date; answers with its BS counterpart.
pub(crate) async fn to_bs_endpoint(
    Query(query): Query<CalendarQuery>,
) -> Result<Json<CalendarConversion>, AppError> {
    let ad = calendar::parse_ad(&query.date)?;
    let bs = calendar::to_bs(ad)?;
    Ok(Json(CalendarConversion { ad, bs }))
}

/// `?date=` is a BS date; answers with its Gregorian counterpart.
pub(crate) async fn to_ad_endpoint(
    Query(query): Query<CalendarQuery>,
) -> Result<Json<CalendarConversion>, AppError> {
    let bs: BsDate = query.date.parse()?;
    let ad = calendar::to_ad(bs)?;
    Ok(Json(CalendarConversion { ad, bs }))
}
