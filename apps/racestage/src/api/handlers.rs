//! # API Endpoint Handlers
//!
//! Every report handler builds its own `StageCounter`; server state only
//! holds the data source and the split range.

use super::{
    AppState,
    types::{
        ChartParams, ClassifyRequest, ClassifyResponse, ErrorResponse, HealthResponse,
        MAX_REPORT_PARTICIPANTS, ReportRequest, SplitsParams,
    },
};
use crate::chart::build_chart;
use crate::provider::{FieldFilter, ProviderError, records};
use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use racestage_core::classify;

/// Map a provider failure: unreachable data is 404, unusable data is 400.
fn provider_error(context: &str, e: &ProviderError) -> Response {
    tracing::error!("{}: {}", context, e);
    let status = if e.is_fetch_failure() {
        StatusCode::NOT_FOUND
    } else {
        StatusCode::BAD_REQUEST
    };
    (status, Json(ErrorResponse::new(format!("{context}: {e}")))).into_response()
}

fn bad_request(msg: String) -> Response {
    tracing::error!("{}", msg);
    (StatusCode::BAD_REQUEST, Json(ErrorResponse::new(msg))).into_response()
}

// =============================================================================
// HEALTH HANDLER
// =============================================================================

/// Health check endpoint.
pub async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse::default())
}

// =============================================================================
// COURSES / SPLITS HANDLERS
// =============================================================================

/// List the event's courses.
pub async fn courses_handler(State(state): State<AppState>) -> Response {
    let courses = match state.source.courses().await {
        Ok(c) => c,
        Err(e) => return provider_error("failed to fetch courses", &e),
    };

    match records::course_infos(courses) {
        Ok(infos) => (StatusCode::OK, Json(infos)).into_response(),
        Err(e) => bad_request(format!("failed to parse courses: {e}")),
    }
}

/// List the stage splits of a course.
pub async fn splits_handler(
    State(state): State<AppState>,
    Query(params): Query<SplitsParams>,
) -> Response {
    let splits = match state.source.splits(params.course).await {
        Ok(s) => s,
        Err(e) => return provider_error("failed to fetch splits", &e),
    };

    match records::select_splits(splits, state.splits) {
        Ok(infos) => (StatusCode::OK, Json(infos)).into_response(),
        Err(e) => bad_request(format!("failed to parse splits: {e}")),
    }
}

// =============================================================================
// CHART HANDLER
// =============================================================================

/// Stage and status counts for a course, fetched live.
pub async fn chart_handler(
    State(state): State<AppState>,
    Query(params): Query<ChartParams>,
) -> Response {
    let filter = match FieldFilter::parse(&params.filter) {
        Ok(f) => f,
        Err(e) => return bad_request(e.to_string()),
    };

    match build_chart(state.source.as_ref(), params.course, &filter, state.splits).await {
        Ok(report) => (StatusCode::OK, Json(report)).into_response(),
        Err(e) => provider_error("failed to build chart", &e),
    }
}

// =============================================================================
// REPORT HANDLER
// =============================================================================

/// Stage and status counts for records supplied in the body.
pub async fn report_handler(Json(request): Json<ReportRequest>) -> Response {
    if request.participants.len() > MAX_REPORT_PARTICIPANTS {
        return bad_request(format!(
            "{} participants exceed maximum {}",
            request.participants.len(),
            MAX_REPORT_PARTICIPANTS
        ));
    }

    let report = records::count_records(request.stages, &request.participants);
    (StatusCode::OK, Json(report)).into_response()
}

// =============================================================================
// CLASSIFY HANDLER
// =============================================================================

/// Classify one record without counting it anywhere.
pub async fn classify_handler(Json(request): Json<ClassifyRequest>) -> impl IntoResponse {
    let (result, diagnostic) = classify(&request.stages, &request.record);
    (StatusCode::OK, Json(ClassifyResponse::new(result, &diagnostic)))
}
