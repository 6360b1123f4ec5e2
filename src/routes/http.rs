// Handlers: version, usage report, purge

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use super::AppState;
use crate::error::ReportError;
use crate::models::{Period, UsageRow, report_rows};

/// Service name and version (from Cargo.toml at build time).
pub(super) async fn version_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct UsageQuery {
    beginning_ms: i64,
    ending_ms: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UsageResponse {
    period: Period,
    summaries: Vec<UsageRow>,
}

/// GET /api/usage?beginningMs=..&endingMs=.. — usage summary rows for the period.
pub(super) async fn usage_handler(
    State(state): State<AppState>,
    Query(q): Query<UsageQuery>,
) -> Response {
    let period = Period::new(q.beginning_ms, q.ending_ms);
    match state.usage_log.get_usage_summary(period).await {
        Ok(report) => Json(UsageResponse {
            period,
            summaries: report_rows(report),
        })
        .into_response(),
        Err(e) => error_response(e),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct PurgeRequest {
    earlier_than_ms: i64,
}

/// POST /api/purge {"earlierThanMs": ..} — deleted row counts.
pub(super) async fn purge_handler(
    State(state): State<AppState>,
    Json(req): Json<PurgeRequest>,
) -> Response {
    match state.usage_log.purge_log(req.earlier_than_ms).await {
        Ok(counts) => Json(counts).into_response(),
        Err(e) => error_response(e),
    }
}

fn error_response(e: ReportError) -> Response {
    let status = match e {
        ReportError::InvalidPeriod { .. } => StatusCode::BAD_REQUEST,
        ReportError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(serde_json::json!({ "error": e.to_string() }))).into_response()
}
