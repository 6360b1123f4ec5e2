// HTTP routes over the reporting facade

mod http;

use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::snapshot_store::SqliteSnapshotStore;
use crate::usage_log::UsageLog;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) usage_log: Arc<UsageLog<SqliteSnapshotStore>>,
}

pub fn app(usage_log: Arc<UsageLog<SqliteSnapshotStore>>) -> Router {
    let state = AppState { usage_log };
    Router::new()
        .route("/", get(|| async { "usagelog: usage reporting" })) // GET /
        .route("/version", get(http::version_handler)) // GET /version
        .route("/api/usage", get(http::usage_handler)) // GET /api/usage
        .route("/api/purge", post(http::purge_handler)) // POST /api/purge
        .layer(CorsLayer::new().allow_origin(Any))
        .with_state(state)
}
