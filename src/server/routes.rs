use crate::scan::report::escape_html;
use crate::state::{AppState, CountersSnapshot};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Json, Response};
use std::sync::Arc;

/// GET / -- fresh scan rendered as a page
pub async fn get_report_html(State(state): State<Arc<AppState>>) -> Response {
    match state.run_fresh_scan().await {
        Ok(report) => Html(report.render_html()).into_response(),
        Err(e) => {
            tracing::warn!(error = %e, "scan failed");
            (
                StatusCode::BAD_GATEWAY,
                Html(format!(
                    "<!DOCTYPE html><html><body><h1>scan failed</h1><p>{}</p></body></html>",
                    escape_html(&e.to_string())
                )),
            )
                .into_response()
        }
    }
}

/// GET /api/scan -- fresh scan as JSON
pub async fn get_scan(State(state): State<Arc<AppState>>) -> Response {
    match state.run_fresh_scan().await {
        Ok(report) => Json(report).into_response(),
        Err(e) => {
            tracing::warn!(error = %e, "scan failed");
            (
                StatusCode::BAD_GATEWAY,
                Json(serde_json::json!({ "error": e.to_string() })),
            )
                .into_response()
        }
    }
}

/// GET /api/counters -- performance counters (lock-free reads)
pub async fn get_counters(State(state): State<Arc<AppState>>) -> Json<CountersSnapshot> {
    Json(state.counters.snapshot())
}
