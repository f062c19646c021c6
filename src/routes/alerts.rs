//! `/hawkular/alerts/` routes (spec §6).

use axum::extract::{Query, State};
use axum::Json;

use crate::alerts::rule::AlertRule;
use crate::state::AppState;

/// Matches the original `GetAlertsStatus` response shape
/// (`original_source/src/server/handlers/api.go`), which reports the
/// scheduler's configured interval and webhook target alongside its
/// service/heartbeat state.
#[derive(Debug, serde::Serialize)]
pub struct AlertsStatusResponse {
    #[serde(rename = "AlertsService")]
    alerts_service: &'static str,
    #[serde(rename = "HeartbeatTimestamp")]
    heartbeat_timestamp: i64,
    #[serde(rename = "AlertsInterval")]
    alerts_interval: u64,
    #[serde(rename = "ServerURL")]
    server_url: String,
}

pub async fn status(State(state): State<AppState>) -> Json<AlertsStatusResponse> {
    let service = if state.alerts.is_enabled() {
        "STARTED"
    } else {
        "UNAVAILABLE"
    };
    Json(AlertsStatusResponse {
        alerts_service: service,
        heartbeat_timestamp: state.alerts.heartbeat_ms(),
        alerts_interval: state.alerts.interval_seconds(),
        server_url: state.alerts.server_url().unwrap_or("").to_string(),
    })
}

#[derive(Debug, serde::Deserialize)]
pub struct RawParams {
    id: Option<String>,
    state: Option<bool>,
}

pub async fn raw(
    State(state): State<AppState>,
    Query(params): Query<RawParams>,
) -> Json<Vec<AlertRule>> {
    let rules = state
        .alerts
        .list(params.id.as_deref(), params.state)
        .await;
    Json(rules)
}
