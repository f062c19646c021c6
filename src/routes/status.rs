//! `GET status` (spec §6).

use axum::extract::State;
use axum::Json;

use crate::state::AppState;

#[derive(Debug, serde::Serialize)]
pub struct StatusResponse {
    #[serde(rename = "MetricsService")]
    metrics_service: &'static str,
    #[serde(rename = "Implementation-Version")]
    implementation_version: &'static str,
    #[serde(rename = "MohawkVersion")]
    mohawk_version: &'static str,
    #[serde(rename = "MohawkStorage")]
    mohawk_storage: &'static str,
}

pub async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        metrics_service: "STARTED",
        implementation_version: env!("CARGO_PKG_VERSION"),
        mohawk_version: env!("CARGO_PKG_VERSION"),
        mohawk_storage: state.storage.name(),
    })
}
