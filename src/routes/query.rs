//! `POST m/stats/query` — multi-id query returning the object envelope
//! (spec §6 table, §4.5).

use std::collections::HashMap;

use axum::extract::State;
use axum::Json;
use chrono::Utc;

use crate::error::{AppResult, CoreError};
use crate::query::{self, QueryRequest, SeriesData};
use crate::state::AppState;

use super::tenant::TenantHeader;

pub async fn post_stats_query(
    State(state): State<AppState>,
    TenantHeader(tenant): TenantHeader,
    Json(request): Json<QueryRequest>,
) -> AppResult<Json<HashMap<String, SeriesData>>> {
    let now_ms = Utc::now().timestamp_millis();
    let results = query::run_keyed(
        state.storage.clone(),
        &tenant,
        &request,
        now_ms,
        &state.default_start_time,
    )
    .await
    .map_err(CoreError::from)?;
    Ok(Json(results))
}
