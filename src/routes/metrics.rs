//! `GET tenants` and `GET metrics` (spec §6).

use axum::extract::{Query, State};
use axum::Json;

use crate::error::{AppError, AppResult};
use crate::state::AppState;
use crate::storage::Item;
use crate::tags;

use super::tenant::TenantHeader;

pub async fn tenants(State(state): State<AppState>) -> AppResult<Json<Vec<String>>> {
    let tenants = state.storage.get_tenants().await.map_err(app_error)?;
    Ok(Json(tenants))
}

#[derive(Debug, serde::Deserialize)]
pub struct ListParams {
    #[serde(rename = "type")]
    metric_type: Option<String>,
    tags: Option<String>,
}

/// `GET metrics?type=gauge&tags=k:v,...`. The original Go router only lists
/// items for `type=gauge` (or an absent type); any other metric type returns
/// an empty list, a quirk of the source kept verbatim (spec §6 table).
pub async fn list_items(
    State(state): State<AppState>,
    TenantHeader(tenant): TenantHeader,
    Query(params): Query<ListParams>,
) -> AppResult<Json<Vec<Item>>> {
    if let Some(kind) = params.metric_type.as_deref() {
        if !kind.eq_ignore_ascii_case("gauge") {
            return Ok(Json(Vec::new()));
        }
    }

    let tag_query = match params.tags.as_deref().filter(|s| !s.trim().is_empty()) {
        Some(expr) => tags::parse_tags(expr).map_err(crate::error::CoreError::from)?,
        None => Default::default(),
    };

    let items = state
        .storage
        .get_item_list(&tenant, &tag_query)
        .await
        .map_err(app_error)?;
    Ok(Json(items))
}

fn app_error(err: crate::storage::EngineError) -> AppError {
    crate::error::CoreError::from(err).into()
}
