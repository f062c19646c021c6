//! Raw/stats read, ingest, tag, and delete handlers shared by the
//! `gauges`/`counters`/`availability` route tables (spec §6). The core
//! treats all three metric types identically (spec §1 Non-goals), so one
//! handler per operation is mounted under each type's path prefix instead of
//! branching on type internally.

use std::collections::HashMap;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;

use crate::error::{AppError, AppResult, CoreError};
use crate::state::AppState;
use crate::storage::{EngineError, Order, Sample};
use crate::tags;
use crate::time;

use super::tenant::TenantHeader;

fn app_error(err: EngineError) -> AppError {
    CoreError::from(err).into()
}

#[derive(Debug, Default, serde::Deserialize)]
pub struct RangeParams {
    start: Option<String>,
    end: Option<String>,
    #[serde(rename = "bucketDuration")]
    bucket_duration: Option<String>,
    limit: Option<i64>,
    order: Option<Order>,
}

pub async fn get_raw(
    State(state): State<AppState>,
    TenantHeader(tenant): TenantHeader,
    Path(id): Path<String>,
    Query(params): Query<RangeParams>,
) -> AppResult<Json<Vec<Sample>>> {
    tags::validate_id(&id).map_err(CoreError::from)?;
    let timespan = time::parse_timespan(
        params.end.as_deref(),
        params.start.as_deref(),
        None,
        Utc::now().timestamp_millis(),
        &state.default_start_time,
    )
    .map_err(CoreError::from)?;
    let limit = time::effective_limit(params.limit);
    let order = params.order.unwrap_or(Order::Asc);

    let samples = state
        .storage
        .get_raw_data(&tenant, &id, timespan.end_ms, timespan.start_ms, limit, order)
        .await
        .map_err(app_error)?;
    Ok(Json(samples))
}

/// `GET {gauges,counters,availability}/{id}/stats`. A `bucketDuration` of
/// `0` (the default, spec §4.1) falls back to raw samples rather than
/// folding the whole window into one synthetic bucket, matching the
/// original's `:id/stats` route (`server.go`'s `GetData` handler, which
/// returns raw data whenever `bucketDuration == 0`, `api.go`'s `getData`).
pub async fn get_stats(
    State(state): State<AppState>,
    TenantHeader(tenant): TenantHeader,
    Path(id): Path<String>,
    Query(params): Query<RangeParams>,
) -> AppResult<Json<crate::query::SeriesData>> {
    tags::validate_id(&id).map_err(CoreError::from)?;
    let timespan = time::parse_timespan(
        params.end.as_deref(),
        params.start.as_deref(),
        params.bucket_duration.as_deref(),
        Utc::now().timestamp_millis(),
        &state.default_start_time,
    )
    .map_err(CoreError::from)?;
    let limit = time::effective_limit(params.limit);
    let order = params.order.unwrap_or(Order::Asc);

    if timespan.bucket_ms > 0 {
        let buckets = state
            .storage
            .get_stat_data(
                &tenant,
                &id,
                timespan.end_ms,
                timespan.start_ms,
                limit,
                order,
                timespan.bucket_ms,
            )
            .await
            .map_err(app_error)?;
        Ok(Json(crate::query::SeriesData::Stats(buckets)))
    } else {
        let samples = state
            .storage
            .get_raw_data(&tenant, &id, timespan.end_ms, timespan.start_ms, limit, order)
            .await
            .map_err(app_error)?;
        Ok(Json(crate::query::SeriesData::Raw(samples)))
    }
}

#[derive(Debug, serde::Deserialize)]
pub struct IngestDataPoint {
    #[serde(deserialize_with = "crate::json_input::i64_from_number_or_string")]
    timestamp: i64,
    #[serde(deserialize_with = "crate::json_input::f64_from_number_or_string")]
    value: f64,
}

#[derive(Debug, serde::Deserialize)]
pub struct IngestItem {
    id: String,
    data: Vec<IngestDataPoint>,
}

/// `POST {gauges,counters}/raw` (and the deprecated `data` alias): ingest
/// sample batches (spec §6 "Ingest body shape").
pub async fn post_ingest(
    State(state): State<AppState>,
    TenantHeader(tenant): TenantHeader,
    Json(items): Json<Vec<IngestItem>>,
) -> AppResult<StatusCode> {
    for item in &items {
        tags::validate_id(&item.id).map_err(CoreError::from)?;
        for point in &item.data {
            Sample::new(point.timestamp, point.value).map_err(CoreError::from)?;
            state
                .storage
                .post_raw_data(&tenant, &item.id, point.timestamp, point.value)
                .await
                .map_err(app_error)?;
        }
    }
    Ok(StatusCode::OK)
}

/// `POST {gauges,counters}/raw/query` (and the deprecated `stats/query`
/// alias when used without bucket aggregation): multi-id query returning the
/// array envelope (spec §6 table, §4.5).
pub async fn post_raw_query(
    State(state): State<AppState>,
    TenantHeader(tenant): TenantHeader,
    Json(request): Json<crate::query::QueryRequest>,
) -> AppResult<Json<Vec<crate::query::QueryResultEntry>>> {
    let now_ms = Utc::now().timestamp_millis();
    let results = crate::query::run_listed(
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

#[derive(Debug, serde::Deserialize)]
pub struct BulkTagItem {
    id: String,
    tags: HashMap<String, String>,
}

/// `PUT gauges/tags`: bulk tag update.
pub async fn put_tags_bulk(
    State(state): State<AppState>,
    TenantHeader(tenant): TenantHeader,
    Json(items): Json<Vec<BulkTagItem>>,
) -> AppResult<StatusCode> {
    for item in items {
        tags::validate_id(&item.id).map_err(CoreError::from)?;
        for (key, value) in &item.tags {
            tags::validate_tag_component(key).map_err(CoreError::from)?;
            tags::validate_tag_component(value).map_err(CoreError::from)?;
        }
        state
            .storage
            .put_tags(&tenant, &item.id, item.tags)
            .await
            .map_err(app_error)?;
    }
    Ok(StatusCode::OK)
}

/// `PUT {gauges,counters}/{id}/tags`: merge tags into one item.
pub async fn put_tags_single(
    State(state): State<AppState>,
    TenantHeader(tenant): TenantHeader,
    Path(id): Path<String>,
    Json(new_tags): Json<HashMap<String, String>>,
) -> AppResult<StatusCode> {
    tags::validate_id(&id).map_err(CoreError::from)?;
    for (key, value) in &new_tags {
        tags::validate_tag_component(key).map_err(CoreError::from)?;
        tags::validate_tag_component(value).map_err(CoreError::from)?;
    }
    state
        .storage
        .put_tags(&tenant, &id, new_tags)
        .await
        .map_err(app_error)?;
    Ok(StatusCode::OK)
}

#[derive(Debug, Default, serde::Deserialize)]
pub struct DeleteRangeParams {
    start: Option<String>,
    end: Option<String>,
}

/// `DELETE gauges/{id}/raw`: delete samples in a range.
pub async fn delete_raw(
    State(state): State<AppState>,
    TenantHeader(tenant): TenantHeader,
    Path(id): Path<String>,
    Query(params): Query<DeleteRangeParams>,
) -> AppResult<StatusCode> {
    tags::validate_id(&id).map_err(CoreError::from)?;
    let timespan = time::parse_timespan(
        params.end.as_deref(),
        params.start.as_deref(),
        None,
        Utc::now().timestamp_millis(),
        &state.default_start_time,
    )
    .map_err(CoreError::from)?;
    state
        .storage
        .delete_data(&tenant, &id, timespan.end_ms, timespan.start_ms)
        .await
        .map_err(app_error)?;
    Ok(StatusCode::OK)
}

/// `DELETE gauges/{id}/tags/{tagsCSV}`: remove the listed tag keys.
pub async fn delete_tags(
    State(state): State<AppState>,
    TenantHeader(tenant): TenantHeader,
    Path((id, tags_csv)): Path<(String, String)>,
) -> AppResult<StatusCode> {
    tags::validate_id(&id).map_err(CoreError::from)?;
    let keys: Vec<String> = tags_csv
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();
    state
        .storage
        .delete_tags(&tenant, &id, &keys)
        .await
        .map_err(app_error)?;
    Ok(StatusCode::OK)
}
