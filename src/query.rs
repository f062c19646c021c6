//! Query coordinator (spec component C5).
//!
//! Resolves a query request (explicit ids plus an optional tag query) into
//! a concrete id list and dispatches raw or bucketed reads per id, the way
//! `original_source/src/server/handlers/api.go`'s `decodeRequestBody` /
//! `parseQueryArgs` / `getData` trio does for the Go implementation.

use std::collections::HashMap;
use std::sync::Arc;

use crate::storage::{Bucket, Order, Sample, StorageEngine};
use crate::tags::{self, BadTagError};
use crate::time::{self, Timespan, TimespanParseError};

#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    #[error("bad metric id: {0}")]
    BadMetricId(String),
    #[error(transparent)]
    BadTag(#[from] BadTagError),
    #[error(transparent)]
    Timespan(#[from] TimespanParseError),
    #[error(transparent)]
    Engine(#[from] crate::storage::EngineError),
}

/// The per-id payload a query resolves to: either raw samples (bucket == 0)
/// or aggregated buckets.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(untagged)]
pub enum SeriesData {
    Raw(Vec<Sample>),
    Stats(Vec<Bucket>),
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct QueryRequest {
    #[serde(default)]
    pub ids: Vec<String>,
    #[serde(default)]
    pub tags: Option<String>,
    #[serde(default, deserialize_with = "crate::json_input::opt_string_from_number_or_string")]
    pub start: Option<String>,
    #[serde(default, deserialize_with = "crate::json_input::opt_string_from_number_or_string")]
    pub end: Option<String>,
    #[serde(
        default,
        rename = "bucketDuration",
        deserialize_with = "crate::json_input::opt_string_from_number_or_string"
    )]
    pub bucket_duration: Option<String>,
    #[serde(default)]
    pub limit: Option<i64>,
    #[serde(default)]
    pub order: Option<Order>,
}

/// Resolve `request.ids` plus any tag-query matches into the final id list
/// (spec §4.5 step 1-2): every explicit id is validated, and tag-query
/// matches are appended.
pub async fn resolve_ids(
    storage: &dyn StorageEngine,
    tenant: &str,
    request: &QueryRequest,
) -> Result<Vec<String>, QueryError> {
    for id in &request.ids {
        tags::validate_id(id).map_err(|_| QueryError::BadMetricId(id.clone()))?;
    }

    let mut ids = request.ids.clone();
    if let Some(tag_expr) = request.tags.as_deref().filter(|s| !s.trim().is_empty()) {
        let parsed = tags::parse_tags(tag_expr)?;
        let items = storage.get_item_list(tenant, &parsed).await?;
        ids.extend(items.into_iter().map(|item| item.id));
    }
    Ok(ids)
}

/// Parse the request's timespan fields (spec §4.5 step 3).
pub fn resolve_timespan(
    request: &QueryRequest,
    now_ms: i64,
    default_start_offset: &str,
) -> Result<Timespan, TimespanParseError> {
    time::parse_timespan(
        request.end.as_deref(),
        request.start.as_deref(),
        request.bucket_duration.as_deref(),
        now_ms,
        default_start_offset,
    )
}

/// Dispatch a single id's data per spec §4.5 step 3: raw when `bucket == 0`,
/// bucketed stats otherwise.
pub async fn fetch_series(
    storage: &dyn StorageEngine,
    tenant: &str,
    id: &str,
    timespan: &Timespan,
    limit: i64,
    order: Order,
) -> Result<SeriesData, QueryError> {
    if timespan.bucket_ms == 0 {
        let samples = storage
            .get_raw_data(tenant, id, timespan.end_ms, timespan.start_ms, limit, order)
            .await?;
        Ok(SeriesData::Raw(samples))
    } else {
        let buckets = storage
            .get_stat_data(
                tenant,
                id,
                timespan.end_ms,
                timespan.start_ms,
                limit,
                order,
                timespan.bucket_ms,
            )
            .await?;
        Ok(SeriesData::Stats(buckets))
    }
}

/// Run a full multi-id query and return results keyed by id, as used by
/// `PostMQuery`'s object envelope (spec §4.5 "Envelopes").
pub async fn run_keyed(
    storage: Arc<dyn StorageEngine>,
    tenant: &str,
    request: &QueryRequest,
    now_ms: i64,
    default_start_offset: &str,
) -> Result<HashMap<String, SeriesData>, QueryError> {
    let ids = resolve_ids(storage.as_ref(), tenant, request).await?;
    let timespan = resolve_timespan(request, now_ms, default_start_offset)?;
    let limit = time::effective_limit(request.limit);
    let order = request.order.unwrap_or(Order::Asc);

    let mut out = HashMap::with_capacity(ids.len());
    for id in ids {
        let series = fetch_series(storage.as_ref(), tenant, &id, &timespan, limit, order).await?;
        out.insert(id, series);
    }
    Ok(out)
}

/// One entry of `PostQuery`'s array envelope (spec §4.5 "Envelopes").
#[derive(Debug, Clone, serde::Serialize)]
pub struct QueryResultEntry {
    pub id: String,
    pub data: SeriesData,
}

/// Run a full multi-id query and return results as an ordered list, as used
/// by `PostQuery`'s array envelope.
pub async fn run_listed(
    storage: Arc<dyn StorageEngine>,
    tenant: &str,
    request: &QueryRequest,
    now_ms: i64,
    default_start_offset: &str,
) -> Result<Vec<QueryResultEntry>, QueryError> {
    let ids = resolve_ids(storage.as_ref(), tenant, request).await?;
    let timespan = resolve_timespan(request, now_ms, default_start_offset)?;
    let limit = time::effective_limit(request.limit);
    let order = request.order.unwrap_or(Order::Asc);

    let mut out = Vec::with_capacity(ids.len());
    for id in ids {
        let data = fetch_series(storage.as_ref(), &tenant, &id, &timespan, limit, order).await?;
        out.push(QueryResultEntry { id, data });
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::memory::MemoryEngine;

    #[tokio::test]
    async fn resolve_ids_rejects_bad_explicit_id() {
        let storage = MemoryEngine::new();
        let request = QueryRequest {
            ids: vec!["bad\"id".to_string()],
            tags: None,
            start: None,
            end: None,
            bucket_duration: None,
            limit: None,
            order: None,
        };
        let err = resolve_ids(&storage, "acme", &request).await.unwrap_err();
        assert!(matches!(err, QueryError::BadMetricId(_)));
    }

    #[tokio::test]
    async fn resolve_ids_merges_tag_query_matches() {
        let storage = MemoryEngine::new();
        storage.post_raw_data("acme", "cpu", 0, 1.0).await.unwrap();
        let mut tags = HashMap::new();
        tags.insert("unit".to_string(), "pct".to_string());
        storage.put_tags("acme", "cpu", tags).await.unwrap();

        let request = QueryRequest {
            ids: vec!["explicit".to_string()],
            tags: Some("unit:pct".to_string()),
            start: None,
            end: None,
            bucket_duration: None,
            limit: None,
            order: None,
        };
        let ids = resolve_ids(&storage, "acme", &request).await.unwrap();
        assert!(ids.contains(&"explicit".to_string()));
        assert!(ids.contains(&"cpu".to_string()));
    }

    #[tokio::test]
    async fn fetch_series_dispatches_raw_when_bucket_is_zero() {
        let storage = MemoryEngine::new();
        storage.post_raw_data("acme", "cpu", 500, 1.0).await.unwrap();
        let timespan = Timespan {
            end_ms: 1_000,
            start_ms: 0,
            bucket_ms: 0,
        };
        let series = fetch_series(&storage, "acme", "cpu", &timespan, 100, Order::Asc)
            .await
            .unwrap();
        assert!(matches!(series, SeriesData::Raw(_)));
    }

    #[tokio::test]
    async fn fetch_series_dispatches_stats_when_bucket_is_set() {
        let storage = MemoryEngine::new();
        storage.post_raw_data("acme", "cpu", 500, 1.0).await.unwrap();
        let timespan = Timespan {
            end_ms: 1_000,
            start_ms: 0,
            bucket_ms: 500,
        };
        let series = fetch_series(&storage, "acme", "cpu", &timespan, 100, Order::Asc)
            .await
            .unwrap();
        assert!(matches!(series, SeriesData::Stats(_)));
    }
}
