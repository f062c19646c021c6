//! Storage contract (spec component C3).
//!
//! `StorageEngine` is the trait-object boundary chosen in `DESIGN.md`: the
//! original implementation supports out-of-tree backends selected by name at
//! startup (`original_source/src/server/server.go`'s `--storage` switch), so
//! a trait object generalizes better than a closed compile-time enum.

pub mod document;
pub mod memory;
pub mod sqlite;

#[cfg(test)]
pub mod contract_tests;

use async_trait::async_trait;
use std::collections::HashMap;

/// `(timestamp_ms, value)` — spec §3 "Sample". Non-finite values are
/// rejected at construction (`Sample::new`), matching "the ingest path
/// rejects non-finite values".
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Sample {
    pub timestamp: i64,
    pub value: f64,
}

impl Sample {
    pub fn new(timestamp: i64, value: f64) -> Result<Self, EngineError> {
        if !value.is_finite() {
            return Err(EngineError::InvalidValue(value));
        }
        Ok(Self { timestamp, value })
    }
}

/// A metric definition: an id plus a tag map (spec §3 "Item").
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Item {
    pub id: String,
    pub tags: HashMap<String, String>,
}

/// A logical namespace scoping items and samples (spec §3 "Tenant").
pub type Tenant = String;

/// Sort order for range queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Order {
    Asc,
    Desc,
}

impl Default for Order {
    fn default() -> Self {
        Order::Asc
    }
}

/// A fixed-width statistical bucket (spec §3 "Bucket").
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Bucket {
    pub start: i64,
    pub end: i64,
    pub samples: u64,
    pub min: f64,
    pub max: f64,
    pub sum: f64,
    pub avg: f64,
    pub first: f64,
    pub last: f64,
    pub empty: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("non-finite sample value: {0}")]
    InvalidValue(f64),
    #[error("engine initialization failed: {0}")]
    InitFailed(String),
    #[error("engine I/O error: {0}")]
    Io(#[from] anyhow::Error),
}

pub type EngineResult<T> = Result<T, EngineError>;

/// Every storage engine satisfies this contract (spec §4.3). Preconditions
/// and postconditions are engine-independent; see each method's doc comment
/// for the exact semantics a new engine must uphold.
#[async_trait]
pub trait StorageEngine: Send + Sync {
    /// Stable engine identifier (spec §4.3 `name()`), surfaced verbatim by
    /// the `status` endpoint's `MohawkStorage` field.
    fn name(&self) -> &'static str;

    /// Every tenant with at least one item.
    async fn get_tenants(&self) -> EngineResult<Vec<Tenant>>;

    /// Items in `tenant` whose tags contain every `(k, v)` in `tags`
    /// (AND semantics); an empty `tags` map returns every item.
    async fn get_item_list(
        &self,
        tenant: &str,
        tags: &HashMap<String, String>,
    ) -> EngineResult<Vec<Item>>;

    /// Samples with `start <= ts < end`, capped at `limit`, ordered by
    /// `order`. Ties on timestamp are engine-defined (spec §4.3 "Ordering &
    /// ties") — callers must not depend on tie-break stability across
    /// engines.
    async fn get_raw_data(
        &self,
        tenant: &str,
        id: &str,
        end: i64,
        start: i64,
        limit: i64,
        order: Order,
    ) -> EngineResult<Vec<Sample>>;

    /// Bucketed aggregation over `[start, end)` (spec §4.4). The default
    /// implementation folds `get_raw_data` through `crate::aggregate`, so
    /// engines only need to implement raw reads; an engine may override this
    /// to push the fold down into its own query layer.
    async fn get_stat_data(
        &self,
        tenant: &str,
        id: &str,
        end: i64,
        start: i64,
        limit: i64,
        order: Order,
        bucket: i64,
    ) -> EngineResult<Vec<Bucket>> {
        // Over-fetch ignoring the caller's limit: bucket limiting trims
        // *buckets*, not raw samples, after folding (spec §4.4 step 4).
        let raw = self
            .get_raw_data(tenant, id, end, start, i64::MAX, Order::Asc)
            .await?;
        Ok(crate::aggregate::fold_buckets(&raw, start, end, bucket, limit, order))
    }

    /// Upsert the item definition on first write; append the sample.
    async fn post_raw_data(
        &self,
        tenant: &str,
        id: &str,
        timestamp: i64,
        value: f64,
    ) -> EngineResult<()>;

    /// Merge tags: existing keys are overwritten, others preserved.
    async fn put_tags(
        &self,
        tenant: &str,
        id: &str,
        tags: HashMap<String, String>,
    ) -> EngineResult<()>;

    /// Remove the listed tag keys.
    async fn delete_tags(&self, tenant: &str, id: &str, keys: &[String]) -> EngineResult<()>;

    /// Remove samples in `[start, end)`.
    async fn delete_data(&self, tenant: &str, id: &str, end: i64, start: i64) -> EngineResult<()>;
}
