//! In-memory storage engine.
//!
//! Grounded in `original_source/backends/random.go`'s `Random` backend
//! (`Items []Item`, `FilterItems` by tag) generalized from synthesized demo
//! data to real appended samples, behind `std::sync::RwLock`s the way the
//! teacher's services guard shared state with locks rather than actors.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

use super::{Bucket, EngineError, EngineResult, Item, Order, Sample, StorageEngine, Tenant};

#[derive(Debug, Default)]
struct TenantData {
    items: HashMap<String, Item>,
    samples: HashMap<String, Vec<Sample>>,
}

/// Process-local storage engine. Safe for concurrent readers and writers
/// (spec §5): reads take a shared lock, writes take an exclusive one, and
/// no lock is held across an `.await` point because every operation here is
/// synchronous CPU work.
#[derive(Debug, Default)]
pub struct MemoryEngine {
    tenants: RwLock<HashMap<Tenant, TenantData>>,
}

impl MemoryEngine {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StorageEngine for MemoryEngine {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn get_tenants(&self) -> EngineResult<Vec<Tenant>> {
        let guard = self.tenants.read().expect("memory engine lock poisoned");
        Ok(guard.keys().cloned().collect())
    }

    async fn get_item_list(
        &self,
        tenant: &str,
        tags: &HashMap<String, String>,
    ) -> EngineResult<Vec<Item>> {
        let guard = self.tenants.read().expect("memory engine lock poisoned");
        let Some(data) = guard.get(tenant) else {
            return Ok(Vec::new());
        };
        Ok(data
            .items
            .values()
            .filter(|item| crate::tags::matches(&item.tags, tags))
            .cloned()
            .collect())
    }

    async fn get_raw_data(
        &self,
        tenant: &str,
        id: &str,
        end: i64,
        start: i64,
        limit: i64,
        order: Order,
    ) -> EngineResult<Vec<Sample>> {
        let guard = self.tenants.read().expect("memory engine lock poisoned");
        let Some(samples) = guard.get(tenant).and_then(|d| d.samples.get(id)) else {
            return Ok(Vec::new());
        };

        let mut matching: Vec<Sample> = samples
            .iter()
            .copied()
            .filter(|s| s.timestamp >= start && s.timestamp < end)
            .collect();

        // Insertion order is preserved by the underlying Vec; ASC sorts by
        // timestamp, DESC reverses (spec §4.3 "Ordering & ties": ties keep
        // insertion order, reversed for DESC).
        match order {
            Order::Asc => matching.sort_by_key(|s| s.timestamp),
            Order::Desc => {
                matching.sort_by_key(|s| s.timestamp);
                matching.reverse();
            }
        }

        matching.truncate(limit.max(0) as usize);
        Ok(matching)
    }

    async fn post_raw_data(
        &self,
        tenant: &str,
        id: &str,
        timestamp: i64,
        value: f64,
    ) -> EngineResult<()> {
        let sample = Sample::new(timestamp, value)?;
        let mut guard = self.tenants.write().expect("memory engine lock poisoned");
        let data = guard.entry(tenant.to_string()).or_default();
        data.items.entry(id.to_string()).or_insert_with(|| Item {
            id: id.to_string(),
            tags: HashMap::new(),
        });
        data.samples.entry(id.to_string()).or_default().push(sample);
        Ok(())
    }

    async fn put_tags(
        &self,
        tenant: &str,
        id: &str,
        tags: HashMap<String, String>,
    ) -> EngineResult<()> {
        let mut guard = self.tenants.write().expect("memory engine lock poisoned");
        let data = guard.entry(tenant.to_string()).or_default();
        let item = data.items.entry(id.to_string()).or_insert_with(|| Item {
            id: id.to_string(),
            tags: HashMap::new(),
        });
        item.tags.extend(tags);
        Ok(())
    }

    async fn delete_tags(&self, tenant: &str, id: &str, keys: &[String]) -> EngineResult<()> {
        let mut guard = self.tenants.write().expect("memory engine lock poisoned");
        if let Some(item) = guard.get_mut(tenant).and_then(|d| d.items.get_mut(id)) {
            for key in keys {
                item.tags.remove(key);
            }
        }
        Ok(())
    }

    async fn delete_data(&self, tenant: &str, id: &str, end: i64, start: i64) -> EngineResult<()> {
        if start >= end {
            return Err(EngineError::Io(anyhow::anyhow!(
                "delete range must satisfy start < end"
            )));
        }
        let mut guard = self.tenants.write().expect("memory engine lock poisoned");
        if let Some(samples) = guard.get_mut(tenant).and_then(|d| d.samples.get_mut(id)) {
            samples.retain(|s| s.timestamp < start || s.timestamp >= end);
        }
        Ok(())
    }
}
