//! TTL-backed idempotency cache.
//!
//! No teacher analog exists for TTL caching specifically; grounded on the
//! general async-trait-over-storage idiom used elsewhere in the crate
//! (`WorkflowResolver`, registry storage traits).

use crate::workflow::state::WorkflowValue;
use async_trait::async_trait;
use dashmap::DashMap;
use std::time::{Duration, Instant};

#[derive(Clone)]
pub struct CachedResult {
    pub value: WorkflowValue,
    stored_at: Instant,
    ttl: Duration,
}

impl CachedResult {
    fn is_expired(&self) -> bool {
        self.stored_at.elapsed() > self.ttl
    }
}

#[async_trait]
pub trait IdempotencyStore: Send + Sync {
    async fn get(&self, key: &str) -> Option<WorkflowValue>;
    async fn put(&self, key: &str, value: WorkflowValue, ttl: Duration);
}

#[derive(Default)]
pub struct InMemoryIdempotencyStore {
    entries: DashMap<String, CachedResult>,
}

impl InMemoryIdempotencyStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl IdempotencyStore for InMemoryIdempotencyStore {
    async fn get(&self, key: &str) -> Option<WorkflowValue> {
        let entry = self.entries.get(key)?;
        if entry.is_expired() {
            drop(entry);
            self.entries.remove(key);
            return None;
        }
        Some(entry.value.clone())
    }

    async fn put(&self, key: &str, value: WorkflowValue, ttl: Duration) {
        self.entries.insert(
            key.to_string(),
            CachedResult { value, stored_at: Instant::now(), ttl },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn returns_cached_value_within_ttl() {
        let store = InMemoryIdempotencyStore::new();
        store.put("k1", WorkflowValue::Int(7), Duration::from_secs(60)).await;
        assert_eq!(store.get("k1").await.unwrap().as_i64(), Some(7));
    }

    #[tokio::test]
    async fn expires_after_ttl() {
        let store = InMemoryIdempotencyStore::new();
        store.put("k1", WorkflowValue::Int(7), Duration::from_millis(1)).await;
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(store.get("k1").await.is_none());
    }
}
