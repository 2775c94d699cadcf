//! HA cache client (spec §4.G): sentinel-aware master/replica discovery,
//! the full redis-style operation surface, circuit breaker, and metrics.
//! No `redis` crate dependency is wired — the client is implemented over an
//! injected `CacheBackend` so a real driver plugs in without this crate
//! depending on it directly (see DESIGN.md).

use super::metrics::{CacheMetrics, OpStats};
use crate::error::Result;
use crate::reliability::{CircuitBreaker, CircuitBreakerConfig};
use async_trait::async_trait;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// The wire-level operations a real Redis/Sentinel client would implement.
/// Values are opaque strings; JSON encode/decode of compound values happens
/// one layer up in `CacheClient`.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;
    async fn set(&self, key: &str, value: String, ttl: Option<Duration>) -> Result<()>;
    async fn delete(&self, key: &str) -> Result<bool>;
    async fn exists(&self, key: &str) -> Result<bool>;
    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool>;
    async fn ttl(&self, key: &str) -> Result<Option<Duration>>;
    async fn hget(&self, key: &str, field: &str) -> Result<Option<String>>;
    async fn hset(&self, key: &str, field: &str, value: String) -> Result<()>;
    async fn lpush(&self, key: &str, value: String) -> Result<()>;
    async fn lrange(&self, key: &str, start: isize, stop: isize) -> Result<Vec<String>>;
    async fn sadd(&self, key: &str, member: String) -> Result<bool>;
    async fn smembers(&self, key: &str) -> Result<Vec<String>>;
    async fn publish(&self, channel: &str, message: String) -> Result<u64>;
    async fn geo_add(&self, key: &str, lng: f64, lat: f64, member: String) -> Result<()>;
    async fn geo_radius(&self, key: &str, lng: f64, lat: f64, radius_km: f64) -> Result<Vec<String>>;
    async fn scan_keys(&self, pattern: &str) -> Result<Vec<String>>;
}

/// How the client locates its backend: a direct endpoint, or sentinel
/// discovery of a named master (spec §4.G).
#[derive(Debug, Clone)]
pub enum CacheDiscovery {
    Direct { address: String },
    Sentinel { sentinels: Vec<String>, master_name: String },
}

pub struct CacheClient {
    backend: Arc<dyn CacheBackend>,
    discovery: CacheDiscovery,
    breaker: CircuitBreaker,
    metrics: CacheMetrics,
}

impl CacheClient {
    pub fn new(backend: Arc<dyn CacheBackend>, discovery: CacheDiscovery) -> Self {
        Self { backend, discovery, breaker: CircuitBreaker::new("cache", CircuitBreakerConfig::cache_default()), metrics: CacheMetrics::new() }
    }

    pub fn discovery(&self) -> &CacheDiscovery {
        &self.discovery
    }

    pub fn metrics_for(&self, op: &str) -> OpStats {
        self.metrics.for_op(op)
    }

    pub fn hit_rate(&self) -> f64 {
        self.metrics.hit_rate()
    }

    pub fn connection_errors(&self) -> u64 {
        self.metrics.connection_errors()
    }

    async fn timed<F, Fut, T>(&self, op: &str, f: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let start = Instant::now();
        let result = self.breaker.call(f).await;
        self.metrics.record(op, start.elapsed(), result.is_ok());
        result
    }

    /// JSON-encodes compound values on set; plain strings pass through
    /// unencoded (spec §4.G).
    pub async fn set(&self, key: &str, value: Value, ttl: Option<Duration>) -> Result<()> {
        let encoded = encode(&value)?;
        let backend = self.backend.clone();
        let key = key.to_string();
        self.timed("set", move || async move { backend.set(&key, encoded, ttl).await }).await
    }

    /// JSON-decodes on read, with passthrough for plain strings (spec §4.G).
    /// Tracks cache hit/miss.
    pub async fn get(&self, key: &str) -> Result<Option<Value>> {
        let backend = self.backend.clone();
        let key_owned = key.to_string();
        let raw = self.timed("get", move || async move { backend.get(&key_owned).await }).await?;
        match raw {
            Some(s) => {
                self.metrics.record_hit();
                Ok(Some(decode(&s)))
            }
            None => {
                self.metrics.record_miss();
                Ok(None)
            }
        }
    }

    pub async fn mset(&self, entries: Vec<(String, Value, Option<Duration>)>) -> Result<()> {
        for (key, value, ttl) in entries {
            self.set(&key, value, ttl).await?;
        }
        Ok(())
    }

    pub async fn mget(&self, keys: &[String]) -> Result<Vec<Option<Value>>> {
        let mut out = Vec::with_capacity(keys.len());
        for key in keys {
            out.push(self.get(key).await?);
        }
        Ok(out)
    }

    pub async fn delete(&self, key: &str) -> Result<bool> {
        let backend = self.backend.clone();
        let key = key.to_string();
        self.timed("delete", move || async move { backend.delete(&key).await }).await
    }

    pub async fn exists(&self, key: &str) -> Result<bool> {
        let backend = self.backend.clone();
        let key = key.to_string();
        self.timed("exists", move || async move { backend.exists(&key).await }).await
    }

    pub async fn expire(&self, key: &str, ttl: Duration) -> Result<bool> {
        let backend = self.backend.clone();
        let key = key.to_string();
        self.timed("expire", move || async move { backend.expire(&key, ttl).await }).await
    }

    pub async fn ttl(&self, key: &str) -> Result<Option<Duration>> {
        let backend = self.backend.clone();
        let key = key.to_string();
        self.timed("ttl", move || async move { backend.ttl(&key).await }).await
    }

    pub async fn hget(&self, key: &str, field: &str) -> Result<Option<Value>> {
        let backend = self.backend.clone();
        let (key, field) = (key.to_string(), field.to_string());
        let raw = self.timed("hget", move || async move { backend.hget(&key, &field).await }).await?;
        Ok(raw.map(|s| decode(&s)))
    }

    pub async fn hset(&self, key: &str, field: &str, value: Value) -> Result<()> {
        let encoded = encode(&value)?;
        let backend = self.backend.clone();
        let (key, field) = (key.to_string(), field.to_string());
        self.timed("hset", move || async move { backend.hset(&key, &field, encoded).await }).await
    }

    pub async fn lpush(&self, key: &str, value: Value) -> Result<()> {
        let encoded = encode(&value)?;
        let backend = self.backend.clone();
        let key = key.to_string();
        self.timed("lpush", move || async move { backend.lpush(&key, encoded).await }).await
    }

    pub async fn lrange(&self, key: &str, start: isize, stop: isize) -> Result<Vec<Value>> {
        let backend = self.backend.clone();
        let key = key.to_string();
        let raw = self.timed("lrange", move || async move { backend.lrange(&key, start, stop).await }).await?;
        Ok(raw.iter().map(|s| decode(s)).collect())
    }

    pub async fn sadd(&self, key: &str, member: Value) -> Result<bool> {
        let encoded = encode(&member)?;
        let backend = self.backend.clone();
        let key = key.to_string();
        self.timed("sadd", move || async move { backend.sadd(&key, encoded).await }).await
    }

    pub async fn smembers(&self, key: &str) -> Result<Vec<Value>> {
        let backend = self.backend.clone();
        let key = key.to_string();
        let raw = self.timed("smembers", move || async move { backend.smembers(&key).await }).await?;
        Ok(raw.iter().map(|s| decode(s)).collect())
    }

    pub async fn publish(&self, channel: &str, message: Value) -> Result<u64> {
        let encoded = encode(&message)?;
        let backend = self.backend.clone();
        let channel = channel.to_string();
        self.timed("publish", move || async move { backend.publish(&channel, encoded).await }).await
    }

    pub async fn geo_add(&self, key: &str, lng: f64, lat: f64, member: &str) -> Result<()> {
        let backend = self.backend.clone();
        let (key, member) = (key.to_string(), member.to_string());
        self.timed("geo_add", move || async move { backend.geo_add(&key, lng, lat, member).await }).await
    }

    pub async fn geo_radius(&self, key: &str, lng: f64, lat: f64, radius_km: f64) -> Result<Vec<String>> {
        let backend = self.backend.clone();
        let key = key.to_string();
        self.timed("geo_radius", move || async move { backend.geo_radius(&key, lng, lat, radius_km).await }).await
    }

    /// Scan-based pattern delete (spec §4.G/§5: "best-effort, writes do not
    /// block on invalidation").
    pub async fn delete_pattern(&self, pattern: &str) -> Result<usize> {
        let backend = self.backend.clone();
        let pattern_owned = pattern.to_string();
        let keys = self.timed("scan", move || async move { backend.scan_keys(&pattern_owned).await }).await?;
        let mut deleted = 0;
        for key in keys {
            if self.delete(&key).await.unwrap_or(false) {
                deleted += 1;
            }
        }
        Ok(deleted)
    }
}

fn encode(value: &Value) -> Result<String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        other => Ok(serde_json::to_string(other)?),
    }
}

fn decode(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;
    use dashmap::DashMap;
    use serde_json::json;

    #[derive(Default)]
    struct InMemoryBackend {
        store: DashMap<String, String>,
        fail_next: std::sync::atomic::AtomicBool,
    }

    #[async_trait]
    impl CacheBackend for InMemoryBackend {
        async fn get(&self, key: &str) -> Result<Option<String>> {
            Ok(self.store.get(key).map(|v| v.clone()))
        }
        async fn set(&self, key: &str, value: String, _ttl: Option<Duration>) -> Result<()> {
            if self.fail_next.swap(false, std::sync::atomic::Ordering::Relaxed) {
                return Err(CoreError::transient("boom"));
            }
            self.store.insert(key.to_string(), value);
            Ok(())
        }
        async fn delete(&self, key: &str) -> Result<bool> {
            Ok(self.store.remove(key).is_some())
        }
        async fn exists(&self, key: &str) -> Result<bool> {
            Ok(self.store.contains_key(key))
        }
        async fn expire(&self, _key: &str, _ttl: Duration) -> Result<bool> {
            Ok(true)
        }
        async fn ttl(&self, _key: &str) -> Result<Option<Duration>> {
            Ok(None)
        }
        async fn hget(&self, _key: &str, _field: &str) -> Result<Option<String>> {
            Ok(None)
        }
        async fn hset(&self, _key: &str, _field: &str, _value: String) -> Result<()> {
            Ok(())
        }
        async fn lpush(&self, _key: &str, _value: String) -> Result<()> {
            Ok(())
        }
        async fn lrange(&self, _key: &str, _start: isize, _stop: isize) -> Result<Vec<String>> {
            Ok(Vec::new())
        }
        async fn sadd(&self, _key: &str, _member: String) -> Result<bool> {
            Ok(true)
        }
        async fn smembers(&self, _key: &str) -> Result<Vec<String>> {
            Ok(Vec::new())
        }
        async fn publish(&self, _channel: &str, _message: String) -> Result<u64> {
            Ok(0)
        }
        async fn geo_add(&self, _key: &str, _lng: f64, _lat: f64, _member: String) -> Result<()> {
            Ok(())
        }
        async fn geo_radius(&self, _key: &str, _lng: f64, _lat: f64, _radius_km: f64) -> Result<Vec<String>> {
            Ok(Vec::new())
        }
        async fn scan_keys(&self, pattern: &str) -> Result<Vec<String>> {
            let prefix = pattern.trim_end_matches('*');
            Ok(self.store.iter().map(|e| e.key().clone()).filter(|k| k.starts_with(prefix)).collect())
        }
    }

    fn client() -> CacheClient {
        CacheClient::new(Arc::new(InMemoryBackend::default()), CacheDiscovery::Direct { address: "127.0.0.1:6379".into() })
    }

    #[tokio::test]
    async fn plain_strings_pass_through_unencoded() {
        let c = client();
        c.set("k", json!("hello"), None).await.unwrap();
        assert_eq!(c.get("k").await.unwrap(), Some(json!("hello")));
    }

    #[tokio::test]
    async fn compound_values_round_trip_through_json() {
        let c = client();
        c.set("k", json!({"a": 1, "b": [1,2,3]}), None).await.unwrap();
        assert_eq!(c.get("k").await.unwrap(), Some(json!({"a": 1, "b": [1,2,3]})));
    }

    #[tokio::test]
    async fn get_tracks_hit_and_miss() {
        let c = client();
        c.set("k", json!("v"), None).await.unwrap();
        c.get("k").await.unwrap();
        c.get("missing").await.unwrap();
        assert!((c.hit_rate() - 0.5).abs() < 1e-9);
    }

    #[tokio::test]
    async fn delete_pattern_removes_matching_keys_only() {
        let c = client();
        c.set("route:1", json!("a"), None).await.unwrap();
        c.set("route:2", json!("b"), None).await.unwrap();
        c.set("customer:1", json!("c"), None).await.unwrap();
        let deleted = c.delete_pattern("route:*").await.unwrap();
        assert_eq!(deleted, 2);
        assert!(c.get("customer:1").await.unwrap().is_some());
    }
}
