//! SMS provider abstraction (spec §4.H): three concrete wire variants,
//! selected at send time by priority desc then success-rate desc, subject
//! to a per-provider sliding-window rate limit. Grounded on
//! `networking/loadbalancer/strategies/round_robin.rs`'s
//! priority/weighted-selection shape, generalized from load-balancer
//! backends to SMS providers, and on `reliability::CircuitBreaker` (reused
//! directly, per-provider instance).

use crate::error::{CoreError, Result};
use crate::reliability::{CircuitBreaker, CircuitBreakerConfig, SlidingWindowRateLimiter};
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Calls-per-60s limit shared by all provider variants (spec §4.H).
pub const RATE_LIMIT_PER_MINUTE: usize = 60;

#[async_trait]
pub trait SmsProvider: Send + Sync {
    /// Sends `body` to `recipient`, returning the provider's message id.
    async fn send(&self, recipient: &str, body: &str) -> Result<String>;
    fn name(&self) -> &str;
}

/// Per-message HTTPS JSON POST provider.
pub struct JsonHttpsProvider {
    name: String,
    endpoint: String,
    api_key: String,
    client: reqwest::Client,
}

impl JsonHttpsProvider {
    pub fn new(name: impl Into<String>, endpoint: impl Into<String>, api_key: impl Into<String>, client: reqwest::Client) -> Self {
        Self { name: name.into(), endpoint: endpoint.into(), api_key: api_key.into(), client }
    }
}

#[async_trait]
impl SmsProvider for JsonHttpsProvider {
    async fn send(&self, recipient: &str, body: &str) -> Result<String> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&serde_json::json!({ "to": recipient, "body": body }))
            .send()
            .await?;
        let payload: serde_json::Value = response.json().await?;
        payload
            .get("message_id")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or_else(|| CoreError::transient(format!("{}: response missing message_id", self.name)))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// INI-formatted POST body provider (a common legacy telco gateway style).
pub struct IniPostProvider {
    name: String,
    endpoint: String,
    account: String,
    client: reqwest::Client,
}

impl IniPostProvider {
    pub fn new(name: impl Into<String>, endpoint: impl Into<String>, account: impl Into<String>, client: reqwest::Client) -> Self {
        Self { name: name.into(), endpoint: endpoint.into(), account: account.into(), client }
    }

    fn ini_body(&self, recipient: &str, body: &str) -> String {
        format!("[message]\naccount={}\nto={}\ntext={}\n", self.account, recipient, body)
    }
}

#[async_trait]
impl SmsProvider for IniPostProvider {
    async fn send(&self, recipient: &str, body: &str) -> Result<String> {
        let response = self
            .client
            .post(&self.endpoint)
            .header("Content-Type", "text/plain")
            .body(self.ini_body(recipient, body))
            .send()
            .await?;
        let text = response.text().await?;
        text.lines()
            .find_map(|line| line.strip_prefix("message_id="))
            .map(str::to_string)
            .ok_or_else(|| CoreError::transient(format!("{}: response missing message_id line", self.name)))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// GET-with-query-parameters provider.
pub struct QueryGetProvider {
    name: String,
    endpoint: String,
    api_key: String,
    client: reqwest::Client,
}

impl QueryGetProvider {
    pub fn new(name: impl Into<String>, endpoint: impl Into<String>, api_key: impl Into<String>, client: reqwest::Client) -> Self {
        Self { name: name.into(), endpoint: endpoint.into(), api_key: api_key.into(), client }
    }
}

#[async_trait]
impl SmsProvider for QueryGetProvider {
    async fn send(&self, recipient: &str, body: &str) -> Result<String> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("key", self.api_key.as_str()), ("to", recipient), ("msg", body)])
            .send()
            .await?;
        let payload: serde_json::Value = response.json().await?;
        payload
            .get("id")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or_else(|| CoreError::transient(format!("{}: response missing id", self.name)))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

struct ProviderSlot {
    provider: Arc<dyn SmsProvider>,
    priority: u8,
    breaker: CircuitBreaker,
    limiter: SlidingWindowRateLimiter,
    successes: AtomicU64,
    failures: AtomicU64,
}

impl ProviderSlot {
    fn success_rate(&self) -> f64 {
        let s = self.successes.load(Ordering::Relaxed);
        let f = self.failures.load(Ordering::Relaxed);
        let total = s + f;
        if total == 0 {
            1.0
        } else {
            s as f64 / total as f64
        }
    }
}

/// Registry of providers, ordered for selection by priority desc then
/// success-rate desc (spec §4.H).
pub struct ProviderRegistry {
    slots: Vec<ProviderSlot>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self { slots: Vec::new() }
    }

    pub fn register(&mut self, provider: Arc<dyn SmsProvider>, priority: u8) {
        let name = provider.name().to_string();
        self.slots.push(ProviderSlot {
            provider,
            priority,
            breaker: CircuitBreaker::new(name, CircuitBreakerConfig::sms_default()),
            limiter: SlidingWindowRateLimiter::per_minute(RATE_LIMIT_PER_MINUTE),
            successes: AtomicU64::new(0),
            failures: AtomicU64::new(0),
        });
    }

    /// Candidate providers for one send attempt, ordered priority desc then
    /// success-rate desc, excluding any already tried in this attempt.
    fn ordered_candidates(&self, exclude: &[String]) -> Vec<usize> {
        let mut indices: Vec<usize> = (0..self.slots.len()).filter(|&i| !exclude.contains(&self.slots[i].provider.name().to_string())).collect();
        indices.sort_by(|&a, &b| {
            let sa = &self.slots[a];
            let sb = &self.slots[b];
            sb.priority.cmp(&sa.priority).then(sb.success_rate().partial_cmp(&sa.success_rate()).unwrap_or(std::cmp::Ordering::Equal))
        });
        indices
    }

    /// Sends through the best eligible provider not in `exclude`, skipping
    /// providers whose rate limit is currently exhausted. Returns the
    /// provider name used alongside the result.
    pub async fn send_via_best(&self, recipient: &str, body: &str, exclude: &[String]) -> Result<(String, String)> {
        for idx in self.ordered_candidates(exclude) {
            let slot = &self.slots[idx];
            if !slot.limiter.try_acquire() {
                continue;
            }
            let name = slot.provider.name().to_string();
            let outcome = slot.breaker.call(|| slot.provider.send(recipient, body)).await;
            match outcome {
                Ok(message_id) => {
                    slot.successes.fetch_add(1, Ordering::Relaxed);
                    return Ok((name, message_id));
                }
                Err(e) => {
                    slot.failures.fetch_add(1, Ordering::Relaxed);
                    tracing::warn!(provider = %name, error = %e, "sms provider send failed");
                }
            }
        }
        Err(CoreError::transient("no eligible sms provider available"))
    }

    pub fn provider_count(&self) -> usize {
        self.slots.len()
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeProvider {
        name: String,
        fails: std::sync::atomic::AtomicBool,
    }

    #[async_trait]
    impl SmsProvider for FakeProvider {
        async fn send(&self, _recipient: &str, _body: &str) -> Result<String> {
            if self.fails.load(Ordering::Relaxed) {
                Err(CoreError::transient("down"))
            } else {
                Ok("msg-1".to_string())
            }
        }

        fn name(&self) -> &str {
            &self.name
        }
    }

    fn provider(name: &str, fails: bool) -> Arc<dyn SmsProvider> {
        Arc::new(FakeProvider { name: name.to_string(), fails: std::sync::atomic::AtomicBool::new(fails) })
    }

    #[tokio::test]
    async fn higher_priority_provider_is_tried_first() {
        let mut registry = ProviderRegistry::new();
        registry.register(provider("low", false), 1);
        registry.register(provider("high", false), 9);
        let (used, _) = registry.send_via_best("+886900000000", "hi", &[]).await.unwrap();
        assert_eq!(used, "high");
    }

    #[tokio::test]
    async fn falls_through_to_next_provider_on_failure() {
        let mut registry = ProviderRegistry::new();
        registry.register(provider("broken", true), 9);
        registry.register(provider("backup", false), 5);
        let (used, _) = registry.send_via_best("+886900000000", "hi", &[]).await.unwrap();
        assert_eq!(used, "backup");
    }

    #[tokio::test]
    async fn no_eligible_provider_is_an_error() {
        let registry = ProviderRegistry::new();
        assert!(registry.send_via_best("+886900000000", "hi", &[]).await.is_err());
    }
}
