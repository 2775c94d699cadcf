//! SMS template with A/B variant selection (spec §4.H): integer-weighted
//! variant selection, monotonic sent-count, effectiveness score updated on
//! delivery receipt. Grounded on `networking/loadbalancer/strategies/
//! round_robin.rs`'s `WeightedRoundRobinBalancer` (cumulative-weight
//! selection), adapted from deterministic rotation to weighted random pick
//! since A/B assignment should not be predictable per-recipient.

use rand::Rng;
use std::sync::atomic::{AtomicU64, Ordering};

pub struct TemplateVariant {
    pub id: String,
    pub body: String,
    pub weight: u32,
    sent_count: AtomicU64,
    delivered_count: AtomicU64,
}

impl TemplateVariant {
    pub fn new(id: impl Into<String>, body: impl Into<String>, weight: u32) -> Self {
        Self { id: id.into(), body: body.into(), weight, sent_count: AtomicU64::new(0), delivered_count: AtomicU64::new(0) }
    }

    pub fn sent_count(&self) -> u64 {
        self.sent_count.load(Ordering::Relaxed)
    }

    pub fn effectiveness_score(&self) -> f64 {
        let sent = self.sent_count.load(Ordering::Relaxed);
        if sent == 0 {
            0.0
        } else {
            self.delivered_count.load(Ordering::Relaxed) as f64 / sent as f64
        }
    }
}

pub struct SmsTemplate {
    pub id: String,
    pub name: String,
    pub variants: Vec<TemplateVariant>,
}

impl SmsTemplate {
    pub fn new(id: impl Into<String>, name: impl Into<String>, variants: Vec<TemplateVariant>) -> Self {
        Self { id: id.into(), name: name.into(), variants }
    }

    /// Picks a variant by integer weight and increments its sent count
    /// (spec §4.H: "monotonic sent-count").
    pub fn select_variant(&self) -> &TemplateVariant {
        let total_weight: u32 = self.variants.iter().map(|v| v.weight).sum();
        let variant = if total_weight == 0 {
            &self.variants[0]
        } else {
            let pick = rand::rng().random_range(0..total_weight);
            let mut cumulative = 0u32;
            self.variants.iter().find(|v| { cumulative += v.weight; pick < cumulative }).unwrap_or(&self.variants[0])
        };
        variant.sent_count.fetch_add(1, Ordering::Relaxed);
        variant
    }

    /// Delivery receipt updates the originating variant's effectiveness
    /// score (spec §4.H).
    pub fn record_delivery(&self, variant_id: &str, delivered: bool) {
        if let Some(variant) = self.variants.iter().find(|v| v.id == variant_id) {
            if delivered {
                variant.delivered_count.fetch_add(1, Ordering::Relaxed);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_weight_variant_is_never_selected() {
        let template = SmsTemplate::new(
            "t1",
            "reminder",
            vec![TemplateVariant::new("a", "body a", 1), TemplateVariant::new("b", "body b", 0)],
        );
        for _ in 0..50 {
            assert_eq!(template.select_variant().id, "a");
        }
    }

    #[test]
    fn selection_increments_sent_count() {
        let template = SmsTemplate::new("t1", "reminder", vec![TemplateVariant::new("a", "body a", 1)]);
        template.select_variant();
        template.select_variant();
        assert_eq!(template.variants[0].sent_count(), 2);
    }

    #[test]
    fn effectiveness_score_reflects_delivered_over_sent() {
        let template = SmsTemplate::new("t1", "reminder", vec![TemplateVariant::new("a", "body a", 1)]);
        template.select_variant();
        template.select_variant();
        template.record_delivery("a", true);
        assert_eq!(template.variants[0].effectiveness_score(), 0.5);
    }
}
