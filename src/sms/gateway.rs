//! SMS send-path orchestration (spec §4.H): segment counting, provider
//! selection with retry-on-a-different-provider, bulk send with batching
//! and inter-batch pause. Grounded on `networking/health/aggregator.rs`'s
//! batch-then-pause iteration shape, generalized from health probes to SMS
//! sends.

use super::provider::ProviderRegistry;
use super::template::SmsTemplate;
use crate::common::SmsMessageId;
use crate::domain::{SmsMessage, SmsStatus};
use crate::error::Result;
use rust_decimal::Decimal;
use serde_json::json;
use std::time::Duration;

pub const BULK_BATCH_SIZE: usize = 100;
pub const BULK_BATCH_PAUSE: Duration = Duration::from_secs(1);

const GSM_SINGLE_SEGMENT_LEN: usize = 160;
const GSM_MULTI_SEGMENT_LEN: usize = 153;
const UNICODE_SINGLE_SEGMENT_LEN: usize = 70;
const UNICODE_MULTI_SEGMENT_LEN: usize = 67;

/// The GSM 03.38 7-bit default alphabet, approximated by ASCII printable
/// range plus the handful of Latin-1 extras GSM covers. Anything outside
/// this set forces UCS-2 (Unicode) segmentation.
const GSM_EXTRA_CHARS: &str = "€ΔΦΓΛΩΠΨΣΘΞÄÖÑÜ§äöñüà";

fn is_gsm_7bit(body: &str) -> bool {
    body.chars().all(|c| c.is_ascii() || GSM_EXTRA_CHARS.contains(c))
}

/// Segment count per spec §4.H: GSM 7-bit content packs 160 chars in a
/// single segment (153 per segment when concatenated); Unicode content
/// packs 70 (67 when concatenated).
pub fn segment_count(body: &str) -> u32 {
    let len = body.chars().count();
    if len == 0 {
        return 1;
    }
    let (single, multi) = if is_gsm_7bit(body) { (GSM_SINGLE_SEGMENT_LEN, GSM_MULTI_SEGMENT_LEN) } else { (UNICODE_SINGLE_SEGMENT_LEN, UNICODE_MULTI_SEGMENT_LEN) };
    if len <= single {
        1
    } else {
        ((len as f64) / (multi as f64)).ceil() as u32
    }
}

fn cost_for_segments(segments: u32, cost_per_segment: Decimal) -> Decimal {
    Decimal::from(segments) * cost_per_segment
}

/// Sends `template`'s selected variant to `recipient` (spec §4.H). A single
/// call to `ProviderRegistry::send_via_best` already walks every eligible
/// provider in priority/success-rate order, so one call here exhausts the
/// registry; there is no separate outer retry.
pub async fn send(registry: &ProviderRegistry, template: &SmsTemplate, recipient: &str, cost_per_segment: Decimal) -> Result<SmsMessage> {
    let variant = template.select_variant();
    let segments = segment_count(&variant.body);

    let (provider_name, provider_message_id) = registry.send_via_best(recipient, &variant.body, &[]).await?;

    Ok(SmsMessage {
        id: SmsMessageId::new(),
        recipient: recipient.to_string(),
        body: variant.body.clone(),
        segments,
        provider: provider_name,
        provider_message_id: Some(provider_message_id),
        status: SmsStatus::Sent,
        retry_count: 0,
        cost: cost_for_segments(segments, cost_per_segment),
        metadata: json!({ "template_id": template.id, "variant_id": variant.id }),
    })
}

/// Sends to each recipient, `BULK_BATCH_SIZE` at a time with a pause
/// between batches, surfacing per-recipient errors without aborting the
/// batch (spec §4.H).
pub async fn bulk_send(registry: &ProviderRegistry, template: &SmsTemplate, recipients: &[String], cost_per_segment: Decimal) -> Vec<(String, Result<SmsMessage>)> {
    let mut results = Vec::with_capacity(recipients.len());
    for (batch_index, batch) in recipients.chunks(BULK_BATCH_SIZE).enumerate() {
        if batch_index > 0 {
            tokio::time::sleep(BULK_BATCH_PAUSE).await;
        }
        for recipient in batch {
            let outcome = send(registry, template, recipient, cost_per_segment).await;
            results.push((recipient.clone(), outcome));
        }
    }
    results
}

/// Applies a delivery receipt (status API poll or inbound webhook),
/// transitioning `sent -> delivered/failed` and updating the originating
/// template's effectiveness score (spec §4.H).
pub fn apply_receipt(message: &mut SmsMessage, template: &SmsTemplate, delivered: bool) {
    message.status = if delivered { SmsStatus::Delivered } else { SmsStatus::Failed };
    if let Some(variant_id) = message.metadata.get("variant_id").and_then(|v| v.as_str()) {
        template.record_delivery(variant_id, delivered);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::super::provider::SmsProvider;
    use super::super::template::TemplateVariant;
    use async_trait::async_trait;
    use std::sync::Arc;

    struct AlwaysSucceeds;
    #[async_trait]
    impl SmsProvider for AlwaysSucceeds {
        async fn send(&self, _recipient: &str, _body: &str) -> Result<String> {
            Ok("pm-1".to_string())
        }
        fn name(&self) -> &str {
            "always"
        }
    }

    fn registry() -> ProviderRegistry {
        let mut r = ProviderRegistry::new();
        r.register(Arc::new(AlwaysSucceeds), 5);
        r
    }

    #[test]
    fn ascii_body_under_160_chars_is_one_segment() {
        assert_eq!(segment_count("your cylinder delivery is on the way"), 1);
    }

    #[test]
    fn ascii_body_over_160_chars_uses_153_char_segments() {
        let body = "a".repeat(200);
        assert_eq!(segment_count(&body), 2);
    }

    #[test]
    fn unicode_body_uses_70_char_single_segment_threshold() {
        let body = "瓦斯".repeat(40);
        assert!(segment_count(&body) > 1);
    }

    #[tokio::test]
    async fn send_builds_a_sent_message_with_segment_count() {
        let r = registry();
        let template = SmsTemplate::new("t1", "reminder", vec![TemplateVariant::new("a", "delivery today", 1)]);
        let msg = send(&r, &template, "+886900000000", Decimal::new(50, 2)).await.unwrap();
        assert_eq!(msg.status, SmsStatus::Sent);
        assert_eq!(msg.segments, 1);
    }

    #[tokio::test]
    async fn bulk_send_reports_per_recipient_results() {
        let r = registry();
        let template = SmsTemplate::new("t1", "reminder", vec![TemplateVariant::new("a", "hi", 1)]);
        let recipients = vec!["+886900000001".to_string(), "+886900000002".to_string()];
        let results = bulk_send(&r, &template, &recipients, Decimal::new(50, 2)).await;
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|(_, r)| r.is_ok()));
    }

    #[test]
    fn delivery_receipt_updates_template_effectiveness() {
        let template = SmsTemplate::new("t1", "reminder", vec![TemplateVariant::new("a", "hi", 1)]);
        template.select_variant();
        let mut msg = SmsMessage {
            id: SmsMessageId::new(),
            recipient: "+886900000000".into(),
            body: "hi".into(),
            segments: 1,
            provider: "always".into(),
            provider_message_id: Some("pm-1".into()),
            status: SmsStatus::Sent,
            retry_count: 0,
            cost: Decimal::ZERO,
            metadata: json!({"template_id": "t1", "variant_id": "a"}),
        };
        apply_receipt(&mut msg, &template, true);
        assert_eq!(msg.status, SmsStatus::Delivered);
        assert_eq!(template.variants[0].effectiveness_score(), 1.0);
    }
}
