use crate::common::SmsMessageId;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmsStatus {
    Pending,
    Sent,
    Delivered,
    Failed,
}

/// Spec §3: `SMSMessage`.
#[derive(Debug, Clone)]
pub struct SmsMessage {
    pub id: SmsMessageId,
    pub recipient: String,
    pub body: String,
    pub segments: u32,
    pub provider: String,
    pub provider_message_id: Option<String>,
    pub status: SmsStatus,
    pub retry_count: u32,
    pub cost: rust_decimal::Decimal,
    pub metadata: Value,
}
