//! SMS gateway (spec §4.H): provider abstraction, A/B templates, send-path
//! orchestration, bulk send.

pub mod gateway;
pub mod provider;
pub mod template;

pub use gateway::{apply_receipt, bulk_send, segment_count, send};
pub use provider::{IniPostProvider, JsonHttpsProvider, ProviderRegistry, QueryGetProvider, SmsProvider};
pub use template::{SmsTemplate, TemplateVariant};
