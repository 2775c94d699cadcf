//! Core data model (spec §3): stops, vehicles, routes and their stops, and
//! the order/customer entities stops are derived from. Ownership follows
//! spec §3's closing note — a Route owns its RouteStops, an Order owns its
//! line items, everything else references by stable id.

mod customer;
mod import_checkpoint;
mod order;
mod route;
mod sms_message;
mod stop;
mod sync_operation;
mod vehicle;

pub use customer::Customer;
pub use import_checkpoint::ImportCheckpoint;
pub use order::{Order, OrderItem, OrderStatus, PaymentStatus};
pub use route::{Route, RouteStatus, RouteStop};
pub use sms_message::{SmsMessage, SmsStatus};
pub use stop::Stop;
pub use sync_operation::{
    ConflictResolutionStrategy, EntityType, SyncDirection, SyncOperation, SyncStatus, SyncTransaction,
};
pub use vehicle::Vehicle;
