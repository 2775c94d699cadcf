pub mod health;
pub mod router;

pub use health::EndpointHealth;
pub use router::{run_health_loop, DbEndpoint, DbRouter, ReplicaSlot, HEALTH_CHECK_INTERVAL};
