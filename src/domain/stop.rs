use crate::common::{CustomerId, LatLng, OrderId, ProductId};
use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// A single delivery target, derived from an `Order` + `Customer` pair and
/// treated as immutable input to the clusterer and solver (spec §3).
#[derive(Debug, Clone)]
pub struct Stop {
    pub order_id: OrderId,
    pub customer_id: CustomerId,
    pub location: LatLng,
    pub demand: HashMap<ProductId, u32>,
    pub time_window_start: DateTime<Utc>,
    pub time_window_end: DateTime<Utc>,
    pub service_time_minutes: u32,
    pub priority: u8,
    pub is_restaurant: bool,
    pub area: String,
}

impl Stop {
    pub fn total_demand(&self) -> u32 {
        self.demand.values().sum()
    }

    /// `base + per_cylinder * count`, the service-time formula named in
    /// spec §6 (`business.base_service_time`, `business.time_per_cylinder`).
    pub fn compute_service_time(base_minutes: u32, per_cylinder_minutes: u32, cylinder_count: u32) -> u32 {
        base_minutes + per_cylinder_minutes * cylinder_count
    }

    pub fn is_compatible_window(&self, other: &Stop) -> bool {
        self.time_window_start < other.time_window_end && other.time_window_start < self.time_window_end
    }
}
