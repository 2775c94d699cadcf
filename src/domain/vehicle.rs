use crate::common::{DriverId, LatLng, ProductId};
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct Vehicle {
    pub driver_id: DriverId,
    pub capacity: HashMap<ProductId, u32>,
    pub start_location: LatLng,
    pub end_location: LatLng,
    pub max_shift_minutes: u32,
}

impl Vehicle {
    pub fn default_shift() -> u32 {
        480
    }

    pub fn capacity_for(&self, product: &ProductId) -> u32 {
        self.capacity.get(product).copied().unwrap_or(0)
    }

    /// Whether `demand` fits within remaining capacity, per product.
    pub fn can_carry(&self, demand: &HashMap<ProductId, u32>, already_loaded: &HashMap<ProductId, u32>) -> bool {
        demand.iter().all(|(product, qty)| {
            let loaded = already_loaded.get(product).copied().unwrap_or(0);
            loaded + qty <= self.capacity_for(product)
        })
    }
}
