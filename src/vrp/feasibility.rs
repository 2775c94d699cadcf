//! Time-window feasibility shared by construction, fallback, and local
//! search (spec §4.C: "per-stop time window; waiting is allowed up to 30
//! minutes"). Grounded on the same
//! `original_source/backend/app/services/optimization/vrp_optimizer.py`
//! construction phase, which rejects an insertion the moment projected
//! arrival falls outside a stop's window.

use crate::domain::{Stop, Vehicle};
use chrono::{DateTime, Duration, Utc};

pub const WAIT_ALLOWANCE_MINUTES: i64 = 30;

fn travel_duration(distance_km: f64, avg_speed_kmh: f64) -> Duration {
    let minutes = (distance_km / avg_speed_kmh) * 60.0;
    Duration::milliseconds((minutes * 60_000.0).round() as i64)
}

/// Whether a vehicle departing `vehicle.start_location` now, at
/// `avg_speed_kmh`, can visit every stop in `order` without breaching its
/// time window. A vehicle may arrive up to `WAIT_ALLOWANCE_MINUTES` early
/// and wait; arriving after `time_window_end` is infeasible.
pub fn respects_time_windows(vehicle: &Vehicle, stops: &[Stop], order: &[usize], avg_speed_kmh: f64) -> bool {
    let mut clock: DateTime<Utc> = Utc::now();
    let mut prev = vehicle.start_location;
    for &idx in order {
        let stop = &stops[idx];
        let leg_km = prev.haversine_km(&stop.location);
        clock += travel_duration(leg_km, avg_speed_kmh);

        if clock > stop.time_window_end {
            return false;
        }
        if clock < stop.time_window_start - Duration::minutes(WAIT_ALLOWANCE_MINUTES) {
            return false;
        }
        if clock < stop.time_window_start {
            clock = stop.time_window_start;
        }

        clock += Duration::milliseconds(stop.service_time_minutes as i64 * 60_000);
        prev = stop.location;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::{CustomerId, DriverId, LatLng, OrderId, ProductId};
    use std::collections::HashMap;

    fn stop_with_window(lng: f64, start_offset_minutes: i64, end_offset_minutes: i64) -> Stop {
        Stop {
            order_id: OrderId::new(),
            customer_id: CustomerId::new(),
            location: LatLng::new(0.0, lng),
            demand: HashMap::from([(ProductId::new(), 1)]),
            time_window_start: Utc::now() + Duration::minutes(start_offset_minutes),
            time_window_end: Utc::now() + Duration::minutes(end_offset_minutes),
            service_time_minutes: 5,
            priority: 0,
            is_restaurant: false,
            area: "A".to_string(),
        }
    }

    fn vehicle() -> Vehicle {
        Vehicle {
            driver_id: DriverId::new(),
            capacity: HashMap::new(),
            start_location: LatLng::new(0.0, 0.0),
            end_location: LatLng::new(0.0, 0.0),
            max_shift_minutes: 480,
        }
    }

    #[test]
    fn wide_open_window_is_always_feasible() {
        let v = vehicle();
        let stops = vec![stop_with_window(1.0, 0, 240)];
        assert!(respects_time_windows(&v, &stops, &[0], 30.0));
    }

    #[test]
    fn arrival_after_window_end_is_infeasible() {
        let v = vehicle();
        // ~111km at 30 km/h is well over 3 hours of travel.
        let stops = vec![stop_with_window(1.0, 0, 5)];
        assert!(!respects_time_windows(&v, &stops, &[0], 30.0));
    }

    #[test]
    fn arrival_more_than_thirty_minutes_early_is_infeasible() {
        let v = vehicle();
        let stops = vec![stop_with_window(0.0001, 120, 240)];
        assert!(!respects_time_windows(&v, &stops, &[0], 30.0));
    }

    #[test]
    fn arrival_within_thirty_minutes_early_waits_and_is_feasible() {
        let v = vehicle();
        let stops = vec![stop_with_window(0.0001, 20, 240)];
        assert!(respects_time_windows(&v, &stops, &[0], 30.0));
    }
}
