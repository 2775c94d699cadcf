//! Deterministic nearest-neighbor fallback (spec §4.C: "deterministic
//! nearest-neighbor fallback" used when the optimizer can't meet its
//! wall-clock deadline). Grounded on the same
//! `original_source/backend/app/services/optimization/vrp_optimizer.py`
//! module, which falls back to a greedy nearest-unvisited-stop construction
//! when the metaheuristic budget is exhausted.

use super::feasibility::respects_time_windows;
use crate::config::BusinessConfig;
use crate::domain::{Stop, Vehicle};
use crate::vrp::insertion::{InsertionResult, PlannedRoute};

fn route_distance_km(vehicle: &Vehicle, stops: &[Stop], order: &[usize]) -> f64 {
    let mut total = 0.0;
    let mut prev = vehicle.start_location;
    for &idx in order {
        total += prev.haversine_km(&stops[idx].location);
        prev = stops[idx].location;
    }
    total + prev.haversine_km(&vehicle.end_location)
}

fn route_duration_minutes(stops: &[Stop], order: &[usize], distance_km: f64, avg_speed_kmh: f64) -> f64 {
    let travel_minutes = (distance_km / avg_speed_kmh) * 60.0;
    let service_minutes: u32 = order.iter().map(|&i| stops[i].service_time_minutes).sum();
    travel_minutes + service_minutes as f64
}

/// Builds routes vehicle-by-vehicle, each time appending the nearest
/// feasible remaining stop to the vehicle's current position until no
/// feasible stop remains, then moving to the next vehicle. Ties broken by
/// lowest stop index so the result is reproducible for identical input.
pub fn nearest_neighbor(
    stops: &[Stop],
    vehicles: &[Vehicle],
    _business: &BusinessConfig,
    avg_speed_kmh: f64,
) -> InsertionResult {
    let mut unassigned: Vec<usize> = (0..stops.len()).collect();
    let mut routes = Vec::with_capacity(vehicles.len());

    for (v, vehicle) in vehicles.iter().enumerate() {
        let mut order: Vec<usize> = Vec::new();
        let mut loaded = std::collections::HashMap::new();
        let mut current_location = vehicle.start_location;

        loop {
            let mut best: Option<(usize, usize, f64)> = None; // (position in unassigned, stop_idx, distance)
            for (pos, &stop_idx) in unassigned.iter().enumerate() {
                if !vehicle.can_carry(&stops[stop_idx].demand, &loaded) {
                    continue;
                }
                let mut candidate = order.clone();
                candidate.push(stop_idx);
                let distance_km = route_distance_km(vehicle, stops, &candidate);
                let duration = route_duration_minutes(stops, &candidate, distance_km, avg_speed_kmh);
                if duration > vehicle.max_shift_minutes as f64 {
                    continue;
                }
                if !respects_time_windows(vehicle, stops, &candidate, avg_speed_kmh) {
                    continue;
                }
                let leg = current_location.haversine_km(&stops[stop_idx].location);
                if best.map(|(_, _, best_leg)| leg < best_leg).unwrap_or(true) {
                    best = Some((pos, stop_idx, leg));
                }
            }
            match best {
                Some((pos, stop_idx, _)) => {
                    unassigned.remove(pos);
                    order.push(stop_idx);
                    current_location = stops[stop_idx].location;
                    for (product, qty) in &stops[stop_idx].demand {
                        *loaded.entry(*product).or_insert(0) += qty;
                    }
                }
                None => break,
            }
        }

        let distance_km = route_distance_km(vehicle, stops, &order);
        let duration_minutes = route_duration_minutes(stops, &order, distance_km, avg_speed_kmh);
        routes.push(PlannedRoute { vehicle_index: v, stop_indices: order, distance_km, duration_minutes });
    }

    InsertionResult { routes, unserved: unassigned }
}
