//! Parallel cheapest-insertion construction heuristic (spec §4.C: "parallel
//! cheapest insertion"). Grounded on
//! `original_source/backend/app/services/optimization/vrp_optimizer.py`'s
//! construction phase: repeatedly insert whichever (stop, vehicle, position)
//! triple has the lowest marginal distance cost, subject to capacity and
//! shift-time feasibility, until no feasible insertion remains.

use super::feasibility::respects_time_windows;
use crate::common::{LatLng, ProductId};
use crate::config::BusinessConfig;
use crate::domain::{Stop, Vehicle};
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct PlannedRoute {
    pub vehicle_index: usize,
    /// Indices into the `stops` slice passed to `cheapest_insertion`, in
    /// visiting order.
    pub stop_indices: Vec<usize>,
    pub distance_km: f64,
    pub duration_minutes: f64,
}

pub struct InsertionResult {
    pub routes: Vec<PlannedRoute>,
    pub unserved: Vec<usize>,
}

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

fn insertion_delta(vehicle: &Vehicle, stops: &[Stop], order: &[usize], stop_idx: usize, position: usize) -> f64 {
    let before = if position == 0 { vehicle.start_location } else { stops[order[position - 1]].location };
    let after = if position == order.len() { vehicle.end_location } else { stops[order[position]].location };
    let removed = before.haversine_km(&after);
    let added = before.haversine_km(&stops[stop_idx].location) + stops[stop_idx].location.haversine_km(&after);
    added - removed
}

/// Builds one route per vehicle by repeated cheapest insertion. Stops that
/// cannot be feasibly placed on any vehicle (capacity or shift-time
/// exhausted) are returned in `unserved` rather than dropped silently.
pub fn cheapest_insertion(
    stops: &[Stop],
    vehicles: &[Vehicle],
    _business: &BusinessConfig,
    avg_speed_kmh: f64,
) -> InsertionResult {
    let mut routes: Vec<PlannedRoute> = (0..vehicles.len())
        .map(|i| PlannedRoute { vehicle_index: i, stop_indices: Vec::new(), distance_km: 0.0, duration_minutes: 0.0 })
        .collect();
    let mut loaded: Vec<HashMap<ProductId, u32>> = vec![HashMap::new(); vehicles.len()];
    let mut unassigned: Vec<usize> = (0..stops.len()).collect();

    loop {
        let mut best: Option<(usize, usize, usize, f64)> = None; // (stop_pos_in_unassigned, vehicle, position, delta)

        for (u_pos, &stop_idx) in unassigned.iter().enumerate() {
            for (v, vehicle) in vehicles.iter().enumerate() {
                if !vehicle.can_carry(&stops[stop_idx].demand, &loaded[v]) {
                    continue;
                }
                let order = &routes[v].stop_indices;
                for position in 0..=order.len() {
                    let delta = insertion_delta(vehicle, stops, order, stop_idx, position);
                    let mut candidate_order = order.clone();
                    candidate_order.insert(position, stop_idx);
                    let distance_km = route_distance_km(vehicle, stops, &candidate_order);
                    let duration = route_duration_minutes(stops, &candidate_order, distance_km, avg_speed_kmh);
                    if duration > vehicle.max_shift_minutes as f64 {
                        continue;
                    }
                    if !respects_time_windows(vehicle, stops, &candidate_order, avg_speed_kmh) {
                        continue;
                    }
                    if best.map(|(_, _, _, best_delta)| delta < best_delta).unwrap_or(true) {
                        best = Some((u_pos, v, position, delta));
                    }
                }
            }
        }

        match best {
            Some((u_pos, v, position, _)) => {
                let stop_idx = unassigned.remove(u_pos);
                routes[v].stop_indices.insert(position, stop_idx);
                for (product, qty) in &stops[stop_idx].demand {
                    *loaded[v].entry(*product).or_insert(0) += qty;
                }
            }
            None => break,
        }
    }

    for (v, vehicle) in vehicles.iter().enumerate() {
        routes[v].distance_km = route_distance_km(vehicle, stops, &routes[v].stop_indices);
        routes[v].duration_minutes = route_duration_minutes(
            stops,
            &routes[v].stop_indices,
            routes[v].distance_km,
            avg_speed_kmh,
        );
    }

    InsertionResult { routes, unserved: unassigned }
}
