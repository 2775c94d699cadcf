//! Vehicle Routing Problem solver (spec §4.C): parallel cheapest insertion
//! for construction, guided local search for improvement, deterministic
//! nearest-neighbor as the fallback when the wall-clock deadline is hit.
//! Grounded on
//! `original_source/backend/app/services/optimization/vrp_optimizer.py` +
//! `enhanced_vrp_solver.py` for the two-phase shape, and on
//! `other_examples/…PeakBI-vrp…constraints/mod.rs` for the hard/soft
//! constraint vocabulary used in doc comments across this module.

pub mod cost;
pub mod fallback;
pub mod feasibility;
pub mod insertion;
pub mod local_search;

use crate::config::BusinessConfig;
use crate::domain::{Stop, Vehicle};
use insertion::{cheapest_insertion, PlannedRoute};
use std::time::Instant;

const LOCAL_SEARCH_ITERATIONS: usize = 25;

#[derive(Debug)]
pub struct SolveOutput {
    pub routes: Vec<PlannedRoute>,
    pub unserved: Vec<usize>,
    pub optimization_score: f64,
    pub used_fallback: bool,
}

fn naive_route_cost(vehicle: &Vehicle, stops: &[Stop], order: &[usize], business: &BusinessConfig, is_weekend: bool, avg_speed_kmh: f64) -> f64 {
    let mut total = 0.0;
    let mut prev = vehicle.start_location;
    for &idx in order {
        total += prev.haversine_km(&stops[idx].location);
        prev = stops[idx].location;
    }
    let distance_km = total + prev.haversine_km(&vehicle.end_location);
    let travel_minutes = (distance_km / avg_speed_kmh) * 60.0;
    let service_minutes: u32 = order.iter().map(|&i| stops[i].service_time_minutes).sum();
    cost::route_cost(distance_km, travel_minutes + service_minutes as f64, 0.0, business, is_weekend).total
}

/// Solves one cluster's VRP subproblem. Construction always runs; local
/// search is skipped (and `used_fallback` set) once the wall-clock
/// `deadline` has passed, per spec §4.C.
pub fn solve(
    stops: &[Stop],
    vehicles: &[Vehicle],
    business: &BusinessConfig,
    avg_speed_kmh: f64,
    is_weekend: bool,
    deadline: Instant,
) -> SolveOutput {
    if Instant::now() >= deadline || vehicles.is_empty() {
        let result = fallback::nearest_neighbor(stops, vehicles, business, avg_speed_kmh);
        let score = score_routes(&result.routes, stops, vehicles, business, avg_speed_kmh, is_weekend, &result.unserved) * 0.5;
        return SolveOutput { routes: result.routes, unserved: result.unserved, optimization_score: score, used_fallback: true };
    }

    let mut result = cheapest_insertion(stops, vehicles, business, avg_speed_kmh);

    let mut used_fallback = false;
    for route in &mut result.routes {
        if Instant::now() >= deadline {
            used_fallback = true;
            break;
        }
        let vehicle = &vehicles[route.vehicle_index];
        let distance_km = local_search::guided_local_search(vehicle, stops, &mut route.stop_indices, LOCAL_SEARCH_ITERATIONS, avg_speed_kmh);
        route.distance_km = distance_km;
        let travel_minutes = (distance_km / avg_speed_kmh) * 60.0;
        let service_minutes: u32 = route.stop_indices.iter().map(|&i| stops[i].service_time_minutes).sum();
        route.duration_minutes = travel_minutes + service_minutes as f64;
    }

    let mut score = score_routes(&result.routes, stops, vehicles, business, avg_speed_kmh, is_weekend, &result.unserved);
    if used_fallback {
        score *= 0.5;
    }

    SolveOutput { routes: result.routes, unserved: result.unserved, optimization_score: score, used_fallback }
}

fn score_routes(
    routes: &[PlannedRoute],
    stops: &[Stop],
    vehicles: &[Vehicle],
    business: &BusinessConfig,
    avg_speed_kmh: f64,
    is_weekend: bool,
    unserved: &[usize],
) -> f64 {
    let unserved_penalty = cost::unserved_priority_penalty(
        &unserved.iter().map(|&i| stops[i].priority).collect::<Vec<_>>(),
    );
    let actual_total: f64 = routes
        .iter()
        .map(|r| cost::route_cost(r.distance_km, r.duration_minutes, 0.0, business, is_weekend).total)
        .sum::<f64>()
        + cost::route_cost(0.0, 0.0, unserved_penalty, business, is_weekend).total;

    let naive_total: f64 = routes
        .iter()
        .map(|r| naive_route_cost(&vehicles[r.vehicle_index], stops, &r.stop_indices, business, is_weekend, avg_speed_kmh))
        .sum();

    cost::optimization_score(actual_total, naive_total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::{CustomerId, DriverId, LatLng, OrderId, ProductId};
    use chrono::Utc;
    use std::collections::HashMap;
    use std::time::Duration;

    fn stop_at(lat: f64, lng: f64) -> Stop {
        Stop {
            order_id: OrderId::new(),
            customer_id: CustomerId::new(),
            location: LatLng::new(lat, lng),
            demand: HashMap::from([(ProductId::new(), 1)]),
            time_window_start: Utc::now(),
            time_window_end: Utc::now() + chrono::Duration::hours(4),
            service_time_minutes: 5,
            priority: 1,
            is_restaurant: false,
            area: "A".to_string(),
        }
    }

    fn vehicle() -> Vehicle {
        Vehicle {
            driver_id: DriverId::new(),
            capacity: HashMap::from([(ProductId::new(), 100)]),
            start_location: LatLng::new(0.0, 0.0),
            end_location: LatLng::new(0.0, 0.0),
            max_shift_minutes: 480,
        }
    }

    #[test]
    fn solves_within_deadline_without_falling_back() {
        let business = BusinessConfig::default();
        let stops = vec![stop_at(0.0, 1.0), stop_at(0.0, 2.0), stop_at(0.0, 0.5)];
        let vehicles = vec![vehicle()];
        let deadline = Instant::now() + Duration::from_secs(2);
        let output = solve(&stops, &vehicles, &business, 30.0, false, deadline);
        assert!(!output.used_fallback);
        assert!(output.unserved.is_empty());
    }

    #[test]
    fn expired_deadline_forces_fallback_with_lowered_score() {
        let business = BusinessConfig::default();
        let stops = vec![stop_at(0.0, 1.0), stop_at(0.0, 2.0)];
        let vehicles = vec![vehicle()];
        let deadline = Instant::now() - Duration::from_secs(1);
        let output = solve(&stops, &vehicles, &business, 30.0, false, deadline);
        assert!(output.used_fallback);
    }

    #[test]
    fn no_vehicles_leaves_all_stops_unserved() {
        let business = BusinessConfig::default();
        let stops = vec![stop_at(0.0, 1.0)];
        let deadline = Instant::now() + Duration::from_secs(2);
        let output = solve(&stops, &[], &business, 30.0, false, deadline);
        assert_eq!(output.unserved.len(), 1);
    }
}
