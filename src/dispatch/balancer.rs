//! Workload balancing pass (spec §4.D): after construction, move trailing
//! stops off vehicles whose weighted score exceeds 1.2x the mean onto
//! vehicles below 0.8x the mean. Grounded on
//! `original_source/backend/app/services/optimization/vrp_optimizer.py`'s
//! post-solve rebalancing step and on the threshold-aggregation style of
//! the teacher's `networking/health/aggregator.rs`.

use crate::domain::{Stop, Vehicle};
use crate::vrp::insertion::PlannedRoute;
use std::collections::HashMap;

const OVERLOAD_FACTOR: f64 = 1.2;
const UNDERLOAD_FACTOR: f64 = 0.8;
const MAX_PASSES: usize = 20;

/// `0.3*stop_count + 0.3*total_demand + 0.4*duration_minutes` (spec §4.D).
fn weighted_score(route: &PlannedRoute, stops: &[Stop]) -> f64 {
    let stop_count = route.stop_indices.len() as f64;
    let demand: u32 = route.stop_indices.iter().map(|&i| stops[i].total_demand()).sum();
    0.3 * stop_count + 0.3 * demand as f64 + 0.4 * route.duration_minutes
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
    let travel = (distance_km / avg_speed_kmh) * 60.0;
    let service: u32 = order.iter().map(|&i| stops[i].service_time_minutes).sum();
    travel + service as f64
}

fn route_demand_map(route: &PlannedRoute, stops: &[Stop]) -> HashMap<crate::common::ProductId, u32> {
    let mut demand = HashMap::new();
    for &i in &route.stop_indices {
        for (product, qty) in &stops[i].demand {
            *demand.entry(*product).or_insert(0) += qty;
        }
    }
    demand
}

/// Rebalances in place. Each pass moves at most one trailing stop per
/// overloaded route; stops once no feasible move remains or the pass cap
/// is hit.
pub fn rebalance(routes: &mut [PlannedRoute], stops: &[Stop], vehicles: &[Vehicle], avg_speed_kmh: f64) {
    if routes.is_empty() {
        return;
    }
    for _ in 0..MAX_PASSES {
        let scores: Vec<f64> = routes.iter().map(|r| weighted_score(r, stops)).collect();
        let mean = scores.iter().sum::<f64>() / scores.len() as f64;
        if mean <= 0.0 {
            break;
        }

        let overloaded = scores
            .iter()
            .enumerate()
            .filter(|&(_, &s)| s > OVERLOAD_FACTOR * mean)
            .map(|(i, _)| i)
            .collect::<Vec<_>>();
        let underloaded = scores
            .iter()
            .enumerate()
            .filter(|&(_, &s)| s < UNDERLOAD_FACTOR * mean)
            .map(|(i, _)| i)
            .collect::<Vec<_>>();

        if overloaded.is_empty() || underloaded.is_empty() {
            break;
        }

        let mut moved_any = false;
        for &from in &overloaded {
            let Some(&trailing) = routes[from].stop_indices.last() else { continue };
            for &to in &underloaded {
                if from == to {
                    continue;
                }
                let vehicle = &vehicles[routes[to].vehicle_index];
                let candidate_demand = route_demand_map(&routes[to], stops);
                if !vehicle.can_carry(&stops[trailing].demand, &candidate_demand) {
                    continue;
                }
                let mut candidate_order = routes[to].stop_indices.clone();
                candidate_order.push(trailing);
                let distance_km = route_distance_km(vehicle, stops, &candidate_order);
                let duration = route_duration_minutes(stops, &candidate_order, distance_km, avg_speed_kmh);
                if duration > vehicle.max_shift_minutes as f64 {
                    continue;
                }

                routes[from].stop_indices.pop();
                routes[to].stop_indices.push(trailing);
                for vehicle_idx in [from, to] {
                    let v = &vehicles[routes[vehicle_idx].vehicle_index];
                    let d = route_distance_km(v, stops, &routes[vehicle_idx].stop_indices);
                    routes[vehicle_idx].distance_km = d;
                    routes[vehicle_idx].duration_minutes = route_duration_minutes(stops, &routes[vehicle_idx].stop_indices, d, avg_speed_kmh);
                }
                moved_any = true;
                break;
            }
        }

        if !moved_any {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::{CustomerId, DriverId, LatLng, OrderId, ProductId};
    use chrono::Utc;
    use std::collections::HashMap as Map;

    fn stop_at(lat: f64, lng: f64) -> Stop {
        Stop {
            order_id: OrderId::new(),
            customer_id: CustomerId::new(),
            location: LatLng::new(lat, lng),
            demand: Map::from([(ProductId::new(), 1)]),
            time_window_start: Utc::now(),
            time_window_end: Utc::now() + chrono::Duration::hours(4),
            service_time_minutes: 5,
            priority: 0,
            is_restaurant: false,
            area: "A".to_string(),
        }
    }

    fn vehicle() -> Vehicle {
        Vehicle {
            driver_id: DriverId::new(),
            capacity: Map::from([(ProductId::new(), 1000)]),
            start_location: LatLng::new(0.0, 0.0),
            end_location: LatLng::new(0.0, 0.0),
            max_shift_minutes: 10_000,
        }
    }

    #[test]
    fn trailing_stop_moves_off_an_overloaded_route() {
        let stops: Vec<Stop> = (0..10).map(|i| stop_at(0.0, i as f64)).collect();
        let vehicles = vec![vehicle(), vehicle()];
        let mut routes = vec![
            PlannedRoute { vehicle_index: 0, stop_indices: (0..9).collect(), distance_km: 0.0, duration_minutes: 900.0 },
            PlannedRoute { vehicle_index: 1, stop_indices: vec![9], distance_km: 0.0, duration_minutes: 10.0 },
        ];
        rebalance(&mut routes, &stops, &vehicles, 30.0);
        assert!(routes[0].stop_indices.len() < 9);
        assert!(routes[1].stop_indices.len() > 1);
    }

    #[test]
    fn balanced_routes_are_left_untouched() {
        let stops: Vec<Stop> = (0..4).map(|i| stop_at(0.0, i as f64)).collect();
        let vehicles = vec![vehicle(), vehicle()];
        let mut routes = vec![
            PlannedRoute { vehicle_index: 0, stop_indices: vec![0, 1], distance_km: 0.0, duration_minutes: 10.0 },
            PlannedRoute { vehicle_index: 1, stop_indices: vec![2, 3], distance_km: 0.0, duration_minutes: 10.0 },
        ];
        let before = (routes[0].stop_indices.clone(), routes[1].stop_indices.clone());
        rebalance(&mut routes, &stops, &vehicles, 30.0);
        assert_eq!((routes[0].stop_indices.clone(), routes[1].stop_indices.clone()), before);
    }
}
