//! Density-based clustering (spec §4.B: "group by density"), grounded on
//! `original_source/backend/app/services/optimization/clustering.py`'s
//! `cluster_by_dbscan` (`DBSCAN(eps=eps_km, min_samples=min_samples,
//! metric='precomputed')`). No sklearn-equivalent crate is in the teacher's
//! stack, so the neighbor search and label propagation are hand-rolled over
//! the haversine metric already used throughout `common::LatLng`.

use super::barrier::adjusted_distance_km;
use super::{ClusterFlags, StopCluster};
use crate::domain::Stop;

const NOISE: i64 = -1;
const UNVISITED: i64 = -2;

/// Whether two stops' time windows fail to overlap at all.
fn windows_incompatible(a: &Stop, b: &Stop) -> bool {
    a.time_window_end < b.time_window_start || b.time_window_end < a.time_window_start
}

/// Classic DBSCAN: a point is a core point once it has at least
/// `min_samples` neighbors (itself included) within `eps_km`. Points that
/// end up in no core point's neighborhood become noise; per spec §4.B each
/// noise point becomes its own singleton cluster rather than being dropped.
/// Neighbor distance runs through `adjusted_distance_km`, so a crossed
/// barrier or (when `flags.consider_time_windows`) an incompatible window
/// can push two otherwise-nearby stops out of each other's neighborhood.
pub fn cluster_density(stops: &[Stop], eps_km: f64, min_samples: usize, flags: &ClusterFlags) -> Vec<StopCluster> {
    let n = stops.len();
    if n == 0 {
        return Vec::new();
    }

    let neighbors: Vec<Vec<usize>> = (0..n)
        .map(|i| {
            (0..n)
                .filter(|&j| {
                    let base = stops[i].location.haversine_km(&stops[j].location);
                    let incompatible = flags.consider_time_windows && windows_incompatible(&stops[i], &stops[j]);
                    adjusted_distance_km(base, stops[i].location, stops[j].location, &flags.barriers, incompatible) <= eps_km
                })
                .collect()
        })
        .collect();

    let mut labels = vec![UNVISITED; n];
    let mut next_cluster: i64 = 0;

    for i in 0..n {
        if labels[i] != UNVISITED {
            continue;
        }
        if neighbors[i].len() < min_samples {
            labels[i] = NOISE;
            continue;
        }
        let cluster_id = next_cluster;
        next_cluster += 1;
        labels[i] = cluster_id;

        let mut seeds = neighbors[i].clone();
        let mut cursor = 0;
        while cursor < seeds.len() {
            let q = seeds[cursor];
            cursor += 1;
            if labels[q] == NOISE {
                labels[q] = cluster_id;
            }
            if labels[q] != UNVISITED {
                continue;
            }
            labels[q] = cluster_id;
            if neighbors[q].len() >= min_samples {
                for &r in &neighbors[q] {
                    if !seeds.contains(&r) {
                        seeds.push(r);
                    }
                }
            }
        }
    }

    let mut next_id = next_cluster as u32;
    let mut clusters: Vec<StopCluster> = (0..next_cluster)
        .map(|cluster_id| {
            let members: Vec<usize> = (0..n).filter(|&i| labels[i] == cluster_id).collect();
            StopCluster::from_members(cluster_id as u32, stops, members)
        })
        .collect();

    for i in 0..n {
        if labels[i] == NOISE {
            clusters.push(StopCluster::from_members(next_id, stops, vec![i]));
            next_id += 1;
        }
    }

    clusters
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::{CustomerId, LatLng, OrderId, ProductId};
    use chrono::Utc;
    use std::collections::HashMap;

    fn stop_at(lat: f64, lng: f64) -> Stop {
        Stop {
            order_id: OrderId::new(),
            customer_id: CustomerId::new(),
            location: LatLng::new(lat, lng),
            demand: HashMap::from([(ProductId::new(), 1)]),
            time_window_start: Utc::now(),
            time_window_end: Utc::now(),
            service_time_minutes: 5,
            priority: 0,
            is_restaurant: false,
            area: "A".to_string(),
        }
    }

    #[test]
    fn tight_group_forms_one_cluster() {
        let stops = vec![
            stop_at(25.000, 121.500),
            stop_at(25.001, 121.501),
            stop_at(25.002, 121.500),
        ];
        let clusters = cluster_density(&stops, 1.0, 2, &ClusterFlags::default());
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].members.len(), 3);
    }

    #[test]
    fn isolated_point_becomes_its_own_singleton_cluster() {
        let stops = vec![
            stop_at(25.000, 121.500),
            stop_at(25.001, 121.501),
            stop_at(30.000, 130.000),
        ];
        let clusters = cluster_density(&stops, 1.0, 2, &ClusterFlags::default());
        assert!(clusters.iter().any(|c| c.members.len() == 1));
    }

    #[test]
    fn barrier_crossing_keeps_otherwise_close_stops_out_of_each_others_neighborhood() {
        let barrier = crate::clustering::GeoBarrier::MountainRange { lat_min: 23.8, lat_max: 24.3, lng_min: 120.9, lng_max: 121.2 };
        // ~40km apart unadjusted, well under eps; 3x barrier multiplier pushes
        // them past it.
        let stops = vec![stop_at(24.0, 120.85), stop_at(24.0, 121.25)];
        let flags = ClusterFlags { barriers: vec![barrier], consider_time_windows: false };
        let clusters = cluster_density(&stops, 50.0, 1, &flags);
        assert_eq!(clusters.len(), 2);
    }

    #[test]
    fn incompatible_time_windows_keep_stops_apart_when_considered() {
        let mut a = stop_at(25.000, 121.500);
        let mut b = stop_at(25.0005, 121.5005);
        a.time_window_start = Utc::now();
        a.time_window_end = Utc::now() + chrono::Duration::hours(1);
        b.time_window_start = Utc::now() + chrono::Duration::hours(5);
        b.time_window_end = Utc::now() + chrono::Duration::hours(6);
        let flags = ClusterFlags { barriers: Vec::new(), consider_time_windows: true };
        let clusters = cluster_density(&[a, b], 1.0, 1, &flags);
        assert_eq!(clusters.len(), 2);
    }

    #[test]
    fn empty_input_yields_no_clusters() {
        assert!(cluster_density(&[], 1.0, 2, &ClusterFlags::default()).is_empty());
    }
}
