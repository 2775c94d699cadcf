//! Size- and barrier-constrained clustering (spec §4.B): derive `eps` from
//! a target density, density-cluster, then repeatedly split any cluster
//! that either exceeds the configured size cap or still has a barrier
//! crossing inside it. Grounded on the three-stage pipeline in
//! `original_source/backend/app/services/optimization/clustering.py`'s
//! `cluster_with_constraints` (density pass -> size-cap split -> barrier
//! verification split).

use super::barrier::GeoBarrier;
use super::{count::cluster_count, density::cluster_density, eps_from_density, ClusterFlags, StopCluster};
use crate::domain::Stop;

const DENSITY_MIN_SAMPLES: usize = 2;

pub fn cluster_constrained(
    stops: &[Stop],
    flags: &ClusterFlags,
    max_cluster_size: usize,
    target_density: f64,
) -> Vec<StopCluster> {
    if stops.is_empty() {
        return Vec::new();
    }
    let eps = eps_from_density(stops.len(), target_density);
    let initial = cluster_density(stops, eps, DENSITY_MIN_SAMPLES, flags);

    let mut result: Vec<Vec<usize>> = Vec::new();
    for cluster in initial {
        split_to_fit(stops, cluster.members, max_cluster_size, &flags.barriers, &mut result);
    }

    result
        .into_iter()
        .enumerate()
        .map(|(id, members)| StopCluster::from_members(id as u32, stops, members))
        .collect()
}

fn split_to_fit(
    stops: &[Stop],
    members: Vec<usize>,
    max_cluster_size: usize,
    barriers: &[GeoBarrier],
    out: &mut Vec<Vec<usize>>,
) {
    if members.len() <= 1 {
        out.push(members);
        return;
    }
    if members.len() > max_cluster_size {
        let k = (members.len() + max_cluster_size - 1) / max_cluster_size;
        for part in partition(stops, &members, k.max(2)) {
            split_to_fit(stops, part, max_cluster_size, barriers, out);
        }
        return;
    }
    if has_barrier_crossing(stops, &members, barriers) {
        for part in partition(stops, &members, 2) {
            if part.len() == members.len() {
                // Could not actually separate the crossing pair further; stop recursing.
                out.push(part);
                return;
            }
            split_to_fit(stops, part, max_cluster_size, barriers, out);
        }
        return;
    }
    out.push(members);
}

fn partition(stops: &[Stop], members: &[usize], k: usize) -> Vec<Vec<usize>> {
    let subset: Vec<Stop> = members.iter().map(|&i| stops[i].clone()).collect();
    let sub_clusters = cluster_count(&subset, k);
    sub_clusters
        .into_iter()
        .map(|c| c.members.into_iter().map(|local| members[local]).collect())
        .collect()
}

fn has_barrier_crossing(stops: &[Stop], members: &[usize], barriers: &[GeoBarrier]) -> bool {
    for &i in members {
        for &j in members {
            if i >= j {
                continue;
            }
            if barriers.iter().any(|b| b.crosses(stops[i].location, stops[j].location)) {
                return true;
            }
        }
    }
    false
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
    fn no_cluster_exceeds_the_size_cap() {
        let stops: Vec<Stop> = (0..20).map(|i| stop_at(25.0 + i as f64 * 0.0005, 121.5)).collect();
        let clusters = cluster_constrained(&stops, &ClusterFlags::default(), 5, 2.0);
        assert!(clusters.iter().all(|c| c.members.len() <= 5));
    }

    #[test]
    fn empty_input_yields_no_clusters() {
        assert!(cluster_constrained(&[], &ClusterFlags::default(), 5, 2.0).is_empty());
    }

    #[test]
    fn barrier_crossing_pair_ends_up_split_apart() {
        let mountain = GeoBarrier::MountainRange { lat_min: 23.8, lat_max: 24.3, lng_min: 120.9, lng_max: 121.2 };
        let stops = vec![stop_at(24.0, 120.5), stop_at(24.0, 121.5)];
        let flags = ClusterFlags { barriers: vec![mountain], consider_time_windows: false };
        let clusters = cluster_constrained(&stops, &flags, 10, 100.0);
        let same_cluster = clusters.iter().any(|c| c.members.len() == 2);
        assert!(!same_cluster);
    }

    #[test]
    fn incompatible_windows_are_split_apart_when_flagged() {
        let mut a = stop_at(25.000, 121.500);
        let mut b = stop_at(25.0005, 121.5005);
        a.time_window_start = Utc::now();
        a.time_window_end = Utc::now() + chrono::Duration::hours(1);
        b.time_window_start = Utc::now() + chrono::Duration::hours(5);
        b.time_window_end = Utc::now() + chrono::Duration::hours(6);
        let flags = ClusterFlags { barriers: Vec::new(), consider_time_windows: true };
        let clusters = cluster_constrained(&[a, b], &flags, 10, 100.0);
        assert!(clusters.iter().all(|c| c.members.len() == 1));
    }
}
