//! Time-window-first clustering (spec §4.B: "group by window compatibility
//! before grouping by density"), grounded on
//! `original_source/backend/app/services/optimization/clustering.py`'s
//! `cluster_by_time_window` (bucket by window label, then DBSCAN within
//! each bucket so density clustering never merges incompatible windows).

use super::density::cluster_density;
use super::{ClusterFlags, StopCluster};
use crate::domain::Stop;
use std::collections::HashMap;

/// Groups stops sharing an exact `(start, end)` time window, density-
/// clusters within each group, then renumbers cluster ids so they are
/// unique across the combined result.
pub fn cluster_time_window(stops: &[Stop], eps_km: f64) -> Vec<StopCluster> {
    if stops.is_empty() {
        return Vec::new();
    }

    let mut buckets: HashMap<(i64, i64), Vec<usize>> = HashMap::new();
    for (i, stop) in stops.iter().enumerate() {
        let key = (stop.time_window_start.timestamp(), stop.time_window_end.timestamp());
        buckets.entry(key).or_default().push(i);
    }

    let mut next_id: u32 = 0;
    let mut result = Vec::new();
    let mut keys: Vec<_> = buckets.keys().cloned().collect();
    keys.sort();
    for key in keys {
        let indices = &buckets[&key];
        let subset: Vec<Stop> = indices.iter().map(|&i| stops[i].clone()).collect();
        // Windows are already bucketed exactly equal here, so there's nothing
        // further for the time-window flag to check within a bucket.
        let sub_clusters = cluster_density(&subset, eps_km, 1, &ClusterFlags::default());
        for cluster in sub_clusters {
            let members = cluster.members.into_iter().map(|local| indices[local]).collect();
            result.push(StopCluster::from_members(next_id, stops, members));
            next_id += 1;
        }
    }
    result
}
