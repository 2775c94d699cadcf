//! Count-based clustering (spec §4.B: "group into exactly k groups"),
//! grounded on `original_source/backend/app/services/optimization/clustering.py`'s
//! `cluster_by_count` (k-means over lat/lng with a fixed iteration cap).

use super::StopCluster;
use crate::common::LatLng;
use crate::domain::Stop;

const MAX_ITERATIONS: usize = 50;

/// Lloyd's-algorithm k-means over the stops' coordinates. `k` is clamped to
/// `[1, stops.len()]` since a cluster count above the stop count is
/// meaningless (spec §4.B: "bounded above by |stops|").
pub fn cluster_count(stops: &[Stop], k: usize) -> Vec<StopCluster> {
    let n = stops.len();
    if n == 0 {
        return Vec::new();
    }
    let k = k.clamp(1, n);

    let mut centroids: Vec<LatLng> = (0..k).map(|i| stops[i * n / k].location).collect();
    let mut assignment = vec![0usize; n];

    for _ in 0..MAX_ITERATIONS {
        let mut changed = false;
        for (i, stop) in stops.iter().enumerate() {
            let (best, _) = centroids
                .iter()
                .enumerate()
                .map(|(c, centroid)| (c, stop.location.haversine_km(centroid)))
                .fold((0usize, f64::MAX), |acc, cur| if cur.1 < acc.1 { cur } else { acc });
            if assignment[i] != best {
                assignment[i] = best;
                changed = true;
            }
        }

        for c in 0..k {
            let members: Vec<usize> = (0..n).filter(|&i| assignment[i] == c).collect();
            if members.is_empty() {
                continue;
            }
            let count = members.len() as f64;
            let lat = members.iter().map(|&i| stops[i].location.lat).sum::<f64>() / count;
            let lng = members.iter().map(|&i| stops[i].location.lng).sum::<f64>() / count;
            centroids[c] = LatLng::new(lat, lng);
        }

        if !changed {
            break;
        }
    }

    (0..k)
        .filter_map(|c| {
            let members: Vec<usize> = (0..n).filter(|&i| assignment[i] == c).collect();
            if members.is_empty() {
                None
            } else {
                Some(StopCluster::from_members(c as u32, stops, members))
            }
        })
        .collect()
}
