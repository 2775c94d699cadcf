//! Geographic Clusterer (spec §4.B): groups stops into subproblems for the
//! VRP solver, honoring barriers, time-window compatibility, and per-cluster
//! size caps. Grounded on
//! `original_source/backend/app/services/optimization/clustering.py`
//! (DBSCAN-over-haversine shape, `eps_km` density formula, barrier tables)
//! and on the teacher's `clustering/coordinator.rs` for how a coordinator
//! module organizes several sub-algorithms behind one surface.

pub mod barrier;
mod constrained;
mod count;
mod density;
mod time_window;

pub use barrier::{example_barriers, GeoBarrier};

/// Bundles the distance-adjustment inputs density clustering consults before
/// grouping stops (spec §4.B): crossed barriers widen effective distance,
/// and so does an incompatible time-window pairing when `consider_time_windows`
/// is set.
#[derive(Debug, Clone, Default)]
pub struct ClusterFlags {
    pub barriers: Vec<GeoBarrier>,
    pub consider_time_windows: bool,
}
pub use constrained::cluster_constrained;
pub use count::cluster_count;
pub use density::cluster_density;
pub use time_window::cluster_time_window;

use crate::common::{LatLng, ProductId};
use crate::domain::Stop;
use std::collections::HashMap;

/// A group of stops treated as one VRP subproblem.
#[derive(Debug, Clone)]
pub struct StopCluster {
    pub id: u32,
    /// Indices into the input `stops` slice.
    pub members: Vec<usize>,
    pub center: LatLng,
    pub radius_km: f64,
    pub density: f64,
    pub demand: HashMap<ProductId, u32>,
}

impl StopCluster {
    pub fn from_members(id: u32, stops: &[Stop], members: Vec<usize>) -> Self {
        let n = members.len().max(1) as f64;
        let center = LatLng::new(
            members.iter().map(|&i| stops[i].location.lat).sum::<f64>() / n,
            members.iter().map(|&i| stops[i].location.lng).sum::<f64>() / n,
        );
        let radius_km = members
            .iter()
            .map(|&i| stops[i].location.haversine_km(&center))
            .fold(0.0_f64, f64::max);
        let area = std::f64::consts::PI * radius_km * radius_km;
        let density = if area > 0.0 { members.len() as f64 / area } else { members.len() as f64 };
        let mut demand: HashMap<ProductId, u32> = HashMap::new();
        for &i in &members {
            for (product, qty) in &stops[i].demand {
                *demand.entry(*product).or_insert(0) += qty;
            }
        }
        Self { id, members, center, radius_km, density, demand }
    }
}

/// `sqrt(n / (target_density * pi))`, clamped to `[0.5, 5]` km (spec §4.B).
pub fn eps_from_density(n: usize, target_density: f64) -> f64 {
    let raw = ((n as f64) / (target_density * std::f64::consts::PI)).sqrt();
    raw.clamp(0.5, 5.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eps_from_density_is_clamped() {
        assert!(eps_from_density(1, 1000.0) >= 0.5);
        assert!(eps_from_density(100_000, 0.001) <= 5.0);
    }
}
