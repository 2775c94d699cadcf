//! Distance & Time Oracle (spec §4.A): haversine fallback plus cached calls
//! to an external routing service, with a regional road-winding factor and
//! a time-of-day speed profile.
//!
//! Grounded on the pluggable-provider shape in
//! `other_examples/…ride-hailing-simulation…routing.rs` (trait + fallback
//! split) and on the async-trait health-check client shape in the teacher's
//! `networking/health/checker.rs`.

mod cache;

use crate::common::LatLng;
use crate::config::RoutingServiceConfig;
use crate::error::Result;
use async_trait::async_trait;
use cache::{CacheEntry, OracleCache};
use chrono::{DateTime, Utc, Timelike};
use std::sync::Arc;

/// Hour-of-day speed class from spec §4.A.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeedClass {
    Peak,
    Normal,
    Highway,
}

/// Base speed table, km/h, keyed by speed class.
#[derive(Debug, Clone, Copy)]
pub struct SpeedTable {
    pub peak_kmh: f64,
    pub normal_kmh: f64,
    pub highway_kmh: f64,
}

impl Default for SpeedTable {
    fn default() -> Self {
        Self { peak_kmh: 18.0, normal_kmh: 30.0, highway_kmh: 60.0 }
    }
}

/// External routing backend. A real implementation calls out to HTTPS JSON
/// (spec §6 wire protocol); any error degrades to the haversine fallback.
#[async_trait]
pub trait RoutingBackend: Send + Sync {
    async fn distance_matrix_meters(&self, points: &[LatLng]) -> Result<Vec<Vec<u32>>>;
}

/// Distance & Time Oracle: deterministic given cache state (spec §4.A).
pub struct DistanceTimeOracle {
    backend: Option<Arc<dyn RoutingBackend>>,
    config: RoutingServiceConfig,
    speeds: SpeedTable,
    cache: OracleCache,
}

impl DistanceTimeOracle {
    pub fn new(backend: Option<Arc<dyn RoutingBackend>>, config: RoutingServiceConfig) -> Self {
        Self { backend, config, speeds: SpeedTable::default(), cache: OracleCache::new(config_ttl(&config)) }
    }

    fn speed_class(&self, departure: DateTime<Utc>) -> SpeedClass {
        let hour = departure.hour();
        if self.config.peak_windows.iter().any(|&(start, end)| hour >= start && hour < end) {
            SpeedClass::Peak
        } else {
            SpeedClass::Normal
        }
    }

    fn great_circle_meters(&self, a: LatLng, b: LatLng) -> u32 {
        let km = a.haversine_km(&b) * self.config.road_winding_factor;
        (km * 1000.0).round() as u32
    }

    /// NxN integer distance matrix in meters. Symmetric, zero diagonal
    /// (spec §8). Cache-keyed on rounded coordinates; write-through.
    pub async fn distance_matrix(&self, points: &[LatLng]) -> Result<Vec<Vec<u32>>> {
        let n = points.len();
        let mut matrix = vec![vec![0u32; n]; n];
        let mut uncached_pairs: Vec<(usize, usize)> = Vec::new();

        for i in 0..n {
            for j in (i + 1)..n {
                match self.cache.get(points[i], points[j]) {
                    Some(CacheEntry { meters, .. }) => {
                        matrix[i][j] = meters;
                        matrix[j][i] = meters;
                    }
                    None => uncached_pairs.push((i, j)),
                }
            }
        }

        if !uncached_pairs.is_empty() {
            let resolved = self.resolve_pairs(points, &uncached_pairs).await;
            for ((i, j), (meters, is_fallback)) in uncached_pairs.into_iter().zip(resolved) {
                matrix[i][j] = meters;
                matrix[j][i] = meters;
                self.cache.put(points[i], points[j], meters, is_fallback);
            }
        }

        Ok(matrix)
    }

    async fn resolve_pairs(&self, points: &[LatLng], pairs: &[(usize, usize)]) -> Vec<(u32, bool)> {
        if let Some(backend) = &self.backend {
            let subset: Vec<LatLng> = pairs.iter().flat_map(|&(i, j)| [points[i], points[j]]).collect();
            if let Ok(full) = backend.distance_matrix_meters(&subset).await {
                let mut out = Vec::with_capacity(pairs.len());
                for (k, _) in pairs.iter().enumerate() {
                    // subset[2k] -> subset[2k+1]
                    if let Some(row) = full.get(2 * k) {
                        if let Some(&meters) = row.get(2 * k + 1) {
                            out.push((meters, false));
                            continue;
                        }
                    }
                    out.push((self.great_circle_meters(points[pairs[k].0], points[pairs[k].1]), true));
                }
                return out;
            }
        }
        pairs.iter().map(|&(i, j)| (self.great_circle_meters(points[i], points[j]), true)).collect()
    }

    /// Integer minutes to travel from `from` to `to`, departing at
    /// `departure_time`. Peak hours multiply distance->time by the peak
    /// factor (spec §4.A).
    pub async fn estimate_travel_minutes(&self, from: LatLng, to: LatLng, departure_time: DateTime<Utc>) -> Result<u32> {
        let meters = match self.cache.get(from, to) {
            Some(entry) => entry.meters,
            None => {
                let resolved = self.resolve_pairs(&[from, to], &[(0, 1)]).await;
                let (meters, is_fallback) = resolved[0];
                self.cache.put(from, to, meters, is_fallback);
                meters
            }
        };
        let speed_kmh = match self.speed_class(departure_time) {
            SpeedClass::Peak => self.speeds.peak_kmh,
            SpeedClass::Normal => self.speeds.normal_kmh,
            SpeedClass::Highway => self.speeds.highway_kmh,
        };
        let km = meters as f64 / 1000.0;
        let hours = km / speed_kmh;
        Ok((hours * 60.0).ceil() as u32)
    }
}

fn config_ttl(config: &RoutingServiceConfig) -> std::time::Duration {
    config.cache_ttl
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn matrix_is_symmetric_and_zero_diagonal() {
        let oracle = DistanceTimeOracle::new(None, RoutingServiceConfig::default());
        let points = vec![
            LatLng::new(25.033, 121.565),
            LatLng::new(25.047, 121.517),
            LatLng::new(25.060, 121.550),
        ];
        let matrix = oracle.distance_matrix(&points).await.unwrap();
        for i in 0..3 {
            assert_eq!(matrix[i][i], 0);
            for j in 0..3 {
                assert_eq!(matrix[i][j], matrix[j][i]);
            }
        }
    }

    #[tokio::test]
    async fn repeated_calls_are_deterministic_given_cache() {
        let oracle = DistanceTimeOracle::new(None, RoutingServiceConfig::default());
        let points = vec![LatLng::new(25.033, 121.565), LatLng::new(25.047, 121.517)];
        let m1 = oracle.distance_matrix(&points).await.unwrap();
        let m2 = oracle.distance_matrix(&points).await.unwrap();
        assert_eq!(m1, m2);
    }

    #[tokio::test]
    async fn peak_hour_increases_estimated_minutes() {
        use chrono::TimeZone;
        let oracle = DistanceTimeOracle::new(None, RoutingServiceConfig::default());
        let from = LatLng::new(25.033, 121.565);
        let to = LatLng::new(25.047, 121.517);
        let peak = chrono::Utc.with_ymd_and_hms(2026, 7, 30, 8, 0, 0).unwrap();
        let off_peak = chrono::Utc.with_ymd_and_hms(2026, 7, 30, 14, 0, 0).unwrap();
        let peak_minutes = oracle.estimate_travel_minutes(from, to, peak).await.unwrap();
        let off_minutes = oracle.estimate_travel_minutes(from, to, off_peak).await.unwrap();
        assert!(peak_minutes >= off_minutes);
    }
}
