//! Geographic barriers (mountain ranges, river crossings) that multiply
//! effective distance between stops (spec §4.B), grounded on
//! `original_source/backend/app/services/optimization/clustering.py`'s
//! `_crosses_mountain`/`_crosses_river` bounding-box checks. The mechanism is
//! generic; the table of barriers is configuration, not a hardcoded fact
//! about one region (SPEC_FULL.md §B).

use crate::common::LatLng;

#[derive(Debug, Clone)]
pub enum GeoBarrier {
    MountainRange { lat_min: f64, lat_max: f64, lng_min: f64, lng_max: f64 },
    River { lat: f64, lng_min: f64, lng_max: f64 },
}

impl GeoBarrier {
    pub(crate) fn crosses(&self, a: LatLng, b: LatLng) -> bool {
        match *self {
            GeoBarrier::MountainRange { lat_min, lat_max, lng_min, lng_max } => {
                let crosses_lng = (a.lng < lng_min && b.lng > lng_max) || (b.lng < lng_min && a.lng > lng_max);
                let both_within_lat =
                    (lat_min..=lat_max).contains(&a.lat) && (lat_min..=lat_max).contains(&b.lat);
                crosses_lng && both_within_lat
            }
            GeoBarrier::River { lat, lng_min, lng_max } => {
                let straddles_lat = (a.lat.min(b.lat)..=a.lat.max(b.lat)).contains(&lat);
                let within_lng = (lng_min..=lng_max).contains(&a.lng) || (lng_min..=lng_max).contains(&b.lng);
                straddles_lat && within_lng
            }
        }
    }

    fn multiplier(&self) -> f64 {
        match self {
            GeoBarrier::MountainRange { .. } => 3.0,
            GeoBarrier::River { .. } => 1.5,
        }
    }
}

/// An illustrative barrier table; deployers supply their own region's
/// geometry via `GeoBarrier` values (SPEC_FULL.md §B).
pub fn example_barriers() -> Vec<GeoBarrier> {
    vec![
        GeoBarrier::MountainRange { lat_min: 23.8, lat_max: 24.3, lng_min: 120.9, lng_max: 121.2 },
        GeoBarrier::River { lat: 25.02, lng_min: 121.40, lng_max: 121.60 },
    ]
}

/// Multiplies `base_distance_km` by 3x for a crossed mountain range, 1.5x for
/// a crossed river; multipliers stack when a pair crosses more than one
/// barrier. Additionally applies a 10x penalty when `consider_time_windows`
/// is set and the two stops' windows don't overlap (spec §4.B).
pub fn adjusted_distance_km(
    base_distance_km: f64,
    a: LatLng,
    b: LatLng,
    barriers: &[GeoBarrier],
    windows_incompatible: bool,
) -> f64 {
    let mut multiplier = 1.0;
    for barrier in barriers {
        if barrier.crosses(a, b) {
            multiplier *= barrier.multiplier();
        }
    }
    if windows_incompatible {
        multiplier *= 10.0;
    }
    base_distance_km * multiplier
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mountain_crossing_triples_distance() {
        let barrier = GeoBarrier::MountainRange { lat_min: 23.8, lat_max: 24.3, lng_min: 120.9, lng_max: 121.2 };
        let a = LatLng::new(24.0, 120.5);
        let b = LatLng::new(24.0, 121.5);
        let adjusted = adjusted_distance_km(10.0, a, b, &[barrier], false);
        assert_eq!(adjusted, 30.0);
    }

    #[test]
    fn incompatible_windows_apply_tenx() {
        let a = LatLng::new(24.0, 120.5);
        let b = LatLng::new(24.0, 121.5);
        let adjusted = adjusted_distance_km(10.0, a, b, &[], true);
        assert_eq!(adjusted, 100.0);
    }

    #[test]
    fn no_barrier_crossed_leaves_distance_unchanged() {
        let barrier = GeoBarrier::MountainRange { lat_min: 23.8, lat_max: 24.3, lng_min: 120.9, lng_max: 121.2 };
        let a = LatLng::new(25.0, 121.5);
        let b = LatLng::new(25.1, 121.6);
        assert_eq!(adjusted_distance_km(10.0, a, b, &[barrier], false), 10.0);
    }
}
