//! The single authoritative VRP cost expression (SPEC_FULL.md §C), used by
//! every insertion and local-search decision so different solver stages
//! never disagree about what "cheaper" means. Grounded on
//! `original_source/backend/app/services/optimization/vrp_optimizer.py` and
//! `enhanced_vrp_solver.py` for the weighted three-term cost shape.

use crate::config::BusinessConfig;

const W_DISTANCE: f64 = 0.4;
const W_TIME: f64 = 0.4;
const W_PRIORITY: f64 = 0.2;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CostBreakdown {
    pub distance_term: f64,
    pub time_term: f64,
    pub priority_term: f64,
    pub total: f64,
}

/// `cost = 0.4*distance_km*fuel_cost_per_km + 0.4*duration_min*(driver_cost_per_hour/60)
///         + 0.2*unserved_priority_penalty`, with the first two terms scaled
/// by `weekend_surcharge` when `is_weekend` (SPEC_FULL.md §B/§C).
pub fn route_cost(
    distance_km: f64,
    duration_minutes: f64,
    unserved_priority_penalty: f64,
    business: &BusinessConfig,
    is_weekend: bool,
) -> CostBreakdown {
    let surcharge = if is_weekend { business.weekend_surcharge } else { 1.0 };
    let distance_term = W_DISTANCE * distance_km * business.fuel_cost_per_km * surcharge;
    let time_term = W_TIME * duration_minutes * (business.driver_cost_per_hour / 60.0) * surcharge;
    let priority_term = W_PRIORITY * unserved_priority_penalty;
    CostBreakdown { distance_term, time_term, priority_term, total: distance_term + time_term + priority_term }
}

/// Sum of priorities of stops the solver could not place on any route.
pub fn unserved_priority_penalty(unserved_priorities: &[u8]) -> f64 {
    unserved_priorities.iter().map(|&p| p as f64).sum()
}

/// `1.0 - cost/naive_baseline_cost`, clamped to `[0, 1]` (SPEC_FULL.md §C).
/// The naive baseline is the cost of visiting stops in their original,
/// unoptimized order.
pub fn optimization_score(actual_cost: f64, naive_baseline_cost: f64) -> f64 {
    if naive_baseline_cost <= 0.0 {
        return 1.0;
    }
    (1.0 - actual_cost / naive_baseline_cost).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weekend_surcharge_scales_distance_and_time_terms_only() {
        let business = BusinessConfig::default();
        let weekday = route_cost(10.0, 30.0, 0.0, &business, false);
        let weekend = route_cost(10.0, 30.0, 0.0, &business, true);
        assert_eq!(weekend.distance_term, weekday.distance_term * business.weekend_surcharge);
        assert_eq!(weekend.time_term, weekday.time_term * business.weekend_surcharge);
    }

    #[test]
    fn priority_term_is_unaffected_by_weekend_surcharge() {
        let business = BusinessConfig::default();
        let weekday = route_cost(0.0, 0.0, 5.0, &business, false);
        let weekend = route_cost(0.0, 0.0, 5.0, &business, true);
        assert_eq!(weekday.priority_term, weekend.priority_term);
    }

    #[test]
    fn optimization_score_is_clamped() {
        assert_eq!(optimization_score(100.0, 0.0), 1.0);
        assert_eq!(optimization_score(0.0, 100.0), 1.0);
        assert_eq!(optimization_score(200.0, 100.0), 0.0);
    }
}
