use crate::common::{DriverId, OrderId, RouteId};
use crate::error::{CoreError, Result};
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteStatus {
    Planned,
    Optimized,
    InProgress,
    Completed,
    Cancelled,
}

#[derive(Debug, Clone)]
pub struct RouteStop {
    pub route_id: RouteId,
    pub order_id: OrderId,
    /// 1-indexed position within the route.
    pub sequence: u32,
    pub estimated_arrival: DateTime<Utc>,
    pub service_duration_minutes: u32,
    pub distance_from_previous_km: f64,
}

/// A vehicle's ordered execution of stops on a date. A Route exclusively
/// owns its `RouteStop`s (spec §3).
#[derive(Debug, Clone)]
pub struct Route {
    pub id: RouteId,
    pub route_number: String,
    pub date: NaiveDate,
    pub driver_id: DriverId,
    pub status: RouteStatus,
    pub total_distance_km: f64,
    pub estimated_duration_minutes: u32,
    pub polyline: Option<String>,
    pub optimization_score: f64,
    stops: Vec<RouteStop>,
}

impl Route {
    pub fn new(id: RouteId, route_number: String, date: NaiveDate, driver_id: DriverId) -> Self {
        Self {
            id,
            route_number,
            date,
            driver_id,
            status: RouteStatus::Planned,
            total_distance_km: 0.0,
            estimated_duration_minutes: 0,
            polyline: None,
            optimization_score: 0.0,
            stops: Vec::new(),
        }
    }

    pub fn stops(&self) -> &[RouteStop] {
        &self.stops
    }

    /// Replaces the stop sequence wholesale, re-numbering 1..N and verifying
    /// the invariant from spec §3: sequences form a contiguous permutation,
    /// and cumulative time never exceeds `max_shift_minutes`.
    pub fn set_stops(&mut self, mut stops: Vec<RouteStop>, max_shift_minutes: u32) -> Result<()> {
        for (i, stop) in stops.iter_mut().enumerate() {
            stop.route_id = self.id;
            stop.sequence = (i + 1) as u32;
        }
        let cumulative_minutes: u32 = stops.iter().map(|s| s.service_duration_minutes).sum();
        if cumulative_minutes > max_shift_minutes {
            return Err(CoreError::validation(format!(
                "route {} cumulative time {}min exceeds shift {}min",
                self.id, cumulative_minutes, max_shift_minutes
            )));
        }
        self.stops = stops;
        Ok(())
    }

    pub fn sequence_is_contiguous_permutation(&self) -> bool {
        let expected: HashSet<u32> = (1..=self.stops.len() as u32).collect();
        let actual: HashSet<u32> = self.stops.iter().map(|s| s.sequence).collect();
        expected == actual
    }

    /// Only the Dispatch Orchestrator may move a route from `optimized` to
    /// `in_progress`; only stop updates push it toward `completed` (spec §5).
    pub fn begin_execution(&mut self) -> Result<()> {
        if self.status != RouteStatus::Optimized {
            return Err(CoreError::validation(format!(
                "route {} cannot begin execution from status {:?}",
                self.id, self.status
            )));
        }
        self.status = RouteStatus::InProgress;
        Ok(())
    }

    pub fn complete(&mut self) -> Result<()> {
        if self.status != RouteStatus::InProgress {
            return Err(CoreError::validation(format!(
                "route {} cannot complete from status {:?}",
                self.id, self.status
            )));
        }
        self.status = RouteStatus::Completed;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rs(route_id: RouteId, seq: u32) -> RouteStop {
        RouteStop {
            route_id,
            order_id: OrderId::new(),
            sequence: seq,
            estimated_arrival: Utc::now(),
            service_duration_minutes: 10,
            distance_from_previous_km: 1.0,
        }
    }

    #[test]
    fn set_stops_renumbers_contiguously() {
        let id = RouteId::new();
        let mut r = Route::new(id, "R-1".into(), Utc::now().date_naive(), DriverId::new());
        let stops = vec![rs(id, 5), rs(id, 9), rs(id, 1)];
        r.set_stops(stops, 480).unwrap();
        assert!(r.sequence_is_contiguous_permutation());
        assert_eq!(r.stops()[0].sequence, 1);
        assert_eq!(r.stops()[2].sequence, 3);
    }

    #[test]
    fn set_stops_rejects_shift_overrun() {
        let id = RouteId::new();
        let mut r = Route::new(id, "R-1".into(), Utc::now().date_naive(), DriverId::new());
        let stops = vec![rs(id, 1), rs(id, 2)];
        assert!(r.set_stops(stops, 5).is_err());
    }

    #[test]
    fn status_transition_guard() {
        let id = RouteId::new();
        let mut r = Route::new(id, "R-1".into(), Utc::now().date_naive(), DriverId::new());
        assert!(r.begin_execution().is_err());
        r.status = RouteStatus::Optimized;
        assert!(r.begin_execution().is_ok());
        assert_eq!(r.status, RouteStatus::InProgress);
    }
}
