//! Write-through cache for the distance/time oracle. Keys are rounded
//! coordinates so nearby repeat lookups hit; fallback entries never expire
//! (spec §4.A: "permanent for great-circle fallback") while routing-service
//! results carry the configured TTL. The fallback bit is internal bookkeeping
//! only — it is never surfaced as part of a result (spec §4.A: "Cache MUST
//! NOT leak the fallback classification into results").

use crate::common::LatLng;
use dashmap::DashMap;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy)]
pub struct CacheEntry {
    pub meters: u32,
    pub is_fallback: bool,
}

struct Entry {
    meters: u32,
    is_fallback: bool,
    inserted_at: Instant,
}

pub struct OracleCache {
    ttl: Duration,
    entries: DashMap<(i64, i64, i64, i64), Entry>,
}

fn round_key(p: LatLng) -> (i64, i64) {
    // Round to ~1m precision (5 decimal places).
    ((p.lat * 100_000.0).round() as i64, (p.lng * 100_000.0).round() as i64)
}

impl OracleCache {
    pub fn new(ttl: Duration) -> Self {
        Self { ttl, entries: DashMap::new() }
    }

    fn key(a: LatLng, b: LatLng) -> (i64, i64, i64, i64) {
        let (a_lat, a_lng) = round_key(a);
        let (b_lat, b_lng) = round_key(b);
        if (a_lat, a_lng) <= (b_lat, b_lng) {
            (a_lat, a_lng, b_lat, b_lng)
        } else {
            (b_lat, b_lng, a_lat, a_lng)
        }
    }

    pub fn get(&self, a: LatLng, b: LatLng) -> Option<CacheEntry> {
        if a.lat == b.lat && a.lng == b.lng {
            return Some(CacheEntry { meters: 0, is_fallback: true });
        }
        let key = Self::key(a, b);
        let entry = self.entries.get(&key)?;
        if !entry.is_fallback && entry.inserted_at.elapsed() > self.ttl {
            return None;
        }
        Some(CacheEntry { meters: entry.meters, is_fallback: entry.is_fallback })
    }

    pub fn put(&self, a: LatLng, b: LatLng, meters: u32, is_fallback: bool) {
        let key = Self::key(a, b);
        self.entries.insert(key, Entry { meters, is_fallback, inserted_at: Instant::now() });
    }
}
