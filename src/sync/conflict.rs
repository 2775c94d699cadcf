//! Conflict detection and resolution (spec §4.E). Grounded on
//! `replication/conflicts.rs`'s strategy-enum/resolver shape, generalized
//! from byte-version comparison to the version/updated_at/content-hash
//! detection this system actually needs, and on SPEC_FULL.md §D for the
//! `auto_merged` field-level merge grammar.

use crate::domain::ConflictResolutionStrategy;
use chrono::{DateTime, Duration, Utc};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

const CONFLICT_WINDOW: Duration = Duration::minutes(5);
const IGNORED_FIELDS: [&str; 4] = ["id", "updated_at", "legacy_id", "version"];

/// Whether `local` and `remote` are in conflict (spec §4.E): compares
/// `version` when present on both sides, else falls back to `updated_at`
/// proximity plus a content hash excluding volatile fields.
pub fn detect_conflict(local: &Value, remote: &Value, local_updated_at: DateTime<Utc>, remote_updated_at: DateTime<Utc>) -> bool {
    if let (Some(lv), Some(rv)) = (local.get("version"), remote.get("version")) {
        return lv != rv;
    }
    let both_changed = (local_updated_at - remote_updated_at).abs() <= CONFLICT_WINDOW;
    if !both_changed {
        return false;
    }
    content_hash(local) != content_hash(remote)
}

fn content_hash(value: &Value) -> String {
    let filtered = strip_ignored_fields(value);
    let canonical = serde_json::to_string(&filtered).unwrap_or_default();
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    hex::encode(hasher.finalize())
}

fn strip_ignored_fields(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut out = Map::new();
            for (k, v) in map {
                if !IGNORED_FIELDS.contains(&k.as_str()) {
                    out.insert(k.clone(), strip_ignored_fields(v));
                }
            }
            Value::Object(out)
        }
        other => other.clone(),
    }
}

/// Resolves a conflict per the chosen strategy. `Manual` returns `None`,
/// meaning the operation stays in `conflict` (spec §4.E).
pub fn resolve(
    strategy: ConflictResolutionStrategy,
    local: &Value,
    remote: &Value,
    local_updated_at: DateTime<Utc>,
    remote_updated_at: DateTime<Utc>,
) -> Option<Value> {
    match strategy {
        ConflictResolutionStrategy::NewestWins => {
            Some(if local_updated_at >= remote_updated_at { local.clone() } else { remote.clone() })
        }
        ConflictResolutionStrategy::LegacyWins => Some(remote.clone()),
        ConflictResolutionStrategy::NewSystemWins => Some(local.clone()),
        ConflictResolutionStrategy::AutoMerged => Some(auto_merge(local, remote, local_updated_at, remote_updated_at)),
        ConflictResolutionStrategy::Manual => None,
    }
}

/// Field-level merge grammar (SPEC_FULL.md §D):
/// 1. Scalars: newer `updated_at` wins; non-null beats null regardless of
///    timestamp.
/// 2. Objects: recurse field-by-field.
/// 3. Arrays of objects with an `id`/`code`: additive union keyed on that
///    id, merging overlapping elements recursively.
/// 4. Arrays of scalars: set union.
pub fn auto_merge(local: &Value, remote: &Value, local_updated_at: DateTime<Utc>, remote_updated_at: DateTime<Utc>) -> Value {
    match (local, remote) {
        (Value::Object(l), Value::Object(r)) => {
            let mut out = Map::new();
            let mut keys: Vec<&String> = l.keys().chain(r.keys()).collect();
            keys.sort();
            keys.dedup();
            for key in keys {
                let lv = l.get(key);
                let rv = r.get(key);
                let merged = match (lv, rv) {
                    (Some(a), Some(b)) => merge_field(a, b, local_updated_at, remote_updated_at),
                    (Some(a), None) => a.clone(),
                    (None, Some(b)) => b.clone(),
                    (None, None) => Value::Null,
                };
                out.insert(key.clone(), merged);
            }
            Value::Object(out)
        }
        _ => merge_field(local, remote, local_updated_at, remote_updated_at),
    }
}

fn merge_field(a: &Value, b: &Value, local_updated_at: DateTime<Utc>, remote_updated_at: DateTime<Utc>) -> Value {
    match (a, b) {
        (Value::Null, other) => other.clone(),
        (other, Value::Null) => other.clone(),
        (Value::Object(_), Value::Object(_)) => auto_merge(a, b, local_updated_at, remote_updated_at),
        (Value::Array(left), Value::Array(right)) => merge_array(left, right, local_updated_at, remote_updated_at),
        _ => {
            if local_updated_at >= remote_updated_at { a.clone() } else { b.clone() }
        }
    }
}

fn element_key(v: &Value) -> Option<String> {
    v.get("id").or_else(|| v.get("code")).map(|k| k.to_string())
}

fn merge_array(left: &[Value], right: &[Value], local_updated_at: DateTime<Utc>, remote_updated_at: DateTime<Utc>) -> Value {
    let all_objects_with_key = left.iter().chain(right.iter()).all(|v| v.is_object()) && left.iter().chain(right.iter()).all(|v| element_key(v).is_some());

    if all_objects_with_key {
        let mut merged: Vec<(String, Value)> = Vec::new();
        for item in left {
            let key = element_key(item).unwrap();
            merged.push((key, item.clone()));
        }
        for item in right {
            let key = element_key(item).unwrap();
            if let Some(existing) = merged.iter_mut().find(|(k, _)| *k == key) {
                existing.1 = auto_merge(&existing.1, item, local_updated_at, remote_updated_at);
            } else {
                merged.push((key, item.clone()));
            }
        }
        Value::Array(merged.into_iter().map(|(_, v)| v).collect())
    } else {
        let mut union: Vec<Value> = left.to_vec();
        for item in right {
            if !union.contains(item) {
                union.push(item.clone());
            }
        }
        Value::Array(union)
    }
}
