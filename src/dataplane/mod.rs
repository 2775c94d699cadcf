//! HA data plane: database router (spec §4.F) and cache client (spec §4.G).

pub mod cache;
pub mod db;
