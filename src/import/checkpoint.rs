//! Checkpoint sidecar (spec §4.I): progress is persisted as JSON after each
//! batch so an interrupted import can resume from `last_processed_row`
//! instead of restarting. Grounded on `original_source/backend/migrations/
//! data_migration/rollback_manager 2.py`'s checkpoint-file shape.

use crate::domain::ImportCheckpoint;
use crate::error::Result;
use std::path::{Path, PathBuf};

/// Sidecar path for a given source file: `<source_file>.checkpoint.json`.
pub fn sidecar_path(source_file: &str) -> PathBuf {
    PathBuf::from(format!("{source_file}.checkpoint.json"))
}

/// Loads an existing checkpoint for `source_file`, if one exists on disk.
pub fn load(source_file: &str) -> Result<Option<ImportCheckpoint>> {
    let path = sidecar_path(source_file);
    if !path.exists() {
        return Ok(None);
    }
    let raw = std::fs::read_to_string(&path)?;
    Ok(Some(serde_json::from_str(&raw)?))
}

/// Writes (or overwrites) the checkpoint sidecar after a batch completes.
pub fn save(checkpoint: &ImportCheckpoint) -> Result<()> {
    let path = sidecar_path(&checkpoint.source_file);
    let raw = serde_json::to_string_pretty(checkpoint)?;
    std::fs::write(&path, raw)?;
    Ok(())
}

/// Deletes the sidecar on clean completion (spec §4.I).
pub fn clear(source_file: &str) -> Result<()> {
    let path = sidecar_path(source_file);
    if path.exists() {
        std::fs::remove_file(path)?;
    }
    Ok(())
}

pub fn exists(source_file: &str) -> bool {
    Path::new(&sidecar_path(source_file)).exists()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn round_trips_through_disk() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("rows.csv");
        let source_str = source.to_str().unwrap().to_string();

        let mut checkpoint = ImportCheckpoint::new(source_str.clone());
        checkpoint.last_processed_row = 5000;
        checkpoint.batches_completed = 1;
        save(&checkpoint).unwrap();

        assert!(exists(&source_str));
        let loaded = load(&source_str).unwrap().unwrap();
        assert_eq!(loaded.last_processed_row, 5000);
    }

    #[test]
    fn clear_removes_the_sidecar() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("rows.csv");
        let source_str = source.to_str().unwrap().to_string();

        save(&ImportCheckpoint::new(source_str.clone())).unwrap();
        assert!(exists(&source_str));
        clear(&source_str).unwrap();
        assert!(!exists(&source_str));
    }

    #[test]
    fn missing_checkpoint_loads_as_none() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("never-imported.csv");
        assert!(load(source.to_str().unwrap()).unwrap().is_none());
    }
}
