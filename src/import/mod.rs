//! Bulk legacy migration pipeline (spec §4.I): streaming CSV ingest with
//! legacy encoding/date conversion, foreign-key resolution, checkpointing,
//! and rollback support.

pub mod checkpoint;
pub mod dates;
pub mod encoding;
pub mod pipeline;
pub mod report;
pub mod rollback;

pub use encoding::EncodingConverter;
pub use pipeline::{run, FieldMapping, FkMaps, BATCH_SIZE};
pub use report::ImportReport;
pub use rollback::{capture, compute_checksum, rollback as roll_back, verify, ImportTarget, RestorePoint};
