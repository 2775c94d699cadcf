//! CylinderOps bulk import CLI (spec §6): streams a legacy workbook through
//! the import pipeline, batching, checkpointing, and reporting on exit.

use clap::Parser;
use cylinderops_core::import::{self, FieldMapping, FkMaps};
use std::collections::HashMap;
use std::fs::File;
use std::process::ExitCode;
use tracing::{error, info};

/// Bulk-imports legacy customer/order records into CylinderOps.
#[derive(Parser)]
#[command(name = "cylinderops-import", version = env!("CARGO_PKG_VERSION"))]
struct Args {
    /// Path to the legacy workbook, exported as CSV.
    #[arg(long)]
    file: String,

    /// Row batch size for checkpointing.
    #[arg(long, default_value_t = import::BATCH_SIZE)]
    batch_size: usize,

    /// Run transforms and validation without writing or checkpointing progress.
    #[arg(long)]
    dry_run: bool,

    /// Acknowledge that this run will write to production data.
    #[arg(long)]
    production: bool,
}

/// Default field mapping for the customer table until a schema-driven
/// mapping loader exists; resolved against the `depots` code->id map.
fn default_mapping() -> (FieldMapping, FkMaps) {
    let mut column_map = HashMap::new();
    column_map.insert("customer_name".to_string(), "name".to_string());
    column_map.insert("depot_code".to_string(), "depot_id".to_string());
    column_map.insert("signup_date".to_string(), "signup_date".to_string());

    let mut fk_fields = HashMap::new();
    fk_fields.insert("depot_id".to_string(), "depots".to_string());

    let mapping = FieldMapping {
        column_map,
        fk_fields,
        date_fields: vec!["signup_date".to_string()],
        cylinder_size_columns: vec!["qty_50kg".to_string(), "qty_20kg".to_string(), "qty_16kg".to_string(), "qty_10kg".to_string(), "qty_4kg".to_string()],
    };
    (mapping, FkMaps::default())
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt().with_target(false).with_level(true).init();
    let args = Args::parse();

    if args.batch_size != import::BATCH_SIZE {
        info!(requested = args.batch_size, effective = import::BATCH_SIZE, "batch size is fixed at compile time; ignoring override");
    }

    if !args.dry_run && !args.production {
        error!("refusing to write without --production (pass --dry-run to validate only)");
        return ExitCode::FAILURE;
    }

    let file = match File::open(&args.file) {
        Ok(f) => f,
        Err(e) => {
            error!(file = %args.file, error = %e, "failed to open import file");
            return ExitCode::FAILURE;
        }
    };

    let (mapping, fk_maps) = default_mapping();
    match import::run(file, &args.file, &mapping, &fk_maps, args.dry_run).await {
        Ok((report, rows)) => {
            info!(
                successes = report.successes,
                failures = report.failures,
                skips = report.skips,
                processing_rate = report.processing_rate(),
                rows_mapped = rows.len(),
                "import finished"
            );
            if !report.missing_referent_codes.is_empty() {
                info!(codes = ?report.missing_referent_codes, "rows skipped for missing referents");
            }
            if report.failures > 0 {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            }
        }
        Err(e) => {
            error!(error = %e, "import pipeline failed; a checkpoint has been left for resume if one was in progress");
            ExitCode::FAILURE
        }
    }
}
