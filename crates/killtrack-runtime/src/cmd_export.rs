//! `killtrack export`: write the plain-text listing of all records.

use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{DateTime, Utc};
use killtrack_core::export::{export_file_name, export_text};
use killtrack_core::{AggregateStore, JsonFileStore, KillRecord};

use crate::cli::ExportOpts;

pub fn cmd_export(store_path: &Path, opts: &ExportOpts) -> anyhow::Result<()> {
    let store = AggregateStore::new(JsonFileStore::new(store_path));
    let records = store.records();
    let now = Utc::now();

    if opts.stdout {
        print!("{}", export_text(&records, now));
        return Ok(());
    }

    let out = opts
        .out
        .clone()
        .unwrap_or_else(|| PathBuf::from(export_file_name(now)));
    let written = write_export(&records, &out, now)?;
    tracing::info!(records = records.len(), "export written");
    println!("exported {} records to {}", records.len(), written.display());
    Ok(())
}

/// Write the listing to `out`, creating parent directories.
pub fn write_export(
    records: &[KillRecord],
    out: &Path,
    now: DateTime<Utc>,
) -> anyhow::Result<PathBuf> {
    if let Some(parent) = out.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("cannot create {}", parent.display()))?;
    }
    std::fs::write(out, export_text(records, now))
        .with_context(|| format!("cannot write export to {}", out.display()))?;
    Ok(out.to_path_buf())
}
