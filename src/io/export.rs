//! Persist finalized tables to CSV.
//!
//! Rows are written in the order given, dates as `YYYY-MM-DD`, floats in
//! shortest round-trip form. The table is written to a sibling temp file and
//! renamed over the destination, so a failed write leaves the old file intact.

use std::fs;
use std::path::{Path, PathBuf};

use log::info;
use serde::Serialize;

use crate::error::PipelineError;

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Serialize every row of `rows` to `path`, replacing it atomically.
pub fn write_table<T: Serialize>(path: &Path, rows: &[T]) -> Result<(), PipelineError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| PipelineError::io(parent, e))?;
    }
    let tmp = temp_path(path);

    let written = (|| {
        let mut writer = csv::Writer::from_path(&tmp).map_err(|e| PipelineError::csv(&tmp, e))?;
        for row in rows {
            writer.serialize(row).map_err(|e| PipelineError::csv(&tmp, e))?;
        }
        writer.flush().map_err(|e| PipelineError::io(&tmp, e))
    })();

    if let Err(e) = written {
        let _ = fs::remove_file(&tmp);
        return Err(e);
    }
    fs::rename(&tmp, path).map_err(|e| PipelineError::io(path, e))?;
    info!("wrote {} rows to '{}'", rows.len(), path.display());
    Ok(())
}
