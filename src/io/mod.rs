//! File adapters for the JSON and workbook representations.

pub mod excel_read;
pub mod excel_write;
pub mod json;

use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;

use crate::error::{Result, ToolError};

/// Writes `bytes` to a temporary file next to `path` and renames it into
/// place, so a failed conversion never leaves a truncated output behind.
pub fn write_atomically(path: &Path, bytes: &[u8]) -> Result<()> {
    let directory = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut staged = NamedTempFile::new_in(directory)?;
    staged.write_all(bytes)?;
    staged.flush()?;
    staged
        .persist(path)
        .map_err(|err| ToolError::Io(err.error))?;
    Ok(())
}
