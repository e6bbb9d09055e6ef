//! Atomic document replacement

use crate::StoreError;
use serde::Serialize;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

/// Write a JSON document atomically: temp file in the same directory,
/// fsync, rename over the target. Readers observe either the old or the
/// new document, never a partial write.
pub(crate) fn write_json<T: Serialize>(path: &Path, data: &T) -> Result<(), StoreError> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent)?;

    let tmp = path.with_extension("json.tmp");
    {
        let mut file = File::create(&tmp)?;
        let json = serde_json::to_string_pretty(data)?;
        file.write_all(json.as_bytes())?;
        file.sync_all()?;
    }
    fs::rename(&tmp, path)?;
    Ok(())
}
