//! Bank-Merge: Question Bank Persistence for examforge
//!
//! This crate owns the on-disk question bank: tolerant reading, field
//! normalization of newly accepted items, merging, and atomic writes.
//!
//! ## Layer 2 - Data Exchange
//!
//! Focus: never lose existing entries; treat unknown shapes as empty.

mod entry;
mod error;

pub use entry::{normalize, BankEntry, NormalizeOptions};
pub use error::BankError;

use std::io::Write;
use std::path::Path;

use serde_json::Value;
use tracing::{debug, info, warn};

/// Result type for bank operations
pub type BankResult<T> = std::result::Result<T, BankError>;

/// Keys under which an object-shaped bank keeps its entries.
const ENTRY_KEYS: &[&str] = &["items", "questions"];

/// Combine an existing bank with newly accepted entries.
///
/// Existing entries come first, new ones are appended in order. No
/// deduplication is performed.
pub fn merge(existing: Vec<BankEntry>, new_entries: Vec<BankEntry>) -> Vec<BankEntry> {
    let mut merged = existing;
    merged.reserve(new_entries.len());
    merged.extend(new_entries);
    merged
}

/// Extract bank entries from an already-parsed JSON document.
///
/// Accepts a bare array or an object with an `items`/`questions` array.
/// Any other shape yields an empty bank.
pub fn entries_from_value(value: Value) -> BankResult<Vec<BankEntry>> {
    let list = match value {
        Value::Array(list) => list,
        Value::Object(mut map) => {
            let key = ENTRY_KEYS.iter().find(|k| map.get(**k).is_some_and(Value::is_array));
            match key.and_then(|k| map.remove(*k)) {
                Some(Value::Array(list)) => list,
                _ => {
                    warn!("bank object has no items/questions array; treating as empty");
                    return Ok(Vec::new());
                }
            }
        }
        _ => {
            warn!("unrecognized bank shape; treating as empty");
            return Ok(Vec::new());
        }
    };

    let mut entries = Vec::with_capacity(list.len());
    for (idx, raw) in list.into_iter().enumerate() {
        match serde_json::from_value::<BankEntry>(raw) {
            Ok(entry) => entries.push(entry),
            Err(e) => warn!(index = idx, error = %e, "skipping unreadable bank entry"),
        }
    }
    Ok(entries)
}

/// Read a bank file.
///
/// A missing file is an empty bank. Invalid JSON and I/O failures are errors.
pub fn read_bank(path: &Path) -> BankResult<Vec<BankEntry>> {
    if !path.exists() {
        debug!(path = %path.display(), "bank file missing; starting empty");
        return Ok(Vec::new());
    }

    let raw = std::fs::read_to_string(path).map_err(|e| BankError::io(path, e))?;
    let value: Value = serde_json::from_str(&raw).map_err(|source| BankError::InvalidJson {
        path: path.to_path_buf(),
        source,
    })?;
    let entries = entries_from_value(value)?;
    debug!(path = %path.display(), entries = entries.len(), "bank loaded");
    Ok(entries)
}

/// Write a bank file as pretty JSON.
///
/// Parent directories are created. The content goes to a temp file in the
/// same directory which is then renamed over the target.
pub fn write_bank(path: &Path, entries: &[BankEntry]) -> BankResult<()> {
    write_json_atomic(path, entries)?;
    info!(path = %path.display(), entries = entries.len(), "bank written");
    Ok(())
}

/// Serialize any value as pretty JSON to `path` via temp file + rename.
pub fn write_json_atomic<T: serde::Serialize + ?Sized>(path: &Path, value: &T) -> BankResult<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent).map_err(|e| BankError::io(parent, e))?;

    let body = serde_json::to_string_pretty(value)?;
    let mut tmp = tempfile::NamedTempFile::new_in(parent).map_err(|e| BankError::io(parent, e))?;
    tmp.write_all(body.as_bytes())
        .map_err(|e| BankError::io(tmp.path(), e))?;
    tmp.flush().map_err(|e| BankError::io(tmp.path(), e))?;
    tmp.persist(path).map_err(|e| BankError::io(path, e.error))?;
    Ok(())
}

/// Read, merge and write in one step. Returns the merged length.
pub fn merge_into_file(path: &Path, new_entries: Vec<BankEntry>) -> BankResult<usize> {
    let existing = read_bank(path)?;
    let existing_len = existing.len();
    let added = new_entries.len();
    let merged = merge(existing, new_entries);
    write_bank(path, &merged)?;
    info!(existing = existing_len, added, total = merged.len(), "bank merged");
    Ok(merged.len())
}
