#![forbid(unsafe_code)]

//! Companion tables for images stored on external media ("MDD" mode).
//!
//! ```text
//! DynRcrd.bin, per record with dynamic variables:
//!   [u32 file_record_length][u16 flags]{[u32 offset][u32 id]}...
//! FileRcrd.bin:
//!   [u32 count]{[u16 name_hash][u32 file_record_offset][u32 dyn_var_count]}...
//!   sorted by name_hash ascending
//! ```

use std::path::{Path, PathBuf};

use crate::mpfs::error::{MpfsError, MpfsResult};
use crate::mpfs::format::FileRecord;
use crate::mpfs::io::write_atomic;

pub const DYN_RECORD_FILE: &str = "DynRcrd.bin";
pub const FILE_RECORD_FILE: &str = "FileRcrd.bin";

pub const FILE_RECORD_ENTRY_LEN: usize = 10;

pub fn dyn_records(records: &[FileRecord]) -> Vec<u8> {
    let mut out = Vec::new();
    for r in records.iter().filter(|r| !r.dyn_vars.is_empty()) {
        out.extend_from_slice(&r.file_record_length.to_le_bytes());
        out.extend_from_slice(&r.flags().to_le_bytes());
        for v in &r.dyn_vars {
            out.extend_from_slice(&v.offset.to_le_bytes());
            out.extend_from_slice(&v.id.to_le_bytes());
        }
    }
    out
}

/// Only records with dynamic variables get a row; firmware searches by hash.
pub fn file_records(records: &[FileRecord]) -> MpfsResult<Vec<u8>> {
    let mut rows: Vec<(u16, u32, u32)> = Vec::new();
    for r in records.iter().filter(|r| !r.dyn_vars.is_empty()) {
        let count = u32::try_from(r.dyn_vars.len())
            .map_err(|_| MpfsError::ImageTooLarge(format!("{}: too many variables", r.name())))?;
        rows.push((r.name_hash(), r.file_record_offset, count));
    }
    // Stable: equal hashes keep image order.
    rows.sort_by_key(|row| row.0);

    let count = u32::try_from(rows.len())
        .map_err(|_| MpfsError::ImageTooLarge(format!("{} records", rows.len())))?;
    let mut out = Vec::with_capacity(4 + rows.len() * FILE_RECORD_ENTRY_LEN);
    out.extend_from_slice(&count.to_le_bytes());
    for (hash, offset, vars) in rows {
        out.extend_from_slice(&hash.to_le_bytes());
        out.extend_from_slice(&offset.to_le_bytes());
        out.extend_from_slice(&vars.to_le_bytes());
    }
    Ok(out)
}

/// Writes both tables into `dir`; returns their paths and total size.
pub fn write_index_files(records: &[FileRecord], dir: &Path) -> MpfsResult<(Vec<PathBuf>, usize)> {
    // Render both before touching the disk.
    let dyn_bytes = dyn_records(records);
    let file_bytes = file_records(records)?;

    let dyn_path = dir.join(DYN_RECORD_FILE);
    let file_path = dir.join(FILE_RECORD_FILE);
    write_atomic(&dyn_path, &dyn_bytes)?;
    write_atomic(&file_path, &file_bytes)?;

    Ok((vec![dyn_path, file_path], dyn_bytes.len() + file_bytes.len()))
}
