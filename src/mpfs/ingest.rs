#![forbid(unsafe_code)]

use std::fs::{self, File};
use std::io::Read;
use std::path::Path;
use std::time::UNIX_EPOCH;
use tracing::debug;

use crate::mpfs::compress::{Compressor, GzipCompressor};
use crate::mpfs::error::{MpfsError, MpfsResult};
use crate::mpfs::format::FileRecord;
use crate::mpfs::path::TypeList;
use crate::mpfs::template::TemplateIndexer;

/// Result of ingesting one source file.
#[derive(Debug)]
pub struct Ingested {
    pub record: FileRecord,
    /// Synthetic index record; belongs right after `record`.
    pub index: Option<FileRecord>,
    /// Percentage saved by compression, when the compressed copy was kept.
    pub gzip_ratio: Option<u32>,
}

impl Ingested {
    /// Human-readable log line for this file.
    pub fn summary(&self) -> String {
        let r = &self.record;
        match (&self.index, self.gzip_ratio) {
            (Some(idx), _) => format!(
                "    {}: {} bytes, {} vars",
                r.name(),
                r.size(),
                idx.size() / 8
            ),
            (None, Some(ratio)) if ratio > 0 => {
                format!("    {}: {} bytes (gzipped by {}%)", r.name(), r.size(), ratio)
            }
            _ => format!("    {}: {} bytes", r.name(), r.size()),
        }
    }

    /// Owner first, then its index record.
    pub fn into_records(self) -> impl Iterator<Item = FileRecord> {
        std::iter::once(self.record).chain(self.index)
    }
}

/// Turns source files into image records.
#[derive(Debug, Clone)]
pub struct Ingester {
    dynamic_types: TypeList,
    no_compress_types: TypeList,
    compressor: Option<GzipCompressor>,
}

impl Ingester {
    pub fn new(dynamic_types: TypeList, no_compress_types: TypeList) -> Self {
        Self {
            dynamic_types,
            no_compress_types,
            compressor: Some(GzipCompressor::default()),
        }
    }

    /// No template indexing and no compression (classic images).
    pub fn plain() -> Self {
        Self {
            dynamic_types: TypeList::default(),
            no_compress_types: TypeList::default(),
            compressor: None,
        }
    }

    /// Reads `local` and builds the record stored under `image_name`.
    ///
    /// Either a complete record comes back or an error does; nothing is
    /// half-populated.
    pub fn ingest(
        &self,
        indexer: &mut dyn TemplateIndexer,
        local: &Path,
        image_name: &str,
    ) -> MpfsResult<Ingested> {
        if !local.exists() {
            return Err(MpfsError::MissingSourceFile(local.to_path_buf()));
        }

        let meta = fs::metadata(local)?;
        let mut raw = Vec::with_capacity(meta.len() as usize);
        {
            let mut f = File::open(local)?;
            f.read_to_end(&mut raw)?;
        }

        let mut record = FileRecord::new(image_name, raw);
        record.file_date = meta
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_secs() as u32)
            .unwrap_or(0);

        let mut index = None;
        if self.dynamic_types.matches(image_name) {
            let text = String::from_utf8_lossy(&record.data).into_owned();
            index = indexer.index(&mut record, &text);
            if index.is_some() {
                record.has_index = true;
            }
        }

        let mut gzip_ratio = None;
        if index.is_none() && !self.no_compress_types.matches(image_name) {
            if let Some(gz) = &self.compressor {
                gzip_ratio = compress_if_smaller(gz, &mut record)?;
            }
        }

        debug!(
            name = image_name,
            size = record.size(),
            zipped = record.is_zipped,
            indexed = record.has_index,
            "ingested"
        );

        Ok(Ingested {
            record,
            index,
            gzip_ratio,
        })
    }
}

/// Swaps in the compressed payload only when it is non-empty and strictly smaller.
fn compress_if_smaller(codec: &dyn Compressor, record: &mut FileRecord) -> MpfsResult<Option<u32>> {
    let original = record.data.len();
    let packed = codec.compress(&record.data)?;
    if packed.is_empty() || packed.len() >= original {
        return Ok(None);
    }
    let ratio = 100 - (100 * packed.len() / original) as u32;
    debug!(codec = codec.name(), from = original, to = packed.len(), "compressed");
    record.data = packed;
    record.is_zipped = true;
    Ok(Some(ratio))
}
