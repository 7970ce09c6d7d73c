#![forbid(unsafe_code)]

use crate::mpfs::error::MpfsResult;
use crate::mpfs::format::FileRecord;

/// Locates runtime-substituted variables inside template assets.
///
/// The placeholder grammar lives with the implementor. The generator only relies
/// on this contract:
/// - `index` may record variables on `owner` (`dyn_vars`, `file_record_offset`,
///   `file_record_length`) and may return a synthetic index record, which is
///   stored right after `owner` in the image;
/// - `flush_changed_indices` runs once per generation, after ingestion and before
///   any artifact is encoded, and reports whether persisted indices changed.
pub trait TemplateIndexer {
    fn index(&mut self, owner: &mut FileRecord, text: &str) -> Option<FileRecord>;

    fn flush_changed_indices(&mut self) -> MpfsResult<bool>;
}

/// Indexer for images without dynamic content.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoTemplates;

impl TemplateIndexer for NoTemplates {
    fn index(&mut self, _owner: &mut FileRecord, _text: &str) -> Option<FileRecord> {
        None
    }

    fn flush_changed_indices(&mut self) -> MpfsResult<bool> {
        Ok(false)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::mpfs::format::DynVar;

    /// Treats every `~name~` pair as one variable with a sequential id and emits an
    /// index record holding the raw 8-byte `{offset, id}` entries.
    #[derive(Debug, Default)]
    pub struct TildeIndexer {
        pub flushes: usize,
        next_offset: u32,
    }

    impl TemplateIndexer for TildeIndexer {
        fn index(&mut self, owner: &mut FileRecord, text: &str) -> Option<FileRecord> {
            let mut vars = Vec::new();
            let mut open: Option<usize> = None;
            for (i, b) in text.bytes().enumerate() {
                if b != b'~' {
                    continue;
                }
                match open.take() {
                    None => open = Some(i),
                    Some(start) => vars.push(DynVar {
                        offset: start as u32,
                        id: vars.len() as u32,
                    }),
                }
            }
            if vars.is_empty() {
                return None;
            }

            let mut idx = Vec::with_capacity(vars.len() * 8);
            for v in &vars {
                idx.extend_from_slice(&v.offset.to_le_bytes());
                idx.extend_from_slice(&v.id.to_le_bytes());
            }

            owner.file_record_offset = self.next_offset;
            owner.file_record_length = 4 + 2 + 8 * vars.len() as u32;
            self.next_offset += owner.file_record_length;
            owner.dyn_vars = vars;

            let mut record = FileRecord::new(format!("{}.idx", owner.name()), idx);
            record.file_date = owner.file_date;
            record.is_index = true;
            Some(record)
        }

        fn flush_changed_indices(&mut self) -> MpfsResult<bool> {
            self.flushes += 1;
            Ok(self.flushes == 1)
        }
    }
}
