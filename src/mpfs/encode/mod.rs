#![forbid(unsafe_code)]

mod asm;
pub(crate) mod banner;
mod bin;
mod c_array;

pub use asm::AsmSink;
pub use bin::BinSink;
pub use c_array::CArraySink;

use std::path::PathBuf;

use crate::mpfs::error::MpfsResult;
use crate::mpfs::format::{FileRecord, MAGIC, VERSION};

/// Destination for one rendering of an image.
///
/// `write_byte` is the only primitive; the multi-byte helpers decompose into it so
/// every rendering sees exactly the same byte sequence. Sinks buffer everything and
/// touch the filesystem only in `close`.
pub trait ImageSink {
    fn write_byte(&mut self, b: u8);

    /// Bytes written so far.
    fn len(&self) -> usize;

    /// Renders any trailer and publishes the artifact; returns its path.
    fn close(self) -> MpfsResult<PathBuf>
    where
        Self: Sized;

    fn write_bytes(&mut self, data: &[u8]) {
        for &b in data {
            self.write_byte(b);
        }
    }

    fn write_u16(&mut self, v: u16) {
        self.write_bytes(&v.to_le_bytes());
    }

    fn write_u32(&mut self, v: u32) {
        self.write_bytes(&v.to_le_bytes());
    }

    fn write_str(&mut self, s: &str) {
        self.write_bytes(s.as_bytes());
    }
}

/// Emits the canonical MPFS2 byte stream for already planned `records`.
pub fn write_image<S: ImageSink>(records: &[FileRecord], sink: &mut S) {
    sink.write_bytes(&MAGIC);
    sink.write_bytes(&VERSION);
    sink.write_u16(records.len() as u16);

    for r in records {
        sink.write_u16(r.name_hash());
    }

    for r in records {
        sink.write_u32(r.loc_str);
        sink.write_u32(r.loc_data);
        sink.write_u32(r.size());
        sink.write_u32(r.file_date);
        sink.write_u32(0);
        sink.write_u16(r.flags());
    }

    for r in records {
        sink.write_str(r.name());
        sink.write_byte(0x00);
    }

    for r in records {
        sink.write_bytes(&r.data);
    }
}

/// Writes the image through `sink` and closes it; returns the artifact path and
/// the image length.
pub fn encode_image<S: ImageSink>(records: &[FileRecord], mut sink: S) -> MpfsResult<(PathBuf, usize)> {
    write_image(records, &mut sink);
    let len = sink.len();
    let path = sink.close()?;
    Ok((path, len))
}
