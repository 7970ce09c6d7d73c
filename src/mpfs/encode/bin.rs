#![forbid(unsafe_code)]

use std::path::{Path, PathBuf};

use crate::mpfs::encode::ImageSink;
use crate::mpfs::error::MpfsResult;
use crate::mpfs::io::write_atomic;
use crate::mpfs::path::artifact_path;

/// Raw binary image, e.g. for upload into external flash.
#[derive(Debug)]
pub struct BinSink {
    path: PathBuf,
    buf: Vec<u8>,
}

impl BinSink {
    pub fn open(dir: &Path, name: &str) -> Self {
        Self {
            path: artifact_path(dir, name, ".bin"),
            buf: Vec::new(),
        }
    }
}

impl ImageSink for BinSink {
    fn write_byte(&mut self, b: u8) {
        self.buf.push(b);
    }

    fn len(&self) -> usize {
        self.buf.len()
    }

    fn close(self) -> MpfsResult<PathBuf> {
        write_atomic(&self.path, &self.buf)?;
        Ok(self.path)
    }
}
