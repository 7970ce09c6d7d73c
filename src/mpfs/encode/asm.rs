#![forbid(unsafe_code)]

use std::path::{Path, PathBuf};

use crate::mpfs::encode::banner::{asm_banner, timestamp_now, ASM30_PREAMBLE, EOL};
use crate::mpfs::encode::ImageSink;
use crate::mpfs::error::MpfsResult;
use crate::mpfs::io::write_atomic;
use crate::mpfs::path::artifact_path;

/// Bytes per `.pbyte` directive.
const LINE: usize = 12;

/// Program-memory pointer to the image plus the table-read helper firmware calls
/// to fetch packed bytes.
const READ_STUB: &[&str] = &[
    "END_OF_MPFS:",
    "",
    "\t.section\t.const,psv",
    "\t.global\t_MPFS_Start",
    "_MPFS_Start:",
    "\t.long\tpaddr(BEGIN_MPFS)",
    "",
    "\t.section\tMPFSHelpers,code",
    "",
    "\t.global _ReadProgramMemory",
    "_ReadProgramMemory:",
    "\tpush\t\t_TBLPAG",
    "\tmov\t\t\tw1,_TBLPAG",
    "\tmov\t\t\tw0,w5",
    "\ttblrdl\t\t[w5],w0",
    "\ttblrdh\t\t[w5],w1",
    "\tpop\t\t\t_TBLPAG",
    "\treturn",
];

/// ASM30 source holding the image as `.pbyte` data in program memory.
#[derive(Debug)]
pub struct AsmSink {
    path: PathBuf,
    out: String,
    len: usize,
}

impl AsmSink {
    pub fn open(dir: &Path, name: &str) -> Self {
        Self::with_timestamp(dir, name, &timestamp_now())
    }

    pub fn with_timestamp(dir: &Path, name: &str, timestamp: &str) -> Self {
        let path = artifact_path(dir, name, ".s");
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let mut out = asm_banner(
            &file_name,
            timestamp,
            &[
                "Defines an MPFS2 image to be stored in program memory.",
                "Defined in ASM30 assembly for optimal storage size.",
            ],
        );
        for line in ASM30_PREAMBLE {
            out.push_str(line);
            out.push_str(EOL);
        }
        out.push_str("BEGIN_MPFS:");

        Self { path, out, len: 0 }
    }

    fn finish_text(&mut self) {
        // One zero pad byte always terminates the data.
        if self.len == 0 {
            self.out.push_str(&format!("{EOL}\t.pbyte\t"));
        } else if self.len % LINE == 0 {
            self.out.push(',');
        }
        self.out.push_str("0x00");
        self.out.push_str(EOL);
        for line in READ_STUB {
            self.out.push_str(line);
            self.out.push_str(EOL);
        }
    }
}

impl ImageSink for AsmSink {
    fn write_byte(&mut self, b: u8) {
        if self.len % LINE == 0 {
            self.out.push_str(&format!("{EOL}\t.pbyte\t"));
        }
        self.out.push_str(&format!("0x{b:02x}"));
        self.len += 1;
        if self.len % LINE != 0 {
            self.out.push(',');
        }
    }

    fn len(&self) -> usize {
        self.len
    }

    fn close(mut self) -> MpfsResult<PathBuf> {
        self.finish_text();
        write_atomic(&self.path, self.out.as_bytes())?;
        Ok(self.path)
    }
}
