#![forbid(unsafe_code)]

use std::fmt;
use std::str::FromStr;

use crate::mpfs::error::MpfsError;

/// MPFS2 image magic.
pub const MAGIC: [u8; 4] = *b"MPFS";

/// Format version written after the magic (major, minor).
pub const VERSION: [u8; 2] = [0x02, 0x01];

/// Magic + version + u16 file count.
pub const HEADER_LEN: u32 = 8;

/// One u16 name hash per file.
pub const HASH_ENTRY_LEN: u32 = 2;

/// FAT entry: name offset, data offset, size, date, reserved (u32 each) + u16 flags.
pub const FAT_ENTRY_LEN: u32 = 22;

/// Payload was gzip-compressed at build time.
pub const FLAG_ISZIPPED: u16 = 0x0001;

/// File is followed by a synthetic dynamic-variable index record.
pub const FLAG_HASINDEX: u16 = 0x0002;

/// Hash stored for an empty name.
pub const EMPTY_NAME_HASH: u16 = 0xFFFF;

/// Rolling 16-bit hash over the name bytes: `hash = (hash + byte) << 1`.
pub fn name_hash(name: &str) -> u16 {
    if name.is_empty() {
        return EMPTY_NAME_HASH;
    }
    name.bytes()
        .fold(0u16, |hash, b| hash.wrapping_add(u16::from(b)) << 1)
}

/// One dynamic variable occurrence inside a template file, as reported by the indexer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DynVar {
    pub offset: u32,
    pub id: u32,
}

#[derive(Debug, Clone, Default)]
pub struct FileRecord {
    name: String,
    name_hash: u16,
    pub file_date: u32,
    pub data: Vec<u8>,
    pub loc_str: u32,
    pub loc_data: u32,
    pub has_index: bool,
    pub is_index: bool,
    pub is_zipped: bool,
    pub dyn_vars: Vec<DynVar>,
    pub file_record_offset: u32,
    pub file_record_length: u32,
}

impl FileRecord {
    pub fn new(name: impl Into<String>, data: Vec<u8>) -> Self {
        let name = name.into();
        let name_hash = name_hash(&name);
        Self {
            name,
            name_hash,
            data,
            ..Self::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn name_hash(&self) -> u16 {
        self.name_hash
    }

    /// Payload length as stored in the image (after compression, if any).
    pub fn size(&self) -> u32 {
        self.data.len() as u32
    }

    pub fn flags(&self) -> u16 {
        let mut flags = 0;
        if self.has_index {
            flags |= FLAG_HASINDEX;
        }
        if self.is_zipped {
            flags |= FLAG_ISZIPPED;
        }
        flags
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Bin,
    CArray,
    Assembly,
    Mdd,
    ClassicBin,
    ClassicC,
    ClassicAsm,
}

impl OutputFormat {
    pub const ALL: [OutputFormat; 7] = [
        OutputFormat::Bin,
        OutputFormat::CArray,
        OutputFormat::Assembly,
        OutputFormat::Mdd,
        OutputFormat::ClassicBin,
        OutputFormat::ClassicC,
        OutputFormat::ClassicAsm,
    ];

    pub fn is_classic(self) -> bool {
        matches!(
            self,
            OutputFormat::ClassicBin | OutputFormat::ClassicC | OutputFormat::ClassicAsm
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OutputFormat::Bin => "bin",
            OutputFormat::CArray => "c",
            OutputFormat::Assembly => "asm",
            OutputFormat::Mdd => "mdd",
            OutputFormat::ClassicBin => "classic-bin",
            OutputFormat::ClassicC => "classic-c",
            OutputFormat::ClassicAsm => "classic-asm",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = MpfsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bin" => Ok(OutputFormat::Bin),
            "c" | "c18" | "c32" => Ok(OutputFormat::CArray),
            "asm" | "asm30" | "s" => Ok(OutputFormat::Assembly),
            "mdd" => Ok(OutputFormat::Mdd),
            "classic-bin" => Ok(OutputFormat::ClassicBin),
            "classic-c" => Ok(OutputFormat::ClassicC),
            "classic-asm" => Ok(OutputFormat::ClassicAsm),
            _ => Err(MpfsError::UnsupportedFormat(s.to_string())),
        }
    }
}
