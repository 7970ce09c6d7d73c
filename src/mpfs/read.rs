#![forbid(unsafe_code)]

use std::io::Cursor;

use crate::mpfs::error::{MpfsError, MpfsResult};
use crate::mpfs::format::{
    name_hash, FAT_ENTRY_LEN, FLAG_HASINDEX, FLAG_ISZIPPED, HASH_ENTRY_LEN, HEADER_LEN, MAGIC,
    VERSION,
};
use crate::mpfs::io::{read_exact, read_u16, read_u32};

/// One FAT entry of a canonical image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub name: String,
    pub name_hash: u16,
    pub loc_str: u32,
    pub loc_data: u32,
    pub size: u32,
    pub file_date: u32,
    pub flags: u16,
}

impl Entry {
    pub fn is_zipped(&self) -> bool {
        self.flags & FLAG_ISZIPPED != 0
    }

    pub fn has_index(&self) -> bool {
        self.flags & FLAG_HASINDEX != 0
    }

    /// Stored payload bytes within `image`.
    pub fn payload<'a>(&self, image: &'a [u8]) -> &'a [u8] {
        let start = self.loc_data as usize;
        &image[start..start + self.size as usize]
    }
}

fn nul_terminated(image: &[u8], at: u32) -> MpfsResult<String> {
    let tail = image
        .get(at as usize..)
        .ok_or_else(|| MpfsError::Invalid(format!("name offset {at} outside image")))?;
    let end = tail
        .iter()
        .position(|&b| b == 0)
        .ok_or_else(|| MpfsError::Invalid(format!("unterminated name at {at}")))?;
    String::from_utf8(tail[..end].to_vec())
        .map_err(|_| MpfsError::Invalid(format!("name at {at} is not utf8")))
}

/// Parses and bounds-checks a canonical image.
pub fn read_entries(image: &[u8]) -> MpfsResult<Vec<Entry>> {
    let mut cur = Cursor::new(image);

    let magic = read_exact::<4>(&mut cur).map_err(|_| MpfsError::Invalid("file too small".into()))?;
    if magic != MAGIC {
        return Err(MpfsError::Invalid("bad magic".into()));
    }
    let version = read_exact::<2>(&mut cur)?;
    if version != VERSION {
        return Err(MpfsError::Invalid(format!(
            "unsupported version {}.{}",
            version[0], version[1]
        )));
    }
    let count = read_u16(&mut cur)? as u32;

    let tables_end = HEADER_LEN + (HASH_ENTRY_LEN + FAT_ENTRY_LEN) * count;
    if tables_end as usize > image.len() {
        return Err(MpfsError::Invalid("FAT outside file".into()));
    }

    let mut hashes = Vec::with_capacity(count as usize);
    for _ in 0..count {
        hashes.push(read_u16(&mut cur)?);
    }

    let mut out = Vec::with_capacity(count as usize);
    for hash in hashes {
        let loc_str = read_u32(&mut cur)?;
        let loc_data = read_u32(&mut cur)?;
        let size = read_u32(&mut cur)?;
        let file_date = read_u32(&mut cur)?;
        let _reserved = read_u32(&mut cur)?;
        let flags = read_u16(&mut cur)?;

        if loc_str < tables_end {
            return Err(MpfsError::Invalid(format!("name offset {loc_str} inside tables")));
        }
        let name = nul_terminated(image, loc_str)?;

        let end = u64::from(loc_data) + u64::from(size);
        if loc_data < tables_end || end > image.len() as u64 {
            return Err(MpfsError::Invalid(format!("payload outside file: {name}")));
        }
        if name_hash(&name) != hash {
            return Err(MpfsError::Invalid(format!("hash mismatch: {name}")));
        }

        out.push(Entry {
            name,
            name_hash: hash,
            loc_str,
            loc_data,
            size,
            file_date,
            flags,
        });
    }

    Ok(out)
}
