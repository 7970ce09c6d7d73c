#![forbid(unsafe_code)]

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use crate::mpfs::error::{MpfsError, MpfsResult};

pub fn read_exact<const N: usize>(r: &mut dyn Read) -> MpfsResult<[u8; N]> {
    let mut buf = [0u8; N];
    r.read_exact(&mut buf)?;
    Ok(buf)
}

pub fn read_u16(r: &mut dyn Read) -> MpfsResult<u16> {
    Ok(u16::from_le_bytes(read_exact::<2>(r)?))
}

pub fn read_u32(r: &mut dyn Read) -> MpfsResult<u32> {
    Ok(u32::from_le_bytes(read_exact::<4>(r)?))
}

fn tmp_sibling(path: &Path) -> MpfsResult<PathBuf> {
    let name = path
        .file_name()
        .ok_or_else(|| MpfsError::Invalid(format!("not a file path: {}", path.display())))?;
    Ok(path.with_file_name(format!(".{}.tmp", name.to_string_lossy())))
}

/// Writes `bytes` to a hidden sibling and renames it over `path`, so readers only
/// ever see the previous artifact or the complete new one.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> MpfsResult<()> {
    let tmp = tmp_sibling(path)?;
    if let Err(e) = fs::write(&tmp, bytes) {
        let _ = fs::remove_file(&tmp);
        return Err(e.into());
    }
    if let Err(e) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(e.into());
    }
    Ok(())
}
