#![forbid(unsafe_code)]

use crate::mpfs::error::{MpfsError, MpfsResult};
use crate::mpfs::format::{FileRecord, FAT_ENTRY_LEN, HASH_ENTRY_LEN, HEADER_LEN};

/// Assigns `loc_str` and `loc_data` for every record and returns the image length.
///
/// Layout: header, hash table, FAT, then all names (NUL-terminated) in record
/// order, then all payloads in record order.
pub fn plan(records: &mut [FileRecord]) -> MpfsResult<u32> {
    if records.len() > u16::MAX as usize {
        return Err(MpfsError::ImageTooLarge(format!(
            "{} files (limit {})",
            records.len(),
            u16::MAX
        )));
    }
    let n = records.len() as u32;
    let overflow = || MpfsError::ImageTooLarge("image exceeds 4 GiB".into());

    let mut base = HEADER_LEN + (HASH_ENTRY_LEN + FAT_ENTRY_LEN) * n;

    for r in records.iter_mut() {
        r.loc_str = base;
        let name_len = u32::try_from(r.name().len() + 1).map_err(|_| overflow())?;
        base = base.checked_add(name_len).ok_or_else(overflow)?;
    }
    for r in records.iter_mut() {
        r.loc_data = base;
        let size = u32::try_from(r.data.len()).map_err(|_| overflow())?;
        base = base.checked_add(size).ok_or_else(overflow)?;
    }

    Ok(base)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn records(sizes: &[(&str, usize)]) -> Vec<FileRecord> {
        sizes.iter()
            .map(|(name, len)| FileRecord::new(*name, vec![0xAA; *len]))
            .collect()
    }

    #[test]
    fn single_record() {
        let mut rs = records(&[("a.txt", 5)]);
        let total = plan(&mut rs).unwrap();
        assert_eq!(rs[0].loc_str, 8 + 2 + 22);
        assert_eq!(rs[0].loc_data, 32 + 6);
        assert_eq!(total, 38 + 5);
    }

    #[test]
    fn offsets_are_contiguous() {
        let mut rs = records(&[
            ("index.htm", 120),
            ("dir/b.txt", 0),
            ("img/logo.gif", 3000),
            ("x", 1),
        ]);
        let total = plan(&mut rs).unwrap();

        let n = rs.len() as u32;
        assert_eq!(rs[0].loc_str, 8 + 24 * n);
        for w in rs.windows(2) {
            assert_eq!(w[1].loc_str, w[0].loc_str + w[0].name().len() as u32 + 1);
            assert_eq!(w[1].loc_data, w[0].loc_data + w[0].size());
        }
        let last = rs.last().unwrap();
        assert_eq!(rs[0].loc_data, last.loc_str + last.name().len() as u32 + 1);
        assert_eq!(total, last.loc_data + last.size());
    }

    #[test]
    fn empty_list_is_just_a_header() {
        let mut rs: Vec<FileRecord> = Vec::new();
        assert_eq!(plan(&mut rs).unwrap(), HEADER_LEN);
    }

    #[test]
    fn replanning_is_stable() {
        let mut rs = records(&[("a", 3), ("bb", 4)]);
        let first = plan(&mut rs).unwrap();
        let locs: Vec<_> = rs.iter().map(|r| (r.loc_str, r.loc_data)).collect();
        assert_eq!(plan(&mut rs).unwrap(), first);
        let again: Vec<_> = rs.iter().map(|r| (r.loc_str, r.loc_data)).collect();
        assert_eq!(locs, again);
    }

    #[test]
    fn too_many_files() {
        let mut rs: Vec<FileRecord> = (0..=u16::MAX as usize)
            .map(|_| FileRecord::default())
            .collect();
        assert!(matches!(plan(&mut rs), Err(MpfsError::ImageTooLarge(_))));
    }
}
