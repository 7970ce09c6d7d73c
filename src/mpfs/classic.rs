#![forbid(unsafe_code)]

//! MPFS classic: the pre-MPFS2 layout still read by older firmware.
//!
//! ```text
//! FAT, (N + 1) × 17 bytes:
//!   [u8 status = 0x00][u32 LE data address][12-byte uppercased name]
//!   terminator: [0x04][0xFFFFFFFF]["END OF FAT  "]
//! payloads, each byte-stuffed and followed by [0x04][0xFF × 4]
//! ```
//!
//! Payload ends are found by scanning for an unescaped ETX, so any DLE or ETX
//! byte inside a file is preceded by a DLE.

use std::path::{Path, PathBuf};

use crate::mpfs::encode::banner::{asm_banner, c_banner, ASM30_PREAMBLE, EOL};
use crate::mpfs::encode::{BinSink, ImageSink};
use crate::mpfs::error::{MpfsError, MpfsResult};
use crate::mpfs::format::{FileRecord, OutputFormat};
use crate::mpfs::io::write_atomic;
use crate::mpfs::path::artifact_path;

pub const STATUS_DATA: u8 = 0x00;
pub const DLE: u8 = 0x03;
pub const ETX: u8 = 0x04;

pub const NAME_LEN: usize = 12;
pub const FAT_ENTRY_LEN: u32 = 17;
pub const END_OF_FAT: &[u8; NAME_LEN] = b"END OF FAT  ";

/// End-of-file marker appended to every payload.
pub const TRAILER: [u8; 5] = [ETX, 0xFF, 0xFF, 0xFF, 0xFF];

/// Escapes every DLE and ETX byte with a leading DLE.
pub fn stuff(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len() + data.len() / 16);
    for &b in data {
        if b == DLE || b == ETX {
            out.push(DLE);
        }
        out.push(b);
    }
    out
}

/// Uppercased, truncated or space-padded to exactly 12 bytes.
pub fn fat_name(name: &str) -> [u8; NAME_LEN] {
    let mut out = [b' '; NAME_LEN];
    for (dst, src) in out.iter_mut().zip(name.bytes()) {
        *dst = src.to_ascii_uppercase();
    }
    out
}

fn char_literal(b: u8) -> String {
    if (32..=126).contains(&b) && b != b'\'' && b != b'\\' {
        format!("'{}'", b as char)
    } else {
        format!("0x{b:02x}")
    }
}

#[derive(Debug)]
struct ClassicEntry {
    name: [u8; NAME_LEN],
    address: u32,
    payload: Vec<u8>,
}

/// A fully addressed classic image.
#[derive(Debug)]
pub struct ClassicImage {
    entries: Vec<ClassicEntry>,
}

impl ClassicImage {
    /// Stuffs each payload and assigns data addresses after `reserve_block`
    /// bytes and the FAT.
    pub fn new(records: &[FileRecord], reserve_block: u32) -> MpfsResult<Self> {
        let overflow = || MpfsError::ImageTooLarge("classic image exceeds 4 GiB".into());

        let fat_len = u32::try_from(records.len() + 1)
            .ok()
            .and_then(|n| n.checked_mul(FAT_ENTRY_LEN))
            .ok_or_else(overflow)?;
        let mut base = reserve_block.checked_add(fat_len).ok_or_else(overflow)?;

        let mut entries = Vec::with_capacity(records.len());
        for r in records {
            let payload = stuff(&r.data);
            let address = base;
            let span = u32::try_from(payload.len() + TRAILER.len()).map_err(|_| overflow())?;
            base = base.checked_add(span).ok_or_else(overflow)?;
            entries.push(ClassicEntry {
                name: fat_name(r.name()),
                address,
                payload,
            });
        }
        Ok(Self { entries })
    }

    /// Binary layout: FAT, terminator, then trailered payloads.
    pub fn write_bin<S: ImageSink>(&self, sink: &mut S) {
        for e in &self.entries {
            sink.write_byte(STATUS_DATA);
            sink.write_u32(e.address);
            sink.write_bytes(&e.name);
        }
        sink.write_byte(ETX);
        sink.write_u32(0xFFFF_FFFF);
        sink.write_bytes(END_OF_FAT);

        for e in &self.entries {
            sink.write_bytes(&e.payload);
            sink.write_bytes(&TRAILER);
        }
    }

    /// C source: one `MPFS_xxxx` array per file plus a `MPFS_Start` FAT table.
    pub fn render_c(&self, file_name: &str, timestamp: &str) -> String {
        let mut out = c_banner(
            file_name,
            timestamp,
            &["Defines an MPFS classic image to be stored in program memory."],
        );
        out.push_str(&format!("#include \"tcpip/tcpip.h\"{EOL}{EOL}"));
        out.push_str(&format!(
            "#if defined(STACK_USE_MPFS) && !defined(MPFS_USE_EEPROM) && !defined(MPFS_USE_SPI_FLASH){EOL}"
        ));

        for (idx, e) in self.entries.iter().enumerate() {
            out.push_str(&format!(
                "{EOL}/*******************************{EOL} * Begin {}{EOL} *******************************/{EOL}{EOL}",
                String::from_utf8_lossy(&e.name)
            ));
            out.push_str(&format!("static ROM unsigned char MPFS_{idx:04x}[] = {EOL}{{"));
            for (i, b) in e.payload.iter().enumerate() {
                if i % 12 == 0 {
                    out.push_str(&format!("{EOL}\t"));
                }
                out.push_str(&format!("0x{b:02x},"));
            }
            out.push_str(&format!("{EOL}\t0x04,0xff,0xff,0xff,0xff{EOL}}};{EOL}"));
        }

        for line in [
            "",
            "/**************************************************",
            " * Start of MPFS FAT",
            " **************************************************/",
            "typedef struct",
            "{",
            "    unsigned char Flags;",
            "    ROM unsigned char* Address;",
            "    unsigned char Name[12];",
            "} FAT_TABLE_ENTRY;",
            "",
        ] {
            out.push_str(line);
            out.push_str(EOL);
        }
        out.push_str(&format!("ROM FAT_TABLE_ENTRY MPFS_Start[] = {EOL}{{"));
        for (idx, e) in self.entries.iter().enumerate() {
            out.push_str(&format!("{EOL}\t{{ 0x00, MPFS_{idx:04x}"));
            for &b in &e.name {
                out.push_str(&format!(", {}", char_literal(b)));
            }
            out.push_str(" },");
        }
        out.push_str(&format!("{EOL}\t{{ 0x04, (ROM unsigned char*)0xffffff"));
        for &b in END_OF_FAT {
            out.push_str(&format!(", {}", char_literal(b)));
        }
        out.push_str(&format!(" }},{EOL}}};{EOL}{EOL}"));

        for line in [
            "/**************************************************",
            " * End of MPFS",
            " **************************************************/",
            "",
            "#endif // #if defined(STACK_USE_MPFS) && !defined(MPFS_USE_EEPROM) && !defined(MPFS_USE_SPI_FLASH)",
        ] {
            out.push_str(line);
            out.push_str(EOL);
        }
        out
    }

    /// ASM30 source: one `_MPFS_xxxx` label per file plus the FAT in `.const`.
    pub fn render_asm(&self, file_name: &str, timestamp: &str) -> String {
        let mut out = asm_banner(
            file_name,
            timestamp,
            &[
                "Defines an MPFS classic image to be stored in program memory.",
                "Defined in ASM30 assembly for optimal storage size.",
            ],
        );
        for line in ASM30_PREAMBLE {
            out.push_str(line);
            out.push_str(EOL);
        }
        out.push_str(&format!("BEGIN_MPFS:{EOL}"));

        for (idx, e) in self.entries.iter().enumerate() {
            out.push_str(&format!(
                "{EOL};*******************************{EOL};  Begin {}{EOL};*******************************{EOL}",
                String::from_utf8_lossy(&e.name)
            ));
            out.push_str(&format!(
                "\tgoto\tEND_OF_MPFS_{idx:04x}\t\t; Prevent accidental execution of constant data{EOL}"
            ));
            out.push_str(&format!("\t.global _MPFS_{idx:04x}{EOL}_MPFS_{idx:04x}:"));
            let last = e.payload.len().saturating_sub(1);
            for (i, b) in e.payload.iter().enumerate() {
                if i % 12 == 0 {
                    out.push_str(&format!("{EOL}\t.pbyte\t"));
                }
                out.push_str(&format!("0x{b:02x}"));
                if i % 12 != 11 && i != last {
                    out.push(',');
                }
            }
            out.push_str(&format!(
                "{EOL}\t.pbyte\t0x04,0xff,0xff,0xff,0xff{EOL}END_OF_MPFS_{idx:04x}:{EOL}"
            ));
        }

        for line in [
            ";*************************************************",
            ";  Start of MPFS FAT",
            ";*************************************************",
            "\t.section\t.const,psv",
            "\t.global _MPFS_Start",
        ] {
            out.push_str(line);
            out.push_str(EOL);
        }
        out.push_str("_MPFS_Start:");
        for (idx, e) in self.entries.iter().enumerate() {
            out.push_str(&format!(
                "{EOL}\t.byte\t0x00,0x00{EOL}\t.long\tpaddr(_MPFS_{idx:04x}){EOL}\t.byte\t"
            ));
            let chars: Vec<String> = e.name.iter().map(|&b| char_literal(b)).collect();
            out.push_str(&chars.join(","));
        }
        let end: Vec<String> = END_OF_FAT.iter().map(|&b| char_literal(b)).collect();
        out.push_str(&format!(
            "{EOL}\t.byte\t0x04,0x00{EOL}\t.long\t0xffffffff{EOL}\t.byte\t{}{EOL}{EOL}",
            end.join(",")
        ));
        out.push_str(&format!("\t.section MPFSEnd,code{EOL}END_OF_MPFS:{EOL}"));
        out.push_str(&format!("{EOL}{EOL}; End of Generated Image{EOL}"));
        out
    }

    /// Writes the artifact for a classic `format`; returns its path and size.
    pub fn generate(
        &self,
        format: OutputFormat,
        dir: &Path,
        name: &str,
        timestamp: &str,
    ) -> MpfsResult<(PathBuf, usize)> {
        match format {
            OutputFormat::ClassicBin => {
                let mut sink = BinSink::open(dir, name);
                self.write_bin(&mut sink);
                let len = sink.len();
                Ok((sink.close()?, len))
            }
            OutputFormat::ClassicC => {
                let path = artifact_path(dir, name, ".c");
                let text = self.render_c(&file_label(&path), timestamp);
                write_atomic(&path, text.as_bytes())?;
                Ok((path, text.len()))
            }
            OutputFormat::ClassicAsm => {
                let path = artifact_path(dir, name, ".s");
                let text = self.render_asm(&file_label(&path), timestamp);
                write_atomic(&path, text.as_bytes())?;
                Ok((path, text.len()))
            }
            other => Err(MpfsError::UnsupportedFormat(format!(
                "{other} is not a classic format"
            ))),
        }
    }
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const TS: &str = "Thu Jan 01 1970 00:00:00";

    fn u32_at(b: &[u8], at: usize) -> u32 {
        u32::from_le_bytes(b[at..at + 4].try_into().unwrap())
    }

    #[test]
    fn stuffing_escapes_each_sentinel() {
        let src = [0x10, 0x04, 0x20, 0x30, 0x03, 0x40, 0x50, 0x60, 0x70, 0x80];
        let out = stuff(&src);
        assert_eq!(out.len(), 12);
        assert_eq!(
            out,
            vec![0x10, 0x03, 0x04, 0x20, 0x30, 0x03, 0x03, 0x40, 0x50, 0x60, 0x70, 0x80]
        );
    }

    #[test]
    fn stuffing_is_single_lookahead() {
        // DLE DLE -> each escaped once, not recursively.
        assert_eq!(stuff(&[0x03, 0x03]), vec![0x03, 0x03, 0x03, 0x03]);
        assert_eq!(stuff(b"plain"), b"plain".to_vec());
    }

    #[test]
    fn names_are_fixed_width() {
        assert_eq!(&fat_name("index.htm"), b"INDEX.HTM   ");
        assert_eq!(&fat_name("a_very_long_name.html"), b"A_VERY_LONG_");
        assert_eq!(&fat_name(""), b"            ");
    }

    #[test]
    fn binary_layout() {
        let records = vec![
            FileRecord::new("a.txt", vec![1, 2, 5]),
            FileRecord::new("b.htm", vec![0x04, 0x03]),
        ];
        let image = ClassicImage::new(&records, 0).unwrap();
        let tmp = TempDir::new().unwrap();
        let (path, len) = image
            .generate(OutputFormat::ClassicBin, tmp.path(), "MPFSImg", TS)
            .unwrap();
        let bin = fs::read(&path).unwrap();
        assert_eq!(bin.len(), len);

        let fat_len = 17 * 3;
        assert_eq!(bin[0], STATUS_DATA);
        assert_eq!(u32_at(&bin, 1), fat_len as u32);
        assert_eq!(&bin[5..17], b"A.TXT       ");
        assert_eq!(u32_at(&bin, 18), fat_len as u32 + 3 + 5);
        assert_eq!(&bin[22..34], b"B.HTM       ");
        assert_eq!(bin[34], ETX);
        assert_eq!(u32_at(&bin, 35), 0xFFFF_FFFF);
        assert_eq!(&bin[39..51], END_OF_FAT);

        assert_eq!(&bin[51..59], &[1, 2, 5, 0x04, 0xFF, 0xFF, 0xFF, 0xFF]);
        assert_eq!(&bin[59..], &[0x03, 0x04, 0x03, 0x03, 0x04, 0xFF, 0xFF, 0xFF, 0xFF]);
        assert_eq!(len, fat_len + 8 + 9);
    }

    #[test]
    fn reserve_block_shifts_addresses() {
        let records = vec![FileRecord::new("a", vec![9])];
        let image = ClassicImage::new(&records, 0x100).unwrap();
        let tmp = TempDir::new().unwrap();
        let (path, _) = image
            .generate(OutputFormat::ClassicBin, tmp.path(), "img", TS)
            .unwrap();
        let bin = fs::read(path).unwrap();
        assert_eq!(u32_at(&bin, 1), 0x100 + 34);
    }

    #[test]
    fn c_rendering_has_one_symbol_per_file() {
        let records = vec![
            FileRecord::new("index.htm", vec![0x41; 13]),
            FileRecord::new("it's", vec![0x03]),
        ];
        let image = ClassicImage::new(&records, 0).unwrap();
        let text = image.render_c("img.c", TS);

        assert!(text.contains("static ROM unsigned char MPFS_0000[] = \r\n{\r\n\t0x41,"));
        assert!(text.contains("static ROM unsigned char MPFS_0001[] = \r\n{\r\n\t0x03,0x03,\r\n\t0x04,0xff,0xff,0xff,0xff\r\n};"));
        assert!(!text.contains("DATACHUNK"));
        assert!(text.contains(
            "\t{ 0x00, MPFS_0000, 'I', 'N', 'D', 'E', 'X', '.', 'H', 'T', 'M', ' ', ' ', ' ' },"
        ));
        assert!(text.contains("MPFS_0001, 'I', 'T', 0x27, 'S',"));
        assert!(text.contains("{ 0x04, (ROM unsigned char*)0xffffff, 'E', 'N', 'D', ' ', 'O', 'F', ' ', 'F', 'A', 'T', ' ', ' ' },"));
        // 13 bytes -> two data lines.
        assert_eq!(text.matches("0x41,").count(), 13);
    }

    #[test]
    fn asm_rendering_labels_each_file() {
        let records = vec![FileRecord::new("a.txt", (0u8..13).map(|b| b + 0x10).collect())];
        let image = ClassicImage::new(&records, 0).unwrap();
        let text = image.render_asm("img.s", TS);
        for line in ASM30_PREAMBLE {
            assert!(text.contains(&format!("{line}\r\n")), "{line}");
        }
        assert!(text.contains("\t.global BEGIN_MPFS\r\nBEGIN_MPFS:\r\n"));

        assert!(text.contains("\t.global _MPFS_0000\r\n_MPFS_0000:\r\n\t.pbyte\t0x10,0x11,"));
        assert!(text.contains("0x1a,0x1b\r\n\t.pbyte\t0x1c\r\n\t.pbyte\t0x04,0xff,0xff,0xff,0xff\r\nEND_OF_MPFS_0000:"));
        assert!(text.contains("\t.long\tpaddr(_MPFS_0000)\r\n\t.byte\t'A','.','T','X','T',' ',' ',' ',' ',' ',' ',' '"));
        assert!(text.contains("\t.long\t0xffffffff\r\n\t.byte\t'E','N','D',' ','O','F',' ','F','A','T',' ',' '"));
    }

    #[test]
    fn canonical_format_is_rejected() {
        let image = ClassicImage::new(&[], 0).unwrap();
        let tmp = TempDir::new().unwrap();
        let err = image
            .generate(OutputFormat::Bin, tmp.path(), "img", TS)
            .unwrap_err();
        assert!(matches!(err, MpfsError::UnsupportedFormat(_)));
        assert!(fs::read_dir(tmp.path()).unwrap().next().is_none());
    }
}
