#![forbid(unsafe_code)]

use std::path::{Path, PathBuf};

use crate::mpfs::encode::banner::{c_banner, timestamp_now, EOL};
use crate::mpfs::encode::ImageSink;
use crate::mpfs::error::MpfsResult;
use crate::mpfs::io::write_atomic;
use crate::mpfs::path::artifact_path;

/// Bytes per `DATACHUNKxxxxxx` macro. Older PIC compilers choked on larger
/// initializers.
const CHUNK: usize = 1024;

/// Bytes per source line; each line carries an ASCII gloss comment.
const LINE: usize = 16;

/// Width of one `,0xNN` item, used to pad the trailing line.
const ITEM_WIDTH: usize = 5;

/// C source holding the image as chunked `ROM uint8_t` arrays.
#[derive(Debug)]
pub struct CArraySink {
    path: PathBuf,
    out: String,
    len: usize,
    gloss: String,
}

fn glyph(b: u8) -> char {
    // '*' would allow "*/" to close the gloss comment early.
    if (32..=126).contains(&b) && b != b'*' {
        b as char
    } else {
        '.'
    }
}

impl CArraySink {
    pub fn open(dir: &Path, name: &str) -> Self {
        Self::with_timestamp(dir, name, &timestamp_now())
    }

    pub fn with_timestamp(dir: &Path, name: &str, timestamp: &str) -> Self {
        let path = artifact_path(dir, name, ".c");
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let mut out = c_banner(
            &file_name,
            timestamp,
            &["Defines an MPFS2 image to be stored in program memory."],
        );
        for line in [
            "#define __MPFS_IMG2_C_",
            "",
            "#include \"system_config.h\"",
            "",
            "#if !defined(MPFS_USE_EEPROM) && !defined(MPFS_USE_SPI_FLASH)",
            "#include \"tcpip/tcpip.h\"",
            "",
            "#if defined(STACK_USE_MPFS2)",
            "",
            "/**************************************",
            " * MPFS2 Image Data",
        ] {
            out.push_str(line);
            out.push_str(EOL);
        }
        out.push_str(" **************************************/");

        Self {
            path,
            out,
            len: 0,
            gloss: String::with_capacity(LINE),
        }
    }

    fn chunk_count(&self) -> usize {
        self.len.div_ceil(CHUNK)
    }

    fn finish_text(&mut self) {
        if self.len != 0 {
            let missing = (LINE - self.len % LINE) % LINE;
            self.out.push_str(&" ".repeat(missing * ITEM_WIDTH + 1));
            self.out.push_str(&format!(" /* {:<width$} */", self.gloss, width = LINE));
        }
        self.out.push_str(EOL);
        self.out.push_str(EOL);

        if self.len != 0 {
            for line in [
                "/**************************************",
                " * MPFS2 C linkable symbols",
                " **************************************/",
                "// XC8 gets one array per chunk; other compilers get a single array so the",
                "// linker cannot reorder the chunks in flash.",
                "#if defined(__XC8)",
            ] {
                self.out.push_str(line);
                self.out.push_str(EOL);
            }
            self.out
                .push_str(&format!("\tROM uint8_t MPFS_Start[] = {{DATACHUNK000000}};{EOL}"));
            for i in 1..self.chunk_count() {
                self.out.push_str(&format!(
                    "\tROM uint8_t MPFS_{i:06x}[] = {{DATACHUNK{i:06x}}};{EOL}"
                ));
            }
            let all: Vec<String> = (0..self.chunk_count())
                .map(|i| format!("DATACHUNK{i:06x}"))
                .collect();
            self.out.push_str(&format!("#else{EOL}"));
            self.out.push_str(&format!(
                "\tROM uint8_t MPFS_Start[] = {{{}}};{EOL}",
                all.join(", ")
            ));
            self.out.push_str(&format!("#endif{EOL}{EOL}"));
        }

        for line in [
            "/**************************************************************",
            " * End of MPFS",
            " **************************************************************/",
            "",
            "#endif // #if defined(STACK_USE_MPFS2)",
            "",
            "#endif // #if !defined(MPFS_USE_EEPROM) && !defined(MPFS_USE_SPI_FLASH)",
        ] {
            self.out.push_str(line);
            self.out.push_str(EOL);
        }
    }
}

impl ImageSink for CArraySink {
    fn write_byte(&mut self, b: u8) {
        let chunk_start = self.len % CHUNK == 0;
        let line_start = self.len % LINE == 0;

        if !chunk_start {
            self.out.push(',');
        }
        if line_start {
            if self.len != 0 {
                // A chunk's last line has no trailing comma; keep the gloss aligned.
                if chunk_start {
                    self.out.push(' ');
                }
                self.out.push_str(&format!(" /* {} */", self.gloss));
            }
            self.gloss.clear();
        }
        if chunk_start {
            self.out
                .push_str(&format!("{EOL}#define DATACHUNK{:06x}", self.len / CHUNK));
        }
        if line_start {
            self.out.push_str(&format!(" \\{EOL}\t"));
        }

        self.gloss.push(glyph(b));
        self.out.push_str(&format!("0x{b:02x}"));
        self.len += 1;
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

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const TS: &str = "Thu Jan 01 1970 00:00:00";

    fn render(dir: &Path, data: &[u8]) -> String {
        let mut sink = CArraySink::with_timestamp(dir, "img", TS);
        sink.write_bytes(data);
        let path = sink.close().unwrap();
        String::from_utf8(fs::read(path).unwrap()).unwrap()
    }

    #[test]
    fn glossed_lines_and_padded_tail() {
        let tmp = TempDir::new().unwrap();
        let text = render(tmp.path(), b"Hello, *World*!\nab");

        let expected_body = format!(
            "\r\n#define DATACHUNK000000 \\\r\n\t\
             0x48,0x65,0x6c,0x6c,0x6f,0x2c,0x20,0x2a,0x57,0x6f,0x72,0x6c,0x64,0x2a,0x21,0x0a, \
             /* Hello, .World.!. */ \\\r\n\t0x61,0x62{} /* ab               */\r\n\r\n",
            " ".repeat(14 * 5 + 1)
        );
        assert!(text.contains(&expected_body), "{text}");
        assert!(text.contains(
            "#if defined(__XC8)\r\n\tROM uint8_t MPFS_Start[] = {DATACHUNK000000};\r\n#else\r\n\
             \tROM uint8_t MPFS_Start[] = {DATACHUNK000000};\r\n#endif\r\n"
        ));
        assert!(text.contains("Generated Thu Jan 01 1970 00:00:00"));
        assert!(text.ends_with("#endif // #if !defined(MPFS_USE_EEPROM) && !defined(MPFS_USE_SPI_FLASH)\r\n"));
    }

    #[test]
    fn full_trailing_line_keeps_its_gloss() {
        let tmp = TempDir::new().unwrap();
        let text = render(tmp.path(), b"0123456789abcdef");
        assert!(text.contains("0x65,0x66  /* 0123456789abcdef */\r\n\r\n"));
    }

    #[test]
    fn chunks_every_1024_bytes() {
        let tmp = TempDir::new().unwrap();
        let text = render(tmp.path(), &vec![0u8; 1030]);

        assert!(text.contains("#define DATACHUNK000000 \\\r\n"));
        assert!(text.contains("0x00  /* ................ */\r\n#define DATACHUNK000001 \\\r\n\t0x00"));
        assert!(!text.contains("DATACHUNK000002"));
        assert!(text.contains("\tROM uint8_t MPFS_000001[] = {DATACHUNK000001};\r\n"));
        assert!(text.contains("MPFS_Start[] = {DATACHUNK000000, DATACHUNK000001};"));
        assert_eq!(text.matches("0x00").count(), 1030);
    }

    #[test]
    fn empty_image_has_no_symbols() {
        let tmp = TempDir::new().unwrap();
        let text = render(tmp.path(), b"");
        assert!(!text.contains("DATACHUNK"));
        assert!(text.contains("End of MPFS"));
    }

    #[test]
    fn fixed_timestamp_is_reproducible() {
        let tmp = TempDir::new().unwrap();
        let a = render(tmp.path(), b"same bytes");
        let b = render(tmp.path(), b"same bytes");
        assert_eq!(a, b);
    }
}
