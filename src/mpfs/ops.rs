#![forbid(unsafe_code)]

use std::collections::HashSet;
use std::fs;
use std::path::{Component, Path, PathBuf};

use crate::mpfs::build::{BuildConfig, Generator};
use crate::mpfs::compress::{Compressor, GzipCompressor};
use crate::mpfs::error::{MpfsError, MpfsResult};
use crate::mpfs::read::{read_entries, Entry};
use crate::mpfs::template::NoTemplates;

/// Runs one generation without template indexing and prints its log.
pub fn build(config: BuildConfig) -> MpfsResult<Vec<PathBuf>> {
    let mut gen = Generator::new(config);
    let res = gen.run(&mut NoTemplates);
    for line in gen.log() {
        println!("{line}");
    }
    res
}

fn flag_names(e: &Entry) -> String {
    let mut out = Vec::new();
    if e.is_zipped() {
        out.push("zip");
    }
    if e.has_index() {
        out.push("idx");
    }
    if out.is_empty() {
        "-".to_string()
    } else {
        out.join(",")
    }
}

pub fn list(image: &Path, verbose: bool) -> MpfsResult<()> {
    let bytes = fs::read(image)?;
    let entries = read_entries(&bytes)?;
    for e in entries {
        if verbose {
            println!(
                "{}  str={} off={} len={} date={} hash={:04x} flags={}",
                e.name,
                e.loc_str,
                e.loc_data,
                e.size,
                e.file_date,
                e.name_hash,
                flag_names(&e)
            );
        } else {
            println!("{}", e.name);
        }
    }
    Ok(())
}

/// Destination of `name` below `output`; rejects names that would escape it.
fn entry_path(output: &Path, name: &str) -> MpfsResult<PathBuf> {
    let rel = Path::new(name);
    if rel
        .components()
        .any(|c| !matches!(c, Component::Normal(_)))
    {
        return Err(MpfsError::Invalid(format!("unsafe entry name: {name}")));
    }
    Ok(output.join(rel))
}

/// Stored bytes of `e`, gunzipped when the entry is flagged as compressed.
fn contents(e: &Entry, image: &[u8]) -> MpfsResult<Vec<u8>> {
    let payload = e.payload(image);
    if e.is_zipped() {
        GzipCompressor::default()
            .decompress(payload)
            .map_err(|err| MpfsError::Invalid(format!("{}: {err}", e.name)))
    } else {
        Ok(payload.to_vec())
    }
}

/// Writes every entry (or those containing one of `filter`) below `output`;
/// returns how many were written.
pub fn extract(image: &Path, output: &Path, filter: &[String]) -> MpfsResult<usize> {
    let bytes = fs::read(image)?;
    let entries = read_entries(&bytes)?;
    fs::create_dir_all(output)?;

    let mut written = 0;
    for e in entries {
        if !filter.is_empty() && !filter.iter().any(|s| e.name.contains(s.as_str())) {
            continue;
        }

        let raw = contents(&e, &bytes)?;
        let out_path = entry_path(output, &e.name)?;
        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&out_path, &raw)?;
        written += 1;
    }

    Ok(written)
}

/// Bounds, name hashes, duplicate names and gzip streams; returns the entry count.
pub fn verify(image: &Path) -> MpfsResult<usize> {
    let bytes = fs::read(image)?;
    let entries = read_entries(&bytes)?;

    let mut seen = HashSet::new();
    for e in &entries {
        if !seen.insert(e.name.as_str()) {
            return Err(MpfsError::Invalid(format!("duplicate entry: {}", e.name)));
        }
        contents(e, &bytes)?;
    }

    println!("ok: {} entries", entries.len());
    Ok(entries.len())
}
