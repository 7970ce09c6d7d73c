#![forbid(unsafe_code)]

use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::mpfs::classic::ClassicImage;
use crate::mpfs::collect::collect;
use crate::mpfs::encode::banner::timestamp_now;
use crate::mpfs::encode::{encode_image, AsmSink, BinSink, CArraySink};
use crate::mpfs::error::{MpfsError, MpfsResult};
use crate::mpfs::format::{FileRecord, OutputFormat};
use crate::mpfs::index::write_index_files;
use crate::mpfs::ingest::Ingester;
use crate::mpfs::layout::plan;
use crate::mpfs::path::{check_path_conflict, image_name, TypeList};
use crate::mpfs::template::TemplateIndexer;

pub const DEFAULT_OUTPUT_NAME: &str = "MPFSImg2";
pub const DEFAULT_DYNAMIC_TYPES: &str = "*.htm, *.html, *.cgi, *.xml";
pub const DEFAULT_NO_COMPRESS_TYPES: &str = "*.inc, snmp.bib";

/// Inputs of one generation.
#[derive(Debug, Clone)]
pub struct BuildConfig {
    pub source: PathBuf,
    pub output_dir: PathBuf,
    /// Artifact base name; the format's extension is appended.
    pub output_name: String,
    pub format: OutputFormat,
    pub dynamic_types: TypeList,
    pub no_compress_types: TypeList,
    /// Bytes left free ahead of a classic image's FAT.
    pub reserve_block: u32,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            source: PathBuf::from("."),
            output_dir: PathBuf::from("."),
            output_name: DEFAULT_OUTPUT_NAME.to_string(),
            format: OutputFormat::Bin,
            dynamic_types: TypeList::parse(DEFAULT_DYNAMIC_TYPES),
            no_compress_types: TypeList::parse(DEFAULT_NO_COMPRESS_TYPES),
            reserve_block: 0,
        }
    }
}

/// Runs generations and keeps the ordered, human-readable log of what happened.
#[derive(Debug)]
pub struct Generator {
    config: BuildConfig,
    log: Vec<String>,
}

impl Generator {
    pub fn new(config: BuildConfig) -> Self {
        Self {
            config,
            log: Vec::new(),
        }
    }

    pub fn log(&self) -> &[String] {
        &self.log
    }

    /// Builds the configured artifact(s); returns the written paths.
    ///
    /// Files that cannot be ingested are logged and skipped. Any other failure
    /// aborts before an artifact is written and is appended to the log.
    pub fn run(&mut self, indexer: &mut dyn TemplateIndexer) -> MpfsResult<Vec<PathBuf>> {
        match self.generate(indexer) {
            Ok(paths) => Ok(paths),
            Err(e) => {
                self.log.push(format!("ERROR: {e}"));
                Err(e)
            }
        }
    }

    fn generate(&mut self, indexer: &mut dyn TemplateIndexer) -> MpfsResult<Vec<PathBuf>> {
        let cfg = self.config.clone();

        if !cfg.source.is_dir() {
            return Err(MpfsError::SourceDirectoryMissing(cfg.source));
        }
        if !cfg.output_dir.is_dir() {
            return Err(MpfsError::DestinationDirectoryMissing(cfg.output_dir));
        }
        check_path_conflict(&cfg.source, &cfg.output_dir)?;

        let ingester = if cfg.format.is_classic() {
            Ingester::plain()
        } else {
            Ingester::new(cfg.dynamic_types.clone(), cfg.no_compress_types.clone())
        };

        let mut records = self.ingest_all(&ingester, indexer, &cfg.source)?;
        if records.is_empty() {
            return Err(MpfsError::EmptyFileSet);
        }
        info!(
            files = records.iter().filter(|r| !r.is_index).count(),
            records = records.len(),
            "ingestion finished"
        );

        if indexer.flush_changed_indices()? {
            info!("dynamic variable indices changed");
        }

        let (paths, len) = encode(&cfg, &mut records)?;
        let kind = if cfg.format.is_classic() { "MPFS" } else { "MPFS2" };
        self.log.push(String::new());
        self.log.push(format!("GENERATED {kind} IMAGE: {len} bytes"));
        for p in &paths {
            info!(path = %p.display(), format = %cfg.format, bytes = len, "artifact written");
        }
        Ok(paths)
    }

    fn ingest_all(
        &mut self,
        ingester: &Ingester,
        indexer: &mut dyn TemplateIndexer,
        source: &Path,
    ) -> MpfsResult<Vec<FileRecord>> {
        let mut records = Vec::new();
        let mut current_dir: Option<PathBuf> = None;

        for file in collect(source)? {
            let parent = file.parent().map(Path::to_path_buf);
            if parent != current_dir {
                if let Some(dir) = &parent {
                    self.log.push(format!("{} :", dir.display()));
                }
                current_dir = parent;
            }

            let ingested = image_name(source, &file)
                .and_then(|name| ingester.ingest(indexer, &file, &name));
            match ingested {
                Ok(ing) => {
                    self.log.push(ing.summary());
                    records.extend(ing.into_records());
                }
                Err(e) => {
                    warn!(file = %file.display(), error = %e, "skipping file");
                    self.log.push(format!("ERROR: {e}"));
                }
            }
        }

        Ok(records)
    }
}

fn encode(cfg: &BuildConfig, records: &mut [FileRecord]) -> MpfsResult<(Vec<PathBuf>, usize)> {
    let dir = cfg.output_dir.as_path();
    let name = cfg.output_name.as_str();

    if cfg.format.is_classic() {
        let image = ClassicImage::new(records, cfg.reserve_block)?;
        let (path, len) = image.generate(cfg.format, dir, name, &timestamp_now())?;
        return Ok((vec![path], len));
    }

    plan(records)?;
    let (path, len) = match cfg.format {
        OutputFormat::Bin => encode_image(records, BinSink::open(dir, name))?,
        OutputFormat::CArray => encode_image(records, CArraySink::open(dir, name))?,
        OutputFormat::Assembly => encode_image(records, AsmSink::open(dir, name))?,
        OutputFormat::Mdd => {
            return write_index_files(records, dir);
        }
        other => return Err(MpfsError::UnsupportedFormat(other.to_string())),
    };
    Ok((vec![path], len))
}
