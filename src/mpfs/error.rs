#![forbid(unsafe_code)]

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MpfsError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("could not read {}", .0.display())]
    MissingSourceFile(PathBuf),

    #[error("directory {} does not exist", .0.display())]
    SourceDirectoryMissing(PathBuf),

    #[error("output directory \"{}\" does not exist", .0.display())]
    DestinationDirectoryMissing(PathBuf),

    #[error("no files to put in the image")]
    EmptyFileSet,

    #[error(
        "the output directory {} is located in the source directory {}; \
         the image cannot be placed inside the directory it is built from",
        .output.display(),
        .source_dir.display()
    )]
    PathConflict { output: PathBuf, source_dir: PathBuf },

    #[error("unsupported output format: {0}")]
    UnsupportedFormat(String),

    #[error("image too large: {0}")]
    ImageTooLarge(String),

    #[error("invalid image: {0}")]
    Invalid(String),
}

pub type MpfsResult<T> = Result<T, MpfsError>;
