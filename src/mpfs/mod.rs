#![forbid(unsafe_code)]

mod build;
mod classic;
mod collect;
mod compress;
mod encode;
mod error;
mod format;
mod index;
mod ingest;
mod io;
mod layout;
mod ops;
mod path;
mod read;
mod template;

pub use build::{BuildConfig, DEFAULT_DYNAMIC_TYPES, DEFAULT_NO_COMPRESS_TYPES, DEFAULT_OUTPUT_NAME};

pub use error::{MpfsError, MpfsResult};
pub use format::OutputFormat;
pub use path::TypeList;

pub use ops::{build, extract, list, verify};
