#![forbid(unsafe_code)]

mod mpfs;
mod ui;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{fmt, EnvFilter};

use crate::mpfs::{BuildConfig, OutputFormat, TypeList};

#[derive(Debug, Parser)]
#[command(name = "mpfsgen", version, about = "MPFS2 image generator for embedded web assets")]
struct Cli {
    /// More diagnostics on stderr (-v info, -vv debug, -vvv trace).
    #[arg(short = 'v', action = clap::ArgAction::Count, global = true)]
    verbosity: u8,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Interactive wizard for building an image (terminal).
    Ui,

    /// Build an image from a source directory.
    Build {
        /// Source directory.
        #[arg(long)]
        input: PathBuf,
        /// Existing output directory.
        #[arg(long)]
        output: PathBuf,
        /// Artifact base name.
        #[arg(long, default_value = mpfs::DEFAULT_OUTPUT_NAME)]
        name: String,
        /// bin, c, asm, mdd, classic-bin, classic-c or classic-asm.
        #[arg(long, default_value = "bin")]
        format: OutputFormat,
        /// Suffixes of template files (comma-separated).
        #[arg(long, default_value = mpfs::DEFAULT_DYNAMIC_TYPES)]
        dynamic: String,
        /// Suffixes that are never gzipped (comma-separated).
        #[arg(long, default_value = mpfs::DEFAULT_NO_COMPRESS_TYPES)]
        no_compress: String,
        /// Bytes reserved ahead of a classic image.
        #[arg(long, default_value_t = 0)]
        reserve_block: u32,
    },

    /// List entries in a binary image.
    List {
        #[arg(long)]
        image: PathBuf,
        /// Print offsets, sizes and flags too.
        #[arg(long, default_value_t = false)]
        verbose: bool,
    },

    /// Extract a binary image to an output directory.
    Extract {
        #[arg(long)]
        image: PathBuf,
        #[arg(long)]
        output: PathBuf,
        /// Only extract entries that contain this substring (repeatable).
        #[arg(long)]
        filter: Vec<String>,
    },

    /// Verify image integrity (bounds, name hashes, gzip streams).
    Verify {
        #[arg(long)]
        image: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();

    let filter = match cli.verbosity {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let res = match cli.cmd {
        Command::Ui => ui::run(),
        Command::Build {
            input,
            output,
            name,
            format,
            dynamic,
            no_compress,
            reserve_block,
        } => mpfs::build(BuildConfig {
            source: input,
            output_dir: output,
            output_name: name,
            format,
            dynamic_types: TypeList::parse(&dynamic),
            no_compress_types: TypeList::parse(&no_compress),
            reserve_block,
        })
        .map(|_| ()),
        Command::List { image, verbose } => mpfs::list(&image, verbose),
        Command::Extract {
            image,
            output,
            filter,
        } => mpfs::extract(&image, &output, &filter).map(|n| println!("extracted {n} entries")),
        Command::Verify { image } => mpfs::verify(&image).map(|_| ()),
    };

    if let Err(e) = res {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
