#![forbid(unsafe_code)]

use crate::mpfs::{self, BuildConfig, MpfsError, OutputFormat, TypeList};
use inquire::validator::Validation;
use inquire::{Confirm, InquireError, Select, Text};
use std::path::PathBuf;

fn prompt_err(e: InquireError) -> MpfsError {
    MpfsError::Io(std::io::Error::new(std::io::ErrorKind::Other, e))
}

fn validate_dir(p: &str) -> Result<Validation, inquire::CustomUserError> {
    let pb = PathBuf::from(p.trim());
    if !pb.exists() {
        return Ok(Validation::Invalid("Path does not exist".into()));
    }
    if !pb.is_dir() {
        return Ok(Validation::Invalid("Path is not a directory".into()));
    }
    Ok(Validation::Valid)
}

fn validate_name(p: &str) -> Result<Validation, inquire::CustomUserError> {
    let p = p.trim();
    if p.is_empty() || p.contains(['/', '\\']) {
        return Ok(Validation::Invalid("Enter a plain file name".into()));
    }
    Ok(Validation::Valid)
}

fn validate_reserve(p: &str) -> Result<Validation, inquire::CustomUserError> {
    match p.trim().parse::<u32>() {
        Ok(_) => Ok(Validation::Valid),
        Err(_) => Ok(Validation::Invalid("Enter a byte count (0..=4294967295)".into())),
    }
}

fn show_types(list: &TypeList) -> String {
    if list.is_empty() {
        "<none>".to_string()
    } else {
        list.as_slice().join(" ")
    }
}

pub fn run() -> mpfs::MpfsResult<()> {
    println!("MPFS2 Image Wizard\n");

    let source = Text::new("Source directory")
        .with_default("./web_pages")
        .with_validator(validate_dir)
        .prompt()
        .map(|s| PathBuf::from(s.trim()))
        .map_err(prompt_err)?;

    let output_dir = Text::new("Output directory (outside the source directory)")
        .with_default(".")
        .with_validator(validate_dir)
        .prompt()
        .map(|s| PathBuf::from(s.trim()))
        .map_err(prompt_err)?;

    let format = Select::new("Output format", OutputFormat::ALL.to_vec())
        .prompt()
        .map_err(prompt_err)?;

    let output_name = Text::new("Image name (extension is added)")
        .with_default(mpfs::DEFAULT_OUTPUT_NAME)
        .with_validator(validate_name)
        .prompt()
        .map(|s| s.trim().to_string())
        .map_err(prompt_err)?;

    let mut config = BuildConfig {
        source,
        output_dir,
        output_name,
        format,
        ..BuildConfig::default()
    };

    if format.is_classic() {
        config.reserve_block = Text::new("Reserve block (bytes ahead of the image)")
            .with_default("0")
            .with_validator(validate_reserve)
            .prompt()
            .map_err(prompt_err)?
            .trim()
            .parse::<u32>()
            .map_err(|e| MpfsError::Invalid(format!("reserve block: {e}")))?;
    } else {
        let dynamic = Text::new("Dynamic files (comma-separated suffixes)")
            .with_default(mpfs::DEFAULT_DYNAMIC_TYPES)
            .prompt()
            .map_err(prompt_err)?;
        config.dynamic_types = TypeList::parse(&dynamic);

        let no_compress = Text::new("Never compress (comma-separated suffixes)")
            .with_default(mpfs::DEFAULT_NO_COMPRESS_TYPES)
            .prompt()
            .map_err(prompt_err)?;
        config.no_compress_types = TypeList::parse(&no_compress);
    }

    println!("\nBuild summary:");
    println!("  source     : {}", config.source.display());
    println!("  output dir : {}", config.output_dir.display());
    println!("  name       : {}", config.output_name);
    println!("  format     : {}", config.format);
    if config.format.is_classic() {
        println!("  reserve    : {} bytes", config.reserve_block);
    } else {
        println!("  dynamic    : {}", show_types(&config.dynamic_types));
        println!("  no gzip    : {}", show_types(&config.no_compress_types));
    }

    let proceed = Confirm::new("Proceed?")
        .with_default(true)
        .prompt()
        .map_err(prompt_err)?;
    if !proceed {
        return Ok(());
    }

    mpfs::build(config).map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_valid(v: Validation) -> bool {
        matches!(v, Validation::Valid)
    }

    #[test]
    fn reserve_block_must_be_a_byte_count() {
        assert!(is_valid(validate_reserve("0").unwrap()));
        assert!(is_valid(validate_reserve(" 4096 ").unwrap()));
        assert!(!is_valid(validate_reserve("4k").unwrap()));
        assert!(!is_valid(validate_reserve("-1").unwrap()));
        assert!(!is_valid(validate_reserve("").unwrap()));
    }

    #[test]
    fn image_name_must_be_plain() {
        assert!(is_valid(validate_name("MPFSImg2").unwrap()));
        assert!(!is_valid(validate_name("out/img").unwrap()));
        assert!(!is_valid(validate_name("  ").unwrap()));
    }
}
