#![forbid(unsafe_code)]

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::mpfs::error::{MpfsError, MpfsResult};
use crate::mpfs::path::is_hidden;

fn walk_err(e: walkdir::Error) -> MpfsError {
    let msg = e.to_string();
    let io = e
        .into_io_error()
        .unwrap_or_else(|| std::io::Error::new(std::io::ErrorKind::Other, msg));
    MpfsError::Io(io)
}

/// Every non-hidden regular file below `root`.
///
/// Order: the files of a directory in listing order, followed by the contents of
/// each subdirectory in listing order. Nothing is sorted; this order becomes the
/// image order.
pub fn collect(root: &Path) -> MpfsResult<Vec<PathBuf>> {
    if !root.is_dir() {
        return Err(MpfsError::SourceDirectoryMissing(root.to_path_buf()));
    }
    collect_dir(root)
}

fn collect_dir(dir: &Path) -> MpfsResult<Vec<PathBuf>> {
    let mut files = Vec::new();
    let mut subdirs = Vec::new();

    let level = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(false);

    for ent in level {
        let ent = ent.map_err(walk_err)?;
        if is_hidden(ent.file_name()) {
            continue;
        }
        let ty = ent.file_type();
        if ty.is_dir() {
            subdirs.push(ent.into_path());
        } else if ty.is_file() {
            files.push(ent.into_path());
        }
    }

    for sub in subdirs {
        let nested = collect_dir(&sub)?;
        files.extend(nested);
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use std::fs;
    use tempfile::TempDir;

    fn touch(root: &Path, rel: &str) {
        let p = root.join(rel);
        fs::create_dir_all(p.parent().unwrap()).unwrap();
        fs::write(p, rel.as_bytes()).unwrap();
    }

    fn rel_set(root: &Path, files: &[PathBuf]) -> BTreeSet<String> {
        files
            .iter()
            .map(|p| {
                p.strip_prefix(root)
                    .unwrap()
                    .to_string_lossy()
                    .replace('\\', "/")
            })
            .collect()
    }

    #[test]
    fn keeps_every_sibling_subtree() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        for rel in [
            "index.htm",
            "css/site.css",
            "css/print/p.css",
            "img/logo.gif",
            "img/icons/a.png",
            "js/app.js",
        ] {
            touch(root, rel);
        }

        let files = collect(root).unwrap();
        assert_eq!(files.len(), 6);
        let set = rel_set(root, &files);
        assert_eq!(set.len(), 6);
        assert!(set.contains("css/print/p.css"));
        assert!(set.contains("img/icons/a.png"));
        assert!(set.contains("js/app.js"));
    }

    #[test]
    fn files_precede_subdirectory_contents() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        touch(root, "sub/inner.txt");
        touch(root, "top.txt");

        let files = collect(root).unwrap();
        let rels: Vec<_> = files
            .iter()
            .map(|p| p.strip_prefix(root).unwrap().to_path_buf())
            .collect();
        assert_eq!(rels[0], PathBuf::from("top.txt"));
        assert_eq!(rels[1], Path::new("sub").join("inner.txt"));
    }

    #[test]
    fn skips_hidden_files_and_directories() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        touch(root, "a.txt");
        touch(root, ".hidden");
        touch(root, ".git/config");
        touch(root, "dir/.DS_Store");
        touch(root, "dir/b.txt");

        let set = rel_set(root, &collect(root).unwrap());
        assert_eq!(
            set.into_iter().collect::<Vec<_>>(),
            vec!["a.txt".to_string(), "dir/b.txt".to_string()]
        );
    }

    #[test]
    fn empty_tree_yields_nothing() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("empty/deeper")).unwrap();
        assert!(collect(tmp.path()).unwrap().is_empty());
    }

    #[test]
    fn missing_root_is_reported() {
        let tmp = TempDir::new().unwrap();
        let err = collect(&tmp.path().join("nope")).unwrap_err();
        assert!(matches!(err, MpfsError::SourceDirectoryMissing(_)));
    }
}
