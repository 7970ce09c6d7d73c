#![forbid(unsafe_code)]

use std::path::{Path, PathBuf};

use crate::mpfs::error::{MpfsError, MpfsResult};

/// Image name of `file_path`: its path below `root`, joined with forward slashes.
pub fn image_name(root: &Path, file_path: &Path) -> MpfsResult<String> {
    let rel = file_path.strip_prefix(root).map_err(|_| {
        MpfsError::Invalid(format!(
            "{} is outside {}",
            file_path.display(),
            root.display()
        ))
    })?;

    let mut out = String::new();
    for (i, comp) in rel.components().enumerate() {
        if i != 0 {
            out.push('/');
        }
        out.push_str(&comp.as_os_str().to_string_lossy());
    }
    out = out.replace('\\', "/");

    let out = out.trim_start_matches('/').to_string();
    if out.is_empty() {
        return Err(MpfsError::Invalid("empty relative path".into()));
    }

    Ok(out)
}

/// Comma-separated list of file name suffixes, e.g. `"*.htm, *.cgi"`.
///
/// `*` is decorative and stripped; matching is a plain suffix test.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeList(Vec<String>);

impl TypeList {
    pub fn parse(csv: &str) -> Self {
        Self(
            csv.split(',')
                .map(|x| x.replace('*', " ").trim().to_string())
                .filter(|x| !x.is_empty())
                .collect(),
        )
    }

    pub fn matches(&self, name: &str) -> bool {
        self.0.iter().any(|end| name.ends_with(end.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

/// Fails when `output` is `source` or lies below it: the generator would
/// otherwise pick up its own artifacts on the next run.
pub fn check_path_conflict(source: &Path, output: &Path) -> MpfsResult<()> {
    let source_abs = source.canonicalize()?;
    let output_abs = output.canonicalize()?;
    if output_abs.starts_with(&source_abs) {
        return Err(MpfsError::PathConflict {
            output: output.to_path_buf(),
            source_dir: source.to_path_buf(),
        });
    }
    Ok(())
}

/// `dir/name`, with `ext` appended unless `name` already ends with it.
pub fn artifact_path(dir: &Path, name: &str, ext: &str) -> PathBuf {
    if name.ends_with(ext) {
        dir.join(name)
    } else {
        dir.join(format!("{name}{ext}"))
    }
}

pub fn is_hidden(name: &std::ffi::OsStr) -> bool {
    name.to_string_lossy().starts_with('.')
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn image_name_uses_forward_slashes() {
        let root = Path::new("/srv/web");
        let f = root.join("dir").join("b.txt");
        assert_eq!(image_name(root, &f).unwrap(), "dir/b.txt");
        assert_eq!(image_name(root, &root.join("a.txt")).unwrap(), "a.txt");
    }

    #[test]
    fn image_name_rejects_outside_paths() {
        let err = image_name(Path::new("/srv/web"), Path::new("/etc/passwd"));
        assert!(matches!(err, Err(MpfsError::Invalid(_))));
        assert!(image_name(Path::new("/srv/web"), Path::new("/srv/web")).is_err());
    }

    #[test]
    fn type_list_strips_wildcards() {
        let types = TypeList::parse("*.htm, *.html,, *.cgi ,snmp.bib,*");
        assert_eq!(types.as_slice(), &[".htm", ".html", ".cgi", "snmp.bib"]);
        assert!(types.matches("index.htm"));
        assert!(types.matches("dir/status.cgi"));
        assert!(types.matches("snmp.bib"));
        assert!(!types.matches("logo.gif"));
        assert!(TypeList::parse(" , *").is_empty());
    }

    #[test]
    fn type_list_is_suffix_only() {
        let types = TypeList::parse("*.inc");
        assert!(!types.matches("file.inc.bak"));
        assert!(types.matches("header.inc"));
    }

    #[test]
    fn output_inside_source_conflicts() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("web");
        let inner = src.join("build");
        let outside = tmp.path().join("out");
        fs::create_dir_all(&inner).unwrap();
        fs::create_dir_all(&outside).unwrap();

        assert!(matches!(
            check_path_conflict(&src, &src),
            Err(MpfsError::PathConflict { .. })
        ));
        assert!(matches!(
            check_path_conflict(&src, &inner),
            Err(MpfsError::PathConflict { .. })
        ));
        assert!(check_path_conflict(&src, &outside).is_ok());
        // Sibling sharing a string prefix is not a conflict.
        let web2 = tmp.path().join("web2");
        fs::create_dir_all(&web2).unwrap();
        assert!(check_path_conflict(&src, &web2).is_ok());
    }

    #[test]
    fn artifact_path_appends_extension_once() {
        let dir = Path::new("/out");
        assert_eq!(artifact_path(dir, "MPFSImg2", ".bin"), dir.join("MPFSImg2.bin"));
        assert_eq!(artifact_path(dir, "img.bin", ".bin"), dir.join("img.bin"));
    }
}
