//! Capability-based file helpers for UTF-8 paths.

use std::io;

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::{ambient_authority, fs_utf8};

/// Open the directory containing `path` and return it with the file name.
pub fn open_parent(path: &Utf8Path) -> io::Result<(fs_utf8::Dir, String)> {
    let name = path
        .file_name()
        .ok_or_else(|| io::Error::other(format!("{path} does not name a file")))?
        .to_owned();
    let parent = match path.parent() {
        Some(parent) if !parent.as_str().is_empty() => parent,
        _ => Utf8Path::new("."),
    };
    let dir = fs_utf8::Dir::open_ambient_dir(parent, ambient_authority())?;
    Ok((dir, name))
}

/// Create every missing directory above `path`.
pub fn ensure_parent_dir(path: &Utf8Path) -> io::Result<()> {
    let Some(parent) = path.parent() else {
        return Ok(());
    };
    if parent.as_str().is_empty() {
        return Ok(());
    }
    let (base, relative) = if parent.is_absolute() {
        let relative = parent.strip_prefix("/").unwrap_or(parent);
        ("/", Utf8PathBuf::from(relative))
    } else {
        (".", parent.to_path_buf())
    };
    if relative.as_str().is_empty() {
        return Ok(());
    }
    fs_utf8::Dir::open_ambient_dir(base, ambient_authority())?.create_dir_all(&relative)
}

/// Read the whole file at `path` as UTF-8 text.
pub fn read_to_string(path: &Utf8Path) -> io::Result<String> {
    let (dir, name) = open_parent(path)?;
    dir.read_to_string(name)
}

/// Whether `path` exists and is a regular file.
///
/// # Errors
/// Propagates I/O failures, including `NotFound` when the parent is absent.
pub fn file_is_file(path: &Utf8Path) -> io::Result<bool> {
    let (dir, name) = open_parent(path)?;
    match dir.metadata(&name) {
        Ok(metadata) => Ok(metadata.is_file()),
        Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(error) => Err(error),
    }
}

/// Replace the file at `path` with `contents`, creating parents as needed.
pub fn write(path: &Utf8Path, contents: &[u8]) -> io::Result<()> {
    ensure_parent_dir(path)?;
    let (dir, name) = open_parent(path)?;
    dir.write(name, contents)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use tempfile::TempDir;

    fn utf8(dir: &TempDir) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf-8 temp dir")
    }

    #[rstest]
    fn writes_create_missing_parents() {
        let dir = TempDir::new().expect("tempdir");
        let path = utf8(&dir).join("nested/deeper/state.json");
        write(&path, b"{}").expect("write file");
        assert_eq!(read_to_string(&path).expect("read back"), "{}");
    }

    #[rstest]
    fn reading_a_missing_file_fails() {
        let dir = TempDir::new().expect("tempdir");
        let err = read_to_string(&utf8(&dir).join("absent.json")).expect_err("missing file");
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[rstest]
    fn directories_are_not_files() {
        let dir = TempDir::new().expect("tempdir");
        let root = utf8(&dir);
        write(&root.join("present.json"), b"[]").expect("write file");
        assert!(file_is_file(&root.join("present.json")).expect("inspect file"));
        assert!(!file_is_file(&root.join("absent.json")).expect("inspect missing"));
        std::fs::create_dir(root.join("sub")).expect("create dir");
        assert!(!file_is_file(&root.join("sub")).expect("inspect dir"));
    }

    #[rstest]
    fn paths_without_a_file_name_are_rejected() {
        assert!(open_parent(Utf8Path::new("/")).is_err());
    }
}
