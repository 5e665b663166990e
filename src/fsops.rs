//! Filesystem access behind a trait.
//!
//! The pipeline only touches disk through [`FileSystem`], so tests can wrap
//! [`LocalFs`] to inject failures. All writes that replace something a reader
//! might be looking at (links, the manifest) go through a temporary file and a
//! rename in the same directory.

use sha2::{Digest, Sha256};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// Size and modification time of a file.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FileStat {
    pub size: u64,
    /// Seconds since the Unix epoch, with sub-second precision.
    pub mtime: f64,
}

pub trait FileSystem {
    /// Regular files directly inside `dir` (symlinks followed), sorted by path.
    fn list_files(&self, dir: &Path) -> io::Result<Vec<PathBuf>>;

    fn stat(&self, path: &Path) -> io::Result<FileStat>;

    /// Content hash formatted as `sha256-<hex>`.
    fn hash_file(&self, path: &Path) -> io::Result<String>;

    /// True when `path` resolves to something. A dangling symlink does not.
    fn exists(&self, path: &Path) -> bool;

    /// Absolute path with every symlink resolved.
    fn canonicalize(&self, path: &Path) -> io::Result<PathBuf>;

    fn create_dir_all(&self, dir: &Path) -> io::Result<()>;

    /// Point `link` at `target`, replacing whatever `link` was.
    fn create_link(&self, target: &Path, link: &Path) -> io::Result<()>;

    fn link_points_to(&self, link: &Path, target: &Path) -> bool;

    /// Remove `link` if it is a symlink. Returns whether anything was removed.
    fn remove_link(&self, link: &Path) -> io::Result<bool>;

    /// Replace `path` with `contents` via `<name>.tmp` and a rename.
    fn write_atomic(&self, path: &Path, contents: &[u8]) -> io::Result<()>;

    /// Probe that `dir` supports the temp-then-rename write pattern.
    fn check_atomic_write(&self, dir: &Path) -> io::Result<()>;
}

/// [`FileSystem`] on the real disk.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalFs;

impl FileSystem for LocalFs {
    fn list_files(&self, dir: &Path) -> io::Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if fs::metadata(&path).map(|m| m.is_file()).unwrap_or(false) {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }

    fn stat(&self, path: &Path) -> io::Result<FileStat> {
        let meta = fs::metadata(path)?;
        Ok(FileStat {
            size: meta.len(),
            mtime: epoch_seconds(meta.modified()?),
        })
    }

    fn hash_file(&self, path: &Path) -> io::Result<String> {
        let mut file = fs::File::open(path)?;
        let mut hasher = Sha256::new();
        io::copy(&mut file, &mut hasher)?;
        Ok(format!("sha256-{:x}", hasher.finalize()))
    }

    fn exists(&self, path: &Path) -> bool {
        fs::metadata(path).is_ok()
    }

    fn canonicalize(&self, path: &Path) -> io::Result<PathBuf> {
        fs::canonicalize(path)
    }

    fn create_dir_all(&self, dir: &Path) -> io::Result<()> {
        fs::create_dir_all(dir)
    }

    fn create_link(&self, target: &Path, link: &Path) -> io::Result<()> {
        let tmp = sibling(link, |name| format!(".tmp_{name}_{}", std::process::id()));
        if fs::symlink_metadata(&tmp).is_ok() {
            fs::remove_file(&tmp)?;
        }
        make_symlink(target, &tmp)?;
        fs::rename(&tmp, link).inspect_err(|_| {
            let _ = fs::remove_file(&tmp);
        })
    }

    fn link_points_to(&self, link: &Path, target: &Path) -> bool {
        fs::read_link(link).map(|t| t == target).unwrap_or(false)
    }

    fn remove_link(&self, link: &Path) -> io::Result<bool> {
        match fs::symlink_metadata(link) {
            Ok(meta) if meta.file_type().is_symlink() => {
                fs::remove_file(link)?;
                Ok(true)
            }
            Ok(_) => Ok(false),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        }
    }

    fn write_atomic(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        let tmp = sibling(path, |name| format!("{name}.tmp"));
        fs::write(&tmp, contents)
            .and_then(|()| fs::rename(&tmp, path))
            .inspect_err(|_| {
                let _ = fs::remove_file(&tmp);
            })
    }

    fn check_atomic_write(&self, dir: &Path) -> io::Result<()> {
        let pid = std::process::id();
        let probe = dir.join(format!(".normpic_probe_{pid}.tmp"));
        let renamed = dir.join(format!(".normpic_probe_{pid}"));
        fs::write(&probe, b"probe")?;
        let result = fs::rename(&probe, &renamed);
        let _ = fs::remove_file(&probe);
        let _ = fs::remove_file(&renamed);
        result
    }
}

fn sibling(path: &Path, name: impl FnOnce(&str) -> String) -> PathBuf {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(name(&file_name))
}

fn epoch_seconds(time: SystemTime) -> f64 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(d) => d.as_secs_f64(),
        Err(e) => -e.duration().as_secs_f64(),
    }
}

#[cfg(unix)]
fn make_symlink(target: &Path, link: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(windows)]
fn make_symlink(target: &Path, link: &Path) -> io::Result<()> {
    std::os::windows::fs::symlink_file(target, link)
}
