// src/fs_utils.rs - Entry classification plus recursive copy and remove helpers
use filetime::{set_file_times, FileTime};
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::MirrorError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Dir,
    Symlink,
    Other,
}

impl EntryKind {
    pub fn of(meta: &fs::Metadata) -> Self {
        let ft = meta.file_type();
        if ft.is_symlink() {
            EntryKind::Symlink
        } else if ft.is_dir() {
            EntryKind::Dir
        } else if ft.is_file() {
            EntryKind::File
        } else {
            EntryKind::Other
        }
    }

    /// Kind of whatever `path` resolves to. `None` if nothing is there or the link dangles.
    pub fn follow(path: &Path) -> Option<Self> {
        fs::metadata(path).ok().map(|m| Self::of(&m))
    }

    /// Kind of `path` itself; a trailing symlink is reported as `Symlink`.
    pub fn probe(path: &Path) -> Option<Self> {
        fs::symlink_metadata(path).ok().map(|m| Self::of(&m))
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntryKind::File => "file",
            EntryKind::Dir => "directory",
            EntryKind::Symlink => "symlink",
            EntryKind::Other => "special file",
        };
        f.write_str(name)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CopyStats {
    pub files: usize,
    pub dirs: usize,
    pub bytes: u64,
    pub skipped: usize,
}

impl CopyStats {
    pub fn absorb(&mut self, other: CopyStats) {
        self.files += other.files;
        self.dirs += other.dirs;
        self.bytes += other.bytes;
        self.skipped += other.skipped;
    }
}

/// Copies contents and permissions, then carries over access/modification
/// times. Timestamps are best-effort: failing to set them only logs.
pub fn copy_file_with_metadata(src: &Path, dst: &Path) -> Result<u64, MirrorError> {
    let bytes = fs::copy(src, dst).map_err(|source| MirrorError::Copy {
        from: src.to_path_buf(),
        to: dst.to_path_buf(),
        source,
    })?;
    preserve_times(src, dst);
    debug!("copied {} bytes: {} -> {}", bytes, src.display(), dst.display());
    Ok(bytes)
}

fn preserve_times(src: &Path, dst: &Path) {
    if let Err(e) = copy_times(src, dst) {
        warn!("could not preserve timestamps on {}: {e}", dst.display());
    }
}

fn copy_times(src: &Path, dst: &Path) -> io::Result<()> {
    let meta = fs::metadata(src)?;
    set_file_times(
        dst,
        FileTime::from_last_access_time(&meta),
        FileTime::from_last_modification_time(&meta),
    )
}

/// Copies the tree under `src` to `dst`. Any entry the walk cannot resolve,
/// a dangling symlink included, aborts the copy. Directory timestamps are
/// applied once the walk is done, since filling a directory bumps its mtime.
pub fn copy_recursively(src: &Path, dst: &Path) -> Result<CopyStats, MirrorError> {
    let mut stats = CopyStats::default();
    let mut dirs = Vec::new();
    for entry in WalkDir::new(src).follow_links(true).sort_by_file_name() {
        let entry = entry.map_err(|err| {
            let path = err.path().map_or_else(|| src.to_path_buf(), Path::to_path_buf);
            MirrorError::Walk { path, source: err }
        })?;

        let src_path = entry.path();
        let Ok(rel) = src_path.strip_prefix(src) else {
            continue;
        };
        let dst_path = dst.join(rel);
        let ft = entry.file_type();

        if ft.is_dir() {
            fs::create_dir_all(&dst_path).map_err(|source| MirrorError::CreateDir {
                path: dst_path.clone(),
                source,
            })?;
            stats.dirs += 1;
            dirs.push((src_path.to_path_buf(), dst_path));
        } else if ft.is_file() {
            stats.bytes += copy_file_with_metadata(src_path, &dst_path)?;
            stats.files += 1;
        } else {
            warn!("skipping special file {}", src_path.display());
            stats.skipped += 1;
        }
    }
    for (src_dir, dst_dir) in &dirs {
        preserve_times(src_dir, dst_dir);
    }
    Ok(stats)
}

/// Removes `path` without following a trailing symlink: links are unlinked,
/// real directories are removed with everything under them.
pub fn remove_recursively(path: &Path) -> Result<(), MirrorError> {
    if EntryKind::probe(path) == Some(EntryKind::Dir) {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    }
    .map_err(|source| MirrorError::Remove {
        path: path.to_path_buf(),
        source,
    })
}

/// True when one path is the other or lies inside it. Paths that do not exist
/// yet are resolved through their nearest existing ancestor.
pub fn paths_overlap(a: &Path, b: &Path) -> bool {
    let a = resolve_path(a);
    let b = resolve_path(b);
    a.starts_with(&b) || b.starts_with(&a)
}

fn resolve_path(path: &Path) -> PathBuf {
    if let Ok(p) = fs::canonicalize(path) {
        return p;
    }
    match (path.parent(), path.file_name()) {
        (Some(parent), Some(name)) if !parent.as_os_str().is_empty() => {
            resolve_path(parent).join(name)
        }
        _ => std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn copy_recursively_keeps_nested_layout() {
        let tmp = tempdir().unwrap();
        let src = tmp.path().join("src");
        fs::create_dir_all(src.join("a/b")).unwrap();
        fs::write(src.join("top.txt"), "top").unwrap();
        fs::write(src.join("a/b/deep.bin"), [0u8, 1, 2, 3]).unwrap();

        let dst = tmp.path().join("dst");
        let stats = copy_recursively(&src, &dst).unwrap();

        assert_eq!(fs::read(dst.join("top.txt")).unwrap(), b"top");
        assert_eq!(fs::read(dst.join("a/b/deep.bin")).unwrap(), [0u8, 1, 2, 3]);
        assert_eq!(stats.files, 2);
        // dst itself, a, a/b
        assert_eq!(stats.dirs, 3);
        assert_eq!(stats.bytes, 7);
    }

    #[test]
    fn copy_preserves_modification_time() {
        let tmp = tempdir().unwrap();
        let src = tmp.path().join("old.txt");
        let dst = tmp.path().join("copy.txt");
        fs::write(&src, "stamp").unwrap();
        let stamp = FileTime::from_unix_time(1_500_000_000, 0);
        filetime::set_file_mtime(&src, stamp).unwrap();

        copy_file_with_metadata(&src, &dst).unwrap();

        let meta = fs::metadata(&dst).unwrap();
        assert_eq!(FileTime::from_last_modification_time(&meta), stamp);
    }

    #[test]
    fn copy_missing_file_reports_both_paths() {
        let tmp = tempdir().unwrap();
        let src = tmp.path().join("nope.txt");
        let dst = tmp.path().join("dst.txt");

        let err = copy_file_with_metadata(&src, &dst).unwrap_err();
        match err {
            MirrorError::Copy { from, to, .. } => {
                assert_eq!(from, src);
                assert_eq!(to, dst);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn remove_recursively_handles_files_and_dirs() {
        let tmp = tempdir().unwrap();
        let file = tmp.path().join("f.txt");
        let dir = tmp.path().join("d");
        fs::write(&file, "x").unwrap();
        fs::create_dir_all(dir.join("inner")).unwrap();
        fs::write(dir.join("inner/g.txt"), "y").unwrap();

        remove_recursively(&file).unwrap();
        remove_recursively(&dir).unwrap();

        assert!(!file.exists());
        assert!(!dir.exists());
    }

    #[cfg(unix)]
    #[test]
    fn remove_recursively_unlinks_symlink_without_touching_target() {
        let tmp = tempdir().unwrap();
        let target = tmp.path().join("keep");
        fs::create_dir(&target).unwrap();
        fs::write(target.join("precious.txt"), "keep me").unwrap();
        let link = tmp.path().join("link");
        std::os::unix::fs::symlink(&target, &link).unwrap();

        remove_recursively(&link).unwrap();

        assert!(EntryKind::probe(&link).is_none());
        assert_eq!(fs::read_to_string(target.join("precious.txt")).unwrap(), "keep me");
    }

    #[cfg(unix)]
    #[test]
    fn copy_recursively_fails_on_nested_dangling_symlink() {
        let tmp = tempdir().unwrap();
        let src = tmp.path().join("src");
        fs::create_dir_all(src.join("sub")).unwrap();
        fs::write(src.join("sub/ok.txt"), "ok").unwrap();
        let broken = src.join("sub/broken");
        std::os::unix::fs::symlink(tmp.path().join("gone"), &broken).unwrap();

        let err = copy_recursively(&src, &tmp.path().join("dst")).unwrap_err();
        match err {
            MirrorError::Walk { path, .. } => assert_eq!(path, broken),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn copy_recursively_preserves_directory_times() {
        let tmp = tempdir().unwrap();
        let src = tmp.path().join("src");
        fs::create_dir_all(src.join("assets/img")).unwrap();
        fs::write(src.join("assets/img/logo.png"), "png").unwrap();
        let stamp = FileTime::from_unix_time(1_400_000_000, 0);
        filetime::set_file_mtime(src.join("assets"), stamp).unwrap();
        filetime::set_file_mtime(src.join("assets/img"), stamp).unwrap();

        let dst = tmp.path().join("dst");
        copy_recursively(&src, &dst).unwrap();

        for dir in ["assets", "assets/img"] {
            let meta = fs::metadata(dst.join(dir)).unwrap();
            assert_eq!(FileTime::from_last_modification_time(&meta), stamp, "{dir}");
        }
    }

    #[test]
    fn overlap_detects_nesting_in_both_directions() {
        let tmp = tempdir().unwrap();
        let data = tmp.path().join("data");
        fs::create_dir(&data).unwrap();

        assert!(paths_overlap(&data, &data.join("not/yet/there")));
        assert!(paths_overlap(&data.join("inner"), &data));
        assert!(paths_overlap(&data, &data));
        assert!(!paths_overlap(&data, &tmp.path().join(".pio/build/env/data")));
    }
}
