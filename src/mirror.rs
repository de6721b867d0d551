// src/mirror.rs - Clear-then-copy mirroring of the data directory into the build tree
use chrono::Local;
use nanoid::nanoid;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::config::{MirrorConfig, MirrorMode};
use crate::error::MirrorError;
use crate::fs_utils::{
    copy_file_with_metadata, copy_recursively, paths_overlap, remove_recursively, CopyStats,
    EntryKind,
};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MirrorReport {
    /// Names of the top-level entries that were copied, in copy order.
    pub entries: Vec<String>,
    pub stats: CopyStats,
}

pub fn ensure_directory(path: &Path) -> Result<(), MirrorError> {
    fs::create_dir_all(path).map_err(|source| MirrorError::CreateDir {
        path: path.to_path_buf(),
        source,
    })
}

/// Empties `path`, leaving the directory itself in place. Returns how many
/// entries were removed. Stops at the first entry that cannot be removed.
pub fn clear_directory(path: &Path) -> Result<usize, MirrorError> {
    let mut removed = 0;
    for item in read_dir_sorted(path)? {
        remove_recursively(&item)?;
        removed += 1;
    }
    info!("cleared {removed} entries from {}", path.display());
    Ok(removed)
}

/// Copies every direct entry of `source_dir` into `dest_dir` under the same
/// name, printing one line per top-level entry.
pub fn copy_tree(source_dir: &Path, dest_dir: &Path) -> Result<MirrorReport, MirrorError> {
    let mut report = MirrorReport::default();

    for src in read_dir_sorted(source_dir)? {
        let Some(name) = src.file_name() else {
            continue;
        };
        let dst = dest_dir.join(name);

        let Some(kind) = EntryKind::follow(&src) else {
            warn!("skipping {}: dangling symlink", src.display());
            report.stats.skipped += 1;
            continue;
        };
        if !matches!(kind, EntryKind::File | EntryKind::Dir) {
            warn!("skipping {}: {kind}", src.display());
            report.stats.skipped += 1;
            continue;
        }
        check_destination_slot(&dst, kind)?;

        if kind == EntryKind::File {
            report.stats.bytes += copy_file_with_metadata(&src, &dst)?;
            report.stats.files += 1;
            println!("Copied file: {} -> {}", src.display(), dst.display());
        } else {
            report.stats.absorb(copy_recursively(&src, &dst)?);
            println!("Copied directory: {} -> {}", src.display(), dst.display());
        }
        report.entries.push(name.to_string_lossy().into_owned());
    }

    Ok(report)
}

/// Same-kind collisions are fine (file overwrite, directory merge); anything
/// else is refused.
fn check_destination_slot(dst: &Path, kind: EntryKind) -> Result<(), MirrorError> {
    match EntryKind::probe(dst) {
        None => Ok(()),
        Some(found) if found == kind => Ok(()),
        Some(found) => Err(MirrorError::TypeConflict {
            path: dst.to_path_buf(),
            expected: kind,
            found,
        }),
    }
}

fn read_dir_sorted(path: &Path) -> Result<Vec<PathBuf>, MirrorError> {
    let read_err = |source| MirrorError::ReadDir {
        path: path.to_path_buf(),
        source,
    };
    let mut items = fs::read_dir(path)
        .map_err(read_err)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<Result<Vec<_>, _>>()
        .map_err(read_err)?;
    items.sort();
    Ok(items)
}

fn validate(config: &MirrorConfig) -> Result<(), MirrorError> {
    let source_dir = &config.source_dir;
    match EntryKind::follow(source_dir) {
        None => return Err(MirrorError::SourceMissing(source_dir.clone())),
        Some(EntryKind::Dir) => {}
        Some(_) => return Err(MirrorError::SourceNotDirectory(source_dir.clone())),
    }
    match EntryKind::probe(&config.dest_dir) {
        None | Some(EntryKind::Dir) => {}
        Some(found) => {
            return Err(MirrorError::DestinationNotDirectory {
                path: config.dest_dir.clone(),
                found,
            })
        }
    }
    if paths_overlap(source_dir, &config.dest_dir) {
        return Err(MirrorError::Overlap {
            source_dir: source_dir.clone(),
            dest_dir: config.dest_dir.clone(),
        });
    }
    Ok(())
}

/// Makes `config.dest_dir` an exact copy of `config.source_dir`.
///
/// Every check that can fail without side effects runs first, so a missing
/// source never costs the previous destination contents.
pub fn run_mirror(config: &MirrorConfig) -> Result<MirrorReport, MirrorError> {
    validate(config)?;
    info!(
        "mirroring {} -> {} ({:?})",
        config.source_dir.display(),
        config.dest_dir.display(),
        config.mode
    );

    let report = match config.mode {
        MirrorMode::InPlace => {
            ensure_directory(&config.dest_dir)?;
            clear_directory(&config.dest_dir)?;
            copy_tree(&config.source_dir, &config.dest_dir)?
        }
        MirrorMode::Staged => mirror_staged(&config.source_dir, &config.dest_dir)?,
    };

    println!(
        "Data files ready for SPIFFS upload ({} entries, {} files, {} bytes) at {}",
        report.entries.len(),
        report.stats.files,
        report.stats.bytes,
        Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    Ok(report)
}

/// Builds the new tree in a sibling directory and swaps it in with renames.
fn mirror_staged(source_dir: &Path, dest_dir: &Path) -> Result<MirrorReport, MirrorError> {
    let parent = dest_dir.parent().unwrap_or(Path::new("."));
    let name = dest_dir
        .file_name()
        .map_or_else(|| "data".to_owned(), |n| n.to_string_lossy().into_owned());
    ensure_directory(parent)?;

    let id = nanoid!(10);
    let staging = parent.join(format!(".{name}.staging-{id}"));
    let retired = parent.join(format!(".{name}.old-{id}"));

    let staged = fs::create_dir(&staging)
        .map_err(|source| MirrorError::CreateDir {
            path: staging.clone(),
            source,
        })
        .and_then(|_| copy_tree(source_dir, &staging));
    let report = match staged {
        Ok(report) => report,
        Err(e) => {
            discard(&staging);
            return Err(e);
        }
    };

    let had_previous = EntryKind::probe(dest_dir).is_some();
    if had_previous {
        if let Err(e) = rename(dest_dir, &retired) {
            discard(&staging);
            return Err(e);
        }
    }
    if let Err(e) = rename(&staging, dest_dir) {
        if had_previous {
            if let Err(restore) = rename(&retired, dest_dir) {
                warn!("previous data left at {}: {restore}", retired.display());
            }
        }
        discard(&staging);
        return Err(e);
    }
    if had_previous {
        discard(&retired);
    }

    info!("swapped staged tree into {}", dest_dir.display());
    Ok(report)
}

fn rename(from: &Path, to: &Path) -> Result<(), MirrorError> {
    fs::rename(from, to).map_err(|source| MirrorError::Rename {
        from: from.to_path_buf(),
        to: to.to_path_buf(),
        source,
    })
}

fn discard(path: &Path) {
    if let Err(e) = remove_recursively(path) {
        warn!("could not clean up {}: {e}", path.display());
    }
}
