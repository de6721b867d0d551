// src/error.rs - Error types for mirroring and launching the upload tool
use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::fs_utils::EntryKind;

#[derive(Debug, Error)]
pub enum MirrorError {
    #[error("source directory {} does not exist", .0.display())]
    SourceMissing(PathBuf),

    #[error("source path {} is not a directory", .0.display())]
    SourceNotDirectory(PathBuf),

    #[error("destination {} exists but is a {found}, not a directory", .path.display())]
    DestinationNotDirectory { path: PathBuf, found: EntryKind },

    #[error(
        "source {} and destination {} overlap",
        .source_dir.display(),
        .dest_dir.display()
    )]
    Overlap {
        source_dir: PathBuf,
        dest_dir: PathBuf,
    },

    #[error("cannot create directory {}", .path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot list directory {}", .path.display())]
    ReadDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot remove {}", .path.display())]
    Remove {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot copy {} -> {}", .from.display(), .to.display())]
    Copy {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot walk {}", .path.display())]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error(
        "cannot copy {expected} onto existing {found} at {}",
        .path.display()
    )]
    TypeConflict {
        path: PathBuf,
        expected: EntryKind,
        found: EntryKind,
    },

    #[error("cannot rename {} -> {}", .from.display(), .to.display())]
    Rename {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("failed to launch {} (is PlatformIO installed? try --pio <PATH>)", .program.display())]
    Launch {
        program: PathBuf,
        #[source]
        source: io::Error,
    },
}
