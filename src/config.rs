// src/config.rs - Resolved paths for one run, computed once at startup
use anyhow::{Context, Result};
use std::env;
use std::path::{Path, PathBuf};

pub const DEFAULT_ENVIRONMENT: &str = "esp32-c3-devkitm-1";
pub const DEFAULT_DATA_DIR: &str = "data";
pub const DEFAULT_BUILD_DIR: &str = ".pio";
/// A directory holding this file is a PlatformIO project root.
pub const PROJECT_MARKER: &str = "platformio.ini";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MirrorMode {
    /// Clear the destination, then copy into it.
    #[default]
    InPlace,
    /// Copy into a sibling directory, then rename it over the destination.
    Staged,
}

#[derive(Clone, Debug)]
pub struct MirrorConfig {
    pub project_dir: PathBuf,
    pub source_dir: PathBuf,
    pub dest_dir: PathBuf,
    pub environment: String,
    /// Whether the environment was picked by the user and should be passed on to PlatformIO.
    pub explicit_environment: bool,
    pub mode: MirrorMode,
}

impl MirrorConfig {
    /// `data_dir` and `build_dir` are taken relative to `project_dir` unless
    /// absolute. Without an environment the default board is used and not
    /// passed on to PlatformIO.
    pub fn new(
        project_dir: &Path,
        data_dir: &Path,
        build_dir: &Path,
        environment: Option<&str>,
    ) -> Self {
        let name = environment.unwrap_or(DEFAULT_ENVIRONMENT);
        Self {
            project_dir: project_dir.to_path_buf(),
            source_dir: project_dir.join(data_dir),
            dest_dir: staged_data_dir(project_dir, build_dir, name),
            environment: name.to_owned(),
            explicit_environment: environment.is_some(),
            mode: MirrorMode::InPlace,
        }
    }

    /// `<project>/data` mirrored into `<project>/.pio/build/<default env>/data`.
    pub fn conventional(project_dir: &Path) -> Self {
        Self::new(
            project_dir,
            Path::new(DEFAULT_DATA_DIR),
            Path::new(DEFAULT_BUILD_DIR),
            None,
        )
    }

    pub fn with_mode(mut self, mode: MirrorMode) -> Self {
        self.mode = mode;
        self
    }
}

/// Where PlatformIO expects the data directory for `environment`. A relative
/// `build_dir` hangs off the project root; an absolute one is used as is.
pub fn staged_data_dir(project_dir: &Path, build_dir: &Path, environment: &str) -> PathBuf {
    project_dir
        .join(build_dir)
        .join("build")
        .join(environment)
        .join("data")
}

/// First ancestor of `start` (itself included) that contains `platformio.ini`,
/// or `start` when there is none.
pub fn project_dir_from(start: &Path) -> PathBuf {
    start
        .ancestors()
        .find(|dir| dir.join(PROJECT_MARKER).is_file())
        .unwrap_or(start)
        .to_path_buf()
}

/// Project root for this run. An explicit directory is made absolute against
/// the working directory; otherwise the search starts next to the executable,
/// so the result does not depend on where the tool was started from.
pub fn resolve_project_dir(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(dir) = explicit {
        return std::path::absolute(dir)
            .with_context(|| format!("cannot resolve project directory {}", dir.display()));
    }
    let exe = env::current_exe().context("cannot locate the running executable")?;
    let exe = exe.canonicalize().unwrap_or(exe);
    let exe_dir = exe
        .parent()
        .with_context(|| format!("executable {} has no parent directory", exe.display()))?;
    Ok(project_dir_from(exe_dir))
}
