// src/upload.rs - Locating PlatformIO and running its uploadfs target
use std::env;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};
use tracing::{debug, info};

use crate::error::UploadError;

const TOOL_NAMES: [&str; 2] = ["platformio", "pio"];

#[derive(Clone, Debug)]
pub struct UploadCommand {
    program: PathBuf,
    args: Vec<OsString>,
    working_dir: PathBuf,
}

impl UploadCommand {
    /// `<program> run --target uploadfs`, run from the project root.
    pub fn new(program: impl Into<PathBuf>, project_dir: &Path) -> Self {
        Self {
            program: program.into(),
            args: ["run", "--target", "uploadfs"].map(OsString::from).to_vec(),
            working_dir: project_dir.to_path_buf(),
        }
    }

    pub fn environment(mut self, name: &str) -> Self {
        self.args.push("--environment".into());
        self.args.push(name.into());
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn to_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args).current_dir(&self.working_dir);
        cmd
    }

    pub fn describe(&self) -> String {
        let mut line = self.program.display().to_string();
        for arg in &self.args {
            line.push(' ');
            line.push_str(&arg.to_string_lossy());
        }
        line
    }
}

/// Runs the upload and waits for it. The child shares our stdin, stdout and
/// stderr. Only a failure to start is an error; the exit status is returned
/// as is.
pub fn trigger_upload(upload: &UploadCommand) -> Result<ExitStatus, UploadError> {
    info!("running `{}` in {}", upload.describe(), upload.working_dir.display());
    let status = upload
        .to_command()
        .status()
        .map_err(|source| UploadError::Launch {
            program: upload.program.clone(),
            source,
        })?;
    debug!("upload tool exited with {status}");
    Ok(status)
}

/// Exit code this tool should end with after the upload: `None` when the
/// upload succeeded, otherwise the child's own code, or 1 if it was killed
/// by a signal.
pub fn exit_code(status: &ExitStatus) -> Option<i32> {
    if status.success() {
        None
    } else {
        Some(status.code().unwrap_or(1))
    }
}

/// An explicit path wins, then `platformio`/`pio` on `PATH`, then the
/// default PlatformIO Core install under the home directory. Falls back to
/// the bare name so the launch error names what was tried.
pub fn locate_platformio(explicit: Option<&Path>) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }
    if let Some(found) = env::var_os("PATH").and_then(|paths| search_path(&paths)) {
        debug!("found upload tool on PATH: {}", found.display());
        return found;
    }
    if let Some(found) = dirs_next::home_dir()
        .map(|home| penv_executable(&home))
        .filter(|p| p.is_file())
    {
        debug!("using PlatformIO Core install: {}", found.display());
        return found;
    }
    PathBuf::from(TOOL_NAMES[0])
}

fn search_path(paths: &OsStr) -> Option<PathBuf> {
    env::split_paths(paths).find_map(|dir| {
        TOOL_NAMES
            .iter()
            .map(|name| dir.join(format!("{name}{}", env::consts::EXE_SUFFIX)))
            .find(|candidate| candidate.is_file())
    })
}

/// `~/.platformio/penv/bin/platformio`, or the `Scripts` variant on Windows.
fn penv_executable(home: &Path) -> PathBuf {
    let penv = home.join(".platformio").join("penv");
    if cfg!(windows) {
        penv.join("Scripts").join("platformio.exe")
    } else {
        penv.join("bin").join("platformio")
    }
}
