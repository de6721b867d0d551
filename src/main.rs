// src/main.rs - uploadfs-sync: mirror data/ into the PlatformIO build tree, then run uploadfs
mod config;
mod error;
mod fs_utils;
mod mirror;
mod upload;

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use crate::config::{
    resolve_project_dir, MirrorConfig, MirrorMode, DEFAULT_BUILD_DIR, DEFAULT_DATA_DIR,
};
use crate::mirror::run_mirror;
use crate::upload::{exit_code, locate_platformio, trigger_upload, UploadCommand};

#[derive(Parser, Debug)]
#[command(
    name = "uploadfs-sync",
    about = "Copies the project's data/ folder into the PlatformIO build tree and uploads the filesystem image",
    version,
    author = "Farid",
    long_about = None
)]
struct Cli {
    #[arg(
        long,
        value_name = "DIR",
        env = "UPLOADFS_PROJECT_DIR",
        help = "PlatformIO project root (default: nearest platformio.ini above this executable)"
    )]
    project_dir: Option<PathBuf>,

    #[arg(
        short = 'e',
        long,
        value_name = "ENV",
        env = "UPLOADFS_ENVIRONMENT",
        help = "PlatformIO environment to stage and upload (default: esp32-c3-devkitm-1)"
    )]
    environment: Option<String>,

    #[arg(long, value_name = "DIR", default_value = DEFAULT_DATA_DIR, help = "Source data directory")]
    data_dir: PathBuf,

    #[arg(long, value_name = "DIR", default_value = DEFAULT_BUILD_DIR, help = "PlatformIO build directory")]
    build_dir: PathBuf,

    #[arg(long, value_name = "PATH", env = "UPLOADFS_PIO", help = "PlatformIO executable to run")]
    pio: Option<PathBuf>,

    #[arg(long, help = "Only mirror the data directory, skip the upload")]
    no_upload: bool,

    #[arg(long, help = "Build the copy next to the destination and swap it in with a rename")]
    atomic: bool,

    #[arg(short, long, action = clap::ArgAction::Count, help = "More log output (-v info, -vv debug)")]
    verbose: u8,
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let project_dir = resolve_project_dir(cli.project_dir.as_deref())?;
    let mode = if cli.atomic {
        MirrorMode::Staged
    } else {
        MirrorMode::InPlace
    };
    let config = MirrorConfig::new(
        &project_dir,
        &cli.data_dir,
        &cli.build_dir,
        cli.environment.as_deref(),
    )
    .with_mode(mode);

    run_mirror(&config).with_context(|| {
        format!(
            "mirroring {} into {} failed",
            config.source_dir.display(),
            config.dest_dir.display()
        )
    })?;

    if cli.no_upload {
        return Ok(());
    }

    let mut upload = UploadCommand::new(locate_platformio(cli.pio.as_deref()), &config.project_dir);
    if config.explicit_environment {
        upload = upload.environment(&config.environment);
    }
    let status = trigger_upload(&upload)?;
    println!("Data upload finished");

    if let Some(code) = exit_code(&status) {
        warn!("{} exited with {status}", upload.program().display());
        std::process::exit(code);
    }
    Ok(())
}
