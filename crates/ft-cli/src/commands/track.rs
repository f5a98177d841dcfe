//! Track command: the long-running sampling loop.

use std::ffi::OsString;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};
use fs2::FileExt;
use ft_core::Tracker;

use crate::Config;
use crate::commands::util::open_database;
use crate::probe::CommandSource;
use crate::sampler::Sampler;

/// Returns the path of the single-writer lock for a database.
fn lock_path(database_path: &Path) -> PathBuf {
    let mut name = OsString::from(database_path.as_os_str());
    name.push(".lock");
    PathBuf::from(name)
}

/// Takes the exclusive tracker lock for a database.
///
/// The lock is held until the returned file is dropped.
pub fn acquire_writer_lock(database_path: &Path) -> Result<File> {
    let path = lock_path(database_path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).context("failed to create database directory")?;
    }
    let file = OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(&path)
        .with_context(|| format!("failed to open lock file {}", path.display()))?;
    file.try_lock_exclusive().with_context(|| {
        format!(
            "another tracker is already running on {}",
            database_path.display()
        )
    })?;
    Ok(file)
}

pub fn run(config: &Config) -> Result<()> {
    let argv = config
        .probe_command
        .as_deref()
        .context("no probe_command configured; set it in config.toml or FT_PROBE_COMMAND")?;
    let source = CommandSource::new(argv)?;

    let _lock = acquire_writer_lock(&config.database_path)?;
    let db = open_database(config)?;

    let stop = Arc::new(AtomicBool::new(false));
    let handler_stop = Arc::clone(&stop);
    ctrlc::set_handler(move || handler_stop.store(true, Ordering::SeqCst))
        .context("failed to install signal handler")?;

    tracing::info!(
        database = %config.database_path.display(),
        interval_ms = config.sample_interval_ms,
        "tracking started"
    );
    let mut sampler = Sampler::new(
        db,
        Tracker::new(config.tracker_config()),
        source,
        config.sample_interval(),
    );
    let ticks = sampler.run(&stop).context("tracking stopped on error")?;
    tracing::info!(ticks, "tracking stopped");
    Ok(())
}
