//! Data store operations and directory layout.

use anyhow::{Context, Result};
use std::fs::{self, File};
use std::path::Path;

use crate::config::{Config, HostsyncPaths};

/// Ensure the hostsync data directory exists.
pub fn ensure_dirs(paths: &HostsyncPaths) -> Result<()> {
    fs::create_dir_all(&paths.config_dir)?;
    Ok(())
}

/// Load config from store.
pub fn load_config(paths: &HostsyncPaths) -> Result<Config> {
    Config::load(paths)
}

/// Save config to store.
pub fn save_config(paths: &HostsyncPaths, config: &Config) -> Result<()> {
    Config::save(config, paths)
}

/// Advisory exclusive lock held for the duration of a hosts file update.
/// Released when dropped.
#[derive(Debug)]
pub struct SyncLock {
    _file: File,
}

/// Block until the lock on `lock_file` is ours. Creates the file if needed.
pub fn lock_exclusive(lock_file: &Path) -> Result<SyncLock> {
    if let Some(p) = lock_file.parent() {
        fs::create_dir_all(p)?;
    }
    let file = fs::OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(lock_file)
        .with_context(|| format!("open lock file {}", lock_file.display()))?;
    fs2::FileExt::lock_exclusive(&file)
        .with_context(|| format!("lock {}", lock_file.display()))?;
    Ok(SyncLock { _file: file })
}
