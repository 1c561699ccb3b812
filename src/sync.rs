//! The sync run: privilege check, fetch, splice, backup, commit.
//!
//! Collaborators are passed in as trait objects so the whole run can be
//! driven from tests with a temp hosts file and a canned source.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::backup;
use crate::block::{extract_block, splice, synchronize, Markers, SyncAction};
use crate::config::{HostsyncPaths, Settings};
use crate::error::SyncError;
use crate::fetch::RemoteSource;
use crate::hosts::{self, FileHostsWriter, HostsWriter};
use crate::platform::{require_elevated, PrivilegeCheck};
use crate::store::{self, SyncLock};

/// Where and how to sync.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    pub hosts_file: PathBuf,
    /// None puts backups next to the hosts file.
    pub backup_dir: Option<PathBuf>,
    pub markers: Markers,
    /// Advisory lock held around read, backup and write. None skips locking.
    pub lock_file: Option<PathBuf>,
}

impl SyncOptions {
    pub fn new(hosts_file: impl Into<PathBuf>) -> Self {
        Self {
            hosts_file: hosts_file.into(),
            backup_dir: None,
            markers: Markers::default(),
            lock_file: None,
        }
    }

    pub fn from_settings(settings: &Settings, paths: &HostsyncPaths) -> Self {
        Self {
            hosts_file: settings.hosts_file.clone(),
            backup_dir: settings.backup_dir.clone(),
            markers: settings.markers.clone(),
            lock_file: Some(paths.lock_file.clone()),
        }
    }
}

/// Outcome of a sync or a dry run.
#[derive(Debug, Clone)]
pub struct SyncReport {
    pub hosts_file: PathBuf,
    pub action: SyncAction,
    /// The hosts file content differs from before.
    pub changed: bool,
    /// Normalized block taken from the remote.
    pub block: String,
    /// None for a dry run.
    pub backup: Option<PathBuf>,
}

/// Lock is advisory: failing to take it is logged, not fatal.
fn try_lock(lock_file: Option<&Path>) -> Option<SyncLock> {
    let lock_file = lock_file?;
    match store::lock_exclusive(lock_file) {
        Ok(lock) => Some(lock),
        Err(e) => {
            warn!(lock = %lock_file.display(), error = %format!("{e:#}"), "proceeding without sync lock");
            None
        }
    }
}

/// Bring the marked block in the hosts file up to date with the remote.
///
/// Either everything succeeds (hosts file updated, backup on disk) or the run
/// stops before the hosts file is touched. A failed write still leaves the
/// backup behind and names it in the error.
pub fn run_sync(
    privileges: &dyn PrivilegeCheck,
    source: &dyn RemoteSource,
    opts: &SyncOptions,
) -> Result<SyncReport, SyncError> {
    run_sync_with(privileges, source, &FileHostsWriter, opts)
}

/// [`run_sync`] with an explicit hosts writer.
pub fn run_sync_with(
    privileges: &dyn PrivilegeCheck,
    source: &dyn RemoteSource,
    writer: &dyn HostsWriter,
    opts: &SyncOptions,
) -> Result<SyncReport, SyncError> {
    require_elevated(privileges)?;

    let remote = source.fetch()?;
    let block = extract_block(&remote, &opts.markers)?;
    info!(
        url = source.url(),
        lines = block.lines().count(),
        "extracted remote block"
    );

    let _lock = try_lock(opts.lock_file.as_deref());

    let local = hosts::read_hosts(&opts.hosts_file)?;
    let spliced = splice(&local, &block, &opts.markers)?;
    let changed = spliced.content != local;

    // The backup is the exact bytes the new content was computed from.
    let backup = backup::save_backup(&opts.hosts_file, opts.backup_dir.as_deref(), &local)?;
    info!(backup = %backup.display(), "backed up hosts file");

    hosts::write_with(writer, &opts.hosts_file, &spliced.content, &backup)?;
    info!(
        hosts_file = %opts.hosts_file.display(),
        action = %spliced.action,
        changed,
        "hosts file updated"
    );

    Ok(SyncReport {
        hosts_file: opts.hosts_file.clone(),
        action: spliced.action,
        changed,
        block,
        backup: Some(backup),
    })
}

/// Fetch and compute the new content without writing anything.
pub fn preview(source: &dyn RemoteSource, opts: &SyncOptions) -> Result<SyncReport, SyncError> {
    let remote = source.fetch()?;
    let local = hosts::read_hosts(&opts.hosts_file)?;
    let synced = synchronize(&remote, &local, &opts.markers)?;
    Ok(SyncReport {
        hosts_file: opts.hosts_file.clone(),
        action: synced.action,
        changed: synced.changed,
        block: synced.block,
        backup: None,
    })
}

/// Outcome of a restore.
#[derive(Debug, Clone)]
pub struct RestoreReport {
    pub restored_from: PathBuf,
    /// Backup of the content that was replaced; None if the hosts file was missing.
    pub previous: Option<PathBuf>,
}

/// Resolve a backup argument: newest when None, a bare name inside the backup directory.
pub fn resolve_backup(opts: &SyncOptions, name: Option<&Path>) -> anyhow::Result<PathBuf> {
    match name {
        Some(p) if p.components().count() > 1 || p.is_absolute() => Ok(p.to_path_buf()),
        Some(p) => Ok(backup::backup_dir_for(&opts.hosts_file, opts.backup_dir.as_deref()).join(p)),
        None => backup::list_backups(&opts.hosts_file, opts.backup_dir.as_deref())?
            .into_iter()
            .next()
            .map(|b| b.path)
            .ok_or_else(|| {
                anyhow::anyhow!("no backups found for {}", opts.hosts_file.display())
            }),
    }
}

/// Put a backup's bytes back into the hosts file.
///
/// The current content is backed up first, so a restore can itself be undone.
pub fn run_restore(
    privileges: &dyn PrivilegeCheck,
    opts: &SyncOptions,
    from: &Path,
) -> Result<RestoreReport, SyncError> {
    require_elevated(privileges)?;

    let content = fs::read(from).map_err(|source| SyncError::Read {
        path: from.to_path_buf(),
        source,
    })?;

    let _lock = try_lock(opts.lock_file.as_deref());

    let previous = match fs::read(&opts.hosts_file) {
        Ok(current) => Some(backup::save_backup(
            &opts.hosts_file,
            opts.backup_dir.as_deref(),
            &current,
        )?),
        Err(e) if e.kind() == io::ErrorKind::NotFound => None,
        Err(source) => {
            return Err(SyncError::Backup {
                path: opts.hosts_file.clone(),
                source,
            })
        }
    };
    let reference = previous.clone().unwrap_or_else(|| from.to_path_buf());
    hosts::write_hosts(&opts.hosts_file, &content, &reference)?;
    info!(
        hosts_file = %opts.hosts_file.display(),
        from = %from.display(),
        "restored hosts file"
    );

    Ok(RestoreReport {
        restored_from: from.to_path_buf(),
        previous,
    })
}
