//! Timestamped backups of the hosts file.
//!
//! A backup is named `<file>.<YYYYMMDD-HHMMSS>.bak`, or
//! `<file>.<YYYYMMDD-HHMMSS>-<N>.bak` when that second is already taken.
//! Backups are never overwritten or removed by hostsync.

use chrono::{Local, NaiveDateTime};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use crate::error::SyncError;

const STAMP_FORMAT: &str = "%Y%m%d-%H%M%S";
const STAMP_LEN: usize = 15;
const SUFFIX: &str = ".bak";

/// One backup file on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Backup {
    pub path: PathBuf,
    pub taken_at: NaiveDateTime,
    pub seq: u32,
}

/// Directory backups of `target` go to: `backup_dir` or the target's own directory.
pub fn backup_dir_for(target: &Path, backup_dir: Option<&Path>) -> PathBuf {
    match backup_dir {
        Some(dir) => dir.to_path_buf(),
        None => target
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(".")),
    }
}

fn file_name_of(target: &Path) -> String {
    target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "hosts".to_string())
}

fn backup_name(file_name: &str, stamp: &str, seq: u32) -> String {
    if seq == 0 {
        format!("{file_name}.{stamp}{SUFFIX}")
    } else {
        format!("{file_name}.{stamp}-{seq}{SUFFIX}")
    }
}

/// Parse a backup file name belonging to `file_name`.
fn parse_backup_name(file_name: &str, candidate: &str) -> Option<(NaiveDateTime, u32)> {
    let rest = candidate
        .strip_prefix(file_name)?
        .strip_prefix('.')?
        .strip_suffix(SUFFIX)?;
    if rest.len() < STAMP_LEN || !rest.is_char_boundary(STAMP_LEN) {
        return None;
    }
    let (stamp, tail) = rest.split_at(STAMP_LEN);
    let taken_at = NaiveDateTime::parse_from_str(stamp, STAMP_FORMAT).ok()?;
    let seq = match tail {
        "" => 0,
        t => t.strip_prefix('-')?.parse().ok()?,
    };
    Some((taken_at, seq))
}

/// Copy `target` byte-for-byte into a new backup file stamped with the current time.
pub fn create_backup(target: &Path, backup_dir: Option<&Path>) -> Result<PathBuf, SyncError> {
    let original = fs::read(target).map_err(|source| SyncError::Backup {
        path: target.to_path_buf(),
        source,
    })?;
    save_backup(target, backup_dir, &original)
}

/// Save `content`, already read from `target`, as a new backup of it.
pub fn save_backup(
    target: &Path,
    backup_dir: Option<&Path>,
    content: &[u8],
) -> Result<PathBuf, SyncError> {
    save_backup_at(target, backup_dir, content, Local::now().naive_local())
}

/// As [`save_backup`], with an explicit timestamp.
pub fn save_backup_at(
    target: &Path,
    backup_dir: Option<&Path>,
    content: &[u8],
    now: NaiveDateTime,
) -> Result<PathBuf, SyncError> {
    let dir = backup_dir_for(target, backup_dir);
    fs::create_dir_all(&dir).map_err(|source| SyncError::Backup {
        path: dir.clone(),
        source,
    })?;
    let stamp = now.format(STAMP_FORMAT).to_string();
    write_backup(&dir, &file_name_of(target), &stamp, content)
}

/// Stream `content` into a temp file in `dir`, then give it the first free
/// backup name. A failed write leaves nothing under a backup name.
fn write_backup(
    dir: &Path,
    file_name: &str,
    stamp: &str,
    mut content: impl Read,
) -> Result<PathBuf, SyncError> {
    let fail = |path: &Path, source: io::Error| SyncError::Backup {
        path: path.to_path_buf(),
        source,
    };
    let mut tmp = tempfile::Builder::new()
        .prefix(".hostsync-backup-")
        .tempfile_in(dir)
        .map_err(|e| fail(dir, e))?;
    io::copy(&mut content, &mut tmp)
        .and_then(|_| tmp.as_file().sync_all())
        .map_err(|e| fail(dir, e))?;

    let mut seq = 0u32;
    loop {
        let path = dir.join(backup_name(file_name, stamp, seq));
        match tmp.persist_noclobber(&path) {
            Ok(_) => return Ok(path),
            Err(e) if e.error.kind() == io::ErrorKind::AlreadyExists => {
                tmp = e.file;
                seq += 1;
            }
            Err(e) => return Err(fail(&path, e.error)),
        }
    }
}

/// Backups of `target`, newest first.
pub fn list_backups(target: &Path, backup_dir: Option<&Path>) -> anyhow::Result<Vec<Backup>> {
    let dir = backup_dir_for(target, backup_dir);
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let file_name = file_name_of(target);
    let mut backups = Vec::new();
    for entry in fs::read_dir(&dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        if let Some((taken_at, seq)) = parse_backup_name(&file_name, name) {
            backups.push(Backup {
                path: entry.path(),
                taken_at,
                seq,
            });
        }
    }
    backups.sort_by(|a, b| (b.taken_at, b.seq).cmp(&(a.taken_at, a.seq)));
    Ok(backups)
}
