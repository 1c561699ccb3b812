//! Hosts file read/write.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::SyncError;

/// Read the whole hosts file as raw bytes. No decoding is done.
pub fn read_hosts(path: &Path) -> Result<Vec<u8>, SyncError> {
    fs::read(path).map_err(|source| SyncError::Read {
        path: path.to_path_buf(),
        source,
    })
}

/// Replaces the bytes of a hosts file.
pub trait HostsWriter: Send + Sync {
    fn replace(&self, path: &Path, content: &[u8]) -> io::Result<()>;
}

/// Writes a temp file next to the target and renames it over the original,
/// keeping the original permissions. When that is refused (bind-mounted
/// `/etc/hosts` in containers, for one) the file is rewritten in place.
/// A symlinked hosts file is followed; the link itself stays.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileHostsWriter;

impl HostsWriter for FileHostsWriter {
    fn replace(&self, path: &Path, content: &[u8]) -> io::Result<()> {
        let target = resolve_link(path)?;
        match write_atomic(&target, content) {
            Ok(()) => {
                debug!(path = %target.display(), "replaced hosts file by rename");
                Ok(())
            }
            Err(e) => {
                warn!(
                    path = %target.display(),
                    error = %e,
                    "atomic replace failed, rewriting in place"
                );
                write_in_place(&target, content)
            }
        }
    }
}

/// Replace the hosts file with `content` using [`FileHostsWriter`].
/// `backup` only appears in the error message.
pub fn write_hosts(path: &Path, content: &[u8], backup: &Path) -> Result<(), SyncError> {
    write_with(&FileHostsWriter, path, content, backup)
}

/// Replace the hosts file through `writer`; a failure names `backup`.
pub fn write_with(
    writer: &dyn HostsWriter,
    path: &Path,
    content: &[u8],
    backup: &Path,
) -> Result<(), SyncError> {
    writer
        .replace(path, content)
        .map_err(|source| SyncError::Write {
            path: path.to_path_buf(),
            backup: backup.to_path_buf(),
            source,
        })
}

/// The file a symlinked `path` points at; `path` itself otherwise.
fn resolve_link(path: &Path) -> io::Result<PathBuf> {
    match fs::symlink_metadata(path) {
        Ok(meta) if meta.file_type().is_symlink() => fs::canonicalize(path),
        _ => Ok(path.to_path_buf()),
    }
}

fn write_atomic(path: &Path, content: &[u8]) -> io::Result<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let mut tmp = tempfile::Builder::new()
        .prefix(".hostsync-")
        .tempfile_in(dir)?;
    tmp.write_all(content)?;
    tmp.as_file().sync_all()?;
    if let Ok(meta) = fs::metadata(path) {
        fs::set_permissions(tmp.path(), meta.permissions())?;
    }
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

fn write_in_place(path: &Path, content: &[u8]) -> io::Result<()> {
    let mut file = fs::OpenOptions::new()
        .write(true)
        .truncate(true)
        .open(path)?;
    file.write_all(content)?;
    file.sync_all()
}
