//! Error kinds for a sync run.

use std::io;
use std::path::PathBuf;

/// Terminal failure of a sync (or restore) run. Nothing is retried.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("privilege check failed: {0}")]
    Privilege(String),

    #[error("fetch from {url} failed: {reason}")]
    Fetch { url: String, reason: String },

    #[error("remote source malformed: {0}")]
    MalformedSource(String),

    #[error("hosts file malformed: {0}")]
    TargetMalformed(String),

    #[error("cannot read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("backup of {} failed: {source}", path.display())]
    Backup {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(
        "write to {} failed: {source}; restore manually from backup {}",
        path.display(),
        backup.display()
    )]
    Write {
        path: PathBuf,
        backup: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("configuration error: {0}")]
    Config(String),
}

impl SyncError {
    /// Short, stable name of the failing step.
    pub fn kind(&self) -> &'static str {
        match self {
            SyncError::Privilege(_) => "privilege",
            SyncError::Fetch { .. } => "fetch",
            SyncError::MalformedSource(_) => "malformed-source",
            SyncError::TargetMalformed(_) => "malformed-target",
            SyncError::Read { .. } => "read",
            SyncError::Backup { .. } => "backup",
            SyncError::Write { .. } => "write",
            SyncError::Config(_) => "config",
        }
    }

    /// Process exit code for this kind. 1 is left for untyped failures.
    pub fn exit_code(&self) -> i32 {
        match self {
            SyncError::Privilege(_) => 2,
            SyncError::Fetch { .. } => 3,
            SyncError::MalformedSource(_) => 4,
            SyncError::TargetMalformed(_) => 5,
            SyncError::Backup { .. } => 6,
            SyncError::Write { .. } => 7,
            SyncError::Read { .. } => 8,
            SyncError::Config(_) => 9,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_error_names_backup() {
        let e = SyncError::Write {
            path: PathBuf::from("/etc/hosts"),
            backup: PathBuf::from("/etc/hosts.20260101-120000.bak"),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        };
        let msg = e.to_string();
        assert!(msg.contains("/etc/hosts.20260101-120000.bak"));
        assert_eq!(e.kind(), "write");
        assert_eq!(e.exit_code(), 7);
    }

    #[test]
    fn exit_codes_are_distinct() {
        let codes = [
            SyncError::Privilege(String::new()).exit_code(),
            SyncError::Fetch {
                url: String::new(),
                reason: String::new(),
            }
            .exit_code(),
            SyncError::MalformedSource(String::new()).exit_code(),
            SyncError::TargetMalformed(String::new()).exit_code(),
            SyncError::Config(String::new()).exit_code(),
        ];
        let mut sorted = codes.to_vec();
        sorted.sort();
        sorted.dedup();
        assert_eq!(sorted.len(), codes.len());
        assert!(!codes.contains(&0) && !codes.contains(&1));
    }
}
