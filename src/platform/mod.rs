//! Platform abstraction for the privilege check and the hosts file location.

use std::path::PathBuf;

#[cfg(unix)]
pub mod unix;

#[cfg(windows)]
pub mod windows;

use crate::error::SyncError;

/// Decides whether this process may rewrite the system hosts file.
pub trait PrivilegeCheck: Send + Sync {
    /// True when running with administrative rights.
    fn is_elevated(&self) -> anyhow::Result<bool>;

    /// How to obtain the privilege on this platform (for error messages).
    fn hint(&self) -> &'static str;
}

/// Fail with `SyncError::Privilege` unless the check passes.
pub fn require_elevated(check: &dyn PrivilegeCheck) -> Result<(), SyncError> {
    match check.is_elevated() {
        Ok(true) => Ok(()),
        Ok(false) => Err(SyncError::Privilege(format!(
            "not running with administrative rights; {}",
            check.hint()
        ))),
        Err(e) => Err(SyncError::Privilege(format!(
            "could not determine privileges: {e:#}"
        ))),
    }
}

/// Get platform PrivilegeCheck implementation.
/// If HOSTSYNC_SKIP_PRIVILEGE_CHECK is set (e.g. in tests), every check passes.
pub fn default_privilege_check() -> Box<dyn PrivilegeCheck> {
    if std::env::var_os("HOSTSYNC_SKIP_PRIVILEGE_CHECK").is_some() {
        return Box::new(AssumeElevated);
    }
    #[cfg(unix)]
    return Box::new(unix::UnixPrivilegeCheck);

    #[cfg(windows)]
    return Box::new(windows::WindowsPrivilegeCheck);
}

/// PrivilegeCheck that always passes.
#[derive(Debug, Clone, Copy, Default)]
pub struct AssumeElevated;

impl PrivilegeCheck for AssumeElevated {
    fn is_elevated(&self) -> anyhow::Result<bool> {
        Ok(true)
    }

    fn hint(&self) -> &'static str {
        "privilege check skipped"
    }
}

/// Platform-conventional hosts file path.
pub fn system_hosts_path() -> PathBuf {
    #[cfg(unix)]
    return unix::hosts_path();

    #[cfg(windows)]
    return windows::hosts_path();
}
