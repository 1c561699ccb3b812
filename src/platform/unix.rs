//! Unix (macOS, Linux) platform implementations.

use anyhow::Result;
use std::path::PathBuf;

use super::PrivilegeCheck;

pub const HOSTS_PATH: &str = "/etc/hosts";

pub fn hosts_path() -> PathBuf {
    PathBuf::from(HOSTS_PATH)
}

/// Elevated means effective uid 0.
pub struct UnixPrivilegeCheck;

impl PrivilegeCheck for UnixPrivilegeCheck {
    fn is_elevated(&self) -> Result<bool> {
        // SAFETY: geteuid has no preconditions and cannot fail.
        let euid = unsafe { libc::geteuid() };
        Ok(euid == 0)
    }

    fn hint(&self) -> &'static str {
        "re-run with sudo"
    }
}
