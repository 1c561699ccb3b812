//! Windows platform implementations.

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::process::{Command, Stdio};

use super::PrivilegeCheck;

/// `%SystemRoot%\System32\drivers\etc\hosts`, falling back to `C:\Windows`.
pub fn hosts_path() -> PathBuf {
    let root = std::env::var_os("SystemRoot")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(r"C:\Windows"));
    root.join("System32").join("drivers").join("etc").join("hosts")
}

/// `net session` only succeeds from an elevated (administrator) token.
pub struct WindowsPrivilegeCheck;

impl PrivilegeCheck for WindowsPrivilegeCheck {
    fn is_elevated(&self) -> Result<bool> {
        let status = Command::new("net")
            .arg("session")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .context("run 'net session'")?;
        Ok(status.success())
    }

    fn hint(&self) -> &'static str {
        "run from an elevated (Run as administrator) prompt"
    }
}
