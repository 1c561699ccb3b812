//! Doctor command: health checks for the local sync setup.
//!
//! Nothing here touches the network or writes files.

use anyhow::Result;

use crate::backup::list_backups;
use crate::block::{current_block, line_count};
use crate::config::{HostsyncPaths, Settings};
use crate::hosts::read_hosts;
use crate::platform::PrivilegeCheck;

/// Result of a single check.
#[derive(Debug, Clone)]
pub struct CheckResult {
    pub ok: bool,
    pub message: String,
}

impl CheckResult {
    fn ok(message: impl Into<String>) -> Self {
        Self {
            ok: true,
            message: message.into(),
        }
    }

    fn fail(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            message: message.into(),
        }
    }
}

/// Run all doctor checks.
pub fn run_checks(
    paths: &HostsyncPaths,
    settings: &Settings,
    privileges: &dyn PrivilegeCheck,
) -> Result<Vec<CheckResult>> {
    let mut results = Vec::new();

    // 1. Source URL configured
    match &settings.url {
        Some(url) => results.push(CheckResult::ok(format!("Source URL: {url}"))),
        None => results.push(CheckResult::fail(
            "No source URL configured. Run 'hostsync init --url <URL>'.",
        )),
    }

    // 2. Privilege to write the hosts file
    match privileges.is_elevated() {
        Ok(true) => results.push(CheckResult::ok("Running with administrative rights")),
        Ok(false) => results.push(CheckResult::fail(format!(
            "Not running with administrative rights; {}.",
            privileges.hint()
        ))),
        Err(e) => results.push(CheckResult::fail(format!(
            "Cannot determine privileges: {e:#}"
        ))),
    }

    // 3. Hosts file readable, block well-formed
    let hosts_file = &settings.hosts_file;
    match read_hosts(hosts_file) {
        Ok(content) => {
            results.push(CheckResult::ok(format!(
                "Hosts file readable: {}",
                hosts_file.display()
            )));
            match current_block(&content, &settings.markers) {
                Ok(Some(block)) => results.push(CheckResult::ok(format!(
                    "Managed block present ({} lines)",
                    line_count(block)
                ))),
                Ok(None) => results.push(CheckResult::ok(
                    "No managed block yet; the next sync will append one",
                )),
                Err(e) => results.push(CheckResult::fail(format!(
                    "{e}. Fix the hosts file by hand before syncing."
                ))),
            }
        }
        Err(e) => results.push(CheckResult::fail(e.to_string())),
    }

    // 4. Backups
    match list_backups(hosts_file, settings.backup_dir.as_deref()) {
        Ok(backups) => match backups.first() {
            Some(newest) => results.push(CheckResult::ok(format!(
                "{} backup(s); newest {}",
                backups.len(),
                newest.path.display()
            ))),
            None => results.push(CheckResult::ok("No backups yet")),
        },
        Err(e) => results.push(CheckResult::fail(format!("Cannot list backups: {e:#}"))),
    }

    // 5. Last sync
    match crate::state::read_state(paths) {
        Ok(Some(last)) => results.push(CheckResult::ok(format!(
            "Last sync {} ({}) from {}",
            last.synced_at, last.action, last.url
        ))),
        Ok(None) => results.push(CheckResult::ok("Never synced")),
        Err(e) => results.push(CheckResult::fail(format!(
            "Cannot read sync state: {e:#}"
        ))),
    }

    Ok(results)
}
