//! Record of the last successful sync, stored in last-sync.json.

use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;

use crate::block::SyncAction;
use crate::config::HostsyncPaths;

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct LastSync {
    pub url: String,
    pub hosts_file: PathBuf,
    pub backup: PathBuf,
    pub action: SyncAction,
    pub changed: bool,
    pub synced_at: String,
}

pub fn read_state(paths: &HostsyncPaths) -> Result<Option<LastSync>> {
    let path = &paths.state_file;
    if !path.is_file() {
        return Ok(None);
    }
    let s = fs::read_to_string(path).context("read last-sync.json")?;
    let state: LastSync = serde_json::from_str(&s).context("parse last-sync.json")?;
    Ok(Some(state))
}

pub fn write_state(paths: &HostsyncPaths, state: &LastSync) -> Result<()> {
    let path = &paths.state_file;
    if let Some(p) = path.parent() {
        fs::create_dir_all(p)?;
    }
    let s = serde_json::to_string_pretty(state)?;
    fs::write(path, s).context("write last-sync.json")?;
    Ok(())
}
