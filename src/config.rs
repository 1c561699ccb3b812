//! Configuration loading and path resolution.
//!
//! Supports HOSTSYNC_HOME env var override for testing.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::block::{Markers, BEGIN_MARKER, END_MARKER};
use crate::error::SyncError;

/// Paths for hostsync's own data (not the hosts file).
#[derive(Debug, Clone)]
pub struct HostsyncPaths {
    pub config_dir: PathBuf,
    pub config_file: PathBuf,
    pub state_file: PathBuf,
    pub lock_file: PathBuf,
}

impl HostsyncPaths {
    /// Build paths from base directory (e.g. ProjectDirs data dir or HOSTSYNC_HOME).
    pub fn from_base(base: PathBuf) -> Self {
        Self {
            config_file: base.join("config.toml"),
            state_file: base.join("last-sync.json"),
            lock_file: base.join("sync.lock"),
            config_dir: base,
        }
    }

    /// Paths for testing: use a temp dir as base.
    pub fn for_test(base: impl AsRef<Path>) -> Self {
        Self::from_base(base.as_ref().to_path_buf())
    }

    /// Get default hostsync paths (respects HOSTSYNC_HOME).
    pub fn default_paths() -> Self {
        let base = if let Some(home) = std::env::var_os("HOSTSYNC_HOME") {
            PathBuf::from(home)
        } else if let Some(dirs) = directories::ProjectDirs::from("com", "coollab", "hostsync") {
            dirs.data_dir().to_path_buf()
        } else {
            PathBuf::from(".hostsync")
        };
        Self::from_base(base)
    }
}

pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

fn default_begin_marker() -> String {
    BEGIN_MARKER.to_string()
}

fn default_end_marker() -> String {
    END_MARKER.to_string()
}

fn default_connect_timeout() -> u64 {
    DEFAULT_CONNECT_TIMEOUT_SECS
}

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

/// Main config.toml structure.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Config {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hosts_file: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backup_dir: Option<PathBuf>,
    #[serde(default = "default_begin_marker")]
    pub begin_marker: String,
    #[serde(default = "default_end_marker")]
    pub end_marker: String,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            url: None,
            hosts_file: None,
            backup_dir: None,
            begin_marker: default_begin_marker(),
            end_marker: default_end_marker(),
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// Path to config.toml (respects HOSTSYNC_HOME).
pub fn config_path() -> PathBuf {
    HostsyncPaths::default_paths().config_file
}

impl Config {
    /// Load config from paths (with shared lock when file exists).
    pub fn load(paths: &HostsyncPaths) -> Result<Config> {
        if paths.config_file.is_file() {
            let mut file = fs::OpenOptions::new().read(true).open(&paths.config_file)?;
            fs2::FileExt::lock_shared(&file)?;
            use std::io::Read;
            let mut s = String::new();
            file.read_to_string(&mut s)?;
            let cfg: Config = toml::from_str(&s)
                .with_context(|| format!("parse {}", paths.config_file.display()))?;
            Ok(cfg)
        } else {
            Ok(Config::default())
        }
    }

    /// Save config to paths (with exclusive lock). Creates parent dirs if needed.
    pub fn save(&self, paths: &HostsyncPaths) -> Result<()> {
        if let Some(p) = paths.config_file.parent() {
            fs::create_dir_all(p)?;
        }
        let mut file = fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&paths.config_file)?;
        fs2::FileExt::lock_exclusive(&file)?;
        let s = toml::to_string_pretty(self)?;
        use std::io::Write;
        file.write_all(s.as_bytes())?;
        Ok(())
    }

    pub fn markers(&self) -> Markers {
        Markers::new(self.begin_marker.clone(), self.end_marker.clone())
    }
}

/// Values given on the command line; they win over env and config.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub url: Option<String>,
    pub hosts_file: Option<PathBuf>,
}

/// Fully resolved settings for one run.
#[derive(Debug, Clone)]
pub struct Settings {
    pub url: Option<String>,
    pub hosts_file: PathBuf,
    pub backup_dir: Option<PathBuf>,
    pub markers: Markers,
    pub connect_timeout: Duration,
    pub timeout: Duration,
}

impl Settings {
    /// Resolve CLI flags > HOSTSYNC_URL / HOSTSYNC_HOSTS_FILE > config.toml > platform default.
    pub fn resolve(config: &Config, overrides: Overrides) -> Result<Settings, SyncError> {
        let env_url = std::env::var("HOSTSYNC_URL").ok().filter(|s| !s.is_empty());
        let env_hosts = std::env::var_os("HOSTSYNC_HOSTS_FILE")
            .filter(|s| !s.is_empty())
            .map(PathBuf::from);
        Self::resolve_with(config, overrides, env_url, env_hosts)
    }

    fn resolve_with(
        config: &Config,
        overrides: Overrides,
        env_url: Option<String>,
        env_hosts: Option<PathBuf>,
    ) -> Result<Settings, SyncError> {
        let markers = config.markers();
        markers.validate()?;
        if config.timeout_secs == 0 || config.connect_timeout_secs == 0 {
            return Err(SyncError::Config(
                "timeouts must be at least one second".to_string(),
            ));
        }
        let hosts_file = overrides
            .hosts_file
            .or(env_hosts)
            .or_else(|| config.hosts_file.clone())
            .unwrap_or_else(crate::platform::system_hosts_path);
        Ok(Settings {
            url: overrides.url.or(env_url).or_else(|| config.url.clone()),
            hosts_file,
            backup_dir: config.backup_dir.clone(),
            markers,
            connect_timeout: Duration::from_secs(config.connect_timeout_secs),
            timeout: Duration::from_secs(config.timeout_secs),
        })
    }

    /// The source URL, or a configuration error naming how to set one.
    pub fn require_url(&self) -> Result<&str, SyncError> {
        self.url.as_deref().ok_or_else(|| {
            SyncError::Config(
                "no source URL configured; pass --url, set HOSTSYNC_URL, or run 'hostsync init --url <URL>'"
                    .to_string(),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_beat_env_beat_config() {
        let config = Config {
            url: Some("http://config.example/hosts".to_string()),
            hosts_file: Some(PathBuf::from("/config/hosts")),
            ..Config::default()
        };
        let s = Settings::resolve_with(
            &config,
            Overrides {
                url: Some("http://flag.example/hosts".to_string()),
                hosts_file: None,
            },
            Some("http://env.example/hosts".to_string()),
            Some(PathBuf::from("/env/hosts")),
        )
        .unwrap();
        assert_eq!(s.url.as_deref(), Some("http://flag.example/hosts"));
        assert_eq!(s.hosts_file, PathBuf::from("/env/hosts"));

        let s = Settings::resolve_with(&config, Overrides::default(), None, None).unwrap();
        assert_eq!(s.url.as_deref(), Some("http://config.example/hosts"));
        assert_eq!(s.hosts_file, PathBuf::from("/config/hosts"));
    }

    #[test]
    fn missing_url_is_config_error() {
        let s = Settings::resolve_with(&Config::default(), Overrides::default(), None, None)
            .unwrap();
        assert_eq!(s.hosts_file, crate::platform::system_hosts_path());
        assert!(matches!(s.require_url(), Err(SyncError::Config(_))));
    }

    #[test]
    fn zero_timeout_rejected() {
        let config = Config {
            timeout_secs: 0,
            ..Config::default()
        };
        assert!(Settings::resolve_with(&config, Overrides::default(), None, None).is_err());
    }

    #[test]
    fn partial_toml_uses_defaults() {
        let cfg: Config = toml::from_str("url = \"http://x.example/hosts\"\n").unwrap();
        assert_eq!(cfg.url.as_deref(), Some("http://x.example/hosts"));
        assert_eq!(cfg.begin_marker, BEGIN_MARKER);
        assert_eq!(cfg.end_marker, END_MARKER);
        assert_eq!(cfg.timeout_secs, DEFAULT_TIMEOUT_SECS);
    }
}
