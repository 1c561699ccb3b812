//! CLI definitions and command routing.

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;

use crate::block::current_block;
use crate::config::{HostsyncPaths, Overrides, Settings};
use crate::fetch::HttpSource;
use crate::platform::{default_privilege_check, require_elevated, PrivilegeCheck};
use crate::state::{self, LastSync};
use crate::store;
use crate::sync::{self, SyncOptions, SyncReport};

#[derive(Parser)]
#[command(name = "hostsync")]
#[command(about = "Keep a marked block of the hosts file in sync with a remote source")]
#[command(version)]
pub struct Cli {
    /// More log output on stderr (-v info, -vv debug); HOSTSYNC_LOG overrides
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Hosts file to manage instead of the system one
    #[arg(long, global = true, value_name = "PATH")]
    pub hosts_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create the config directory and config.toml; optionally record the source URL
    Init {
        #[arg(long)]
        url: Option<String>,
    },

    /// Fetch the remote block and replace (or append) it in the hosts file
    Sync {
        /// Source URL (overrides HOSTSYNC_URL and config.toml)
        #[arg(long)]
        url: Option<String>,
        /// Show what would change without writing anything
        #[arg(long)]
        dry_run: bool,
    },

    /// Print the managed block currently in the hosts file
    Show,

    /// List backups of the hosts file, newest first
    Backups,

    /// Restore the hosts file from a backup (newest if none given)
    Restore {
        /// Backup file name or path
        backup: Option<PathBuf>,
    },

    /// Show the last successful sync
    Status,

    /// Check configuration, privileges, hosts file and backups
    Doctor,

    /// Print the resolved configuration
    Config,
}

/// Run CLI and dispatch to handlers.
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    crate::logging::init_logging(cli.verbose);
    let paths = HostsyncPaths::default_paths();
    let checker = default_privilege_check();
    let privileges = checker.as_ref();
    let overrides = Overrides {
        url: None,
        hosts_file: cli.hosts_file,
    };

    match cli.command {
        Commands::Init { url } => cmd_init(&paths, url),
        Commands::Sync { url, dry_run } => {
            cmd_sync(&paths, Overrides { url, ..overrides }, dry_run, privileges)
        }
        Commands::Show => cmd_show(&paths, overrides),
        Commands::Backups => cmd_backups(&paths, overrides),
        Commands::Restore { backup } => cmd_restore(&paths, overrides, backup, privileges),
        Commands::Status => cmd_status(&paths),
        Commands::Doctor => cmd_doctor(&paths, overrides, privileges),
        Commands::Config => cmd_config(&paths, overrides),
    }
}

fn load_settings(paths: &HostsyncPaths, overrides: Overrides) -> Result<Settings> {
    let config = store::load_config(paths)?;
    Ok(Settings::resolve(&config, overrides)?)
}

fn cmd_init(paths: &HostsyncPaths, url: Option<String>) -> Result<()> {
    store::ensure_dirs(paths)?;
    let mut config = store::load_config(paths)?;
    if let Some(url) = url {
        config.url = Some(url);
    }
    store::save_config(paths, &config)?;
    if let Some(url) = &config.url {
        println!("Source URL: {url}");
    }
    println!("hostsync initialised at {}", paths.config_dir.display());
    Ok(())
}

fn describe(report: &SyncReport) -> String {
    let what = report.action;
    let lines = report.block.lines().count();
    let change = if report.changed {
        "changed"
    } else {
        "unchanged"
    };
    format!("block {what} ({lines} lines, {change})")
}

fn cmd_sync(
    paths: &HostsyncPaths,
    overrides: Overrides,
    dry_run: bool,
    privileges: &dyn PrivilegeCheck,
) -> Result<()> {
    // Before any file or network access, config.toml included.
    if !dry_run {
        require_elevated(privileges)?;
    }
    let settings = load_settings(paths, overrides)?;
    let source = HttpSource::from_settings(&settings)?;
    let opts = SyncOptions::from_settings(&settings, paths);

    if dry_run {
        let report = sync::preview(&source, &opts)?;
        println!(
            "Dry run for {}: {}",
            report.hosts_file.display(),
            describe(&report)
        );
        print!("{}", report.block);
        return Ok(());
    }

    let report = sync::run_sync(privileges, &source, &opts)?;
    let backup = report.backup.clone().unwrap_or_default();

    let record = LastSync {
        url: settings.require_url()?.to_string(),
        hosts_file: report.hosts_file.clone(),
        backup: backup.clone(),
        action: report.action,
        changed: report.changed,
        synced_at: chrono::Utc::now().to_rfc3339(),
    };
    if let Err(e) = store::ensure_dirs(paths).and_then(|_| state::write_state(paths, &record)) {
        tracing::warn!(error = %format!("{e:#}"), "could not record sync state");
    }

    println!(
        "Updated {}: {}",
        report.hosts_file.display(),
        describe(&report)
    );
    println!("Backup: {}", backup.display());
    Ok(())
}

fn cmd_show(paths: &HostsyncPaths, overrides: Overrides) -> Result<()> {
    let settings = load_settings(paths, overrides)?;
    let content = crate::hosts::read_hosts(&settings.hosts_file)?;
    match current_block(&content, &settings.markers)? {
        Some(block) => std::io::stdout().lock().write_all(block)?,
        None => println!("No managed block in {}", settings.hosts_file.display()),
    }
    Ok(())
}

fn cmd_backups(paths: &HostsyncPaths, overrides: Overrides) -> Result<()> {
    let settings = load_settings(paths, overrides)?;
    let backups =
        crate::backup::list_backups(&settings.hosts_file, settings.backup_dir.as_deref())?;
    if backups.is_empty() {
        println!("No backups for {}", settings.hosts_file.display());
    }
    for b in backups {
        println!(
            "{}\t{}",
            b.taken_at.format("%Y-%m-%d %H:%M:%S"),
            b.path.display()
        );
    }
    Ok(())
}

fn cmd_restore(
    paths: &HostsyncPaths,
    overrides: Overrides,
    backup: Option<PathBuf>,
    privileges: &dyn PrivilegeCheck,
) -> Result<()> {
    require_elevated(privileges)?;
    let settings = load_settings(paths, overrides)?;
    let opts = SyncOptions::from_settings(&settings, paths);
    let from = sync::resolve_backup(&opts, backup.as_deref())?;
    let report = sync::run_restore(privileges, &opts, &from)?;
    println!(
        "Restored {} from {}",
        settings.hosts_file.display(),
        report.restored_from.display()
    );
    if let Some(prev) = report.previous {
        println!("Previous content saved to {}", prev.display());
    }
    Ok(())
}

fn cmd_status(paths: &HostsyncPaths) -> Result<()> {
    match state::read_state(paths)? {
        Some(last) => {
            println!("Last sync: {}", last.synced_at);
            println!("  source:     {}", last.url);
            println!("  hosts file: {}", last.hosts_file.display());
            println!(
                "  result:     block {} ({})",
                last.action,
                if last.changed { "changed" } else { "unchanged" }
            );
            println!("  backup:     {}", last.backup.display());
        }
        None => println!("Never synced"),
    }
    Ok(())
}

fn cmd_doctor(
    paths: &HostsyncPaths,
    overrides: Overrides,
    privileges: &dyn PrivilegeCheck,
) -> Result<()> {
    let settings = load_settings(paths, overrides)?;
    let results = crate::doctor::run_checks(paths, &settings, privileges)?;
    let mut failed = 0;
    for r in &results {
        let mark = if r.ok { "ok" } else { "!!" };
        println!("[{mark}] {}", r.message);
        if !r.ok {
            failed += 1;
        }
    }
    if failed > 0 {
        anyhow::bail!("{failed} check(s) failed");
    }
    Ok(())
}

fn cmd_config(paths: &HostsyncPaths, overrides: Overrides) -> Result<()> {
    let settings = load_settings(paths, overrides)?;
    println!("config file:     {}", paths.config_file.display());
    println!(
        "url:             {}",
        settings.url.as_deref().unwrap_or("(not set)")
    );
    println!("hosts file:      {}", settings.hosts_file.display());
    match &settings.backup_dir {
        Some(dir) => println!("backup dir:      {}", dir.display()),
        None => println!("backup dir:      (next to hosts file)"),
    }
    println!("begin marker:    {}", settings.markers.begin);
    println!("end marker:      {}", settings.markers.end);
    println!("connect timeout: {}s", settings.connect_timeout.as_secs());
    println!("timeout:         {}s", settings.timeout.as_secs());
    Ok(())
}
