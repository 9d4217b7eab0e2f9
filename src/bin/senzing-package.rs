//! senzing-package CLI - install the vendor package inside a container
//!
//! Usage:
//!   senzing-package install                Back up an existing install, then unpack the package
//!   senzing-package replace                Unpack the package over the existing install
//!   senzing-package delete                 Remove the installed package
//!   senzing-package installed-version      Show the installed version
//!   senzing-package package-version        Show the version inside the package archive
//!   senzing-package version                Show the version of this tool
//!   senzing-package sleep                  Do nothing for SENZING_SLEEP_TIME_IN_SECONDS
//!   senzing-package docker-acceptance-test Log entry and exit, for image smoke tests
//!
//! With no arguments the subcommand is read from SENZING_SUBCOMMAND.

use anyhow::{Context, Result};
use clap::{ArgAction, CommandFactory, Parser, Subcommand};
use senzing_package::core::config::{
    self, DEFAULT_SENZING_DIR, DEFAULT_SENZING_PACKAGE, DEFAULT_SLEEP_TIME_IN_SECONDS,
};
use senzing_package::{BackupPolicy, Installer, PackageError, Settings, output};
use std::path::PathBuf;
use std::sync::mpsc;
use std::time::{Duration, Instant};

/// Last date this tool's behaviour changed
const UPDATED: &str = "2026-10-18";

#[derive(Parser)]
#[command(name = "senzing-package")]
#[command(about = "Install, replace and inspect the Senzing package inside a container")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Directory the package is installed into
    #[arg(long, global = true, env = "SENZING_DIR", default_value = DEFAULT_SENZING_DIR)]
    senzing_dir: PathBuf,

    /// Path to the package archive
    #[arg(long, global = true, env = "SENZING_PACKAGE", default_value = DEFAULT_SENZING_PACKAGE)]
    senzing_package: PathBuf,

    /// Enable debug output
    #[arg(
        long,
        global = true,
        env = "SENZING_DEBUG",
        action = ArgAction::Set,
        num_args = 0..=1,
        require_equals = true,
        default_value = "false",
        default_missing_value = "true",
        value_parser = config::parse_bool,
    )]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Back up an existing installation, then install the package into a clean directory
    Install {
        /// Where to move an existing installation (default: <senzing-dir>-original)
        #[arg(long, env = "SENZING_BACKUP_DIR")]
        backup_dir: Option<PathBuf>,

        /// Name backups <senzing-dir>-<version>.<timestamp> instead
        #[arg(
            long,
            env = "SENZING_VERSIONED_BACKUP",
            action = ArgAction::Set,
            num_args = 0..=1,
            require_equals = true,
            default_value = "false",
            default_missing_value = "true",
            value_parser = config::parse_bool,
        )]
        versioned_backup: bool,
    },

    /// Install the package over an existing installation without keeping a backup
    Replace,

    /// Delete the installed package
    Delete,

    /// Show the version of the currently installed package
    #[command(alias = "current-version")]
    InstalledVersion,

    /// Show the version inside the package archive
    PackageVersion,

    /// Show the version of senzing-package
    Version,

    /// Do nothing but sleep. For Docker testing
    Sleep {
        /// Sleep time in seconds
        #[arg(long, env = "SENZING_SLEEP_TIME_IN_SECONDS", default_value_t = DEFAULT_SLEEP_TIME_IN_SECONDS)]
        sleep_time_in_seconds: u64,
    },

    /// Log entry and exit only. For Docker image acceptance tests
    DockerAcceptanceTest,
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::Install { .. } => "install",
            Commands::Replace => "replace",
            Commands::Delete => "delete",
            Commands::InstalledVersion => "installed-version",
            Commands::PackageVersion => "package-version",
            Commands::Version => "version",
            Commands::Sleep { .. } => "sleep",
            Commands::DockerAcceptanceTest => "docker-acceptance-test",
        }
    }
}

fn main() {
    let code = match run() {
        Ok(()) => 0,
        Err(err) => {
            output::error(&format!("{:#}", err));
            err.downcast_ref::<PackageError>()
                .map(PackageError::exit_code)
                .unwrap_or(1)
        }
    };
    std::process::exit(code);
}

fn run() -> Result<()> {
    let cli = parse_cli()?;
    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        anyhow::bail!("no subcommand given and SENZING_SUBCOMMAND is not set");
    };

    output::set_debug(cli.debug);

    let mut settings = Settings {
        senzing_dir: cli.senzing_dir,
        senzing_package: cli.senzing_package,
        debug: cli.debug,
        subcommand: command.name().to_string(),
        ..Default::default()
    };

    match command {
        Commands::Install {
            backup_dir,
            versioned_backup,
        } => {
            settings.backup_dir = backup_dir;
            if versioned_backup {
                settings.backup_policy = BackupPolicy::Versioned;
            }
            with_entry_exit(&settings, install)
        }
        Commands::Replace => with_entry_exit(&settings, replace),
        Commands::Delete => with_entry_exit(&settings, delete),
        Commands::InstalledVersion => with_entry_exit(&settings, installed_version),
        Commands::PackageVersion => with_entry_exit(&settings, package_version),
        Commands::Version => {
            println!(
                "senzing-package {}  updated: {}",
                env!("CARGO_PKG_VERSION"),
                UPDATED
            );
            Ok(())
        }
        Commands::Sleep {
            sleep_time_in_seconds,
        } => {
            settings.sleep_time_in_seconds = sleep_time_in_seconds;
            with_entry_exit(&settings, sleep)
        }
        Commands::DockerAcceptanceTest => with_entry_exit(&settings, |_| Ok(())),
    }
}

/// Parse the command line, falling back to SENZING_SUBCOMMAND when no
/// arguments were given.
fn parse_cli() -> Result<Cli> {
    if std::env::args_os().len() > 1 {
        return Ok(Cli::parse());
    }

    match std::env::var("SENZING_SUBCOMMAND") {
        Ok(subcommand) if !subcommand.trim().is_empty() => {
            let subcommand = subcommand.trim().to_string();
            Cli::try_parse_from(["senzing-package", subcommand.as_str()]).map_err(|e| {
                anyhow::Error::from(PackageError::configuration(format!(
                    "bad SENZING_SUBCOMMAND '{}': {}",
                    subcommand,
                    e.kind()
                )))
            })
        }
        _ => Ok(Cli::parse()),
    }
}

/// Validate settings, log entry and exit lines around `f`.
fn with_entry_exit(settings: &Settings, f: impl FnOnce(&Settings) -> Result<()>) -> Result<()> {
    settings.validate()?;
    let start = Instant::now();
    output::info(&format!("Enter {}", settings.to_json()));

    f(settings)?;

    output::info(&format!(
        "Exit {} elapsed: {:.3}s",
        settings.subcommand,
        start.elapsed().as_secs_f64()
    ));
    Ok(())
}

fn install(settings: &Settings) -> Result<()> {
    let installer = Installer::new(&settings.senzing_dir);
    let current = installer.installed_version().ok();
    let backup = settings.resolve_backup_dir(current.as_ref().map(|v| v.version.as_str()));
    output::debug(&format!("backup directory: {}", backup.display()));

    let report = installer
        .install(&settings.senzing_package, &backup)
        .with_context(|| format!("install of {} failed", settings.senzing_package.display()))?;

    output::debug(&format!(
        "{} was {} before install",
        settings.senzing_dir.display(),
        report.previous
    ));
    if let Some(backup) = report.backup {
        output::info(&format!(
            "previous installation ({}) kept in {}",
            report.previous_version.as_deref().unwrap_or("unknown version"),
            backup.display()
        ));
    }
    Ok(())
}

fn replace(settings: &Settings) -> Result<()> {
    Installer::new(&settings.senzing_dir)
        .replace(&settings.senzing_package)
        .with_context(|| format!("replace of {} failed", settings.senzing_dir.display()))?;
    Ok(())
}

fn delete(settings: &Settings) -> Result<()> {
    Installer::new(&settings.senzing_dir)
        .delete()
        .with_context(|| format!("delete of {} failed", settings.senzing_dir.display()))?;
    Ok(())
}

fn installed_version(settings: &Settings) -> Result<()> {
    let version = Installer::new(&settings.senzing_dir).installed_version()?;
    output::detail(&format!(
        "version {} detected in {}",
        version,
        settings.senzing_dir.display()
    ));
    println!("{}", version);
    Ok(())
}

fn package_version(settings: &Settings) -> Result<()> {
    let version =
        Installer::new(&settings.senzing_dir).package_version(&settings.senzing_package)?;
    output::detail(&format!(
        "version {} detected in package {}",
        version,
        settings.senzing_package.display()
    ));
    println!("{}", version);
    Ok(())
}

/// Block for the configured time; SIGINT/SIGTERM end the wait early.
fn sleep(settings: &Settings) -> Result<()> {
    let (tx, rx) = mpsc::channel();
    ctrlc::set_handler(move || {
        let _ = tx.send(());
    })
    .context("failed to install signal handler")?;

    let duration = Duration::from_secs(settings.sleep_time_in_seconds);
    let start = Instant::now();
    output::info(&format!("Sleeping {} seconds", settings.sleep_time_in_seconds));

    match rx.recv_timeout(duration) {
        Ok(()) => output::info("interrupted, stopping early"),
        Err(mpsc::RecvTimeoutError::Timeout) => {}
        Err(mpsc::RecvTimeoutError::Disconnected) => {
            std::thread::sleep(duration.saturating_sub(start.elapsed()))
        }
    }
    Ok(())
}
