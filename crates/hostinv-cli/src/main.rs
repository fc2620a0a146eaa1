//! hostinv CLI
//!
//! Collects installed software, listening ports, firmware and OS details of
//! the local host and prints them as text or JSON.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use color_eyre::Result;
use eyre::WrapErr;
use hostinv_exec::LocalRunner;
use hostinv_inventory::{Collector, Domain, Platform};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod progress;
mod report;

use config::{Config, LoggingConfig};
use progress::StderrProgress;

/// Exit status when every probe of a domain failed
const EXIT_ALL_FAILED: u8 = 2;

/// hostinv: local host inventory
#[derive(Parser, Debug)]
#[command(name = "hostinv", version, about)]
struct Cli {
    /// Config file (defaults to $HOSTINV_CONFIG, ./hostinv.toml, then the user config dir)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Print the report as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Print one line per probe to stderr as it finishes
    #[arg(long, global = true)]
    progress: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    /// Installed packages and applications
    Software,
    /// Listening TCP and UDP sockets
    Ports,
    /// BIOS, board and device firmware
    Firmware,
    /// OS, kernel and host identity
    System,
    /// Every domain
    All,
}

impl Command {
    fn domains(self) -> Vec<Domain> {
        match self {
            Command::Software => vec![Domain::Software],
            Command::Ports => vec![Domain::Ports],
            Command::Firmware => vec![Domain::Firmware],
            Command::System => vec![Domain::System],
            Command::All => Domain::ALL.to_vec(),
        }
    }
}

/// Log to stderr so stdout carries only the report
fn init_logging(config: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .wrap_err_with(|| format!("invalid log level `{}`", config.level))?;
    let registry = tracing_subscriber::registry().with(filter);

    if config.json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init()?;
    } else {
        registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .try_init()?;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    color_eyre::install()?;

    let cli = Cli::parse();

    let (config, source) = Config::resolve(cli.config.as_deref())?;
    init_logging(&config.logging)?;
    match &source {
        Some(path) => info!(path = %path.display(), "loaded configuration"),
        None => warn!("no config file found, using defaults"),
    }

    let platform = Platform::detect()?;
    let mut registry = hostinv_probes::builtin();
    registry
        .apply_overrides(&config.probes)
        .wrap_err("invalid [probes] configuration")?;

    let mut runner = LocalRunner::new();
    if cli.progress {
        runner = runner.with_observer(Arc::new(StderrProgress));
    }
    let collector = Collector::new(Arc::new(registry), Arc::new(runner), platform)
        .with_engine_config(&config.engine);

    let domains = cli.command.domains();
    // Dropping the collection future kills any child still running
    let reports = tokio::select! {
        reports = collector.collect_all(&domains) => reports?,
        _ = tokio::signal::ctrl_c() => {
            warn!("interrupted");
            eyre::bail!("interrupted");
        }
    };

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    if cli.json {
        report::write_json(&mut out, &reports)?;
    } else {
        report::write_text(&mut out, &reports)?;
    }

    if reports.iter().any(|r| r.result.all_failed()) {
        return Ok(ExitCode::from(EXIT_ALL_FAILED));
    }
    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["hostinv", "ports", "--json", "--config", "x.toml"]).expect("valid args");

        assert_eq!(cli.command, Command::Ports);
        assert!(cli.json);
        assert_eq!(cli.config, Some(PathBuf::from("x.toml")));
    }

    #[test]
    fn test_all_covers_every_domain() {
        assert_eq!(Command::All.domains().len(), Domain::ALL.len());
        assert_eq!(Command::Firmware.domains(), [Domain::Firmware]);
    }
}
