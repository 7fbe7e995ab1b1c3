//! `homevoice`: terminal admin console for the homevoice voice assistant.

mod config;
mod export;
mod logging;
mod tui;

use anyhow::Context;
use clap::{Parser, Subcommand};
use config::{ConsoleConfig, Overrides};
use homevoice_client::Gateway;
use logging::LogTarget;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(
    name = "homevoice",
    version,
    about = "Admin console for the homevoice smart-home voice assistant"
)]
struct Cli {
    /// Path to console.toml (defaults to the platform config directory).
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Backend API prefix, e.g. http://localhost:5000/api.
    #[arg(long, global = true)]
    base_url: Option<String>,
    /// Per-request timeout in seconds.
    #[arg(long, global = true)]
    timeout: Option<u64>,
    /// Log filter directive (e.g. `debug`, `warn,homevoice_client=debug`).
    #[arg(long, global = true)]
    log_level: Option<String>,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Launch the interactive console (default).
    Tui,
    /// Check that the backend is reachable.
    Health,
    /// Export training data to a file.
    Export {
        #[arg(long, default_value = "json")]
        format: String,
        /// Output file (defaults to training_data.<format> in the export dir).
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    match run(Cli::parse()) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let overrides = Overrides {
        base_url: cli.base_url,
        timeout_secs: cli.timeout,
        log_level: cli.log_level,
    };
    let cfg = ConsoleConfig::resolve(cli.config.as_deref(), &overrides)
        .context("failed to load console configuration")?;

    match cli.command.unwrap_or(Command::Tui) {
        Command::Tui => {
            let log_dir = cfg.log_dir();
            let _guard = logging::init(&cfg.log.level, LogTarget::File(&log_dir))
                .context("failed to initialize logging")?;
            let gateway = Gateway::new(cfg.gateway()).context("invalid API configuration")?;
            tui::run(gateway, cfg.export_dir()).context("terminal I/O failed")?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Health => {
            logging::init(&cfg.log.level, LogTarget::Stderr)
                .context("failed to initialize logging")?;
            let gateway = Gateway::new(cfg.gateway()).context("invalid API configuration")?;
            match gateway.system().health() {
                Ok(body) => {
                    let status = body
                        .get("status")
                        .and_then(|s| s.as_str())
                        .unwrap_or("healthy");
                    println!("{}: {status}", gateway.base_url());
                    Ok(ExitCode::SUCCESS)
                }
                Err(e) => {
                    println!("{}: unreachable ({})", gateway.base_url(), e.detail());
                    Ok(ExitCode::FAILURE)
                }
            }
        }
        Command::Export { format, out } => {
            logging::init(&cfg.log.level, LogTarget::Stderr)
                .context("failed to initialize logging")?;
            let gateway = Gateway::new(cfg.gateway()).context("invalid API configuration")?;
            let payload = gateway
                .training()
                .export(&format)
                .context("export request failed")?;
            let path = out.unwrap_or_else(|| export::default_path(&cfg.export_dir(), &format));
            export::write(&path, &payload)
                .with_context(|| format!("failed to write {}", path.display()))?;
            println!("wrote {}", path.display());
            Ok(ExitCode::SUCCESS)
        }
    }
}
