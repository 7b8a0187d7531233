//! Mailclerk entrypoint.
//!
//! One binary, invoked from cron or a systemd timer. Each invocation runs
//! a single job exactly once and prints the job's one-line (or two-line)
//! outcome report; scheduling decisions happen inside the job itself, so
//! the timer can fire as often as it likes.
//!
//! Usage:
//!   mailclerk run forwarder               # Run the monthly forwarder
//!   mailclerk run rotation                # Run the weekly rotation
//!   mailclerk config validate             # Check required keys
//!   mailclerk config show                 # Print resolved config

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use mailclerk_core::MailclerkConfig;
use mailclerk_jobs::{ForwarderJob, Job, RotationJob};
use mailclerk_mail::ImapSmtpClient;
use mailclerk_store::DropboxClient;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "mailclerk", version, about = "Scheduled, idempotent email dispatch")]
struct Cli {
    /// Config file (default: ~/.mailclerk/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run one job once and print its outcome
    Run {
        #[arg(value_enum)]
        job: JobName,
    },
    /// Inspect the configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum JobName {
    Forwarder,
    Rotation,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the resolved configuration as TOML
    Show,
    /// Check that every required key is present
    Validate,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "mailclerk=debug"
    } else {
        "mailclerk=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_target(false)
        .init();

    let config = match &cli.config {
        Some(path) => MailclerkConfig::load_from(path)?,
        None => MailclerkConfig::load()?,
    };

    match cli.command {
        Command::Run { job } => run_job(config, job).await,
        Command::Config { action } => inspect_config(config, action),
    }
}

async fn run_job(config: MailclerkConfig, job: JobName) -> Result<()> {
    config.validate()?;

    let mail = Arc::new(ImapSmtpClient::new(config.mail));
    let blobs = Arc::new(DropboxClient::new(config.dropbox));

    let job: Box<dyn Job> = match job {
        JobName::Forwarder => {
            if !config.forwarder.enabled {
                anyhow::bail!("forwarder job is disabled in the config");
            }
            Box::new(ForwarderJob::new(config.forwarder, mail, blobs))
        }
        JobName::Rotation => {
            if !config.rotation.enabled {
                anyhow::bail!("rotation job is disabled in the config");
            }
            Box::new(RotationJob::new(config.rotation, mail, blobs)?)
        }
    };

    tracing::info!(job = job.name(), "starting run");
    let report = job.run(Utc::now()).await;
    println!("{report}");
    Ok(())
}

fn inspect_config(config: MailclerkConfig, action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let mut shown = config;
            if !shown.mail.password.is_empty() {
                shown.mail.password = "<redacted>".to_string();
            }
            if !shown.dropbox.access_token.is_empty() {
                shown.dropbox.access_token = "<redacted>".to_string();
            }
            print!("{}", toml::to_string_pretty(&shown)?);
        }
        ConfigAction::Validate => {
            config.validate()?;
            println!("Config OK");
        }
    }
    Ok(())
}
