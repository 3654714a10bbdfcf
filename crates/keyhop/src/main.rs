//! keyhop
//!
//! Runs command batches and uploads content on remote hosts over SSH, printing structured
//! JSON results on stdout.

use std::time::Duration;

use clap::Parser;
use color_eyre::Result;
use eyre::eyre;
use keyhop_exec::events::{self, ProgressEvent};
use keyhop_exec::{ExecError, OutputStream};
use serde::Serialize;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

mod cli;
mod config;

use cli::{Cli, Commands};
use config::{Config, LogConfig};

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::load_default()?,
    };
    init_tracing(&config.log);
    match &config.source {
        Some(path) => debug!(path = %path.display(), "loaded configuration"),
        None => debug!("no config file found, using defaults"),
    }

    let timeout = cli.timeout.map(Duration::from_secs);
    let (sink, rx) = events::channel(256);
    let drain = spawn_progress_logger(rx);

    let outcome = match cli.command {
        Commands::Exec(args) => {
            let params = args.into_params(&config.defaults)?;
            let results = bounded(timeout, keyhop_core::execute(params, Some(&sink))).await;
            results.and_then(|r| print_json(&r))
        }
        Commands::Upload(args) => {
            let params = args.into_params(&config.defaults)?;
            let response = bounded(timeout, keyhop_core::upload(params, Some(&sink))).await;
            response.and_then(|r| print_json(&r))
        }
    };

    drop(sink);
    if let Err(e) = drain.await {
        warn!(error = %e, "progress logger failed");
    }

    outcome
}

fn init_tracing(log: &LogConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if log.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn bounded<T>(
    timeout: Option<Duration>,
    operation: impl Future<Output = Result<T, ExecError>>,
) -> Result<T> {
    let result = match timeout {
        Some(limit) => tokio::time::timeout(limit, operation)
            .await
            .map_err(|_| eyre!("operation timed out after {}s", limit.as_secs()))?,
        None => operation.await,
    };
    Ok(result?)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn spawn_progress_logger(mut rx: broadcast::Receiver<ProgressEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => log_progress(&event),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "progress logger fell behind");
                }
                Err(RecvError::Closed) => break,
            }
        }
    })
}

fn log_progress(event: &ProgressEvent) {
    match event {
        ProgressEvent::KeyStaged => info!("staged private key"),
        ProgressEvent::Connected { target } => info!(remote = %target, "connected"),
        ProgressEvent::Executing { command } => info!(command = %command, "executing"),
        ProgressEvent::Output {
            command,
            stream: OutputStream::Stdout,
            chunk,
        } => debug!(command = %command, "stdout: {}", chunk.trim_end()),
        ProgressEvent::Output {
            command,
            stream: OutputStream::Stderr,
            chunk,
        } => debug!(command = %command, "stderr: {}", chunk.trim_end()),
        ProgressEvent::Exited {
            command,
            exit_code,
            signal,
        } => info!(command = %command, ?exit_code, ?signal, "command finished"),
        ProgressEvent::IncompleteResult { command } => {
            warn!(command = %command, "command ended without an exit status");
        }
        ProgressEvent::Rejected { command, reason } => {
            warn!(command = %command, reason = %reason, "server refused to run command");
        }
        ProgressEvent::DirectoryEnsured { path } => info!(path = %path, "directory ready"),
        ProgressEvent::Uploading { path, bytes } => info!(path = %path, bytes, "uploading"),
        ProgressEvent::CleaningUp => info!("cleaning up"),
    }
}
