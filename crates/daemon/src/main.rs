// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! proofd daemon entry point.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use proofd_core::SystemClock;
use proofd_daemon::adapters::{ExecProver, Prover};
use proofd_daemon::{startup, Config, LifecycleError};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

const USAGE: &str = "usage: proofd [--config <path>]";

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("proofd: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = parse_args()?;
    let config = Config::load(config_path.as_deref())?;
    let _log_guard = init_logging(&config)?;

    let prover_cmd = config.prover_cmd.clone().ok_or(LifecycleError::MissingProverCmd)?;
    let prover: Arc<dyn Prover> = Arc::new(ExecProver::new(prover_cmd));

    let server = startup(&config, prover, SystemClock).await?;
    tokio::select! {
        _ = server.shutdown_requested() => info!("shutdown requested"),
        _ = shutdown_signal() => info!("shutdown signal received"),
    }
    server.shutdown().await;
    Ok(())
}

fn parse_args() -> Result<Option<PathBuf>, String> {
    let mut args = std::env::args().skip(1);
    let mut config = None;
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => {
                let path = args.next().ok_or_else(|| format!("--config needs a path\n{USAGE}"))?;
                config = Some(PathBuf::from(path));
            }
            "--help" | "-h" => {
                println!("{USAGE}");
                std::process::exit(0);
            }
            other => return Err(format!("unknown argument {other:?}\n{USAGE}")),
        }
    }
    Ok(config)
}

/// Env-filtered logging to stderr, or to the configured log file.
fn init_logging(config: &Config) -> Result<Option<WorkerGuard>, std::io::Error> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match &config.log_path {
        Some(path) => {
            let dir = path.parent().unwrap_or_else(|| std::path::Path::new("."));
            let file = path.file_name().unwrap_or_else(|| std::ffi::OsStr::new("proofd.log"));
            std::fs::create_dir_all(dir)?;
            let appender = tracing_appender::rolling::never(dir, file);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(writer)
                .with_ansi(false)
                .init();
            Ok(Some(guard))
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
            Ok(None)
        }
    }
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = term.recv() => {}
                }
            }
            Err(_) => {
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
