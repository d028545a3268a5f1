// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Drift Daemon (driftd)
//!
//! Background process that mirrors configured local directories to the
//! remote drive. Runs the sync engine in watch mode by default, or as a
//! one-shot sync with `--once`.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod lifecycle;

use drift_adapters::{NoOpRemote, NoOpWatcher};
use drift_core::SystemClock;
use drift_engine::{EngineDeps, SyncEngine, RELOAD_CONFIG, STOP};
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info};

use crate::lifecycle::{LifecycleError, Paths};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut once = false;
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--once" => once = true,
            "--version" | "-V" | "-v" => {
                println!("driftd {}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
            "--help" | "-h" | "help" => {
                println!("driftd {}", env!("CARGO_PKG_VERSION"));
                println!("Drift Daemon - mirrors local directories to the remote drive");
                println!();
                println!("USAGE:");
                println!("    driftd [--once]");
                println!();
                println!("OPTIONS:");
                println!("    --once           Replay pending changes, drain the queue, exit");
                println!("    -h, --help       Print help information");
                println!("    -v, --version    Print version information");
                return Ok(());
            }
            _ => {
                eprintln!("error: unexpected argument '{arg}'");
                eprintln!("Usage: driftd [--once | --help | --version]");
                std::process::exit(1);
            }
        }
    }

    let paths = Paths::load()?;
    rotate_log_if_needed(&paths.log_path);
    let log_guard = setup_logging(&paths)?;

    info!("Starting driftd");

    let (daemon, config_rx) = match lifecycle::startup(&paths).await {
        Ok(r) => r,
        Err(LifecycleError::LockFailed(_)) => {
            let pid = std::fs::read_to_string(&paths.lock_path)
                .unwrap_or_default()
                .trim()
                .to_string();
            eprintln!("driftd is already running");
            if !pid.is_empty() {
                eprintln!("  pid: {pid}");
            }
            std::process::exit(1);
        }
        Err(e) => {
            error!("Failed to start daemon: {}", e);
            drop(log_guard);
            return Err(e.into());
        }
    };

    // The watcher service and drive client are linked in by the packaged
    // integrations; the bare daemon wires no-ops so the engine loop,
    // queue, and signal handshakes all run.
    let mut engine = SyncEngine::new(
        EngineDeps {
            store: daemon.store.clone(),
            watcher: NoOpWatcher::new(),
            remote: NoOpRemote::new(),
            clock: SystemClock,
        },
        config_rx,
    );

    if once {
        let summary = engine.sync_once(false).await?;
        info!(
            total_events = summary.total_events,
            enqueued = summary.enqueued,
            suppressed = summary.suppressed,
            "one-shot sync finished"
        );
        daemon.shutdown().await?;
        return Ok(());
    }

    // reload-config signal: re-read config.toml and publish to the engine
    let bus = engine.signal_bus();
    let mut reload_rx = bus.listen(RELOAD_CONFIG);
    {
        let paths = daemon.paths.clone();
        let config_tx = daemon.config_sender();
        tokio::spawn(async move {
            while reload_rx.recv().await.is_some() {
                if let Err(e) = lifecycle::reload_config(&paths, &config_tx) {
                    error!("config reload failed: {}", e);
                }
            }
        });
    }

    // OS signals translate into the durable stop signal
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;
    {
        let bus = bus.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = sigterm.recv() => info!("Received SIGTERM, stopping..."),
                _ = sigint.recv() => info!("Received SIGINT, stopping..."),
            }
            if let Err(e) = bus.send(STOP).await {
                error!("failed to queue stop signal: {}", e);
            }
        });
    }

    println!("READY");
    engine.watch().await?;

    daemon.shutdown().await?;
    info!("Daemon stopped");
    Ok(())
}

/// Maximum log file size before rotation (10 MB).
const MAX_LOG_SIZE: u64 = 10 * 1024 * 1024;

/// Number of rotated log files to keep (driftd.log.1, .2, .3).
const MAX_ROTATED_LOGS: u32 = 3;

/// Rotate the daemon log file if it exceeds [`MAX_LOG_SIZE`].
///
/// Shifts `driftd.log` → `driftd.log.1` → `driftd.log.2` → `driftd.log.3`,
/// deleting the oldest. Best-effort: rotation failures are silently
/// ignored so the daemon still starts.
fn rotate_log_if_needed(log_path: &std::path::Path) {
    let size = match std::fs::metadata(log_path) {
        Ok(m) => m.len(),
        Err(_) => return,
    };

    if size < MAX_LOG_SIZE {
        return;
    }

    let log_str = log_path.display().to_string();

    for i in (1..MAX_ROTATED_LOGS).rev() {
        let from = format!("{log_str}.{i}");
        let to = format!("{log_str}.{}", i + 1);
        let _ = std::fs::rename(&from, &to);
    }

    let _ = std::fs::rename(log_path, format!("{log_str}.1"));
}

fn setup_logging(
    paths: &Paths,
) -> Result<tracing_appender::non_blocking::WorkerGuard, LifecycleError> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    std::fs::create_dir_all(&paths.state_dir)?;

    let file_appender = tracing_appender::rolling::never(
        &paths.state_dir,
        paths
            .log_path
            .file_name()
            .ok_or(LifecycleError::NoStateDir)?,
    );
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(non_blocking))
        .init();

    Ok(guard)
}

#[cfg(test)]
#[path = "main_tests.rs"]
mod tests;
