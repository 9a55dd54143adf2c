// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `jitrd`: poll GitHub for queued workflow runs and serve each one from a
//! fresh just-in-time runner inside a devcontainer.

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use jitr_adapters::{GitHubClient, SystemRunner, DEFAULT_API_URL};
use jitr_core::SystemClock;
use jitr_daemon::lifecycle::{self, Config, LifecycleError};
use jitr_daemon::{env, FileConfigSource};
use jitr_engine::{Daemon, ExecutorConfig, JobExecutor};
use tokio::signal::unix::{signal, SignalKind};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

type JitrDaemon = Daemon<GitHubClient, SystemRunner, SystemClock>;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("jitrd: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), LifecycleError> {
    let config = Config::load()?;
    let daemon = Arc::new(build_daemon(&config)?);
    daemon.preflight()?;

    let lock = lifecycle::startup(&config)?;
    let log_guard = match lifecycle::init_logging(&config) {
        Ok(guard) => guard,
        Err(e) => {
            lock.release();
            return Err(e);
        }
    };

    let result = serve(&config, daemon).await;
    if let Err(e) = &result {
        tracing::error!(error = %e, "daemon exited with error");
    }
    lock.release();
    drop(log_guard);
    result
}

fn build_daemon(config: &Config) -> Result<JitrDaemon, LifecycleError> {
    let source = FileConfigSource::open(&config.config_path)?;
    let file = source.config().clone();
    let token = env::github_token();

    let api_url = env::github_api_url()
        .or(file.github.api_url)
        .unwrap_or_else(|| DEFAULT_API_URL.to_string());
    let mut platform = GitHubClient::new(api_url, token.clone())?;
    if let Some(group) = file.github.runner_group_id {
        platform = platform.with_runner_group(group);
    }

    let mut executor_config = file.executor.apply(ExecutorConfig::default());
    executor_config.token = token;
    let executor = JobExecutor::new(SystemRunner, SystemClock, executor_config);

    Ok(Daemon::new(platform, executor, source, SystemClock))
}

async fn serve(config: &Config, daemon: Arc<JitrDaemon>) -> Result<(), LifecycleError> {
    let cancel = CancellationToken::new();

    let prerequisites = daemon.executor().check_prerequisites(&cancel).await;
    if !prerequisites.is_ready() {
        let detail = prerequisites
            .error
            .unwrap_or_else(|| "container engine or devcontainer CLI unavailable".to_string());
        return Err(LifecycleError::Prerequisites(detail));
    }

    info!(
        pid = std::process::id(),
        state_dir = %config.state_dir.display(),
        config = %config.config_path.display(),
        "jitrd starting"
    );

    let writer = lifecycle::spawn_status_writer(daemon.clone(), config.status_path.clone());
    let signals = spawn_signal_handler(daemon.clone(), cancel.clone())?;
    let grace = env::drain_timeout();

    let result = tokio::select! {
        result = daemon.run(&cancel) => result,
        _ = drain_expired(&cancel, grace) => {
            warn!(grace_ms = grace.as_millis() as u64, "cancelled jobs did not finish in time, exiting");
            Ok(())
        }
    };

    signals.abort();
    writer.abort();
    if let Err(e) = lifecycle::write_status(&config.status_path, &daemon.status()) {
        warn!(path = %config.status_path.display(), error = %e, "failed to write final status");
    }
    result.map_err(LifecycleError::from)
}

/// Resolves `grace` after `cancel` fires.
async fn drain_expired(cancel: &CancellationToken, grace: Duration) {
    cancel.cancelled().await;
    tokio::time::sleep(grace).await;
}

/// First SIGINT/SIGTERM stops dispatching; the second cancels running jobs.
fn spawn_signal_handler(
    daemon: Arc<JitrDaemon>,
    cancel: CancellationToken,
) -> Result<JoinHandle<()>, LifecycleError> {
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;
    Ok(tokio::spawn(async move {
        let mut received = 0u32;
        loop {
            tokio::select! {
                _ = sigterm.recv() => {}
                _ = sigint.recv() => {}
            }
            received += 1;
            if received == 1 {
                info!("signal received, waiting for running jobs (signal again to cancel them)");
                daemon.request_shutdown();
            } else {
                warn!("second signal received, cancelling running jobs");
                cancel.cancel();
                break;
            }
        }
    }))
}
