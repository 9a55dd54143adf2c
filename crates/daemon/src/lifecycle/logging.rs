// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use super::{Config, LifecycleError};

const DEFAULT_FILTER: &str = "info";

/// Install the global subscriber, appending to `daemon.log`.
///
/// Keep the returned guard alive; dropping it flushes and stops the writer.
pub fn init_logging(config: &Config) -> Result<WorkerGuard, LifecycleError> {
    let file_name = config
        .log_path
        .file_name()
        .ok_or_else(|| LifecycleError::Logging(format!("bad log path {}", config.log_path.display())))?;
    let dir = config.log_path.parent().unwrap_or(&config.state_dir);
    let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(dir, file_name));

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(writer).with_ansi(false).with_target(false))
        .try_init()
        .map_err(|e| LifecycleError::Logging(e.to_string()))?;
    Ok(guard)
}
