//! Tracing bootstrap for hosts embedding the scheduler

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;

const DEFAULT_FILTER: &str = "info,storefront_scheduler=debug";
const LOG_FILE_NAME: &str = "scheduler.log";

/// Install the global subscriber: stdout always, plus a daily rolling file
/// when `config.logs_dir` is set. Keep the returned guard alive for the
/// lifetime of the process or buffered file output is lost.
pub fn init_logging(config: &Config) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    match &config.logs_dir {
        Some(logs_dir) => {
            std::fs::create_dir_all(logs_dir)
                .with_context(|| format!("Failed to create logs directory {}", logs_dir))?;

            let file_appender = RollingFileAppender::new(Rotation::DAILY, logs_dir, LOG_FILE_NAME);
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer()) // stdout
                .with(tracing_subscriber::fmt::layer().with_writer(non_blocking).with_ansi(false)) // file
                .try_init()
                .context("Global tracing subscriber already installed")?;

            Ok(Some(guard))
        }
        None => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer())
                .try_init()
                .context("Global tracing subscriber already installed")?;

            Ok(None)
        }
    }
}
