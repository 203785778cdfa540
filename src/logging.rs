//! Tracing subscriber setup

use std::path::Path;

use anyhow::Context;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::config::LOG_FILTER_ENV;

const DEFAULT_FILTER: &str = "info";

/// Resolve the filter directive from the environment, falling back to `info`
pub fn resolve_filter(env_value: Option<String>) -> String {
    env_value
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_FILTER.to_string())
}

/// Install the global subscriber writing to `log_path`.
///
/// With `verbose`, events are mirrored to stderr. With `json`, the file gets
/// one JSON object per event. The returned guard flushes the file writer when
/// dropped and must be held for the life of the process.
pub fn init(log_path: &Path, verbose: bool, json: bool) -> anyhow::Result<WorkerGuard> {
    let directory = log_path
        .parent()
        .context("Log path has no parent directory")?;
    let file_name = log_path
        .file_name()
        .context("Log path has no file name")?;

    std::fs::create_dir_all(directory)
        .with_context(|| format!("Failed to create log directory {:?}", directory))?;

    let appender = tracing_appender::rolling::never(directory, file_name);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let filter = EnvFilter::try_new(resolve_filter(std::env::var(LOG_FILTER_ENV).ok()))
        .context("Failed to parse log filter")?;

    let (text_layer, json_layer) = if json {
        (None, Some(fmt::layer().json().with_writer(writer)))
    } else {
        let layer = fmt::layer()
            .with_writer(writer)
            .with_ansi(false)
            .with_target(false);
        (Some(layer), None)
    };

    let stderr_layer = verbose.then(|| {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(text_layer)
        .with(json_layer)
        .with(stderr_layer)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(guard)
}
