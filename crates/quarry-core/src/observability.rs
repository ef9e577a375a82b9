//! Observability infrastructure for Quarry.
//!
//! Structured logging with consistent spans. This module provides
//! initialization helpers and span constructors used across all
//! Quarry components.

use std::sync::Once;
use tracing::Span;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

static INIT: Once = Once::new();

/// Log output format.
#[derive(Debug, Clone, Copy, Default)]
pub enum LogFormat {
    /// JSON structured logs (for production).
    Json,
    /// Pretty-printed logs (for development).
    #[default]
    Pretty,
}

/// Initializes the logging subsystem.
///
/// Call once at application startup. Safe to call multiple times;
/// subsequent calls are no-ops.
///
/// # Environment Variables
///
/// - `RUST_LOG`: Controls log levels (e.g., `info`, `quarry_job=debug`)
///
/// # Example
///
/// ```rust
/// use quarry_core::observability::{init_logging, LogFormat};
///
/// init_logging(LogFormat::Pretty);
/// ```
pub fn init_logging(format: LogFormat) {
    INIT.call_once(|| {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        match format {
            LogFormat::Json => {
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(fmt::layer().json())
                    .init();
            }
            LogFormat::Pretty => {
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(fmt::layer().pretty())
                    .init();
            }
        }
    });
}

/// Creates a span for job lifecycle operations with standard fields.
///
/// # Example
///
/// ```rust
/// use quarry_core::observability::job_span;
///
/// let span = job_span("execute", "reporting", "daily_rollup");
/// let _guard = span.enter();
/// // ... drive the job protocol
/// ```
#[must_use]
pub fn job_span(operation: &str, pipeline: &str, task: &str) -> Span {
    tracing::info_span!(
        "job",
        op = operation,
        pipeline = pipeline,
        task = task,
    )
}
