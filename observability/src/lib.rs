//! # Tracing helpers
//!
//! Sets up the `tracing` subscriber shared by the blockwatcher binaries: a human readable (or
//! JSON) stdout layer and, optionally, a JSON layer appending to a log file.

use std::fs::{File, OpenOptions};
use std::path::Path;
use std::sync::Mutex;

use error_stack::{Result, ResultExt};
use tracing::Subscriber;
use tracing_subscriber::{prelude::*, registry::LookupSpan, EnvFilter, Layer};

const RUST_LOG: &str = "RUST_LOG";
const RUST_LOG_FORMAT: &str = "RUST_LOG_FORMAT";

pub type BoxedLayer<S> = Box<dyn Layer<S> + Send + Sync>;

#[derive(Debug)]
pub struct TracingInitError;
impl error_stack::Context for TracingInitError {}

impl std::fmt::Display for TracingInitError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("failed to initialize tracing")
    }
}

/// Initialize the global tracing subscriber.
///
/// Logs go to stdout, filtered by `RUST_LOG` (defaults to `info`). Set `RUST_LOG_FORMAT=json`
/// to switch stdout to JSON lines. When `log_path` is provided, every event is also appended
/// to that file as JSON.
///
/// It should be called once during the application startup.
pub fn init_tracing(log_path: Option<&Path>) -> Result<(), TracingInitError> {
    if std::env::var(RUST_LOG).is_err() {
        std::env::set_var(RUST_LOG, "info");
    }

    let mut layers = vec![stdout()];

    if let Some(path) = log_path {
        layers.push(file(path)?);
    }

    tracing_subscriber::registry()
        .with(layers)
        .try_init()
        .change_context(TracingInitError)
        .attach_printable("a global subscriber is already installed")?;

    Ok(())
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("INFO"))
}

fn stdout<S>() -> BoxedLayer<S>
where
    S: Subscriber,
    for<'a> S: LookupSpan<'a>,
{
    let json_fmt = std::env::var(RUST_LOG_FORMAT)
        .map(|val| val == "json")
        .unwrap_or(false);

    if json_fmt {
        tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_target(true)
            .json()
            .with_filter(env_filter())
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_ansi(true)
            .with_target(false)
            .with_filter(env_filter())
            .boxed()
    }
}

fn file<S>(path: &Path) -> Result<BoxedLayer<S>, TracingInitError>
where
    S: Subscriber,
    for<'a> S: LookupSpan<'a>,
{
    let file = open_log_file(path)?;

    let layer = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .with_target(true)
        .json()
        .with_writer(Mutex::new(file))
        .with_filter(env_filter())
        .boxed();

    Ok(layer)
}

fn open_log_file(path: &Path) -> Result<File, TracingInitError> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .change_context(TracingInitError)
        .attach_printable("failed to open log file")
        .attach_printable_lazy(|| format!("path: {}", path.display()))
}
