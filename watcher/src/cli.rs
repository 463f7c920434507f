use std::path::PathBuf;

use anstyle::{AnsiColor, Style};
use blockwatcher_observability::init_tracing;
use clap::{builder::Styles, Parser};
use error_stack::{Result, ResultExt};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::{config::Configuration, error::WatcherError, run_watcher, WatcherErrorResultExt};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None, styles = cli_style())]
pub struct Cli {
    /// Path to the configuration file.
    #[arg(long, short, env = "BLOCKWATCHER_CONFIG", default_value = "config.toml")]
    pub config: PathBuf,
}

impl Cli {
    pub async fn run(self, ct: CancellationToken) -> Result<(), WatcherError> {
        let configuration = Configuration::from_file(&self.config)?;

        init_tracing(configuration.log_path().as_deref())
            .configuration("failed to initialize tracing")?;

        cancel_on_shutdown_signal(ct.clone()).fatal("failed to set up shutdown handler")?;

        run_watcher(configuration, ct).await
    }
}

/// Cancels `ct` on SIGINT or SIGTERM so the ingestion loop stops between blocks.
pub fn cancel_on_shutdown_signal(ct: CancellationToken) -> Result<(), ctrlc::Error> {
    ctrlc::set_handler(move || {
        info!("shutdown signal received");
        ct.cancel();
    })
    .attach_printable("failed to register shutdown signal handler")
}

const HEADER: Style = AnsiColor::Green.on_default().bold();
const LITERAL: Style = AnsiColor::Cyan.on_default().bold();
const PLACEHOLDER: Style = AnsiColor::Cyan.on_default();
const ERROR: Style = AnsiColor::Red.on_default().bold();

/// Help and error colors of the `blockwatcher` command.
pub fn cli_style() -> Styles {
    Styles::styled()
        .header(HEADER)
        .usage(HEADER)
        .literal(LITERAL)
        .placeholder(PLACEHOLDER)
        .error(ERROR)
        .valid(LITERAL)
        .invalid(ERROR)
}
