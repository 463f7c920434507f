use std::{fmt, process::ExitCode};

use error_stack::{Context, Report, Result, ResultExt};

/// Blockwatcher error.
///
/// `Fetch` errors are temporary and retried on the next polling cycle. `Parse` errors abort the
/// current block. `Store` errors on derived data are logged and do not stop the cursor.
#[derive(Debug)]
pub enum WatcherError {
    /// Configuration error. Should not retry.
    Configuration,
    /// Malformed wire-format value. Aborts the current block.
    Parse,
    /// Chain node request failed. Retried on the next poll.
    Fetch,
    /// Key-value store command failed.
    Store,
    /// Fatal error. Should not retry.
    Fatal,
}

impl Context for WatcherError {}

impl fmt::Display for WatcherError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WatcherError::Configuration => f.write_str("blockwatcher error: configuration"),
            WatcherError::Parse => f.write_str("blockwatcher error: parse"),
            WatcherError::Fetch => f.write_str("blockwatcher error: fetch"),
            WatcherError::Store => f.write_str("blockwatcher error: store"),
            WatcherError::Fatal => f.write_str("blockwatcher error: fatal"),
        }
    }
}

pub trait ReportExt {
    fn to_exit_code(&self) -> ExitCode;
}

impl<T> ReportExt for Result<T, WatcherError> {
    fn to_exit_code(&self) -> ExitCode {
        match self {
            Ok(_) => ExitCode::SUCCESS,
            Err(err) => {
                eprintln!("{:?}", err);
                // Exit codes based on sysexits.h
                match err.current_context() {
                    WatcherError::Configuration => ExitCode::from(78),
                    WatcherError::Fetch | WatcherError::Store => ExitCode::from(75),
                    WatcherError::Parse | WatcherError::Fatal => ExitCode::FAILURE,
                }
            }
        }
    }
}

pub trait WatcherErrorResultExt {
    type Ok;
    fn configuration(self, reason: &str) -> Result<Self::Ok, WatcherError>;
    fn fatal(self, reason: &str) -> Result<Self::Ok, WatcherError>;
}

impl<T, C> WatcherErrorResultExt for core::result::Result<T, Report<C>>
where
    C: Context,
{
    type Ok = T;

    fn configuration(self, reason: &str) -> Result<T, WatcherError> {
        self.change_context(WatcherError::Configuration)
            .attach_printable(reason.to_string())
    }

    fn fatal(self, reason: &str) -> Result<T, WatcherError> {
        self.change_context(WatcherError::Fatal)
            .attach_printable(reason.to_string())
    }
}

