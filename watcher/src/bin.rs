use std::process::ExitCode;

use blockwatcher::{cli::Cli, ReportExt};
use clap::Parser;
use tokio_util::sync::CancellationToken;

#[cfg(not(windows))]
#[global_allocator]
static ALLOC: jemallocator::Jemalloc = jemallocator::Jemalloc;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Cli::parse();
    let ct = CancellationToken::new();
    args.run(ct).await.to_exit_code()
}
