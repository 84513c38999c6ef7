//! cloudpail - S3 bucket and object manager
//!
//! Manages buckets and objects on AWS S3 and S3-compatible services, with
//! safe removal of non-empty and versioned buckets.

use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use cloudpail::commands::{self, Cli};

const DEBUG_FILTER: &str = "warn,cloudpail=debug,pail_core=debug,pail_s3=debug";

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // stdout carries command output; logs go to stderr
    let filter = if cli.debug {
        EnvFilter::new(DEBUG_FILTER)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let exit_code = commands::execute(cli).await;

    std::process::exit(exit_code.as_i32());
}
