//! CLI command definitions and execution
//!
//! This module contains all CLI commands and their implementations.
//! Every command resolves its profile, talks to the store through
//! [`pail_core::ObjectStore`] and returns an [`ExitCode`].

use clap::{Parser, Subcommand};
use pail_core::{Error, Profile, ProfileManager, RemotePath, parse_remote_path};
use pail_s3::S3Client;

use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig};

mod completions;
mod get;
mod ls;
mod mb;
mod profile;
mod put;
mod rb;
mod rm;
mod share;
mod stat;

#[cfg(test)]
mod test_support;

/// cloudpail - a terminal client for S3 buckets and objects
///
/// Credentials come from the selected profile, or from the AWS shared
/// configuration files when the profile has no keys of its own.
#[derive(Parser, Debug)]
#[command(name = "cloudpail")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format: human-readable or JSON
    #[arg(long, global = true, default_value = "false")]
    pub json: bool,

    /// Disable colored output
    #[arg(long, global = true, default_value = "false")]
    pub no_color: bool,

    /// Disable progress spinners
    #[arg(long, global = true, default_value = "false")]
    pub no_progress: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true, default_value = "false")]
    pub quiet: bool,

    /// Enable debug logging
    #[arg(long, global = true, default_value = "false")]
    pub debug: bool,

    /// Profile to use (defaults to the configured default profile)
    #[arg(short = 'P', long, global = true, env = "CLOUDPAIL_PROFILE")]
    pub profile: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Manage connection profiles
    #[command(subcommand)]
    Profile(profile::ProfileCommands),

    /// Create a bucket
    Mb(mb::MbArgs),

    /// List buckets, objects or object versions
    Ls(ls::LsArgs),

    /// Remove a bucket, purging every version first if confirmed
    Rb(rb::RbArgs),

    /// Upload a file or folder
    Put(put::PutArgs),

    /// Download an object
    Get(get::GetArgs),

    /// Remove an object
    Rm(rm::RmArgs),

    /// Show object metadata
    Stat(stat::StatArgs),

    /// Generate a time-limited download link
    Share(share::ShareArgs),

    /// Generate shell completion scripts
    Completions(completions::CompletionsArgs),
}

/// Settings shared by every command
#[derive(Debug, Clone, Default)]
pub struct GlobalOptions {
    pub output: OutputConfig,
    pub profile: Option<String>,
}

/// Execute the CLI command and return an exit code
pub async fn execute(cli: Cli) -> ExitCode {
    let globals = GlobalOptions {
        output: OutputConfig {
            json: cli.json,
            no_color: cli.no_color,
            no_progress: cli.no_progress,
            quiet: cli.quiet,
        },
        profile: cli.profile,
    };

    if globals.output.no_color {
        console::set_colors_enabled(false);
        console::set_colors_enabled_stderr(false);
    }

    match cli.command {
        Commands::Profile(cmd) => profile::execute(cmd, &globals).await,
        Commands::Mb(args) => mb::execute(args, &globals).await,
        Commands::Ls(args) => ls::execute(args, &globals).await,
        Commands::Rb(args) => rb::execute(args, &globals).await,
        Commands::Put(args) => put::execute(args, &globals).await,
        Commands::Get(args) => get::execute(args, &globals).await,
        Commands::Rm(args) => rm::execute(args, &globals).await,
        Commands::Stat(args) => stat::execute(args, &globals).await,
        Commands::Share(args) => share::execute(args, &globals).await,
        Commands::Completions(args) => completions::execute(args),
    }
}

/// Print `error` with some context and pick the matching exit code
pub(crate) fn fail(formatter: &Formatter, context: &str, error: &Error) -> ExitCode {
    formatter.error(&format!("{context}: {error}"));
    ExitCode::from_error(error)
}

/// Parse a `bucket[/key]` argument
pub(crate) fn parse_path(formatter: &Formatter, raw: &str) -> Result<RemotePath, ExitCode> {
    parse_remote_path(raw).map_err(|e| {
        formatter.error(&e.to_string());
        ExitCode::UsageError
    })
}

/// Load the profile selected by `--profile` or the configured default
pub(crate) fn resolve_profile(
    globals: &GlobalOptions,
    formatter: &Formatter,
) -> Result<Profile, ExitCode> {
    ProfileManager::new()
        .and_then(|manager| manager.resolve(globals.profile.as_deref()))
        .map_err(|e| fail(formatter, "Failed to load profile", &e))
}

/// Build a client for `profile`
pub(crate) async fn connect_with(
    profile: Profile,
    formatter: &Formatter,
) -> Result<S3Client, ExitCode> {
    S3Client::new(profile)
        .await
        .map_err(|e| fail(formatter, "Failed to create S3 client", &e))
}

/// Build a client for the selected profile
pub(crate) async fn connect(
    globals: &GlobalOptions,
    formatter: &Formatter,
) -> Result<S3Client, ExitCode> {
    let profile = resolve_profile(globals, formatter)?;
    connect_with(profile, formatter).await
}
