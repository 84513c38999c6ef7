//! Profile management commands
//!
//! Profiles name a region, an optional endpoint and optional credentials.
//! A profile without keys reads them from the AWS shared configuration.

use clap::Subcommand;
use pail_core::{Error, Profile, ProfileManager, TimeoutConfig};
use serde::Serialize;

use super::{GlobalOptions, fail};
use crate::exit_code::ExitCode;
use crate::output::Formatter;

/// Profile subcommands
#[derive(Subcommand, Debug)]
pub enum ProfileCommands {
    /// Add or update a profile
    Set(SetArgs),

    /// List all configured profiles
    List(ListArgs),

    /// Remove a profile
    Remove(RemoveArgs),
}

/// Arguments for the `profile set` command
#[derive(clap::Args, Debug)]
pub struct SetArgs {
    /// Profile name (e.g., "default", "work", "minio")
    pub name: String,

    /// AWS region (defaults to the shared AWS profile's region, then us-east-1)
    #[arg(long)]
    pub region: Option<String>,

    /// Custom S3 endpoint URL (e.g., "http://localhost:9000")
    #[arg(long)]
    pub endpoint: Option<String>,

    /// Access key ID
    #[arg(long, requires = "secret_key")]
    pub access_key: Option<String>,

    /// Secret access key
    #[arg(long, env = "CLOUDPAIL_SECRET_KEY", hide_env_values = true, requires = "access_key")]
    pub secret_key: Option<String>,

    /// Shared AWS profile to read credentials from (defaults to the profile name)
    #[arg(long, conflicts_with = "access_key")]
    pub aws_profile: Option<String>,

    /// Use path-style bucket addressing
    #[arg(long)]
    pub path_style: bool,

    /// Connection timeout in milliseconds
    #[arg(long)]
    pub connect_timeout_ms: Option<u64>,

    /// Read timeout in milliseconds
    #[arg(long)]
    pub read_timeout_ms: Option<u64>,

    /// Deadline for a whole request, retries included, in milliseconds
    #[arg(long)]
    pub operation_timeout_ms: Option<u64>,
}

/// Arguments for the `profile list` command
#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// Show full details
    #[arg(short, long)]
    pub long: bool,
}

/// Arguments for the `profile remove` command
#[derive(clap::Args, Debug)]
pub struct RemoveArgs {
    /// Name of the profile to remove
    pub name: String,
}

/// Profile information for output (without secrets)
#[derive(Debug, Serialize)]
struct ProfileInfo {
    name: String,
    region: String,
    endpoint: String,
    credentials: String,
    path_style: bool,
}

impl From<&Profile> for ProfileInfo {
    fn from(profile: &Profile) -> Self {
        let credentials = match profile.static_keys() {
            Some(_) => "static".to_string(),
            None => format!("aws profile '{}'", profile.shared_profile_name()),
        };
        Self {
            name: profile.name.clone(),
            region: profile.region.clone().unwrap_or_else(|| "-".to_string()),
            endpoint: profile.endpoint_url().unwrap_or_else(|| "-".to_string()),
            credentials,
            path_style: profile.path_style,
        }
    }
}

#[derive(Serialize)]
struct ProfileListOutput {
    profiles: Vec<ProfileInfo>,
}

#[derive(Serialize)]
struct ProfileOperationOutput {
    success: bool,
    profile: String,
    message: String,
}

/// Execute a profile subcommand
pub async fn execute(cmd: ProfileCommands, globals: &GlobalOptions) -> ExitCode {
    let formatter = Formatter::new(globals.output.clone());

    let manager = match ProfileManager::new() {
        Ok(manager) => manager,
        Err(e) => return fail(&formatter, "Failed to load configuration", &e),
    };

    match cmd {
        ProfileCommands::Set(args) => execute_set(args, &manager, &formatter),
        ProfileCommands::List(args) => execute_list(args, &manager, &formatter),
        ProfileCommands::Remove(args) => execute_remove(args, &manager, &formatter),
    }
}

/// Build a profile from `profile set` arguments
fn build_profile(args: SetArgs) -> Result<Profile, Error> {
    if args.name.trim().is_empty() {
        return Err(Error::Config("Profile name cannot be empty".into()));
    }

    let mut profile = Profile::new(&args.name);
    profile.region = args.region;

    if let Some(endpoint) = args.endpoint {
        let url = url_check(&endpoint)?;
        profile = profile.with_endpoint(url);
    }

    if let (Some(access_key), Some(secret_key)) = (args.access_key, args.secret_key) {
        profile = profile.with_keys(access_key, secret_key);
    }
    profile.aws_profile = args.aws_profile;
    profile.path_style = args.path_style;

    if args.connect_timeout_ms.is_some()
        || args.read_timeout_ms.is_some()
        || args.operation_timeout_ms.is_some()
    {
        let defaults = TimeoutConfig::default();
        profile.timeout = Some(TimeoutConfig {
            connect_ms: args.connect_timeout_ms.unwrap_or(defaults.connect_ms),
            read_ms: args.read_timeout_ms.unwrap_or(defaults.read_ms),
            operation_ms: args.operation_timeout_ms,
        });
    }

    Ok(profile)
}

fn url_check(endpoint: &str) -> Result<String, Error> {
    if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
        return Err(Error::Config(format!(
            "Endpoint must start with http:// or https://: {endpoint}"
        )));
    }
    Ok(endpoint.trim_end_matches('/').to_string())
}

fn execute_set(args: SetArgs, manager: &ProfileManager, formatter: &Formatter) -> ExitCode {
    let name = args.name.clone();

    let profile = match build_profile(args) {
        Ok(profile) => profile,
        Err(e) => {
            formatter.error(&e.to_string());
            return ExitCode::UsageError;
        }
    };

    match manager.set(profile) {
        Ok(()) => {
            if formatter.is_json() {
                formatter.json(&ProfileOperationOutput {
                    success: true,
                    profile: name.clone(),
                    message: format!("Profile '{name}' configured successfully"),
                });
            } else {
                formatter.success(&format!("Profile '{name}' configured successfully."));
            }
            ExitCode::Success
        }
        Err(e) => fail(formatter, "Failed to save profile", &e),
    }
}

fn execute_list(args: ListArgs, manager: &ProfileManager, formatter: &Formatter) -> ExitCode {
    let profiles = match manager.list() {
        Ok(profiles) => profiles,
        Err(e) => return fail(formatter, "Failed to list profiles", &e),
    };

    if formatter.is_json() {
        formatter.json(&ProfileListOutput {
            profiles: profiles.iter().map(ProfileInfo::from).collect(),
        });
    } else if profiles.is_empty() {
        formatter.println("No profiles configured.");
    } else if args.long {
        let mut table = formatter.table(["Name", "Region", "Endpoint", "Credentials", "Path style"]);
        for info in profiles.iter().map(ProfileInfo::from) {
            table.add_row([
                info.name,
                info.region,
                info.endpoint,
                info.credentials,
                info.path_style.to_string(),
            ]);
        }
        formatter.print_table(&table);
    } else {
        for profile in &profiles {
            let endpoint = profile.endpoint_url().unwrap_or_else(|| "-".to_string());
            formatter.println(&format!("{:<12} {endpoint}", profile.name));
        }
    }

    ExitCode::Success
}

fn execute_remove(args: RemoveArgs, manager: &ProfileManager, formatter: &Formatter) -> ExitCode {
    match manager.remove(&args.name) {
        Ok(()) => {
            if formatter.is_json() {
                formatter.json(&ProfileOperationOutput {
                    success: true,
                    profile: args.name.clone(),
                    message: format!("Profile '{}' removed successfully", args.name),
                });
            } else {
                formatter.success(&format!("Profile '{}' removed successfully.", args.name));
            }
            ExitCode::Success
        }
        Err(e) => fail(formatter, "Failed to remove profile", &e),
    }
}
