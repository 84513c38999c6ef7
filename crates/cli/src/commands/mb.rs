//! mb command - Make bucket
//!
//! Creates a new bucket, constrained to the profile's region or to `--region`.

use clap::Args;
use pail_core::{Error, ObjectStore, validate_bucket_name};
use serde::Serialize;

use super::{GlobalOptions, connect_with, fail, resolve_profile};
use crate::exit_code::ExitCode;
use crate::output::Formatter;

/// Create a bucket
#[derive(Args, Debug)]
pub struct MbArgs {
    /// Bucket name
    pub bucket: String,

    /// Ignore error if bucket already exists
    #[arg(short = 'p', long)]
    pub ignore_existing: bool,

    /// Region for the bucket (overrides the profile's region)
    #[arg(long)]
    pub region: Option<String>,
}

#[derive(Debug, Serialize)]
struct MbOutput {
    status: &'static str,
    bucket: String,
    region: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

/// Service codes for a name that is already taken
const ALREADY_EXISTS: &[&str] = &["BucketAlreadyOwnedByYou", "BucketAlreadyExists"];

fn already_exists(error: &Error) -> bool {
    matches!(error, Error::Service { code, .. } if ALREADY_EXISTS.contains(&code.as_str()))
}

/// Execute the mb command
pub async fn execute(args: MbArgs, globals: &GlobalOptions) -> ExitCode {
    let formatter = Formatter::new(globals.output.clone());

    let bucket = args.bucket.trim_start_matches("s3://").trim_end_matches('/');
    if let Err(e) = validate_bucket_name(bucket) {
        formatter.error(&e.to_string());
        return ExitCode::UsageError;
    }

    let mut profile = match resolve_profile(globals, &formatter) {
        Ok(profile) => profile,
        Err(code) => return code,
    };
    // Sign requests for the target region so the constraint is accepted
    if let Some(region) = &args.region {
        profile = profile.with_region(region.clone());
    }

    let client = match connect_with(profile, &formatter).await {
        Ok(client) => client,
        Err(code) => return code,
    };
    let region = client.region().to_string();

    make_bucket(&client, bucket, &region, args.ignore_existing, &formatter).await
}

async fn make_bucket(
    client: &dyn ObjectStore,
    bucket: &str,
    region: &str,
    ignore_existing: bool,
    formatter: &Formatter,
) -> ExitCode {
    let report = |message: Option<String>| {
        if formatter.is_json() {
            formatter.json(&MbOutput {
                status: "success",
                bucket: bucket.to_string(),
                region: region.to_string(),
                message: message.clone(),
            });
        } else {
            formatter.success(&message.unwrap_or_else(|| {
                format!("Bucket '{bucket}' created successfully in {region}.")
            }));
        }
    };
    let exists_message = || Some(format!("Bucket '{bucket}' already exists."));

    if ignore_existing {
        match client.bucket_exists(bucket).await {
            Ok(true) => {
                report(exists_message());
                return ExitCode::Success;
            }
            Ok(false) => {}
            // creation reports the real problem
            Err(e) => tracing::debug!(bucket, error = %e, "existence check failed"),
        }
    }

    match client.create_bucket(bucket, Some(region.to_string())).await {
        Ok(()) => {
            report(None);
            ExitCode::Success
        }
        Err(e) if ignore_existing && already_exists(&e) => {
            report(exists_message());
            ExitCode::Success
        }
        Err(e) if already_exists(&e) => {
            formatter.error(&format!(
                "Bucket '{bucket}' already exists. Bucket names are global; pick another or use --ignore-existing."
            ));
            ExitCode::Conflict
        }
        Err(e) => fail(formatter, "Failed to create bucket", &e),
    }
}
