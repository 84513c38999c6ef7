//! share command - Generate a presigned download link
//!
//! The link lets anyone holding it download the object until it expires.
//! SigV4 caps the lifetime at seven days.

use std::time::Duration;

use clap::Args;
use jiff::SignedDuration;
use pail_core::{ObjectStore as _, ProfileManager};
use serde::Serialize;

use super::{GlobalOptions, connect, fail, parse_path};
use crate::exit_code::ExitCode;
use crate::output::Formatter;

/// Longest lifetime a presigned link may have
const MAX_EXPIRY_SECS: i64 = 7 * 24 * 3600;

/// Generate a time-limited download link
#[derive(Args, Debug)]
pub struct ShareArgs {
    /// Object path (bucket/key)
    pub path: String,

    /// Link lifetime, e.g. "90s", "30m", "12h", "7d" (default from config)
    #[arg(long, short)]
    pub expires: Option<String>,
}

#[derive(Debug, Serialize)]
struct ShareOutput {
    path: String,
    url: String,
    expires_in_secs: u64,
    expires_at: String,
}

/// Parse a link lifetime
///
/// Accepts plain seconds, whole days as `<n>d`, or any duration jiff
/// understands ("1h30m", "45 minutes", "PT2H").
fn parse_expiry(raw: &str) -> Result<Duration, String> {
    let raw = raw.trim();

    let seconds = if let Ok(secs) = raw.parse::<i64>() {
        secs
    } else if let Some(days) = raw.strip_suffix('d').and_then(|d| d.trim().parse::<i64>().ok()) {
        days.saturating_mul(24 * 3600)
    } else {
        raw.parse::<SignedDuration>()
            .map_err(|e| format!("Invalid expiry '{raw}': {e}"))?
            .as_secs()
    };

    if seconds <= 0 {
        return Err(format!("Expiry must be positive, got '{raw}'"));
    }
    if seconds > MAX_EXPIRY_SECS {
        return Err(format!("Expiry '{raw}' exceeds the maximum of 7 days"));
    }
    Ok(Duration::from_secs(seconds as u64))
}

/// Execute the share command
pub async fn execute(args: ShareArgs, globals: &GlobalOptions) -> ExitCode {
    let formatter = Formatter::new(globals.output.clone());

    let path = match parse_path(&formatter, &args.path) {
        Ok(path) => path,
        Err(code) => return code,
    };
    if let Err(e) = path.require_key() {
        formatter.error(&e.to_string());
        return ExitCode::UsageError;
    }

    let expires = match &args.expires {
        Some(raw) => parse_expiry(raw),
        None => match ProfileManager::new().and_then(|m| m.presign_expiry_secs()) {
            Ok(secs) => parse_expiry(&secs.to_string()),
            Err(e) => return fail(&formatter, "Failed to load configuration", &e),
        },
    };
    let expires = match expires {
        Ok(expires) => expires,
        Err(message) => {
            formatter.error(&message);
            return ExitCode::UsageError;
        }
    };

    let client = match connect(globals, &formatter).await {
        Ok(client) => client,
        Err(code) => return code,
    };

    let url = match client.presigned_get_url(&path, expires).await {
        Ok(url) => url,
        Err(e) => return fail(&formatter, &format!("Failed to share {path}"), &e),
    };

    let expires_at = jiff::Timestamp::now()
        .checked_add(SignedDuration::from_secs(expires.as_secs() as i64))
        .map(|t| t.strftime("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_default();

    if formatter.is_json() {
        formatter.json(&ShareOutput {
            path: path.to_string(),
            url,
            expires_in_secs: expires.as_secs(),
            expires_at,
        });
    } else if formatter.is_quiet() {
        // the link is the whole point; print it even when quiet
        println!("{url}");
    } else {
        formatter.println(&url);
        formatter.println(&formatter.dim(&format!("Expires {expires_at}")));
    }

    ExitCode::Success
}
