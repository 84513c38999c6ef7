//! rb command - Remove bucket
//!
//! Removes a bucket. A bucket that still holds versions or delete markers is
//! purged first, but only after the user confirms (or `--force` is given).
//! Ctrl-C during the purge stops it after the batch in flight.

use std::io::IsTerminal;

use clap::Args;
use console::Term;
use pail_core::{
    BucketRemoval, CancelFlag, Confirm, RemovalOutcome, RemovalReport, RemovalState,
    validate_bucket_name,
};
use serde::Serialize;

use super::{GlobalOptions, connect};
use crate::exit_code::ExitCode;
use crate::output::{Formatter, ProgressBar};

/// Remove a bucket
#[derive(Args, Debug)]
pub struct RbArgs {
    /// Bucket name
    pub bucket: String,

    /// Purge a non-empty bucket without asking
    #[arg(long)]
    pub force: bool,
}

#[derive(Debug, Serialize)]
struct RbOutput {
    status: &'static str,
    bucket: String,
    purged: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    stage: Option<RemovalState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    trail: Vec<RemovalState>,
}

impl From<&RemovalReport> for RbOutput {
    fn from(report: &RemovalReport) -> Self {
        let (status, stage, error) = match &report.outcome {
            RemovalOutcome::Deleted { .. } => ("deleted", None, None),
            RemovalOutcome::Aborted => ("aborted", None, None),
            RemovalOutcome::Failed(failure) => {
                ("failed", Some(failure.stage), Some(failure.error.to_string()))
            }
        };
        Self {
            status,
            bucket: report.bucket.clone(),
            purged: report.purged(),
            stage,
            error,
            trail: report.trail.clone(),
        }
    }
}

/// Asks on the terminal before a purge
///
/// Declines when stdin is not a terminal, unless forced. Ctrl-C keeps its
/// default meaning while the question is open; once the purge is approved
/// it stops the purge after the batch in flight.
struct TerminalPrompt {
    force: bool,
    spinner: Option<indicatif::ProgressBar>,
    cancel: CancelFlag,
}

impl TerminalPrompt {
    fn approve(&self, yes: bool) -> bool {
        if yes {
            watch_interrupts(self.cancel.clone());
        }
        yes
    }

    fn ask(&self, bucket: &str) -> Option<String> {
        let term = Term::stderr();
        term.write_str(&format!(
            "Bucket '{bucket}' is not empty. Permanently delete every object version and delete marker in it? [y/N] "
        ))
        .ok()?;
        term.read_line().ok()
    }
}

impl Confirm for TerminalPrompt {
    fn confirm(&self, bucket: &str) -> bool {
        if self.force {
            return self.approve(true);
        }
        if !std::io::stdin().is_terminal() {
            tracing::debug!(bucket, "stdin is not a terminal, declining purge");
            return false;
        }

        let answer = match &self.spinner {
            Some(bar) => bar.suspend(|| self.ask(bucket)),
            None => self.ask(bucket),
        };
        self.approve(is_yes(answer.as_deref()))
    }
}

fn is_yes(answer: Option<&str>) -> bool {
    matches!(
        answer.map(|a| a.trim().to_ascii_lowercase()).as_deref(),
        Some("y" | "yes")
    )
}

/// Cancel `flag` on the first Ctrl-C; exit on the second
fn watch_interrupts(flag: CancelFlag) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_err() {
            return;
        }
        tracing::warn!("interrupt received, stopping after the current batch");
        flag.cancel();

        if tokio::signal::ctrl_c().await.is_ok() {
            std::process::exit(ExitCode::Interrupted.as_i32());
        }
    });
}

/// Execute the rb command
pub async fn execute(args: RbArgs, globals: &GlobalOptions) -> ExitCode {
    let formatter = Formatter::new(globals.output.clone());

    let bucket = args.bucket.trim_start_matches("s3://").trim_end_matches('/');
    if let Err(e) = validate_bucket_name(bucket) {
        formatter.error(&e.to_string());
        return ExitCode::UsageError;
    }

    let client = match connect(globals, &formatter).await {
        Ok(client) => client,
        Err(code) => return code,
    };

    let spinner = ProgressBar::spinner(&globals.output, &format!("Checking bucket '{bucket}'..."));
    let cancel = CancelFlag::new();
    let prompt = TerminalPrompt {
        force: args.force,
        spinner: spinner.handle(),
        cancel: cancel.clone(),
    };

    let progress = spinner.handle();
    let report = BucketRemoval::new(&client, &prompt)
        .cancel_flag(cancel)
        .on_progress(move |p| {
            if let Some(bar) = &progress {
                bar.set_message(format!(
                    "Purging '{}': {} version(s) deleted in {} batch(es)",
                    bucket, p.deleted, p.batches
                ));
            }
        })
        .run(bucket)
        .await;

    spinner.finish_and_clear();
    render(&report, &formatter)
}

/// Print the outcome and pick the exit code
fn render(report: &RemovalReport, formatter: &Formatter) -> ExitCode {
    if formatter.is_json() {
        formatter.json(&RbOutput::from(report));
    }

    let bucket = &report.bucket;
    match &report.outcome {
        RemovalOutcome::Deleted { purged } => {
            if *purged > 0 {
                formatter.success(&format!(
                    "Bucket '{bucket}' removed after deleting {purged} version(s) and delete marker(s)."
                ));
            } else {
                formatter.success(&format!("Bucket '{bucket}' removed successfully."));
            }
            ExitCode::Success
        }
        RemovalOutcome::Aborted => {
            formatter.warning(&format!("Bucket '{bucket}' was not removed; nothing was deleted."));
            ExitCode::Aborted
        }
        RemovalOutcome::Failed(failure) => {
            if !formatter.is_json() {
                let stage = match failure.stage {
                    RemovalState::CheckingEmpty => "checking whether it is empty",
                    RemovalState::Purging => "purging it",
                    RemovalState::Deleting => "deleting it",
                    _ => "removing it",
                };
                formatter.error(&format!(
                    "Failed to remove bucket '{bucket}' while {stage}: {}",
                    failure.error
                ));
                if failure.purged > 0 {
                    formatter.warning(&format!(
                        "{} version(s) were deleted before the failure; the bucket still exists. Run rb again to continue.",
                        failure.purged
                    ));
                }
            }
            ExitCode::from_error(&failure.error)
        }
    }
}
