//! ls command - List buckets, objects and versions
//!
//! Without a path, lists the buckets of the account. With `bucket[/prefix]`,
//! lists objects; `--versions` lists every version and delete marker instead.

use clap::Args;
use pail_core::{
    ListOptions, ObjectInfo, ObjectStore, RemotePath, VersionRecord, collect_versions,
};
use serde::Serialize;

use super::{GlobalOptions, connect, fail, parse_path};
use crate::exit_code::ExitCode;
use crate::output::{Formatter, format_size, format_time};

/// List buckets or objects
#[derive(Args, Debug)]
pub struct LsArgs {
    /// Remote path (bucket[/prefix]); omit to list buckets
    pub path: Option<String>,

    /// List recursively
    #[arg(short, long)]
    pub recursive: bool,

    /// Show every version and delete marker
    #[arg(long)]
    pub versions: bool,

    /// Summarize output (show totals)
    #[arg(long)]
    pub summarize: bool,
}

/// Output structure for ls command (JSON format)
#[derive(Debug, Serialize)]
struct LsOutput {
    items: Vec<ObjectInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<Summary>,
}

#[derive(Debug, Serialize)]
struct VersionsOutput {
    bucket: String,
    versions: Vec<VersionRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<Summary>,
}

#[derive(Debug, Serialize)]
struct Summary {
    total_objects: usize,
    total_size_bytes: i64,
    total_size_human: String,
}

impl Summary {
    fn new(total_objects: usize, total_size_bytes: i64) -> Self {
        Self {
            total_objects,
            total_size_bytes,
            total_size_human: format_size(total_size_bytes),
        }
    }
}

/// Execute the ls command
pub async fn execute(args: LsArgs, globals: &GlobalOptions) -> ExitCode {
    let formatter = Formatter::new(globals.output.clone());

    let path = match args.path.as_deref() {
        Some(raw) => match parse_path(&formatter, raw) {
            Ok(path) => Some(path),
            Err(code) => return code,
        },
        None => None,
    };

    let client = match connect(globals, &formatter).await {
        Ok(client) => client,
        Err(code) => return code,
    };

    match path {
        None => list_buckets(&client, &formatter, args.summarize).await,
        Some(path) if args.versions => list_versions(&client, &path, &formatter, args.summarize).await,
        Some(path) => list_objects(&client, &path, &args, &formatter).await,
    }
}

async fn list_buckets(client: &dyn ObjectStore, formatter: &Formatter, summarize: bool) -> ExitCode {
    let buckets = match client.list_buckets().await {
        Ok(buckets) => buckets,
        Err(e) => return fail(formatter, "Failed to list buckets", &e),
    };

    if formatter.is_json() {
        formatter.json(&LsOutput {
            summary: summarize.then(|| Summary::new(buckets.len(), 0)),
            items: buckets,
        });
        return ExitCode::Success;
    }

    if buckets.is_empty() {
        formatter.println("No buckets found.");
        return ExitCode::Success;
    }

    let mut table = formatter.table(["Bucket", "Created"]);
    for bucket in &buckets {
        table.add_row([bucket.key.clone(), format_time(bucket.last_modified)]);
    }
    formatter.print_table(&table);

    if summarize {
        formatter.println(&format!("\nTotal: {} buckets", buckets.len()));
    }
    ExitCode::Success
}

async fn list_objects(
    client: &dyn ObjectStore,
    path: &RemotePath,
    args: &LsArgs,
    formatter: &Formatter,
) -> ExitCode {
    let mut items = Vec::new();
    let mut continuation_token: Option<String> = None;

    loop {
        let options = ListOptions {
            recursive: args.recursive,
            max_keys: Some(1000),
            continuation_token: continuation_token.take(),
            ..Default::default()
        };

        match client.list_objects(path, options).await {
            Ok(result) => {
                items.extend(result.items);
                if !result.truncated {
                    break;
                }
                continuation_token = result.continuation_token;
                if continuation_token.is_none() {
                    break;
                }
            }
            Err(e) => return fail(formatter, "Failed to list objects", &e),
        }
    }

    let total_objects = items.iter().filter(|i| !i.is_dir).count();
    let total_size: i64 = items.iter().filter_map(|i| i.size_bytes).sum();

    if formatter.is_json() {
        formatter.json(&LsOutput {
            items,
            summary: args.summarize.then(|| Summary::new(total_objects, total_size)),
        });
        return ExitCode::Success;
    }

    if items.is_empty() {
        formatter.println(&format!("No objects found in '{path}'."));
    }

    for item in &items {
        let date = format_time(item.last_modified);
        if item.is_dir {
            formatter.println(&format!("[{date:>19}] {:>10} {}", "PRE", item.key));
        } else {
            let size = item.size_human.clone().unwrap_or_else(|| "0 B".to_string());
            formatter.println(&format!("[{date:>19}] {size:>10} {}", item.key));
        }
    }

    if args.summarize {
        formatter.println(&format!(
            "\nTotal: {} objects, {}",
            total_objects,
            format_size(total_size)
        ));
    }

    ExitCode::Success
}

async fn list_versions(
    client: &dyn ObjectStore,
    path: &RemotePath,
    formatter: &Formatter,
    summarize: bool,
) -> ExitCode {
    let versions: Vec<VersionRecord> = match collect_versions(client, &path.bucket).await {
        Ok(versions) => versions
            .into_iter()
            .filter(|v| v.key.starts_with(&path.key))
            .collect(),
        Err(e) => return fail(formatter, "Failed to list versions", &e),
    };

    let total_size: i64 = versions.iter().filter_map(|v| v.size_bytes).sum();

    if formatter.is_json() {
        formatter.json(&VersionsOutput {
            bucket: path.bucket.clone(),
            summary: summarize.then(|| Summary::new(versions.len(), total_size)),
            versions,
        });
        return ExitCode::Success;
    }

    if versions.is_empty() {
        formatter.println(&format!("No versions or delete markers in '{path}'."));
        return ExitCode::Success;
    }

    let mut table = formatter.table(["Key", "Version", "Kind", "Latest", "Size", "Modified"]);
    for version in &versions {
        table.add_row([
            version.key.clone(),
            version.version_id.clone(),
            if version.is_delete_marker() { "delete marker" } else { "version" }.to_string(),
            if version.is_latest { "yes" } else { "" }.to_string(),
            version.size_bytes.map(format_size).unwrap_or_default(),
            format_time(version.last_modified),
        ]);
    }
    formatter.print_table(&table);

    if summarize {
        let markers = versions.iter().filter(|v| v.is_delete_marker()).count();
        formatter.println(&format!(
            "\nTotal: {} versions, {} delete markers, {}",
            versions.len() - markers,
            markers,
            format_size(total_size)
        ));
    }

    ExitCode::Success
}
