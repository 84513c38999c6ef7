//! put command - Upload a file or folder
//!
//! A file lands at `bucket/key`, or under the prefix when the key is empty or
//! ends with `/`. A folder is uploaded recursively, keyed by relative path.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::Args;
use pail_core::{ObjectStore, RemotePath};
use serde::Serialize;

use super::{GlobalOptions, connect, fail, parse_path};
use crate::exit_code::ExitCode;
use crate::output::{Formatter, ProgressBar, format_size};

/// Content type used when the extension is unknown
const FALLBACK_CONTENT_TYPE: &str = "binary/octet-stream";

/// Upload a file or folder
#[derive(Args, Debug)]
pub struct PutArgs {
    /// Local file or folder
    pub source: PathBuf,

    /// Destination (bucket[/key or prefix/])
    pub target: String,

    /// Content type (guessed from the file extension by default)
    #[arg(long)]
    pub content_type: Option<String>,
}

#[derive(Debug, Serialize)]
struct PutOutput {
    status: &'static str,
    uploaded: Vec<UploadedItem>,
    failed: usize,
}

#[derive(Debug, Serialize)]
struct UploadedItem {
    source: String,
    target: String,
    size_bytes: i64,
    content_type: String,
}

/// Execute the put command
pub async fn execute(args: PutArgs, globals: &GlobalOptions) -> ExitCode {
    let formatter = Formatter::new(globals.output.clone());

    let target = match parse_path(&formatter, &args.target) {
        Ok(path) => path,
        Err(code) => return code,
    };

    let files = match plan_uploads(&args.source, &target) {
        Ok(files) => files,
        Err(e) => {
            formatter.error(&format!("{e:#}"));
            return ExitCode::UsageError;
        }
    };

    let client = match connect(globals, &formatter).await {
        Ok(client) => client,
        Err(code) => return code,
    };

    upload_all(&client, files, args.content_type.as_deref(), &formatter).await
}

/// Pair each local file with its destination
fn plan_uploads(source: &Path, target: &RemotePath) -> Result<Vec<(PathBuf, RemotePath)>> {
    let metadata = std::fs::metadata(source)
        .with_context(|| format!("Cannot access {}", source.display()))?;

    if metadata.is_file() {
        let key = if target.key.is_empty() || target.key.ends_with('/') {
            let name = source
                .file_name()
                .with_context(|| format!("{} has no file name", source.display()))?;
            format!("{}{}", target.key, name.to_string_lossy())
        } else {
            target.key.clone()
        };
        return Ok(vec![(source.to_path_buf(), RemotePath::new(&target.bucket, key))]);
    }

    if !metadata.is_dir() {
        bail!("{} is neither a file nor a folder", source.display());
    }

    let mut files = Vec::new();
    walk_dir(source, source, &mut files)?;
    files.sort();

    Ok(files
        .into_iter()
        .map(|(path, relative)| {
            let remote = if target.key.is_empty() {
                RemotePath::new(&target.bucket, relative)
            } else {
                target.join(&relative)
            };
            (path, remote)
        })
        .collect())
}

/// Collect every file under `dir` with its `/`-separated path relative to `base`
fn walk_dir(dir: &Path, base: &Path, files: &mut Vec<(PathBuf, String)>) -> Result<()> {
    let entries = std::fs::read_dir(dir).with_context(|| format!("Cannot read {}", dir.display()))?;

    for entry in entries {
        let path = entry
            .with_context(|| format!("Cannot read {}", dir.display()))?
            .path();
        if path.is_dir() {
            walk_dir(&path, base, files)?;
        } else if path.is_file() {
            let relative = path.strip_prefix(base).unwrap_or(&path);
            let key = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            files.push((path, key));
        }
    }
    Ok(())
}

fn content_type_for(path: &Path, explicit: Option<&str>) -> String {
    explicit
        .map(str::to_string)
        .or_else(|| {
            mime_guess::from_path(path)
                .first()
                .map(|m| m.essence_str().to_string())
        })
        .unwrap_or_else(|| FALLBACK_CONTENT_TYPE.to_string())
}

async fn read_file(path: &Path) -> Result<Vec<u8>> {
    tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))
}

async fn upload_all(
    client: &dyn ObjectStore,
    files: Vec<(PathBuf, RemotePath)>,
    content_type: Option<&str>,
    formatter: &Formatter,
) -> ExitCode {
    let total = files.len();
    let spinner = ProgressBar::spinner(formatter.config(), "Uploading...");
    let mut uploaded = Vec::new();
    let mut failed = 0;
    let mut exit_code = ExitCode::Success;

    for (index, (source, target)) in files.into_iter().enumerate() {
        spinner.set_message(format!("Uploading {}/{}: {}", index + 1, total, source.display()));

        let data = match read_file(&source).await {
            Ok(data) => data,
            Err(e) => {
                spinner.suspend(|| formatter.error(&format!("{e:#}")));
                failed += 1;
                exit_code = ExitCode::GeneralError;
                continue;
            }
        };

        let content_type = content_type_for(&source, content_type);
        match client.put_object(&target, data, Some(content_type.clone())).await {
            Ok(info) => {
                let size = info.size_bytes.unwrap_or(0);
                spinner.suspend(|| {
                    if !formatter.is_json() {
                        formatter.println(&format!(
                            "{} -> {} ({})",
                            source.display(),
                            target,
                            format_size(size)
                        ));
                    }
                });
                uploaded.push(UploadedItem {
                    source: source.display().to_string(),
                    target: target.to_string(),
                    size_bytes: size,
                    content_type,
                });
            }
            Err(e) => {
                failed += 1;
                exit_code = spinner.suspend(|| fail(formatter, &format!("Failed to upload {}", source.display()), &e));
                // Connectivity problems will fail every remaining file the same way
                if e.is_transport() {
                    break;
                }
            }
        }
    }
    spinner.finish_and_clear();

    if formatter.is_json() {
        formatter.json(&PutOutput {
            status: if failed == 0 { "success" } else { "partial" },
            uploaded,
            failed,
        });
    } else if total > 1 {
        formatter.println(&format!(
            "Processed {} of {total} file(s){}",
            uploaded.len(),
            if failed > 0 { format!(", {failed} failed") } else { String::new() }
        ));
    }

    exit_code
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_file_into_prefix_keeps_name() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("report.pdf");
        std::fs::write(&file, b"%PDF").unwrap();

        let plan = plan_uploads(&file, &RemotePath::new("b1", "docs/")).unwrap();
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].1.key, "docs/report.pdf");

        let plan = plan_uploads(&file, &RemotePath::bucket_root("b1")).unwrap();
        assert_eq!(plan[0].1.key, "report.pdf");

        let plan = plan_uploads(&file, &RemotePath::new("b1", "renamed.pdf")).unwrap();
        assert_eq!(plan[0].1.key, "renamed.pdf");
    }

    #[test]
    fn test_folder_keys_are_relative_paths() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("img/icons")).unwrap();
        std::fs::write(dir.path().join("index.html"), b"<html>").unwrap();
        std::fs::write(dir.path().join("img/icons/logo.png"), b"png").unwrap();

        let plan = plan_uploads(dir.path(), &RemotePath::new("b1", "site")).unwrap();
        let keys: Vec<&str> = plan.iter().map(|(_, remote)| remote.key.as_str()).collect();
        assert_eq!(keys, vec!["site/img/icons/logo.png", "site/index.html"]);
    }

    #[test]
    fn test_missing_source_is_an_error() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope.txt");
        assert!(plan_uploads(&missing, &RemotePath::bucket_root("b1")).is_err());
    }

    #[test]
    fn test_content_type_guess_and_fallback() {
        assert_eq!(content_type_for(Path::new("a.json"), None), "application/json");
        assert_eq!(content_type_for(Path::new("a.unknownext"), None), FALLBACK_CONTENT_TYPE);
        assert_eq!(content_type_for(Path::new("a.json"), Some("text/plain")), "text/plain");
    }
}
