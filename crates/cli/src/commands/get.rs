//! get command - Download an object
//!
//! Without a destination the object is saved in the current directory as
//! `downloaded_<name>`, so an existing local file of the same name is kept.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use pail_core::ObjectStore as _;
use serde::Serialize;

use super::{GlobalOptions, connect, fail, parse_path};
use crate::exit_code::ExitCode;
use crate::output::{Formatter, ProgressBar, format_size};

/// Download an object
#[derive(Args, Debug)]
pub struct GetArgs {
    /// Object path (bucket/key)
    pub path: String,

    /// Local file or folder to save to
    pub dest: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
struct GetOutput {
    status: &'static str,
    source: String,
    target: String,
    size_bytes: usize,
}

/// Local path for a downloaded object named `file_name`
fn local_target(file_name: &str, dest: Option<&Path>) -> PathBuf {
    match dest {
        Some(dest) if dest.is_dir() => dest.join(file_name),
        Some(dest) => dest.to_path_buf(),
        None => PathBuf::from(format!("downloaded_{file_name}")),
    }
}

async fn write_file(path: &Path, data: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    tokio::fs::write(path, data)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))
}

/// Execute the get command
pub async fn execute(args: GetArgs, globals: &GlobalOptions) -> ExitCode {
    let formatter = Formatter::new(globals.output.clone());

    let path = match parse_path(&formatter, &args.path) {
        Ok(path) => path,
        Err(code) => return code,
    };
    let file_name = match path.require_key() {
        Ok(_) => path.file_name().unwrap_or(&path.key).to_string(),
        Err(e) => {
            formatter.error(&e.to_string());
            return ExitCode::UsageError;
        }
    };

    let client = match connect(globals, &formatter).await {
        Ok(client) => client,
        Err(code) => return code,
    };

    let spinner = ProgressBar::spinner(&globals.output, &format!("Downloading {path}..."));
    let data = client.get_object(&path).await;
    spinner.finish_and_clear();

    let data = match data {
        Ok(data) => data,
        Err(e) => return fail(&formatter, &format!("Failed to download {path}"), &e),
    };

    let target = local_target(&file_name, args.dest.as_deref());
    if let Err(e) = write_file(&target, &data).await {
        formatter.error(&format!("{e:#}"));
        return ExitCode::GeneralError;
    }

    if formatter.is_json() {
        formatter.json(&GetOutput {
            status: "success",
            source: path.to_string(),
            target: target.display().to_string(),
            size_bytes: data.len(),
        });
    } else {
        formatter.success(&format!(
            "{path} -> {} ({})",
            target.display(),
            format_size(data.len() as i64)
        ));
    }
    ExitCode::Success
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_name_is_prefixed() {
        assert_eq!(local_target("photo.jpg", None), PathBuf::from("downloaded_photo.jpg"));
    }

    #[test]
    fn test_directory_destination_keeps_name() {
        let dir = TempDir::new().unwrap();
        assert_eq!(
            local_target("photo.jpg", Some(dir.path())),
            dir.path().join("photo.jpg")
        );
    }

    #[test]
    fn test_file_destination_is_used_as_is() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("copy.jpg");
        assert_eq!(local_target("photo.jpg", Some(&dest)), dest);
    }

    #[tokio::test]
    async fn test_write_file_creates_parents() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("a/b/c.txt");
        write_file(&target, b"hello").await.unwrap();
        assert_eq!(std::fs::read(&target).unwrap(), b"hello");
    }
}
