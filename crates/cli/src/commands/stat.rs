//! stat command - Show object metadata

use clap::Args;
use pail_core::{ObjectInfo, ObjectStore as _};
use serde::Serialize;

use super::{GlobalOptions, connect, fail, parse_path};
use crate::exit_code::ExitCode;
use crate::output::{Formatter, format_time};

/// Show object metadata
#[derive(Args, Debug)]
pub struct StatArgs {
    /// Object path (bucket/key)
    pub path: String,
}

#[derive(Debug, Serialize)]
struct StatOutput {
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_modified: Option<jiff::Timestamp>,
    #[serde(skip_serializing_if = "Option::is_none")]
    size_bytes: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    size_human: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    etag: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    content_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    storage_class: Option<String>,
}

impl StatOutput {
    fn new(name: String, info: ObjectInfo) -> Self {
        Self {
            name,
            last_modified: info.last_modified,
            size_bytes: info.size_bytes,
            size_human: info.size_human,
            etag: info.etag,
            content_type: info.content_type,
            storage_class: info.storage_class,
        }
    }

    fn rows(&self) -> Vec<(&'static str, String)> {
        let mut rows = vec![("Name", self.name.clone())];
        if let (Some(bytes), Some(human)) = (self.size_bytes, &self.size_human) {
            rows.push(("Size", format!("{human} ({bytes} bytes)")));
        }
        rows.push((
            "Content type",
            self.content_type.clone().unwrap_or_else(|| "-".to_string()),
        ));
        rows.push(("Last modified", format_time(self.last_modified)));
        if let Some(etag) = &self.etag {
            rows.push(("ETag", etag.clone()));
        }
        if let Some(class) = &self.storage_class {
            rows.push(("Storage class", class.clone()));
        }
        rows
    }
}

/// Execute the stat command
pub async fn execute(args: StatArgs, globals: &GlobalOptions) -> ExitCode {
    let formatter = Formatter::new(globals.output.clone());

    let path = match parse_path(&formatter, &args.path) {
        Ok(path) => path,
        Err(code) => return code,
    };
    if let Err(e) = path.require_key() {
        formatter.error(&e.to_string());
        return ExitCode::UsageError;
    }

    let client = match connect(globals, &formatter).await {
        Ok(client) => client,
        Err(code) => return code,
    };

    let info = match client.head_object(&path).await {
        Ok(info) => info,
        Err(e) => return fail(&formatter, &format!("Failed to stat {path}"), &e),
    };

    let output = StatOutput::new(path.to_string(), info);
    if formatter.is_json() {
        formatter.json(&output);
    } else {
        let mut table = formatter.table(["Field", "Value"]);
        for (field, value) in output.rows() {
            table.add_row([field.to_string(), value]);
        }
        formatter.print_table(&table);
    }

    ExitCode::Success
}
