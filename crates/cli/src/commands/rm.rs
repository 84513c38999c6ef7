//! rm command - Remove an object
//!
//! The object is probed first. A key the service reports as missing is an
//! error, and so is a probe that could not reach the service: "unreachable"
//! is never treated as "missing".

use clap::Args;
use pail_core::{Error, Existence, ObjectStore, RemotePath, probe_object};
use serde::Serialize;

use super::{GlobalOptions, connect, fail, parse_path};
use crate::exit_code::ExitCode;
use crate::output::Formatter;

/// Remove an object
#[derive(Args, Debug)]
pub struct RmArgs {
    /// Object path (bucket/key)
    pub path: String,
}

#[derive(Debug, Serialize)]
struct RmOutput {
    status: &'static str,
    deleted: String,
}

/// Execute the rm command
pub async fn execute(args: RmArgs, globals: &GlobalOptions) -> ExitCode {
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

    remove_object(&client, &path, &formatter).await
}

async fn remove_object(client: &dyn ObjectStore, path: &RemotePath, formatter: &Formatter) -> ExitCode {
    match probe_object(client, path).await {
        Ok(Existence::Exists) => {}
        Ok(Existence::Missing) => {
            return fail(formatter, "Cannot remove", &Error::NotFound(path.to_string()));
        }
        Ok(Existence::Unknown(e)) => {
            return fail(formatter, &format!("Could not check whether {path} exists"), &e);
        }
        Err(e) => return fail(formatter, &format!("Failed to check {path}"), &e),
    }

    match client.delete_object(path).await {
        Ok(()) => {
            if formatter.is_json() {
                formatter.json(&RmOutput {
                    status: "success",
                    deleted: path.to_string(),
                });
            } else {
                formatter.success(&format!("Removed {path}."));
            }
            ExitCode::Success
        }
        Err(e) => fail(formatter, &format!("Failed to remove {path}"), &e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::{MockStore, quiet_formatter};
    use pail_core::ObjectInfo;

    fn target() -> RemotePath {
        RemotePath::new("b1", "a.txt")
    }

    #[tokio::test]
    async fn test_existing_object_is_deleted() {
        let mut store = MockStore::new();
        store
            .expect_head_object()
            .times(1)
            .returning(|_| Ok(ObjectInfo::file("a.txt", 3)));
        store
            .expect_delete_object()
            .withf(|path| path.key == "a.txt")
            .times(1)
            .returning(|_| Ok(()));

        let code = remove_object(&store, &target(), &quiet_formatter()).await;
        assert_eq!(code, ExitCode::Success);
    }

    #[tokio::test]
    async fn test_missing_object_is_not_found() {
        let mut store = MockStore::new();
        store
            .expect_head_object()
            .times(1)
            .returning(|_| Err(Error::NotFound("b1/a.txt".into())));
        store.expect_delete_object().times(0);

        let code = remove_object(&store, &target(), &quiet_formatter()).await;
        assert_eq!(code, ExitCode::NotFound);
    }

    #[tokio::test]
    async fn test_unreachable_service_is_a_network_error() {
        let mut store = MockStore::new();
        store
            .expect_head_object()
            .times(1)
            .returning(|_| Err(Error::Timeout("HeadObject timed out".into())));
        store.expect_delete_object().times(0);

        let code = remove_object(&store, &target(), &quiet_formatter()).await;
        assert_eq!(code, ExitCode::NetworkError);

        let mut store = MockStore::new();
        store
            .expect_head_object()
            .times(1)
            .returning(|_| Err(Error::NetworkUnavailable("connection refused".into())));
        store.expect_delete_object().times(0);

        let code = remove_object(&store, &target(), &quiet_formatter()).await;
        assert_eq!(code, ExitCode::NetworkError);
    }
}
