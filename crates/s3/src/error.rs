//! Mapping of SDK failures onto pail-core errors
//!
//! The SDK reports three broad kinds of failure: the request never reached
//! the service (dispatch), it ran out of time, or the service answered with
//! an error document. Only the last kind carries a service error code.

use aws_sdk_s3::config::http::HttpResponse;
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};

use pail_core::Error;

/// Service codes meaning the addressed bucket, key or version does not exist
const NOT_FOUND_CODES: &[&str] = &["NotFound", "NoSuchKey", "NoSuchBucket", "NoSuchVersion"];

/// Convert an SDK error for the operation on `resource`
pub(crate) fn map_sdk_error<E>(err: SdkError<E, HttpResponse>, resource: &str) -> Error
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
{
    match &err {
        SdkError::TimeoutError(_) => {
            Error::Timeout(format!("{resource}: {}", DisplayErrorContext(&err)))
        }
        SdkError::DispatchFailure(failure) if failure.is_timeout() => {
            Error::Timeout(format!("{resource}: {}", DisplayErrorContext(&err)))
        }
        SdkError::DispatchFailure(_) => {
            Error::NetworkUnavailable(format!("{resource}: {}", DisplayErrorContext(&err)))
        }
        SdkError::ServiceError(context) => classify_service_error(
            context.err().code(),
            context.err().message(),
            context.raw().status().as_u16(),
            resource,
        ),
        _ => Error::General(format!("{resource}: {}", DisplayErrorContext(&err))),
    }
}

/// Classify an error answer from the service
///
/// HEAD requests carry no error body, so the HTTP status stands in for the
/// missing code.
pub(crate) fn classify_service_error(
    code: Option<&str>,
    message: Option<&str>,
    status: u16,
    resource: &str,
) -> Error {
    let code = match (code, status) {
        (Some(code), _) => code,
        (None, 404) => "NotFound",
        (None, 403) => "AccessDenied",
        (None, _) => "",
    };

    if NOT_FOUND_CODES.contains(&code) {
        return Error::NotFound(resource.to_string());
    }
    if code == "BucketNotEmpty" {
        return Error::BucketNotEmpty(resource.to_string());
    }

    let code = if code.is_empty() {
        format!("Http{status}")
    } else {
        code.to_string()
    };
    Error::service(code, message.unwrap_or(resource))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_resources_map_to_not_found() {
        for code in ["NoSuchBucket", "NoSuchKey", "NotFound"] {
            let err = classify_service_error(Some(code), Some("gone"), 404, "b1/a.txt");
            assert!(matches!(err, Error::NotFound(ref r) if r == "b1/a.txt"), "{code}");
        }
    }

    #[test]
    fn test_head_404_without_body_is_not_found() {
        let err = classify_service_error(None, None, 404, "b1/a.txt");
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn test_head_403_without_body_is_access_denied() {
        let err = classify_service_error(None, None, 403, "b1/a.txt");
        assert!(err.is_access_denied());
        assert_eq!(err.exit_code(), 4);
    }

    #[test]
    fn test_bucket_not_empty() {
        let err = classify_service_error(
            Some("BucketNotEmpty"),
            Some("The bucket you tried to delete is not empty"),
            409,
            "b1",
        );
        assert!(matches!(err, Error::BucketNotEmpty(ref b) if b == "b1"));
    }

    #[test]
    fn test_other_codes_are_kept() {
        let err = classify_service_error(Some("SlowDown"), Some("Please reduce your request rate"), 503, "b1");
        match err {
            Error::Service { code, message } => {
                assert_eq!(code, "SlowDown");
                assert_eq!(message, "Please reduce your request rate");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_unknown_code_uses_status() {
        let err = classify_service_error(None, None, 500, "b1");
        assert!(matches!(err, Error::Service { ref code, .. } if code == "Http500"));
        assert!(!err.is_transport());
    }
}
