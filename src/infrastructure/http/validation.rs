//! Response validation: status codes and content-type acceptability.

use std::collections::HashSet;

use crate::domain::entities::{HttpResponseInfo, ImageRequest};
use crate::domain::errors::{FetchError, ValidationFailure};

/// Content types accepted by default.
pub const DEFAULT_ACCEPTABLE_IMAGE_CONTENT_TYPES: [&str; 11] = [
    "image/tiff",
    "image/jpeg",
    "image/gif",
    "image/png",
    "image/ico",
    "image/x-icon",
    "image/bmp",
    "image/x-bmp",
    "image/x-xbitmap",
    "image/x-ms-bmp",
    "image/x-win-bitmap",
];

/// The default acceptable content-type set.
#[must_use]
pub fn default_acceptable_image_content_types() -> HashSet<String> {
    DEFAULT_ACCEPTABLE_IMAGE_CONTENT_TYPES
        .iter()
        .map(|s| (*s).to_string())
        .collect()
}

fn split_mime(mime: &str) -> Option<(&str, &str)> {
    mime.split_once('/')
}

/// True if `mime` matches some entry of `acceptable`.
///
/// An entry matches when each of its type and subtype is equal to the
/// response's or is `*`; a bare `*/*` entry accepts everything.
#[must_use]
pub fn is_acceptable_content_type(acceptable: &HashSet<String>, mime: &str) -> bool {
    if acceptable.contains("*/*") {
        return true;
    }
    let Some((kind, subtype)) = split_mime(mime) else {
        return false;
    };
    acceptable.iter().any(|entry| {
        split_mime(entry).is_some_and(|(entry_kind, entry_subtype)| {
            (entry_kind == "*" || entry_kind == kind)
                && (entry_subtype == "*" || entry_subtype == subtype)
        })
    })
}

/// Validates a response ahead of decoding.
///
/// The status gate applies to every response; the content-type gate is
/// skipped for local file URLs and for zero-length bodies.
///
/// # Errors
/// Returns [`FetchError::ResponseValidationFailed`] naming the failed gate.
pub fn validate_response(
    request: &ImageRequest,
    response: &HttpResponseInfo,
    data_len: usize,
    acceptable: &HashSet<String>,
) -> Result<(), FetchError> {
    if !response.has_acceptable_status() {
        return Err(FetchError::ResponseValidationFailed(
            ValidationFailure::UnacceptableStatusCode,
        ));
    }

    if request.is_file_url() || data_len == 0 {
        return Ok(());
    }

    match response.mime_type.as_deref() {
        None => Err(FetchError::ResponseValidationFailed(
            ValidationFailure::MissingContentType,
        )),
        Some(mime) if is_acceptable_content_type(acceptable, mime) => Ok(()),
        Some(_) => Err(FetchError::ResponseValidationFailed(
            ValidationFailure::UnacceptableContentType,
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn response(status: u16, mime: Option<&str>) -> HttpResponseInfo {
        HttpResponseInfo {
            status,
            mime_type: mime.map(str::to_string),
            content_length: None,
            url: "https://example.com/a.png".to_string(),
        }
    }

    fn request() -> ImageRequest {
        ImageRequest::parse("https://example.com/a.png").unwrap()
    }

    #[test_case("image/png", true ; "exact_match")]
    #[test_case("image/webp", false ; "unlisted_subtype")]
    #[test_case("text/html", false ; "unlisted_type")]
    #[test_case("png", false ; "malformed_mime")]
    fn test_default_set_matching(mime: &str, expected: bool) {
        let acceptable = default_acceptable_image_content_types();
        assert_eq!(is_acceptable_content_type(&acceptable, mime), expected);
    }

    #[test_case("*/*", "application/octet-stream", true ; "full_wildcard")]
    #[test_case("image/*", "image/webp", true ; "subtype_wildcard")]
    #[test_case("image/*", "text/plain", false ; "subtype_wildcard_wrong_type")]
    #[test_case("*/png", "image/png", true ; "type_wildcard")]
    #[test_case("*/png", "image/jpeg", false ; "type_wildcard_wrong_subtype")]
    fn test_wildcard_matching(entry: &str, mime: &str, expected: bool) {
        let acceptable: HashSet<String> = [entry.to_string()].into_iter().collect();
        assert_eq!(is_acceptable_content_type(&acceptable, mime), expected);
    }

    #[test]
    fn test_status_gate_applies_first() {
        let acceptable = default_acceptable_image_content_types();
        let err = validate_response(&request(), &response(404, Some("image/png")), 4, &acceptable)
            .unwrap_err();
        assert_eq!(
            err.validation_failure(),
            Some(ValidationFailure::UnacceptableStatusCode)
        );
    }

    #[test]
    fn test_missing_content_type_fails() {
        let acceptable = default_acceptable_image_content_types();
        let err =
            validate_response(&request(), &response(200, None), 4, &acceptable).unwrap_err();
        assert_eq!(
            err.validation_failure(),
            Some(ValidationFailure::MissingContentType)
        );
    }

    #[test]
    fn test_empty_body_passes_content_type_gate() {
        let acceptable = default_acceptable_image_content_types();
        assert!(validate_response(&request(), &response(200, None), 0, &acceptable).is_ok());
    }

    #[test]
    fn test_file_url_skips_content_type_gate() {
        let acceptable = default_acceptable_image_content_types();
        let file_request = ImageRequest::parse("file:///tmp/a.png").unwrap();
        assert!(
            validate_response(
                &file_request,
                &response(200, Some("application/octet-stream")),
                4,
                &acceptable
            )
            .is_ok()
        );
    }
}
