//! Response wire types and the completion payload.

use bytes::Bytes;

use super::image::Image;
use super::request::ImageRequest;
use crate::domain::errors::FetchError;

/// The shape of an HTTP response the engine cares about.
#[derive(Debug, Clone)]
pub struct HttpResponseInfo {
    /// HTTP status code.
    pub status: u16,
    /// MIME type parsed from `Content-Type`, without parameters.
    pub mime_type: Option<String>,
    /// `Content-Length` when the server reported one.
    pub content_length: Option<u64>,
    /// Final URL after redirects.
    pub url: String,
}

impl HttpResponseInfo {
    /// True if the status code is in the acceptable `200..300` range.
    #[must_use]
    pub const fn has_acceptable_status(&self) -> bool {
        self.status >= 200 && self.status < 300
    }
}

/// Completion payload delivered to every subscriber.
///
/// Mirrors the full exchange: the original request, the HTTP response
/// descriptor when one was received, the raw body bytes, and the decode
/// result.
#[derive(Debug)]
pub struct DataResponse {
    /// The request this response answers.
    pub request: ImageRequest,
    /// HTTP response descriptor, absent for cache hits and transport
    /// failures that never produced a response.
    pub response: Option<HttpResponseInfo>,
    /// Raw response body.
    pub data: Bytes,
    /// The decoded (and possibly filtered) image, or the failure.
    pub result: Result<Image, FetchError>,
}

impl DataResponse {
    /// Synthesizes a success payload for an image served from the cache.
    #[must_use]
    pub fn cached(request: ImageRequest, image: Image) -> Self {
        Self {
            request,
            response: None,
            data: Bytes::new(),
            result: Ok(image),
        }
    }

    /// Builds a failure payload.
    #[must_use]
    pub fn failure(
        request: ImageRequest,
        response: Option<HttpResponseInfo>,
        data: Bytes,
        error: FetchError,
    ) -> Self {
        Self {
            request,
            response,
            data,
            result: Err(error),
        }
    }

    /// True if the payload carries a decoded image.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}
