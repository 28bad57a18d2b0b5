//! Download and decode error types.

use thiserror::Error;

/// Reason a response failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationFailure {
    /// The response carried no `Content-Type` header.
    #[error("response is missing a content type")]
    MissingContentType,
    /// The response content type is not in the acceptable set.
    #[error("response content type is not acceptable")]
    UnacceptableContentType,
    /// The response status code is outside `200..300`.
    #[error("response status code is not acceptable")]
    UnacceptableStatusCode,
    /// A file URL resolved to no data.
    #[error("file URL yielded no data")]
    DataFileNil,
    /// A file URL could not be read.
    #[error("file URL could not be read")]
    DataFileReadFailed,
}

/// Errors surfaced to download subscribers.
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    /// The input string does not parse as an absolute URL.
    #[error("invalid URL `{url}`: {reason}")]
    InvalidUrl {
        /// The offending input.
        url: String,
        /// Parser diagnostic.
        reason: String,
    },

    /// The subscriber's download was cancelled.
    #[error("request cancelled")]
    RequestCancelled,

    /// The decoder could not produce an image from the response bytes.
    #[error("image serialization failed: {reason}")]
    ImageSerializationFailed {
        /// Decoder diagnostic.
        reason: String,
    },

    /// The response failed validation before decoding.
    #[error("response validation failed: {0}")]
    ResponseValidationFailed(ValidationFailure),

    /// An opaque transport-layer failure from the request runner.
    #[error("transport error: {message}")]
    Transport {
        /// Runner diagnostic.
        message: String,
    },
}

impl FetchError {
    /// Creates an invalid-URL error.
    #[must_use]
    pub fn invalid_url(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidUrl {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Creates a serialization failure.
    #[must_use]
    pub fn serialization(reason: impl Into<String>) -> Self {
        Self::ImageSerializationFailed {
            reason: reason.into(),
        }
    }

    /// Creates a transport error.
    #[must_use]
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// True if this is a cancellation.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::RequestCancelled)
    }

    /// True if the failure came from response validation.
    #[must_use]
    pub const fn is_validation_failure(&self) -> bool {
        matches!(self, Self::ResponseValidationFailed(_))
    }

    /// The validation failure reason, when there is one.
    #[must_use]
    pub const fn validation_failure(&self) -> Option<ValidationFailure> {
        if let Self::ResponseValidationFailed(reason) = self {
            Some(*reason)
        } else {
            None
        }
    }
}
