//! Port definition for image decoding.

use async_trait::async_trait;
use bytes::Bytes;

use crate::domain::entities::Image;
use crate::domain::errors::FetchError;

/// Port turning a byte buffer into a decoded image.
///
/// Implementations must be thread-safe; callers may decode concurrently.
#[async_trait]
pub trait ImageDecoder: Send + Sync {
    /// Decodes `data` into an image.
    ///
    /// # Errors
    /// Returns [`FetchError::ImageSerializationFailed`] if the buffer is
    /// empty or does not decode.
    async fn decode(&self, data: &Bytes) -> Result<Image, FetchError>;
}
