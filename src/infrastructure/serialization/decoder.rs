//! Serialized image decoding off the async runtime.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use tracing::trace;

use crate::domain::entities::Image;
use crate::domain::errors::FetchError;
use crate::domain::ports::ImageDecoder;

/// Decoder backed by the `image` crate.
///
/// Decoding runs on the blocking thread pool under a shared mutex; decoders
/// of common image formats are not assumed thread-safe.
pub struct SerializingImageDecoder {
    gate: Arc<Mutex<()>>,
    scale: f32,
    inflate_after_decode: bool,
}

impl SerializingImageDecoder {
    /// Creates a decoder producing images at scale 1.0, without inflation.
    #[must_use]
    pub fn new() -> Self {
        Self {
            gate: Arc::new(Mutex::new(())),
            scale: 1.0,
            inflate_after_decode: false,
        }
    }

    /// Sets the display scale decoded images report.
    #[must_use]
    pub const fn with_scale(mut self, scale: f32) -> Self {
        self.scale = scale;
        self
    }

    /// Eagerly materializes pixel data after decoding so first render does
    /// not stall.
    #[must_use]
    pub const fn with_inflation(mut self) -> Self {
        self.inflate_after_decode = true;
        self
    }
}

impl Default for SerializingImageDecoder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ImageDecoder for SerializingImageDecoder {
    async fn decode(&self, data: &Bytes) -> Result<Image, FetchError> {
        if data.is_empty() {
            return Err(FetchError::serialization("empty buffer"));
        }

        let gate = self.gate.clone();
        let bytes = data.clone();
        let decoded = tokio::task::spawn_blocking(move || {
            let _serialized = gate.lock();
            image::load_from_memory(&bytes)
        })
        .await
        .map_err(|e| FetchError::serialization(format!("decode task panicked: {e}")))?
        .map_err(|e| FetchError::serialization(e.to_string()))?;

        trace!(
            width = decoded.width(),
            height = decoded.height(),
            "Decoded image"
        );

        let image = Image::new(Arc::new(decoded), self.scale);
        if self.inflate_after_decode {
            image.inflate();
        }
        Ok(image)
    }
}
