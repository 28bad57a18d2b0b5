//! Decoded image handle.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Bytes of memory a single rendered pixel occupies (RGBA).
pub const BYTES_PER_PIXEL: u64 = 4;

/// An immutable decoded raster.
///
/// Wraps the pixel buffer together with the display scale it was decoded
/// for. Cloning is cheap; clones share the pixel buffer and the inflate
/// flag.
#[derive(Clone)]
pub struct Image {
    pixels: Arc<image::DynamicImage>,
    scale: f32,
    inflated: Arc<AtomicBool>,
}

impl std::fmt::Debug for Image {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Image")
            .field("width", &self.width())
            .field("height", &self.height())
            .field("scale", &self.scale)
            .finish_non_exhaustive()
    }
}

impl Image {
    /// Wraps a decoded pixel buffer at the given display scale.
    #[must_use]
    pub fn new(pixels: Arc<image::DynamicImage>, scale: f32) -> Self {
        Self {
            pixels,
            scale,
            inflated: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Wraps a decoded pixel buffer at scale 1.0.
    #[must_use]
    pub fn from_dynamic(pixels: image::DynamicImage) -> Self {
        Self::new(Arc::new(pixels), 1.0)
    }

    /// Raster width in pixels.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    /// Raster height in pixels.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// Device pixels per logical pixel.
    #[must_use]
    pub const fn scale(&self) -> f32 {
        self.scale
    }

    /// The underlying pixel buffer.
    #[must_use]
    pub fn pixels(&self) -> &Arc<image::DynamicImage> {
        &self.pixels
    }

    /// Memory cost of the rendered image.
    ///
    /// `ceil(width * scale) * ceil(height * scale) * 4`.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn total_bytes(&self) -> u64 {
        let width = (f64::from(self.pixels.width()) * f64::from(self.scale)).ceil() as u64;
        let height = (f64::from(self.pixels.height()) * f64::from(self.scale)).ceil() as u64;
        width * height * BYTES_PER_PIXEL
    }

    /// Forces pixel data into memory so the first render does not stall.
    ///
    /// Idempotent; later calls are no-ops.
    pub fn inflate(&self) {
        if !self.inflated.swap(true, Ordering::AcqRel) {
            // Touching the full buffer materializes any lazily-held planes.
            let _ = self.pixels.as_bytes().len();
        }
    }

    /// Whether [`Self::inflate`] has already run for this buffer.
    #[must_use]
    pub fn is_inflated(&self) -> bool {
        self.inflated.load(Ordering::Acquire)
    }
}
