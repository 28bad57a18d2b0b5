//! Size-parameterized scaling filters.

use image::imageops::FilterType;

use super::ImageFilter;
use crate::domain::entities::Image;

fn scaled_identifier(name: &str, width: u32, height: u32) -> String {
    format!("{name}_{width}x{height}")
}

/// Scales to exactly `width x height`, ignoring aspect ratio.
pub struct ScaledToSizeFilter {
    identifier: String,
    width: u32,
    height: u32,
}

impl ScaledToSizeFilter {
    /// Creates a filter targeting the given size.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            identifier: scaled_identifier("scaled", width, height),
            width,
            height,
        }
    }
}

impl ImageFilter for ScaledToSizeFilter {
    fn identifier(&self) -> &str {
        &self.identifier
    }

    fn apply(&self, image: &Image) -> Image {
        let resized = image
            .pixels()
            .resize_exact(self.width, self.height, FilterType::Lanczos3);
        Image::new(std::sync::Arc::new(resized), image.scale())
    }
}

/// Scales to fit inside `width x height`, preserving aspect ratio.
pub struct AspectScaledToFitSizeFilter {
    identifier: String,
    width: u32,
    height: u32,
}

impl AspectScaledToFitSizeFilter {
    /// Creates a filter targeting the given bounding size.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            identifier: scaled_identifier("aspect_fit", width, height),
            width,
            height,
        }
    }
}

impl ImageFilter for AspectScaledToFitSizeFilter {
    fn identifier(&self) -> &str {
        &self.identifier
    }

    fn apply(&self, image: &Image) -> Image {
        let resized = image
            .pixels()
            .resize(self.width, self.height, FilterType::Lanczos3);
        Image::new(std::sync::Arc::new(resized), image.scale())
    }
}

/// Scales to fill `width x height`, preserving aspect ratio and cropping
/// overflow.
pub struct AspectScaledToFillSizeFilter {
    identifier: String,
    width: u32,
    height: u32,
}

impl AspectScaledToFillSizeFilter {
    /// Creates a filter targeting the given size.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            identifier: scaled_identifier("aspect_fill", width, height),
            width,
            height,
        }
    }
}

impl ImageFilter for AspectScaledToFillSizeFilter {
    fn identifier(&self) -> &str {
        &self.identifier
    }

    fn apply(&self, image: &Image) -> Image {
        let filled = image
            .pixels()
            .resize_to_fill(self.width, self.height, FilterType::Lanczos3);
        Image::new(std::sync::Arc::new(filled), image.scale())
    }
}
