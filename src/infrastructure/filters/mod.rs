//! Image filters: identity, composition, and application.
//!
//! A filter is a pure transformation paired with a stable identifier. The
//! cache relies on identifiers being deterministic: two filters with the
//! same identifier must produce the same image for equal inputs, and
//! semantically different filters must not share one.

mod scale;

use std::sync::Arc;

use crate::domain::entities::Image;

pub use scale::{AspectScaledToFillSizeFilter, AspectScaledToFitSizeFilter, ScaledToSizeFilter};

/// A pure image transformation with a stable identity.
pub trait ImageFilter: Send + Sync {
    /// Stable identifier; embedded in cache keys.
    fn identifier(&self) -> &str;

    /// Applies the transformation.
    fn apply(&self, image: &Image) -> Image;
}

/// Filter built from a closure and an explicit identifier.
pub struct DynamicFilter<F>
where
    F: Fn(&Image) -> Image + Send + Sync,
{
    identifier: String,
    transform: F,
}

impl<F> DynamicFilter<F>
where
    F: Fn(&Image) -> Image + Send + Sync,
{
    /// Creates a filter from `transform` under the given identifier.
    pub fn new(identifier: impl Into<String>, transform: F) -> Self {
        Self {
            identifier: identifier.into(),
            transform,
        }
    }
}

impl<F> ImageFilter for DynamicFilter<F>
where
    F: Fn(&Image) -> Image + Send + Sync,
{
    fn identifier(&self) -> &str {
        &self.identifier
    }

    fn apply(&self, image: &Image) -> Image {
        (self.transform)(image)
    }
}

/// Left-fold composition of filters.
///
/// The identifier is the children's identifiers joined with `_`.
pub struct CompositeFilter {
    identifier: String,
    children: Vec<Arc<dyn ImageFilter>>,
}

impl CompositeFilter {
    /// Composes `children`, applied first to last.
    #[must_use]
    pub fn new(children: Vec<Arc<dyn ImageFilter>>) -> Self {
        let identifier = children
            .iter()
            .map(|child| child.identifier())
            .collect::<Vec<_>>()
            .join("_");
        Self {
            identifier,
            children,
        }
    }

    /// The composed filters in application order.
    #[must_use]
    pub fn children(&self) -> &[Arc<dyn ImageFilter>] {
        &self.children
    }
}

impl ImageFilter for CompositeFilter {
    fn identifier(&self) -> &str {
        &self.identifier
    }

    fn apply(&self, image: &Image) -> Image {
        self.children
            .iter()
            .fold(image.clone(), |acc, child| child.apply(&acc))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn raster(width: u32, height: u32) -> Image {
        Image::from_dynamic(image::DynamicImage::new_rgba8(width, height))
    }

    #[test]
    fn test_dynamic_filter_applies_closure() {
        let filter = DynamicFilter::new("double", |image: &Image| {
            raster(image.width() * 2, image.height() * 2)
        });
        let out = filter.apply(&raster(4, 4));
        assert_eq!(out.width(), 8);
        assert_eq!(filter.identifier(), "double");
    }

    #[test]
    fn test_composite_identifier_joins_children() {
        let double: Arc<dyn ImageFilter> = Arc::new(DynamicFilter::new("double", |img: &Image| {
            raster(img.width() * 2, img.height() * 2)
        }));
        let composite = CompositeFilter::new(vec![double.clone(), double]);
        assert_eq!(composite.identifier(), "double_double");
    }

    #[test]
    fn test_composite_apply_is_left_fold() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counted = calls.clone();
        let double: Arc<dyn ImageFilter> = Arc::new(DynamicFilter::new("double", move |img: &Image| {
            counted.fetch_add(1, Ordering::SeqCst);
            raster(img.width() * 2, img.height() * 2)
        }));

        let composite = CompositeFilter::new(vec![double.clone(), double]);
        let out = composite.apply(&raster(3, 3));

        // compose(f, f) == f . f
        assert_eq!(out.width(), 12);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_distinct_identifiers_for_distinct_sizes() {
        let small = ScaledToSizeFilter::new(32, 32);
        let large = ScaledToSizeFilter::new(64, 64);
        assert_ne!(small.identifier(), large.identifier());
    }
}
