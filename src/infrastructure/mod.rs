//! Infrastructure layer with adapters for caching, transport, and decoding.

/// Image caching with automatic purging.
pub mod cache;
/// Downloader configuration.
pub mod config;
/// Download coordination.
pub mod downloader;
/// Image filters.
pub mod filters;
/// HTTP transport and validation.
pub mod http;
/// Bytes-to-image serialization.
pub mod serialization;

pub use cache::{AutoPurgingImageCache, CacheStats, cache_key};
pub use config::{DownloaderConfig, Prioritization};
pub use downloader::{
    CallbackExecutor, CompletionFn, DownloadOptions, ImageDownloader, Receipt,
};
pub use filters::{
    AspectScaledToFillSizeFilter, AspectScaledToFitSizeFilter, CompositeFilter, DynamicFilter,
    ImageFilter, ScaledToSizeFilter,
};
pub use http::HttpRequestRunner;
pub use serialization::SerializingImageDecoder;
