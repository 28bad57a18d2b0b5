//! Imago - an asynchronous remote-image fetching and caching engine.
//!
//! Clients hand the [`ImageDownloader`] a URL and receive a decoded image
//! asynchronously, optionally transformed by a named filter pipeline.
//! Duplicate in-flight requests are coalesced onto one transfer, concurrent
//! downloads are capped with FIFO or LIFO admission, cache hits are served
//! synchronously from the in-memory store, and least-recently-used entries
//! are evicted once a memory budget is exceeded.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

/// Domain layer containing entities, errors, and port definitions.
pub mod domain;
/// Infrastructure layer containing adapters for caching, transport, and
/// decoding.
pub mod infrastructure;

pub use domain::entities::{
    CachePolicy, Credential, DataResponse, HttpMethod, HttpResponseInfo, Image, ImageRequest,
    ReceiptId, UrlId,
};
pub use domain::errors::{FetchError, ValidationFailure};
pub use domain::ports::{ImageDecoder, RequestEventSink, RequestHandle, RequestRunner};
pub use infrastructure::{
    AutoPurgingImageCache, CompositeFilter, DownloadOptions, DownloaderConfig, DynamicFilter,
    HttpRequestRunner, ImageDownloader, ImageFilter, Prioritization, Receipt,
    SerializingImageDecoder,
};

/// Current version of the crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
