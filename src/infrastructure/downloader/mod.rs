//! Download coordination: admission, coalescing, dispatch, receipts.

mod coordinator;
mod executor;
mod handlers;
mod queue;

pub use coordinator::{DownloadOptions, ImageDownloader, Receipt};
pub use executor::{Callback, CallbackExecutor};
pub use handlers::CompletionFn;
