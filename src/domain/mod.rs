//! Domain layer with core entities, errors, and port definitions.

/// Entity definitions.
pub mod entities;
/// Error types.
pub mod errors;
/// Port definitions.
pub mod ports;

pub use entities::{DataResponse, Image, ImageRequest, ReceiptId, UrlId};
pub use errors::{FetchError, ValidationFailure};
