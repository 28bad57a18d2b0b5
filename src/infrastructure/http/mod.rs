//! HTTP transport adapter and response validation.

mod runner;
mod validation;

pub use runner::HttpRequestRunner;
pub use validation::{
    DEFAULT_ACCEPTABLE_IMAGE_CONTENT_TYPES, default_acceptable_image_content_types,
    is_acceptable_content_type, validate_response,
};
