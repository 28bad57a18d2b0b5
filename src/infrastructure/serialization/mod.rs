//! Bytes-to-image serialization glue.

mod decoder;

pub use decoder::SerializingImageDecoder;
