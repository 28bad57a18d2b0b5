//! Port definitions for external adapters.

mod decoder_port;
mod event_port;
mod request_runner_port;

pub use decoder_port::ImageDecoder;
pub use event_port::{NullEventSink, RequestEventSink};
pub use request_runner_port::{
    AttemptCompletionFn, AttemptResult, AttemptSuccess, ProgressFn, RequestHandle, RequestRunner,
    RequestState,
};
