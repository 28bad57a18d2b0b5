//! Port for observable request lifecycle events.

use bytes::Bytes;

use crate::domain::entities::ImageRequest;

/// Sink for request lifecycle notifications.
///
/// Callbacks fire from within the coordinator and must return quickly.
pub trait RequestEventSink: Send + Sync {
    /// A transfer started.
    fn request_resumed(&self, request: &ImageRequest);

    /// A transfer was held back by the concurrency ceiling.
    fn request_suspended(&self, request: &ImageRequest);

    /// A transfer was cancelled before completing.
    fn request_cancelled(&self, request: &ImageRequest);

    /// A transfer completed; `data` is the raw response body.
    fn request_completed(&self, request: &ImageRequest, data: &Bytes);
}

/// Sink that discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullEventSink;

impl RequestEventSink for NullEventSink {
    fn request_resumed(&self, _request: &ImageRequest) {}

    fn request_suspended(&self, _request: &ImageRequest) {}

    fn request_cancelled(&self, _request: &ImageRequest) {}

    fn request_completed(&self, _request: &ImageRequest, _data: &Bytes) {}
}

#[cfg(test)]
#[allow(dead_code, missing_docs)]
pub mod mock {
    use std::sync::{Arc, Mutex};

    use super::*;

    /// Recorded lifecycle event.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum RecordedEvent {
        Resumed(String),
        Suspended(String),
        Cancelled(String),
        Completed(String, usize),
    }

    /// Sink that records events for assertions.
    #[derive(Default)]
    pub struct RecordingEventSink {
        pub events: Arc<Mutex<Vec<RecordedEvent>>>,
    }

    impl RecordingEventSink {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn recorded(&self) -> Vec<RecordedEvent> {
            self.events.lock().unwrap().clone()
        }
    }

    impl RequestEventSink for RecordingEventSink {
        fn request_resumed(&self, request: &ImageRequest) {
            self.events
                .lock()
                .unwrap()
                .push(RecordedEvent::Resumed(request.url().to_string()));
        }

        fn request_suspended(&self, request: &ImageRequest) {
            self.events
                .lock()
                .unwrap()
                .push(RecordedEvent::Suspended(request.url().to_string()));
        }

        fn request_cancelled(&self, request: &ImageRequest) {
            self.events
                .lock()
                .unwrap()
                .push(RecordedEvent::Cancelled(request.url().to_string()));
        }

        fn request_completed(&self, request: &ImageRequest, data: &Bytes) {
            self.events
                .lock()
                .unwrap()
                .push(RecordedEvent::Completed(
                    request.url().to_string(),
                    data.len(),
                ));
        }
    }
}
