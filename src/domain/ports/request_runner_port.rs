//! Port definition for the byte-producing request runner.

use std::sync::Arc;

use bytes::Bytes;

use crate::domain::entities::{Credential, HttpResponseInfo, ImageRequest};
use crate::domain::errors::FetchError;

/// Progress callback: `(bytes received, total bytes when known)`.
pub type ProgressFn = Box<dyn Fn(u64, Option<u64>) + Send + Sync>;

/// Completion callback handed to the runner for one attempt.
pub type AttemptCompletionFn = Box<dyn FnOnce(AttemptResult) + Send>;

/// Bytes and response descriptor produced by a finished transfer.
///
/// The runner reports any HTTP exchange that produced a response as a
/// success, whatever the status code; status and content-type gating happen
/// downstream so failures keep the full payload.
#[derive(Debug)]
pub struct AttemptSuccess {
    /// HTTP response descriptor.
    pub response: HttpResponseInfo,
    /// Raw response body.
    pub data: Bytes,
}

/// Outcome of one network attempt.
pub type AttemptResult = Result<AttemptSuccess, FetchError>;

/// Lifecycle state of a prepared transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    /// Prepared but not yet started.
    Suspended,
    /// Transfer in flight.
    Running,
    /// Transfer delivered its completion.
    Finished,
    /// Cancelled before or during the transfer.
    Cancelled,
}

impl RequestState {
    /// True if the transfer can still be started.
    #[must_use]
    pub const fn is_startable(self) -> bool {
        matches!(self, Self::Suspended)
    }
}

/// Handle to one prepared transfer.
///
/// Contract: a handle delivers its completion exactly once if and only if it
/// was resumed. A handle cancelled while still suspended delivers nothing; a
/// handle cancelled mid-transfer completes with
/// [`FetchError::RequestCancelled`].
pub trait RequestHandle: Send + Sync {
    /// Current lifecycle state.
    fn state(&self) -> RequestState;

    /// Starts the transfer. No-op unless the handle is suspended.
    fn resume(&self);

    /// Cancels the transfer.
    fn cancel(&self);
}

/// Port producing suspended transfers for image requests.
///
/// Implementations perform I/O on their own tasks; `prepare` itself must
/// not block.
pub trait RequestRunner: Send + Sync {
    /// Prepares a suspended transfer for `request`.
    fn prepare(
        &self,
        request: &ImageRequest,
        credential: Option<&Credential>,
        progress: Option<ProgressFn>,
        on_complete: AttemptCompletionFn,
    ) -> Arc<dyn RequestHandle>;
}

#[cfg(test)]
#[allow(dead_code, missing_docs)]
pub mod mock {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU8, Ordering};

    use super::*;

    const SUSPENDED: u8 = 0;
    const RUNNING: u8 = 1;
    const FINISHED: u8 = 2;
    const CANCELLED: u8 = 3;

    /// A prepared transfer under test control.
    pub struct MockHandle {
        pub request: ImageRequest,
        pub has_progress: bool,
        state: AtomicU8,
        completion: Mutex<Option<AttemptCompletionFn>>,
    }

    impl MockHandle {
        /// Resolves the attempt, honoring the completion-iff-resumed
        /// contract.
        pub fn complete(&self, result: AttemptResult) {
            let resumed = self.state.load(Ordering::SeqCst) == RUNNING;
            assert!(resumed, "mock attempt completed without being resumed");
            self.state.store(FINISHED, Ordering::SeqCst);
            let completion = self
                .completion
                .lock()
                .unwrap()
                .take()
                .expect("mock attempt completed twice");
            completion(result);
        }

        pub fn is_resumed(&self) -> bool {
            self.state.load(Ordering::SeqCst) == RUNNING
        }

        pub fn is_cancelled(&self) -> bool {
            self.state.load(Ordering::SeqCst) == CANCELLED
        }
    }

    impl RequestHandle for MockHandle {
        fn state(&self) -> RequestState {
            match self.state.load(Ordering::SeqCst) {
                SUSPENDED => RequestState::Suspended,
                RUNNING => RequestState::Running,
                FINISHED => RequestState::Finished,
                _ => RequestState::Cancelled,
            }
        }

        fn resume(&self) {
            let _ = self.state.compare_exchange(
                SUSPENDED,
                RUNNING,
                Ordering::SeqCst,
                Ordering::SeqCst,
            );
        }

        fn cancel(&self) {
            self.state.store(CANCELLED, Ordering::SeqCst);
        }
    }

    /// Records every prepared attempt; tests resolve them explicitly.
    #[derive(Default)]
    pub struct MockRunner {
        pub prepared: Mutex<Vec<Arc<MockHandle>>>,
    }

    impl MockRunner {
        pub fn new() -> Self {
            Self::default()
        }

        /// Number of attempts prepared so far.
        pub fn prepared_count(&self) -> usize {
            self.prepared.lock().unwrap().len()
        }

        /// The `index`-th prepared attempt.
        pub fn handle(&self, index: usize) -> Arc<MockHandle> {
            self.prepared.lock().unwrap()[index].clone()
        }
    }

    impl RequestRunner for MockRunner {
        fn prepare(
            &self,
            request: &ImageRequest,
            _credential: Option<&Credential>,
            progress: Option<ProgressFn>,
            on_complete: AttemptCompletionFn,
        ) -> Arc<dyn RequestHandle> {
            let handle = Arc::new(MockHandle {
                request: request.clone(),
                has_progress: progress.is_some(),
                state: AtomicU8::new(SUSPENDED),
                completion: Mutex::new(Some(on_complete)),
            });
            self.prepared.lock().unwrap().push(handle.clone());
            handle
        }
    }
}
