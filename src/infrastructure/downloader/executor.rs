//! Ordered delivery of completion callbacks.

use tokio::sync::mpsc;

/// A queued callback.
pub type Callback = Box<dyn FnOnce() + Send>;

/// Executor delivering callbacks in submission order on its own task.
///
/// Completions scheduled here never run on a request runner's I/O task, and
/// two callbacks scheduled one after the other run in that order.
#[derive(Clone)]
pub struct CallbackExecutor {
    tx: mpsc::UnboundedSender<Callback>,
}

impl CallbackExecutor {
    /// Spawns the executor's drain loop on the current runtime.
    #[must_use]
    pub fn spawn() -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<Callback>();
        tokio::spawn(async move {
            while let Some(callback) = rx.recv().await {
                callback();
            }
        });
        Self { tx }
    }

    /// Schedules `callback`. Dropped silently if the executor has shut
    /// down.
    pub fn execute(&self, callback: Callback) {
        let _ = self.tx.send(callback);
    }
}

impl std::fmt::Debug for CallbackExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackExecutor").finish_non_exhaustive()
    }
}
