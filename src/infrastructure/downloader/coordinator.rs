//! Download coordination: dedup, admission, dispatch, cancellation.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use bytes::Bytes;
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, trace, warn};

use crate::domain::entities::{
    DataResponse, HandlerId, HttpResponseInfo, Image, ImageRequest, ReceiptId, UrlId,
};
use crate::domain::errors::FetchError;
use crate::domain::ports::{
    AttemptResult, AttemptSuccess, ImageDecoder, NullEventSink, ProgressFn, RequestEventSink,
    RequestHandle, RequestRunner,
};
use crate::infrastructure::cache::AutoPurgingImageCache;
use crate::infrastructure::config::DownloaderConfig;
use crate::infrastructure::filters::ImageFilter;
use crate::infrastructure::http::{HttpRequestRunner, validate_response};
use crate::infrastructure::serialization::SerializingImageDecoder;

use super::executor::CallbackExecutor;
use super::handlers::{CompletionFn, HandlerTable, ResponseHandler, Subscriber};
use super::queue::{AdmissionQueue, QueuedAttempt};

/// Token identifying one subscription to a pending download.
///
/// Holds the transfer handle so the subscription can be cancelled; the
/// receipt id names the subscription, not the network operation, which may
/// be shared with other subscribers.
pub struct Receipt {
    /// The request this subscription waits on.
    pub request: ImageRequest,
    /// Handle to the (possibly shared) transfer.
    pub handle: Arc<dyn RequestHandle>,
    /// Identity of this subscription.
    pub receipt_id: ReceiptId,
}

/// Per-call download options.
#[derive(Default)]
pub struct DownloadOptions {
    /// Subscription identity; generated fresh when absent.
    pub receipt_id: Option<ReceiptId>,
    /// Transformation applied to the decoded image for this subscriber.
    pub filter: Option<Arc<dyn ImageFilter>>,
    /// Transfer progress hook. Only the first subscriber of a coalesced
    /// download has its progress hook attached; later subscribers' hooks
    /// are dropped.
    pub progress: Option<ProgressFn>,
    /// Completion resolving this subscription, delivered on the callback
    /// executor.
    pub completion: Option<CompletionFn>,
}

impl DownloadOptions {
    /// Creates empty options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pins the subscription identity.
    #[must_use]
    pub fn with_receipt_id(mut self, receipt_id: ReceiptId) -> Self {
        self.receipt_id = Some(receipt_id);
        self
    }

    /// Applies `filter` to this subscriber's image.
    #[must_use]
    pub fn with_filter(mut self, filter: Arc<dyn ImageFilter>) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Forwards transfer progress to `progress`.
    #[must_use]
    pub fn with_progress(mut self, progress: ProgressFn) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Resolves the subscription through `completion`.
    #[must_use]
    pub fn on_completion(mut self, completion: CompletionFn) -> Self {
        self.completion = Some(completion);
        self
    }
}

struct AttemptCompletion {
    url_id: UrlId,
    handler_id: HandlerId,
    result: AttemptResult,
}

struct CoordinatorState {
    handlers: HandlerTable,
    queue: AdmissionQueue,
    active_count: usize,
}

struct DownloaderInner {
    config: DownloaderConfig,
    cache: Option<Arc<AutoPurgingImageCache>>,
    runner: Arc<dyn RequestRunner>,
    decoder: Arc<dyn ImageDecoder>,
    events: Arc<dyn RequestEventSink>,
    executor: CallbackExecutor,
    state: Mutex<CoordinatorState>,
    completion_tx: mpsc::UnboundedSender<AttemptCompletion>,
}

/// Coordinates image downloads: coalesces duplicate requests, enforces the
/// concurrency ceiling with FIFO/LIFO admission, serves cache hits, and
/// fans completions out in subscription order.
pub struct ImageDownloader {
    inner: Arc<DownloaderInner>,
}

impl ImageDownloader {
    /// Creates a coordinator with the default auto-purging cache and no
    /// event sink.
    #[must_use]
    pub fn new(
        config: DownloaderConfig,
        runner: Arc<dyn RequestRunner>,
        decoder: Arc<dyn ImageDecoder>,
    ) -> Self {
        Self::with_components(
            config,
            runner,
            decoder,
            Some(Arc::new(AutoPurgingImageCache::default())),
            Arc::new(NullEventSink),
        )
    }

    /// Creates a coordinator from explicit components.
    ///
    /// Must be called from within a Tokio runtime; the coordinator spawns
    /// its dispatch and callback-delivery tasks immediately.
    ///
    /// # Panics
    /// Panics if `config.max_concurrent` is zero.
    #[must_use]
    pub fn with_components(
        config: DownloaderConfig,
        runner: Arc<dyn RequestRunner>,
        decoder: Arc<dyn ImageDecoder>,
        cache: Option<Arc<AutoPurgingImageCache>>,
        events: Arc<dyn RequestEventSink>,
    ) -> Self {
        assert!(config.max_concurrent >= 1, "max_concurrent must be at least 1");

        let (completion_tx, mut completion_rx) = mpsc::unbounded_channel();
        let queue = AdmissionQueue::new(config.prioritization);
        let inner = Arc::new(DownloaderInner {
            config,
            cache,
            runner,
            decoder,
            events,
            executor: CallbackExecutor::spawn(),
            state: Mutex::new(CoordinatorState {
                handlers: HandlerTable::new(),
                queue,
                active_count: 0,
            }),
            completion_tx,
        });

        // The dispatch loop must not keep the coordinator alive: it holds a
        // weak reference and exits once the last strong handle drops.
        let weak: Weak<DownloaderInner> = Arc::downgrade(&inner);
        tokio::spawn(async move {
            while let Some(completion) = completion_rx.recv().await {
                let Some(inner) = weak.upgrade() else { break };
                inner.dispatch(completion).await;
            }
        });

        Self { inner }
    }

    /// Creates a coordinator over the reqwest runner and the serializing
    /// decoder.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn with_http(config: DownloaderConfig) -> Result<Self, FetchError> {
        let runner = Arc::new(HttpRequestRunner::new(config.timeout)?);
        let decoder = Arc::new(SerializingImageDecoder::new());
        Ok(Self::new(config, runner, decoder))
    }

    /// Creates a coordinator with default configuration over the reqwest
    /// runner.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn with_defaults() -> Result<Self, FetchError> {
        Self::with_http(DownloaderConfig::default())
    }

    /// Subscribes to the image at `request`.
    ///
    /// Returns a [`Receipt`] for the pending download, or `None` when the
    /// request was satisfied synchronously from the cache (the completion
    /// still fires, on the callback executor).
    ///
    /// Duplicate in-flight URLs are coalesced: the new subscriber joins the
    /// existing attempt and no second transfer starts.
    pub async fn download(&self, request: ImageRequest, options: DownloadOptions) -> Option<Receipt> {
        self.inner.download(request, options).await
    }

    /// Downloads a batch, returning receipts for the requests that were not
    /// served from the cache, in input order.
    pub async fn download_batch(
        &self,
        requests: impl IntoIterator<Item = ImageRequest>,
    ) -> Vec<Receipt> {
        let mut receipts = Vec::new();
        for request in requests {
            if let Some(receipt) = self.download(request, DownloadOptions::new()).await {
                receipts.push(receipt);
            }
        }
        receipts
    }

    /// Cancels one subscription.
    ///
    /// The receipt's completion resolves with
    /// [`FetchError::RequestCancelled`]; other subscribers to the same URL
    /// are unaffected. When the last subscriber cancels before the transfer
    /// starts, the transfer itself is cancelled.
    pub async fn cancel(&self, receipt: &Receipt) {
        self.inner.cancel(receipt).await;
    }

    /// Clears the image cache in response to external memory pressure.
    pub async fn on_memory_warning(&self) {
        if let Some(cache) = &self.inner.cache {
            debug!("Memory warning: clearing image cache");
            cache.clear().await;
        }
    }

    /// The coordinator's image cache, when it has one.
    #[must_use]
    pub fn cache(&self) -> Option<&Arc<AutoPurgingImageCache>> {
        self.inner.cache.as_ref()
    }

    /// Number of transfers currently in flight.
    pub async fn active_count(&self) -> usize {
        self.inner.state.lock().await.active_count
    }

    /// Number of transfers held back by the concurrency ceiling.
    pub async fn queued_count(&self) -> usize {
        self.inner.state.lock().await.queue.len()
    }

    /// Number of URLs with a pending attempt.
    pub async fn pending_url_count(&self) -> usize {
        self.inner.state.lock().await.handlers.len()
    }
}

impl DownloaderInner {
    async fn download(&self, request: ImageRequest, options: DownloadOptions) -> Option<Receipt> {
        let url_id = request.url_id();
        let receipt_id = options.receipt_id.unwrap_or_else(ReceiptId::fresh);
        let mut state = self.state.lock().await;

        // Join an attempt already pending for this URL.
        if let Some(handler) = state.handlers.get_mut(&url_id) {
            trace!(url = %url_id, receipt = %receipt_id, "Coalescing onto pending attempt");
            handler.subscribe(Subscriber {
                receipt_id: receipt_id.clone(),
                filter: options.filter,
                completion: options.completion,
            });
            let handle = handler.handle.clone();
            return Some(Receipt {
                request,
                handle,
                receipt_id,
            });
        }

        // Serve synchronously from the cache.
        if request.cache_policy().allows_cached() {
            if let Some(cache) = &self.cache {
                let filter_id = options
                    .filter
                    .as_ref()
                    .map(|filter| filter.identifier().to_string());
                if let Some(image) = cache.get_for_request(&request, filter_id.as_deref()).await {
                    trace!(url = %url_id, "Serving download from image cache");
                    if let Some(completion) = options.completion {
                        let payload = DataResponse::cached(request, image);
                        self.executor.execute(Box::new(move || completion(payload)));
                    }
                    return None;
                }
            }
        }

        // New network attempt.
        let handler_id = HandlerId::fresh();
        let completion_tx = self.completion_tx.clone();
        let completion_url = url_id.clone();
        let handle = self.runner.prepare(
            &request,
            self.config.credential.as_ref(),
            options.progress,
            Box::new(move |result| {
                let _ = completion_tx.send(AttemptCompletion {
                    url_id: completion_url,
                    handler_id,
                    result,
                });
            }),
        );

        if state.active_count < self.config.max_concurrent {
            handle.resume();
            state.active_count += 1;
            debug!(url = %url_id, active = state.active_count, "Started download");
            self.events.request_resumed(&request);
        } else {
            state.queue.push(QueuedAttempt {
                request: request.clone(),
                handle: handle.clone(),
            });
            debug!(url = %url_id, queued = state.queue.len(), "Queued download");
            self.events.request_suspended(&request);
        }

        state.handlers.insert(ResponseHandler::new(
            handler_id,
            request.clone(),
            handle.clone(),
            Subscriber {
                receipt_id: receipt_id.clone(),
                filter: options.filter,
                completion: options.completion,
            },
        ));

        Some(Receipt {
            request,
            handle,
            receipt_id,
        })
    }

    async fn cancel(&self, receipt: &Receipt) {
        let url_id = receipt.request.url_id();
        let mut state = self.state.lock().await;

        let Some(handler) = state.handlers.get_mut(&url_id) else {
            return;
        };
        let Some(subscriber) = handler.remove_subscriber(&receipt.receipt_id) else {
            return;
        };
        debug!(url = %url_id, receipt = %receipt.receipt_id, "Cancelled subscription");

        if let Some(completion) = subscriber.completion {
            let payload = DataResponse::failure(
                receipt.request.clone(),
                None,
                Bytes::new(),
                FetchError::RequestCancelled,
            );
            self.executor.execute(Box::new(move || completion(payload)));
        }

        // Last subscriber gone: erase the entry. A transfer that never
        // started is cancelled outright; one already in flight is left to
        // finish, and its completion becomes a no-op.
        let orphaned = handler.subscribers.is_empty();
        let startable = handler.handle.state().is_startable();
        let handle = handler.handle.clone();
        if orphaned {
            if startable {
                handle.cancel();
                self.events.request_cancelled(&receipt.request);
            }
            state.handlers.remove(&url_id);
        }
    }

    async fn dispatch(&self, completion: AttemptCompletion) {
        let handler = {
            let mut state = self.state.lock().await;
            state.active_count = state.active_count.saturating_sub(1);
            let handler = state
                .handlers
                .take_matching(&completion.url_id, completion.handler_id);
            self.start_next_locked(&mut state);
            handler
        };

        let Some(handler) = handler else {
            debug!(url = %completion.url_id, "Dropping completion for superseded attempt");
            return;
        };

        match completion.result {
            Ok(success) => self.deliver_success(handler, success).await,
            Err(error) => self.deliver_failure(handler, None, Bytes::new(), error),
        }
    }

    async fn deliver_success(&self, handler: ResponseHandler, success: AttemptSuccess) {
        let AttemptSuccess { response, data } = success;
        let ResponseHandler {
            request,
            subscribers,
            ..
        } = handler;

        if let Err(error) = validate_response(
            &request,
            &response,
            data.len(),
            &self.config.acceptable_content_types,
        ) {
            self.fan_out_failure(&request, subscribers, Some(response), data, error);
            return;
        }

        let image = match self.decoder.decode(&data).await {
            Ok(image) => image,
            Err(error) => {
                self.fan_out_failure(&request, subscribers, Some(response), data, error);
                return;
            }
        };

        self.events.request_completed(&request, &data);

        // One transform per distinct filter identifier, shared across
        // subscribers.
        let mut filtered: HashMap<String, Image> = HashMap::new();
        for subscriber in subscribers {
            let subscriber_image = match &subscriber.filter {
                Some(filter) => filtered
                    .entry(filter.identifier().to_string())
                    .or_insert_with(|| filter.apply(&image))
                    .clone(),
                None => image.clone(),
            };

            let filter_id = subscriber
                .filter
                .as_ref()
                .map(|filter| filter.identifier().to_string());
            if let Some(cache) = &self.cache {
                cache
                    .add_for_request(subscriber_image.clone(), &request, filter_id.as_deref())
                    .await;
            }

            if let Some(completion) = subscriber.completion {
                let payload = DataResponse {
                    request: request.clone(),
                    response: Some(response.clone()),
                    data: data.clone(),
                    result: Ok(subscriber_image),
                };
                self.executor.execute(Box::new(move || completion(payload)));
            }
        }
    }

    fn deliver_failure(
        &self,
        handler: ResponseHandler,
        response: Option<HttpResponseInfo>,
        data: Bytes,
        error: FetchError,
    ) {
        let ResponseHandler {
            request,
            subscribers,
            ..
        } = handler;
        self.fan_out_failure(&request, subscribers, response, data, error);
    }

    fn fan_out_failure(
        &self,
        request: &ImageRequest,
        subscribers: Vec<Subscriber>,
        response: Option<HttpResponseInfo>,
        data: Bytes,
        error: FetchError,
    ) {
        warn!(url = %request.url(), error = %error, "Download failed");
        for subscriber in subscribers {
            if let Some(completion) = subscriber.completion {
                let payload = DataResponse::failure(
                    request.clone(),
                    response.clone(),
                    data.clone(),
                    error.clone(),
                );
                self.executor.execute(Box::new(move || completion(payload)));
            }
        }
    }

    fn start_next_locked(&self, state: &mut CoordinatorState) {
        while state.active_count < self.config.max_concurrent {
            let Some(attempt) = state.queue.pop_startable() else {
                break;
            };
            attempt.handle.resume();
            state.active_count += 1;
            debug!(url = %attempt.request.url(), active = state.active_count, "Started queued download");
            self.events.request_resumed(&attempt.request);
        }
    }
}
