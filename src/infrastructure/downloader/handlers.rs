//! Per-URL coalescing records and the table holding them.

use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::entities::{DataResponse, HandlerId, ImageRequest, ReceiptId, UrlId};
use crate::domain::ports::RequestHandle;
use crate::infrastructure::filters::ImageFilter;

/// Completion callback resolving one subscription.
pub type CompletionFn = Box<dyn FnOnce(DataResponse) + Send>;

/// One subscription to a pending download.
pub(crate) struct Subscriber {
    pub receipt_id: ReceiptId,
    pub filter: Option<Arc<dyn ImageFilter>>,
    pub completion: Option<CompletionFn>,
}

/// Coalescing record for one URL: the current network attempt and every
/// subscriber waiting on it.
pub(crate) struct ResponseHandler {
    pub handler_id: HandlerId,
    pub request: ImageRequest,
    pub handle: Arc<dyn RequestHandle>,
    pub subscribers: Vec<Subscriber>,
}

impl ResponseHandler {
    pub fn new(
        handler_id: HandlerId,
        request: ImageRequest,
        handle: Arc<dyn RequestHandle>,
        first_subscriber: Subscriber,
    ) -> Self {
        Self {
            handler_id,
            request,
            handle,
            subscribers: vec![first_subscriber],
        }
    }

    /// Appends a subscriber; delivery later follows subscription order.
    pub fn subscribe(&mut self, subscriber: Subscriber) {
        self.subscribers.push(subscriber);
    }

    /// Removes and returns the subscriber with `receipt_id`.
    pub fn remove_subscriber(&mut self, receipt_id: &ReceiptId) -> Option<Subscriber> {
        let index = self
            .subscribers
            .iter()
            .position(|s| &s.receipt_id == receipt_id)?;
        Some(self.subscribers.remove(index))
    }
}

/// Table of pending attempts keyed by URL fingerprint.
///
/// Every entry maps to a request that is queued, running, or awaiting
/// callback delivery.
#[derive(Default)]
pub(crate) struct HandlerTable {
    entries: HashMap<UrlId, ResponseHandler>,
}

impl HandlerTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_mut(&mut self, url_id: &UrlId) -> Option<&mut ResponseHandler> {
        self.entries.get_mut(url_id)
    }

    pub fn insert(&mut self, handler: ResponseHandler) {
        self.entries.insert(handler.request.url_id(), handler);
    }

    pub fn remove(&mut self, url_id: &UrlId) -> Option<ResponseHandler> {
        self.entries.remove(url_id)
    }

    /// Removes and returns the entry for `url_id` only if it belongs to the
    /// attempt named by `handler_id`; a mismatch means the completion is
    /// stale and the entry stays.
    pub fn take_matching(
        &mut self,
        url_id: &UrlId,
        handler_id: HandlerId,
    ) -> Option<ResponseHandler> {
        match self.entries.get(url_id) {
            Some(handler) if handler.handler_id == handler_id => self.entries.remove(url_id),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::RequestRunner;
    use crate::domain::ports::mocks::MockRunner;

    fn handler(runner: &MockRunner, url: &str, receipt_id: &str) -> ResponseHandler {
        let request = ImageRequest::parse(url).unwrap();
        let handle = runner.prepare(&request, None, None, Box::new(|_| {}));
        ResponseHandler::new(
            HandlerId::fresh(),
            request,
            handle,
            Subscriber {
                receipt_id: ReceiptId::new(receipt_id),
                filter: None,
                completion: None,
            },
        )
    }

    #[test]
    fn test_remove_subscriber_by_receipt() {
        let runner = MockRunner::new();
        let mut entry = handler(&runner, "https://h/x", "r1");
        entry.subscribe(Subscriber {
            receipt_id: ReceiptId::new("r2"),
            filter: None,
            completion: None,
        });

        assert!(entry.remove_subscriber(&ReceiptId::new("r2")).is_some());
        assert!(entry.remove_subscriber(&ReceiptId::new("r2")).is_none());
        assert_eq!(entry.subscribers.len(), 1);
    }

    #[test]
    fn test_take_matching_rejects_superseded_attempts() {
        let runner = MockRunner::new();
        let mut table = HandlerTable::new();
        let entry = handler(&runner, "https://h/x", "r1");
        let url_id = entry.request.url_id();
        let current = entry.handler_id;
        table.insert(entry);

        assert!(table.take_matching(&url_id, HandlerId::fresh()).is_none());
        assert_eq!(table.len(), 1);
        assert!(table.take_matching(&url_id, current).is_some());
        assert_eq!(table.len(), 0);
    }
}
