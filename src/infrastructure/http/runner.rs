//! reqwest-backed request runner.

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;

use bytes::BytesMut;
use futures_util::StreamExt;
use parking_lot::Mutex;
use reqwest::{Client, Method, header};
use tokio::sync::Notify;
use tracing::{debug, trace};

use crate::domain::entities::{Credential, HttpMethod, HttpResponseInfo, ImageRequest};
use crate::domain::errors::FetchError;
use crate::domain::ports::{
    AttemptCompletionFn, AttemptResult, AttemptSuccess, ProgressFn, RequestHandle, RequestRunner,
    RequestState,
};

const SUSPENDED: u8 = 0;
const RUNNING: u8 = 1;
const FINISHED: u8 = 2;
const CANCELLED: u8 = 3;

/// Request runner performing transfers over a shared reqwest client.
pub struct HttpRequestRunner {
    client: Client,
}

impl HttpRequestRunner {
    /// Creates a runner whose requests time out after `timeout`.
    ///
    /// # Errors
    /// Returns [`FetchError::Transport`] if the client cannot be built.
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::transport(format!("failed to create HTTP client: {e}")))?;
        Ok(Self { client })
    }

    /// Wraps an existing client.
    #[must_use]
    pub const fn with_client(client: Client) -> Self {
        Self { client }
    }
}

impl RequestRunner for HttpRequestRunner {
    fn prepare(
        &self,
        request: &ImageRequest,
        credential: Option<&Credential>,
        progress: Option<ProgressFn>,
        on_complete: AttemptCompletionFn,
    ) -> Arc<dyn RequestHandle> {
        Arc::new(HttpRequestHandle {
            state: Arc::new(AtomicU8::new(SUSPENDED)),
            cancelled: Arc::new(Notify::new()),
            job: Mutex::new(Some(TransferJob {
                client: self.client.clone(),
                request: request.clone(),
                credential: credential.cloned(),
                progress,
                on_complete,
            })),
        })
    }
}

struct TransferJob {
    client: Client,
    request: ImageRequest,
    credential: Option<Credential>,
    progress: Option<ProgressFn>,
    on_complete: AttemptCompletionFn,
}

/// A suspended-until-resumed HTTP transfer.
struct HttpRequestHandle {
    state: Arc<AtomicU8>,
    cancelled: Arc<Notify>,
    job: Mutex<Option<TransferJob>>,
}

impl RequestHandle for HttpRequestHandle {
    fn state(&self) -> RequestState {
        match self.state.load(Ordering::SeqCst) {
            SUSPENDED => RequestState::Suspended,
            RUNNING => RequestState::Running,
            FINISHED => RequestState::Finished,
            _ => RequestState::Cancelled,
        }
    }

    fn resume(&self) {
        if self
            .state
            .compare_exchange(SUSPENDED, RUNNING, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return;
        }
        let Some(job) = self.job.lock().take() else {
            return;
        };
        let state = self.state.clone();
        let cancelled = self.cancelled.clone();
        tokio::spawn(run_transfer(job, state, cancelled));
    }

    fn cancel(&self) {
        if self
            .state
            .compare_exchange(SUSPENDED, CANCELLED, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            // Never started: drop the job, no completion fires.
            self.job.lock().take();
            return;
        }
        self.cancelled.notify_one();
    }
}

async fn run_transfer(job: TransferJob, state: Arc<AtomicU8>, cancelled: Arc<Notify>) {
    let TransferJob {
        client,
        request,
        credential,
        progress,
        on_complete,
    } = job;

    debug!(url = %request.url(), "Starting transfer");
    let result = tokio::select! {
        () = cancelled.notified() => Err(FetchError::RequestCancelled),
        result = execute(&client, &request, credential.as_ref(), progress.as_ref()) => result,
    };

    let final_state = if matches!(result, Err(FetchError::RequestCancelled)) {
        CANCELLED
    } else {
        FINISHED
    };
    state.store(final_state, Ordering::SeqCst);
    on_complete(result);
}

async fn execute(
    client: &Client,
    request: &ImageRequest,
    credential: Option<&Credential>,
    progress: Option<&ProgressFn>,
) -> AttemptResult {
    let method = match request.method() {
        HttpMethod::Get => Method::GET,
        HttpMethod::Head => Method::HEAD,
        HttpMethod::Post => Method::POST,
    };

    let mut builder = client.request(method, request.url().as_str());
    for (name, value) in request.headers() {
        builder = builder.header(name.as_str(), value.as_str());
    }
    if let Some(credential) = credential {
        builder = builder.basic_auth(&credential.username, Some(&credential.password));
    }

    let response = builder
        .send()
        .await
        .map_err(|e| FetchError::transport(e.to_string()))?;

    let status = response.status().as_u16();
    let mime_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(|value| {
            value
                .split(';')
                .next()
                .unwrap_or(value)
                .trim()
                .to_string()
        });
    let content_length = response.content_length();
    let final_url = response.url().to_string();

    let mut data = BytesMut::new();
    let mut received = 0u64;
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| FetchError::transport(e.to_string()))?;
        received += chunk.len() as u64;
        data.extend_from_slice(&chunk);
        if let Some(progress) = progress {
            progress(received, content_length);
        }
    }
    trace!(url = %final_url, bytes = received, status, "Transfer finished");

    Ok(AttemptSuccess {
        response: HttpResponseInfo {
            status,
            mime_type,
            content_length,
            url: final_url,
        },
        data: data.freeze(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::AtomicU64;
    use std::thread;

    use tokio::sync::mpsc;
    use tokio::time::timeout;

    /// Spin up a server, so we can test network requests without external
    /// services.
    fn mock_file_server(files: Vec<(String, String, Vec<u8>)>) -> String {
        let server = tiny_http::Server::http("127.0.0.1:0").unwrap();
        let ip = server.server_addr().to_ip().unwrap();
        let base_url = format!("http://{ip}");

        thread::spawn(move || {
            for req in server.incoming_requests() {
                let response = match files.iter().find(|(path, _, _)| path == req.url()) {
                    Some((_, mime, bytes)) => {
                        let header =
                            tiny_http::Header::from_bytes(b"Content-Type", mime.as_bytes())
                                .unwrap();
                        tiny_http::Response::from_data(bytes.clone())
                            .with_header(header)
                            .boxed()
                    }
                    None => tiny_http::Response::empty(404).boxed(),
                };
                let _ = req.respond(response);
            }
        });

        base_url
    }

    fn png_bytes() -> Vec<u8> {
        let mut buffer = std::io::Cursor::new(Vec::new());
        image::DynamicImage::new_rgba8(2, 2)
            .write_to(&mut buffer, image::ImageFormat::Png)
            .unwrap();
        buffer.into_inner()
    }

    fn completion_channel() -> (AttemptCompletionFn, mpsc::UnboundedReceiver<AttemptResult>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Box::new(move |result| {
                let _ = tx.send(result);
            }),
            rx,
        )
    }

    async fn receive(rx: &mut mpsc::UnboundedReceiver<AttemptResult>) -> AttemptResult {
        timeout(Duration::from_secs(10), rx.recv())
            .await
            .expect("attempt did not complete in time")
            .expect("completion channel closed")
    }

    #[tokio::test]
    async fn test_resumed_transfer_delivers_bytes_and_descriptor() {
        let bytes = png_bytes();
        let base = mock_file_server(vec![(
            "/a.png".to_string(),
            "image/png".to_string(),
            bytes.clone(),
        )]);
        let runner = HttpRequestRunner::new(Duration::from_secs(10)).unwrap();
        let request = ImageRequest::parse(&format!("{base}/a.png")).unwrap();

        let (on_complete, mut rx) = completion_channel();
        let handle = runner.prepare(&request, None, None, on_complete);
        assert_eq!(handle.state(), RequestState::Suspended);

        handle.resume();
        let result = receive(&mut rx).await.unwrap();
        assert_eq!(result.response.status, 200);
        assert_eq!(result.response.mime_type.as_deref(), Some("image/png"));
        assert_eq!(result.data.as_ref(), bytes.as_slice());
        assert_eq!(handle.state(), RequestState::Finished);
    }

    #[tokio::test]
    async fn test_progress_reports_received_bytes() {
        let bytes = png_bytes();
        let total = bytes.len() as u64;
        let base = mock_file_server(vec![(
            "/a.png".to_string(),
            "image/png".to_string(),
            bytes,
        )]);
        let runner = HttpRequestRunner::new(Duration::from_secs(10)).unwrap();
        let request = ImageRequest::parse(&format!("{base}/a.png")).unwrap();

        let reported = Arc::new(AtomicU64::new(0));
        let recorded = reported.clone();
        let progress: ProgressFn = Box::new(move |received, _total| {
            recorded.store(received, Ordering::SeqCst);
        });

        let (on_complete, mut rx) = completion_channel();
        let handle = runner.prepare(&request, None, Some(progress), on_complete);
        handle.resume();
        let _ = receive(&mut rx).await.unwrap();

        assert_eq!(reported.load(Ordering::SeqCst), total);
    }

    #[tokio::test]
    async fn test_missing_resource_reports_status_not_error() {
        let base = mock_file_server(vec![]);
        let runner = HttpRequestRunner::new(Duration::from_secs(10)).unwrap();
        let request = ImageRequest::parse(&format!("{base}/nope.png")).unwrap();

        let (on_complete, mut rx) = completion_channel();
        let handle = runner.prepare(&request, None, None, on_complete);
        handle.resume();

        let result = receive(&mut rx).await.unwrap();
        assert_eq!(result.response.status, 404);
    }

    #[tokio::test]
    async fn test_cancel_before_resume_delivers_nothing() {
        let base = mock_file_server(vec![]);
        let runner = HttpRequestRunner::new(Duration::from_secs(10)).unwrap();
        let request = ImageRequest::parse(&format!("{base}/a.png")).unwrap();

        let (on_complete, mut rx) = completion_channel();
        let handle = runner.prepare(&request, None, None, on_complete);
        handle.cancel();
        assert_eq!(handle.state(), RequestState::Cancelled);

        // Resuming a cancelled handle is a no-op.
        handle.resume();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_unreachable_host_is_a_transport_error() {
        let runner = HttpRequestRunner::new(Duration::from_secs(2)).unwrap();
        // TEST-NET-1, unroutable.
        let request = ImageRequest::parse("http://192.0.2.1:9/a.png").unwrap();

        let (on_complete, mut rx) = completion_channel();
        let handle = runner.prepare(&request, None, None, on_complete);
        handle.resume();

        let result = receive(&mut rx).await;
        assert!(matches!(result, Err(FetchError::Transport { .. })));
    }
}
