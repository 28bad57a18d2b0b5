//! Downloader configuration.

use std::collections::HashSet;
use std::time::Duration;

use crate::domain::entities::Credential;
use crate::infrastructure::http::default_acceptable_image_content_types;

/// Default ceiling on simultaneous in-flight requests.
pub const DEFAULT_MAX_CONCURRENT: usize = 4;

/// Default per-request HTTP timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Queue discipline for requests held back by the concurrency ceiling.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Prioritization {
    /// First in, first out.
    #[default]
    Fifo,
    /// Last in, first out.
    Lifo,
}

/// Configuration for the download coordinator.
#[derive(Debug, Clone)]
pub struct DownloaderConfig {
    /// Simultaneous in-flight requests, at least 1.
    pub max_concurrent: usize,
    /// Queue discipline for held-back requests.
    pub prioritization: Prioritization,
    /// Per-request HTTP timeout, applied by the request runner.
    pub timeout: Duration,
    /// Credential attached to every request.
    pub credential: Option<Credential>,
    /// Server content-type gate; extensible at runtime.
    pub acceptable_content_types: HashSet<String>,
}

impl DownloaderConfig {
    /// Sets the concurrency ceiling.
    #[must_use]
    pub const fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent;
        self
    }

    /// Sets the queue discipline.
    #[must_use]
    pub const fn with_prioritization(mut self, prioritization: Prioritization) -> Self {
        self.prioritization = prioritization;
        self
    }

    /// Sets the per-request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Attaches a credential to every request.
    #[must_use]
    pub fn with_credential(mut self, credential: Credential) -> Self {
        self.credential = Some(credential);
        self
    }

    /// Accepts an additional response content type.
    #[must_use]
    pub fn accepting_content_type(mut self, mime: impl Into<String>) -> Self {
        self.acceptable_content_types.insert(mime.into());
        self
    }
}

impl Default for DownloaderConfig {
    fn default() -> Self {
        Self {
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            prioritization: Prioritization::default(),
            timeout: DEFAULT_REQUEST_TIMEOUT,
            credential: None,
            acceptable_content_types: default_acceptable_image_content_types(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = DownloaderConfig::default();
        assert_eq!(config.max_concurrent, 4);
        assert_eq!(config.prioritization, Prioritization::Fifo);
        assert_eq!(config.timeout, Duration::from_secs(60));
        assert!(config.credential.is_none());
        assert!(config.acceptable_content_types.contains("image/png"));
    }

    #[test]
    fn test_builder_style_setters() {
        let config = DownloaderConfig::default()
            .with_max_concurrent(1)
            .with_prioritization(Prioritization::Lifo)
            .accepting_content_type("image/webp");
        assert_eq!(config.max_concurrent, 1);
        assert_eq!(config.prioritization, Prioritization::Lifo);
        assert!(config.acceptable_content_types.contains("image/webp"));
        assert!(config.acceptable_content_types.contains("image/png"));
    }
}
