//! Request wire types and the deduplication fingerprint.

use url::Url;

use crate::domain::errors::FetchError;

/// HTTP method for an image request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum HttpMethod {
    /// GET request.
    #[default]
    Get,
    /// HEAD request.
    Head,
    /// POST request.
    Post,
}

impl HttpMethod {
    /// Method name as sent on the wire.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Head => "HEAD",
            Self::Post => "POST",
        }
    }
}

/// Whether a download may be satisfied from the image cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CachePolicy {
    /// Serve from the image cache when a matching entry exists.
    #[default]
    UseCache,
    /// Always go to the network, ignoring cached images.
    IgnoreCache,
}

impl CachePolicy {
    /// Returns true if a cached image may satisfy the request.
    #[must_use]
    pub const fn allows_cached(self) -> bool {
        matches!(self, Self::UseCache)
    }
}

/// Description of a remote image to fetch.
#[derive(Debug, Clone)]
pub struct ImageRequest {
    url: Url,
    method: HttpMethod,
    headers: Vec<(String, String)>,
    cache_policy: CachePolicy,
}

impl ImageRequest {
    /// Creates a GET request for `url` with the default cache policy.
    #[must_use]
    pub fn new(url: Url) -> Self {
        Self {
            url,
            method: HttpMethod::default(),
            headers: Vec::new(),
            cache_policy: CachePolicy::default(),
        }
    }

    /// Parses `url` and creates a request for it.
    ///
    /// # Errors
    /// Returns [`FetchError::InvalidUrl`] if the string does not parse as an
    /// absolute URL.
    pub fn parse(url: &str) -> Result<Self, FetchError> {
        let parsed = Url::parse(url).map_err(|e| FetchError::invalid_url(url, e.to_string()))?;
        Ok(Self::new(parsed))
    }

    /// Sets the HTTP method.
    #[must_use]
    pub const fn with_method(mut self, method: HttpMethod) -> Self {
        self.method = method;
        self
    }

    /// Appends a request header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Sets the cache policy.
    #[must_use]
    pub const fn with_cache_policy(mut self, policy: CachePolicy) -> Self {
        self.cache_policy = policy;
        self
    }

    /// The request URL.
    #[must_use]
    pub const fn url(&self) -> &Url {
        &self.url
    }

    /// The HTTP method.
    #[must_use]
    pub const fn method(&self) -> HttpMethod {
        self.method
    }

    /// Request headers in insertion order.
    #[must_use]
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// The cache policy.
    #[must_use]
    pub const fn cache_policy(&self) -> CachePolicy {
        self.cache_policy
    }

    /// True if the URL points at a local file.
    #[must_use]
    pub fn is_file_url(&self) -> bool {
        self.url.scheme() == "file"
    }

    /// The deduplication fingerprint for this request.
    #[must_use]
    pub fn url_id(&self) -> UrlId {
        UrlId::new(self.url.as_str())
    }
}

impl From<Url> for ImageRequest {
    fn from(url: Url) -> Self {
        Self::new(url)
    }
}

impl TryFrom<&str> for ImageRequest {
    type Error = FetchError;

    fn try_from(url: &str) -> Result<Self, Self::Error> {
        Self::parse(url)
    }
}

/// Identity of a remote resource: the absolute URL string.
///
/// Two requests with identical URL strings are treated as the same resource
/// regardless of method or header differences; coalescing and cache keying
/// both rely on this fingerprint.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UrlId(String);

impl UrlId {
    /// Creates a fingerprint from any string-like input.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self(url.into())
    }

    /// Returns the inner URL string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UrlId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&ImageRequest> for UrlId {
    fn from(request: &ImageRequest) -> Self {
        request.url_id()
    }
}
