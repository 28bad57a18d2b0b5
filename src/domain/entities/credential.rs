//! Authentication credential attached to outgoing requests.

/// Basic-auth credential supplied at downloader configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    /// Account name.
    pub username: String,
    /// Account secret.
    pub password: String,
}

impl Credential {
    /// Creates a credential.
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}
