//! Subscription identifiers.

use uuid::Uuid;

/// Identity of one subscription to a download result.
///
/// A receipt id names a subscriber, not a network operation: several ids
/// can share one coalesced transfer.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReceiptId(String);

impl ReceiptId {
    /// Creates a receipt id from caller-supplied identity.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generates a fresh random receipt id.
    #[must_use]
    pub fn fresh() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Returns the inner string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ReceiptId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ReceiptId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for ReceiptId {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// Per-attempt nonce distinguishing network attempts for one URL.
///
/// Regenerated for every distinct transfer so a late completion can detect
/// that its attempt has been superseded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(Uuid);

impl HandlerId {
    /// Generates a fresh attempt nonce.
    #[must_use]
    pub fn fresh() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for HandlerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_receipt_ids_are_distinct() {
        assert_ne!(ReceiptId::fresh(), ReceiptId::fresh());
    }

    #[test]
    fn test_fresh_handler_ids_are_distinct() {
        assert_ne!(HandlerId::fresh(), HandlerId::fresh());
    }
}
