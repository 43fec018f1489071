use serde::{Deserialize, Serialize};

/// Unique identifier for an order aggregate.
///
/// Assigned by the producer and never changed afterwards. The wrapper keeps
/// order identifiers from being mixed up with the other string fields of an
/// order (track numbers, transaction ids, ...).
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderUid(String);

impl OrderUid {
    /// Creates an order identifier from a string.
    pub fn new(uid: impl Into<String>) -> Self {
        Self(uid.into())
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if the identifier is the empty string.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Display for OrderUid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for OrderUid {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for OrderUid {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl AsRef<str> for OrderUid {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_uid_preserves_value() {
        let uid = OrderUid::new("b563feb7b2b84b6test");
        assert_eq!(uid.as_str(), "b563feb7b2b84b6test");
        assert_eq!(uid.to_string(), "b563feb7b2b84b6test");
    }

    #[test]
    fn default_order_uid_is_empty() {
        assert!(OrderUid::default().is_empty());
        assert!(!OrderUid::from("x").is_empty());
    }

    #[test]
    fn order_uid_serializes_as_plain_string() {
        let uid = OrderUid::from("abc");
        let json = serde_json::to_string(&uid).unwrap();
        assert_eq!(json, "\"abc\"");
    }
}
