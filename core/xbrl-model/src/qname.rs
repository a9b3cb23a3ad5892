//! FILENAME: core/xbrl-model/src/qname.rs
//! Qualified names for concepts, dimensions and members.
//!
//! A QName is identified by its namespace URI and local name. The prefix is a
//! display hint only and never takes part in equality or ordering.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// A namespace-qualified name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QName {
    /// Namespace URI (empty for no namespace).
    pub namespace: String,

    /// Local part of the name.
    pub local_name: String,

    /// Preferred prefix for display.
    #[serde(default)]
    pub prefix: Option<String>,
}

impl QName {
    pub fn new(namespace: impl Into<String>, local_name: impl Into<String>) -> Self {
        QName {
            namespace: namespace.into(),
            local_name: local_name.into(),
            prefix: None,
        }
    }

    /// Creates a QName with a display prefix.
    pub fn with_prefix(
        prefix: impl Into<String>,
        namespace: impl Into<String>,
        local_name: impl Into<String>,
    ) -> Self {
        QName {
            namespace: namespace.into(),
            local_name: local_name.into(),
            prefix: Some(prefix.into()),
        }
    }

    /// Clark notation: `{namespace}local`.
    pub fn clark(&self) -> String {
        if self.namespace.is_empty() {
            self.local_name.clone()
        } else {
            format!("{{{}}}{}", self.namespace, self.local_name)
        }
    }
}

impl PartialEq for QName {
    fn eq(&self, other: &Self) -> bool {
        self.namespace == other.namespace && self.local_name == other.local_name
    }
}

impl Eq for QName {}

impl Hash for QName {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.namespace.hash(state);
        self.local_name.hash(state);
    }
}

impl PartialOrd for QName {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QName {
    fn cmp(&self, other: &Self) -> Ordering {
        self.namespace
            .cmp(&other.namespace)
            .then_with(|| self.local_name.cmp(&other.local_name))
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.prefix {
            Some(prefix) => write!(f, "{}:{}", prefix, self.local_name),
            None => write!(f, "{}", self.clark()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_ignored_in_equality() {
        let a = QName::with_prefix("us-gaap", "http://fasb.org/us-gaap", "Assets");
        let b = QName::new("http://fasb.org/us-gaap", "Assets");
        assert_eq!(a, b);
        assert_eq!(a.cmp(&b), Ordering::Equal);
    }

    #[test]
    fn test_display() {
        let a = QName::with_prefix("ex", "http://example.com", "Assets");
        assert_eq!(a.to_string(), "ex:Assets");
        let b = QName::new("http://example.com", "Assets");
        assert_eq!(b.to_string(), "{http://example.com}Assets");
        assert_eq!(QName::new("", "local").to_string(), "local");
    }
}
