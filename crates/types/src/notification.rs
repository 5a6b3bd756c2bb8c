//! Push notification payloads

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A notification pushed to the shared screen
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// Sender-supplied identifier; generated on arrival when missing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub message: String,
    /// Free-form category supplied by the sender (e.g. "info", "alert")
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

impl Notification {
    pub fn new(message: &str) -> Self {
        Self {
            id: None,
            message: message.to_string(),
            kind: None,
        }
    }

    pub fn with_kind(mut self, kind: &str) -> Self {
        self.kind = Some(kind.to_string());
        self
    }

    /// Ensure the notification carries an id, generating one if needed
    pub fn ensure_id(mut self) -> Self {
        if self.id.as_deref().map_or(true, str::is_empty) {
            self.id = Some(Uuid::new_v4().to_string());
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_wire_format() {
        let n: Notification =
            serde_json::from_str(r#"{"message":"Lunch is here","type":"info"}"#).unwrap();
        assert_eq!(n.message, "Lunch is here");
        assert_eq!(n.kind.as_deref(), Some("info"));
        assert!(n.id.is_none());
    }

    #[test]
    fn test_ensure_id_keeps_existing() {
        let mut n = Notification::new("hi");
        n.id = Some("abc".to_string());
        assert_eq!(n.ensure_id().id.as_deref(), Some("abc"));
    }

    #[test]
    fn test_ensure_id_generates_unique() {
        let a = Notification::new("a").ensure_id();
        let b = Notification::new("a").ensure_id();
        assert!(a.id.is_some());
        assert_ne!(a.id, b.id);
    }
}
