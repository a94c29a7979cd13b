//! Message-related models
//!
//! Wire field names follow the backend API (`remitente_id`, `contenido`, ...);
//! the Rust-side names are English.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Message identifier.
///
/// The backend assigns numeric ids. Messages created optimistically on send
/// carry a client-generated UUID until the send response (or a push echo)
/// supplies the server id. Both live in one conversation sequence during
/// reconciliation, so they share a type.
///
/// Serialized untagged: numbers parse as `Server`, UUID strings as `Local`
/// (only the local cache ever round-trips a `Local` id).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageId {
    Server(u64),
    Local(Uuid),
}

impl MessageId {
    /// Generate a fresh provisional id for an optimistic send.
    pub fn new_local() -> Self {
        MessageId::Local(Uuid::new_v4())
    }

    pub fn is_local(&self) -> bool {
        matches!(self, MessageId::Local(_))
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MessageId::Server(id) => write!(f, "{}", id),
            MessageId::Local(uuid) => write!(f, "{}", uuid),
        }
    }
}

/// A chat message between the current user and a contact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    #[serde(rename = "remitente_id")]
    pub sender_id: u64,
    #[serde(rename = "destinatario_id")]
    pub recipient_id: u64,
    #[serde(rename = "contenido")]
    pub content: String,
    #[serde(rename = "fecha")]
    pub sent_at: DateTime<Utc>,
    #[serde(rename = "leido", default)]
    pub read: bool,
}

impl Message {
    /// Build the provisional record inserted at send time, before the
    /// backend has confirmed the message.
    pub fn provisional(sender_id: u64, recipient_id: u64, content: String) -> Self {
        Self {
            id: MessageId::new_local(),
            sender_id,
            recipient_id,
            content,
            sent_at: Utc::now(),
            read: false,
        }
    }

    /// Whether this message was sent by the given user.
    pub fn is_from(&self, user_id: u64) -> bool {
        self.sender_id == user_id
    }

    /// Whether this message still carries a provisional (unconfirmed) id.
    pub fn is_pending(&self) -> bool {
        self.id.is_local()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_id_parses_from_number() {
        let msg: Message = serde_json::from_str(
            r#"{"id": 42, "remitente_id": 1, "destinatario_id": 2,
                "contenido": "hola", "fecha": "2026-08-08T10:00:00Z", "leido": true}"#,
        )
        .unwrap();
        assert_eq!(msg.id, MessageId::Server(42));
        assert_eq!(msg.sender_id, 1);
        assert_eq!(msg.recipient_id, 2);
        assert!(msg.read);
    }

    #[test]
    fn test_read_flag_defaults_false() {
        let msg: Message = serde_json::from_str(
            r#"{"id": 7, "remitente_id": 1, "destinatario_id": 2,
                "contenido": "hola", "fecha": "2026-08-08T10:00:00Z"}"#,
        )
        .unwrap();
        assert!(!msg.read);
    }

    #[test]
    fn test_local_id_roundtrip() {
        let msg = Message::provisional(1, 2, "pending".to_string());
        assert!(msg.is_pending());

        let json = serde_json::to_string(&msg).unwrap();
        let back: Message = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id, msg.id);
        assert!(back.is_pending());
    }
}
