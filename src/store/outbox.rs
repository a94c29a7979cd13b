//! Optimistic send pipeline
//!
//! A send inserts a provisional message into the UI immediately; the outbox
//! remembers it until the backend answers. On success the provisional id is
//! reconciled to the server id, on failure the record is retracted and the
//! draft text restored.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::{ConversationKey, Message, MessageId};

/// One in-flight send awaiting its server response.
#[derive(Debug, Clone)]
pub struct PendingSend {
    pub local_id: Uuid,
    /// Conversation the provisional record was inserted into; responses
    /// route back here even if the user has switched contacts meanwhile.
    pub key: ConversationKey,
    pub content: String,
    pub queued_at: DateTime<Utc>,
}

/// Tracks provisional messages between submit and server response.
#[derive(Default)]
pub struct Outbox {
    pending: HashMap<Uuid, PendingSend>,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the provisional message for a submit and start tracking it.
    pub fn begin(&mut self, key: ConversationKey, content: String) -> Message {
        let msg = Message::provisional(key.user_id, key.contact_id, content.clone());
        let local_id = match msg.id {
            MessageId::Local(u) => u,
            MessageId::Server(_) => unreachable!("provisional ids are always local"),
        };
        self.pending.insert(
            local_id,
            PendingSend {
                local_id,
                key,
                content,
                queued_at: msg.sent_at,
            },
        );
        msg
    }

    /// The backend confirmed the send; stop tracking and hand the entry back
    /// for reconciliation.
    pub fn complete(&mut self, local_id: Uuid) -> Option<PendingSend> {
        self.pending.remove(&local_id)
    }

    /// The send failed; stop tracking and hand the entry back for retraction
    /// (the caller restores the draft from `content`).
    pub fn fail(&mut self, local_id: Uuid) -> Option<PendingSend> {
        self.pending.remove(&local_id)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_begin_creates_tracked_provisional() {
        let mut outbox = Outbox::new();
        let key = ConversationKey::new(1, 2);

        let msg = outbox.begin(key, "hola".to_string());
        assert!(msg.is_pending());
        assert_eq!(msg.sender_id, 1);
        assert_eq!(msg.recipient_id, 2);
        assert_eq!(outbox.len(), 1);
    }

    #[test]
    fn test_complete_returns_entry_once() {
        let mut outbox = Outbox::new();
        let key = ConversationKey::new(1, 2);
        let msg = outbox.begin(key, "hola".to_string());
        let local_id = match msg.id {
            MessageId::Local(u) => u,
            _ => unreachable!(),
        };

        let entry = outbox.complete(local_id).unwrap();
        assert_eq!(entry.key, key);
        assert_eq!(entry.content, "hola");
        assert!(outbox.is_empty());
        assert!(outbox.complete(local_id).is_none());
    }

    #[test]
    fn test_fail_returns_draft_content() {
        let mut outbox = Outbox::new();
        let msg = outbox.begin(ConversationKey::new(1, 2), "draft text".to_string());
        let local_id = match msg.id {
            MessageId::Local(u) => u,
            _ => unreachable!(),
        };

        let entry = outbox.fail(local_id).unwrap();
        assert_eq!(entry.content, "draft text");
    }
}
