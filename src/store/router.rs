//! Live event filtering
//!
//! Classifies pushed messages against the current user, the known contact
//! set, and the active conversation. The subscription side (which channels
//! to be on) lives in `push::channel`; this is the receive-side filter.

use std::collections::HashSet;

use crate::models::{Contact, Message};

/// Where a pushed message should land.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Echo of our own send on the outbound conversation channel. Not
    /// appended directly; the reconcile path owns the optimistic copy and
    /// `ConversationStore::apply_live` dedups by id.
    OwnEcho,
    /// Belongs to the conversation currently on screen.
    Active,
    /// Addressed to us from a contact whose conversation is not open.
    Notification,
    /// Not addressed to us, or from a sender not in the contact list.
    Ignored,
}

/// Receive-side filter for pushed messages.
pub struct EventRouter {
    user_id: u64,
    active_contact: Option<u64>,
    known: HashSet<u64>,
}

impl EventRouter {
    pub fn new(user_id: u64) -> Self {
        Self {
            user_id,
            active_contact: None,
            known: HashSet::new(),
        }
    }

    pub fn set_contacts(&mut self, contacts: &[Contact]) {
        self.known = contacts.iter().map(|c| c.id).collect();
    }

    pub fn set_active(&mut self, contact_id: Option<u64>) {
        self.active_contact = contact_id;
    }

    pub fn active(&self) -> Option<u64> {
        self.active_contact
    }

    pub fn route(&self, msg: &Message) -> Route {
        if msg.sender_id == self.user_id {
            return Route::OwnEcho;
        }
        if msg.recipient_id != self.user_id {
            return Route::Ignored;
        }
        if self.active_contact == Some(msg.sender_id) {
            return Route::Active;
        }
        if self.known.contains(&msg.sender_id) {
            return Route::Notification;
        }
        Route::Ignored
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MessageId;
    use chrono::Utc;

    fn msg(sender: u64, recipient: u64) -> Message {
        Message {
            id: MessageId::Server(1),
            sender_id: sender,
            recipient_id: recipient,
            content: "hola".to_string(),
            sent_at: Utc::now(),
            read: false,
        }
    }

    fn contact(id: u64) -> Contact {
        Contact {
            id,
            first_name: format!("c{}", id),
            last_name: String::new(),
            online: false,
            unit_id: 0,
            email: None,
            preview: None,
        }
    }

    fn router() -> EventRouter {
        let mut r = EventRouter::new(1);
        r.set_contacts(&[contact(2), contact(3)]);
        r
    }

    #[test]
    fn test_own_send_is_echo() {
        let mut r = router();
        r.set_active(Some(2));
        assert_eq!(r.route(&msg(1, 2)), Route::OwnEcho);
    }

    #[test]
    fn test_active_contact_routes_to_open_conversation() {
        let mut r = router();
        r.set_active(Some(2));
        assert_eq!(r.route(&msg(2, 1)), Route::Active);
    }

    #[test]
    fn test_other_contact_routes_to_notification() {
        let mut r = router();
        r.set_active(Some(2));
        assert_eq!(r.route(&msg(3, 1)), Route::Notification);

        // With nothing selected everything lands in notifications.
        r.set_active(None);
        assert_eq!(r.route(&msg(2, 1)), Route::Notification);
    }

    #[test]
    fn test_foreign_traffic_ignored() {
        let r = router();
        // Not addressed to us.
        assert_eq!(r.route(&msg(2, 3)), Route::Ignored);
        // Unknown sender.
        assert_eq!(r.route(&msg(77, 1)), Route::Ignored);
    }
}
