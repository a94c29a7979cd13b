//! Contact ordering and unread aggregate
//!
//! Tracks which contacts have unseen messages (and the messages themselves,
//! for notification previews), and the last-activity time per contact that
//! drives list ordering. Unread state for a contact clears when that
//! conversation becomes the active selection.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::models::{Contact, Message};

/// Contact list plus unread/ordering state.
pub struct Roster {
    user_id: u64,
    contacts: Vec<Contact>,
    /// Unseen messages per contact, deduplicated by message id.
    unread: HashMap<u64, Vec<Message>>,
    /// Most recent message activity per contact (incoming or outgoing).
    last_activity: HashMap<u64, DateTime<Utc>>,
    /// Preview text for the contact list, latest message wins.
    previews: HashMap<u64, String>,
}

impl Roster {
    pub fn new(user_id: u64) -> Self {
        Self {
            user_id,
            contacts: Vec::new(),
            unread: HashMap::new(),
            last_activity: HashMap::new(),
            previews: HashMap::new(),
        }
    }

    /// Replace the contact list from a directory fetch. The current user is
    /// filtered out defensively (the backend is supposed to do it already).
    /// Unread and ordering state survives a refresh.
    pub fn set_contacts(&mut self, contacts: Vec<Contact>) {
        self.contacts = contacts
            .into_iter()
            .filter(|c| c.id != self.user_id)
            .collect();
        for contact in &self.contacts {
            if let Some(preview) = &contact.preview {
                self.previews.entry(contact.id).or_insert_with(|| preview.clone());
            }
        }
    }

    pub fn contact(&self, id: u64) -> Option<&Contact> {
        self.contacts.iter().find(|c| c.id == id)
    }

    pub fn contains(&self, id: u64) -> bool {
        self.contact(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.contacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contacts.is_empty()
    }

    /// Record an incoming message from a contact. When the conversation is
    /// not the active one the message joins the unread aggregate. Returns
    /// `true` if it was recorded as unread.
    pub fn record_incoming(&mut self, msg: &Message, active: bool) -> bool {
        if !self.contains(msg.sender_id) {
            tracing::debug!("Message from unknown contact {} ignored", msg.sender_id);
            return false;
        }

        self.touch(msg.sender_id, msg.sent_at, &msg.content);

        if active {
            return false;
        }

        let entries = self.unread.entry(msg.sender_id).or_default();
        if entries.iter().any(|m| m.id == msg.id) {
            return false;
        }
        entries.push(msg.clone());
        true
    }

    /// An outgoing send also refreshes recency and preview for the contact.
    pub fn note_activity(&mut self, contact_id: u64, at: DateTime<Utc>, preview: &str) {
        self.touch(contact_id, at, preview);
    }

    fn touch(&mut self, contact_id: u64, at: DateTime<Utc>, preview: &str) {
        let entry = self.last_activity.entry(contact_id).or_insert(at);
        if at >= *entry {
            *entry = at;
            self.previews.insert(contact_id, preview.to_string());
        }
    }

    /// The conversation with this contact became the active selection:
    /// clear its unread state and hand back the unseen messages so the
    /// caller can seed the conversation store with them.
    pub fn select(&mut self, contact_id: u64) -> Vec<Message> {
        self.unread.remove(&contact_id).unwrap_or_default()
    }

    pub fn unread_count(&self, contact_id: u64) -> usize {
        self.unread.get(&contact_id).map_or(0, Vec::len)
    }

    pub fn unread_total(&self) -> usize {
        self.unread.values().map(Vec::len).sum()
    }

    pub fn has_unread(&self) -> bool {
        self.unread.values().any(|v| !v.is_empty())
    }

    pub fn preview(&self, contact_id: u64) -> Option<&str> {
        self.previews.get(&contact_id).map(String::as_str)
    }

    /// Contacts ordered by most-recent-activity; contacts with no recorded
    /// activity keep their server order at the end.
    pub fn ordered(&self) -> Vec<&Contact> {
        let mut out: Vec<&Contact> = self.contacts.iter().collect();
        out.sort_by_key(|c| match self.last_activity.get(&c.id) {
            Some(at) => (0u8, std::cmp::Reverse(at.timestamp_millis())),
            None => (1u8, std::cmp::Reverse(0)),
        });
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MessageId;
    use chrono::TimeZone;

    fn contact(id: u64, name: &str) -> Contact {
        Contact {
            id,
            first_name: name.to_string(),
            last_name: String::new(),
            online: false,
            unit_id: 100 + id,
            email: None,
            preview: None,
        }
    }

    fn incoming(id: u64, sender: u64, minute: u32, content: &str) -> Message {
        Message {
            id: MessageId::Server(id),
            sender_id: sender,
            recipient_id: 1,
            content: content.to_string(),
            sent_at: Utc.with_ymd_and_hms(2026, 8, 8, 12, minute, 0).unwrap(),
            read: false,
        }
    }

    fn roster() -> Roster {
        let mut roster = Roster::new(1);
        roster.set_contacts(vec![contact(2, "Fernando"), contact(3, "Monica"), contact(4, "Lorenzo")]);
        roster
    }

    #[test]
    fn test_set_contacts_filters_current_user() {
        let mut roster = Roster::new(1);
        roster.set_contacts(vec![contact(1, "Me"), contact(2, "Fernando")]);
        assert_eq!(roster.len(), 1);
        assert!(!roster.contains(1));
    }

    #[test]
    fn test_record_incoming_tracks_unread_unless_active() {
        let mut roster = roster();

        assert!(roster.record_incoming(&incoming(10, 3, 0, "hola"), false));
        assert_eq!(roster.unread_count(3), 1);

        // The active conversation never accumulates unread state.
        assert!(!roster.record_incoming(&incoming(11, 2, 1, "buenas"), true));
        assert_eq!(roster.unread_count(2), 0);
        assert_eq!(roster.unread_total(), 1);
    }

    #[test]
    fn test_record_incoming_dedups_by_id() {
        let mut roster = roster();
        assert!(roster.record_incoming(&incoming(10, 3, 0, "hola"), false));
        assert!(!roster.record_incoming(&incoming(10, 3, 0, "hola"), false));
        assert_eq!(roster.unread_count(3), 1);
    }

    #[test]
    fn test_unknown_sender_ignored() {
        let mut roster = roster();
        assert!(!roster.record_incoming(&incoming(10, 77, 0, "?"), false));
        assert_eq!(roster.unread_total(), 0);
    }

    #[test]
    fn test_select_clears_and_returns_unseen() {
        let mut roster = roster();
        roster.record_incoming(&incoming(10, 3, 0, "uno"), false);
        roster.record_incoming(&incoming(11, 3, 1, "dos"), false);

        let unseen = roster.select(3);
        assert_eq!(unseen.len(), 2);
        assert_eq!(roster.unread_count(3), 0);
        assert!(!roster.has_unread());
    }

    #[test]
    fn test_ordered_by_recency_then_server_order() {
        let mut roster = roster();
        // No activity yet: server order.
        let ids: Vec<u64> = roster.ordered().iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![2, 3, 4]);

        roster.record_incoming(&incoming(10, 3, 0, "hola"), false);
        roster.note_activity(4, Utc.with_ymd_and_hms(2026, 8, 8, 12, 5, 0).unwrap(), "sent");

        let ids: Vec<u64> = roster.ordered().iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![4, 3, 2]);
    }

    #[test]
    fn test_preview_follows_latest_activity() {
        let mut roster = roster();
        roster.record_incoming(&incoming(10, 3, 0, "primero"), false);
        roster.record_incoming(&incoming(11, 3, 2, "ultimo"), false);
        // An older message must not clobber the newer preview.
        roster.record_incoming(&incoming(9, 3, 1, "viejo"), false);

        assert_eq!(roster.preview(3), Some("ultimo"));
    }
}
