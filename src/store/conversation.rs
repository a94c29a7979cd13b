//! Per-conversation message store
//!
//! Holds the ordered message sequence for one (user, contact) pair and
//! reconciles the three sources that feed it: server-fetched history,
//! locally cached history, and live push events. Deduplication is by
//! message id; after reconciliation the sequence never holds two records
//! with the same id.

use std::collections::HashSet;

use uuid::Uuid;

use crate::models::{ConversationKey, Message, MessageId};

/// Outcome of reconciling a provisional message with its server id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconcile {
    /// The provisional record now carries the server id.
    Confirmed,
    /// The push echo already delivered the server copy; the provisional
    /// record was dropped to keep ids unique.
    DroppedDuplicate,
    /// No provisional record with that id exists (already reconciled or
    /// retracted).
    UnknownLocal,
}

/// Ordered, deduplicated message sequence for one conversation.
pub struct ConversationStore {
    key: ConversationKey,
    messages: Vec<Message>,
    ids: HashSet<MessageId>,
}

/// Sort rank: timestamp first, then server ids ascending, then provisional
/// records (stable sort keeps those in insertion order).
fn sort_key(msg: &Message) -> (chrono::DateTime<chrono::Utc>, u8, u64) {
    match msg.id {
        MessageId::Server(n) => (msg.sent_at, 0, n),
        MessageId::Local(_) => (msg.sent_at, 1, 0),
    }
}

impl ConversationStore {
    pub fn new(key: ConversationKey) -> Self {
        Self {
            key,
            messages: Vec::new(),
            ids: HashSet::new(),
        }
    }

    pub fn key(&self) -> ConversationKey {
        self.key
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn contains(&self, id: MessageId) -> bool {
        self.ids.contains(&id)
    }

    /// Merge a server-fetched history page. Returns how many records were new.
    pub fn merge_history(&mut self, batch: Vec<Message>) -> usize {
        self.merge_batch(batch)
    }

    /// Merge the locally cached copy of the history. Same semantics as
    /// `merge_history`; kept separate so call sites read as what they are.
    pub fn merge_cached(&mut self, batch: Vec<Message>) -> usize {
        self.merge_batch(batch)
    }

    fn merge_batch(&mut self, batch: Vec<Message>) -> usize {
        let mut added = 0;
        for msg in batch {
            if self.ids.insert(msg.id) {
                self.messages.push(msg);
                added += 1;
            }
        }
        if added > 0 {
            self.messages.sort_by_key(sort_key);
        }
        added
    }

    /// Append a live-pushed message. Returns `false` for a duplicate so the
    /// caller can skip cache writes. Out-of-order arrivals are placed by
    /// timestamp rather than appended.
    pub fn apply_live(&mut self, msg: Message) -> bool {
        if !self.ids.insert(msg.id) {
            tracing::debug!("Duplicate live message {} ignored", msg.id);
            return false;
        }

        let in_order = self
            .messages
            .last()
            .map_or(true, |last| sort_key(last) <= sort_key(&msg));
        self.messages.push(msg);
        if !in_order {
            self.messages.sort_by_key(sort_key);
        }
        true
    }

    /// Insert the optimistic record created at send time.
    pub fn insert_provisional(&mut self, msg: Message) {
        debug_assert!(msg.id.is_local());
        if self.ids.insert(msg.id) {
            self.messages.push(msg);
        }
    }

    /// Swap a provisional id for the server-assigned one from the send
    /// response. If the push echo already delivered the server copy, the
    /// provisional record is removed instead.
    pub fn reconcile(&mut self, local_id: Uuid, server_id: u64) -> Reconcile {
        let local = MessageId::Local(local_id);
        if !self.contains(local) {
            return Reconcile::UnknownLocal;
        }

        let server = MessageId::Server(server_id);
        if self.contains(server) {
            self.remove(local);
            return Reconcile::DroppedDuplicate;
        }

        if let Some(msg) = self.messages.iter_mut().find(|m| m.id == local) {
            msg.id = server;
            self.ids.remove(&local);
            self.ids.insert(server);
            // The id class changed, which can move the record among equal
            // timestamps.
            self.messages.sort_by_key(sort_key);
        }
        Reconcile::Confirmed
    }

    /// Remove a provisional message after a failed send. Returns the removed
    /// record so the caller can restore the draft text.
    pub fn retract(&mut self, local_id: Uuid) -> Option<Message> {
        self.remove(MessageId::Local(local_id))
    }

    fn remove(&mut self, id: MessageId) -> Option<Message> {
        if !self.ids.remove(&id) {
            return None;
        }
        let pos = self.messages.iter().position(|m| m.id == id)?;
        Some(self.messages.remove(pos))
    }

    /// Server ids of received messages not yet marked read, for sending
    /// read receipts.
    pub fn unread_received_ids(&self, reader_id: u64) -> Vec<u64> {
        self.messages
            .iter()
            .filter(|m| !m.read && m.recipient_id == reader_id)
            .filter_map(|m| match m.id {
                MessageId::Server(n) => Some(n),
                MessageId::Local(_) => None,
            })
            .collect()
    }

    /// Flip the read flag on received messages, after receipts were sent.
    pub fn mark_received_read(&mut self, reader_id: u64) {
        for msg in &mut self.messages {
            if msg.recipient_id == reader_id {
                msg.read = true;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn key() -> ConversationKey {
        ConversationKey::new(1, 2)
    }

    fn server_msg(id: u64, sender: u64, recipient: u64, minute: u32) -> Message {
        Message {
            id: MessageId::Server(id),
            sender_id: sender,
            recipient_id: recipient,
            content: format!("msg {}", id),
            sent_at: Utc.with_ymd_and_hms(2026, 8, 8, 10, minute, 0).unwrap(),
            read: false,
        }
    }

    #[test]
    fn test_merge_history_dedups_and_orders() {
        let mut store = ConversationStore::new(key());

        store.merge_cached(vec![server_msg(10, 2, 1, 0), server_msg(11, 1, 2, 1)]);
        // Server page overlaps the cache and adds one newer message.
        let added = store.merge_history(vec![
            server_msg(11, 1, 2, 1),
            server_msg(12, 2, 1, 2),
            server_msg(10, 2, 1, 0),
        ]);

        assert_eq!(added, 1);
        assert_eq!(store.len(), 3);
        let ids: Vec<_> = store.messages().iter().map(|m| m.id).collect();
        assert_eq!(
            ids,
            vec![
                MessageId::Server(10),
                MessageId::Server(11),
                MessageId::Server(12)
            ]
        );
    }

    #[test]
    fn test_merge_empty_batch_is_noop() {
        let mut store = ConversationStore::new(key());
        store.merge_history(vec![server_msg(1, 2, 1, 0)]);
        assert_eq!(store.merge_history(Vec::new()), 0);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_apply_live_rejects_duplicate() {
        let mut store = ConversationStore::new(key());
        assert!(store.apply_live(server_msg(5, 2, 1, 0)));
        assert!(!store.apply_live(server_msg(5, 2, 1, 0)));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_apply_live_out_of_order_inserts_by_timestamp() {
        let mut store = ConversationStore::new(key());
        store.apply_live(server_msg(6, 2, 1, 5));
        store.apply_live(server_msg(4, 2, 1, 2));

        let ids: Vec<_> = store.messages().iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![MessageId::Server(4), MessageId::Server(6)]);
    }

    #[test]
    fn test_reconcile_swaps_provisional_id() {
        let mut store = ConversationStore::new(key());
        let msg = Message::provisional(1, 2, "hola".to_string());
        let local_id = match msg.id {
            MessageId::Local(u) => u,
            _ => unreachable!(),
        };
        store.insert_provisional(msg);

        assert_eq!(store.reconcile(local_id, 99), Reconcile::Confirmed);
        assert_eq!(store.len(), 1);
        assert!(store.contains(MessageId::Server(99)));
        assert!(!store.contains(MessageId::Local(local_id)));
    }

    #[test]
    fn test_reconcile_drops_provisional_when_echo_won() {
        let mut store = ConversationStore::new(key());
        let msg = Message::provisional(1, 2, "hola".to_string());
        let local_id = match msg.id {
            MessageId::Local(u) => u,
            _ => unreachable!(),
        };
        store.insert_provisional(msg);

        // The push echo of our own send arrives before the POST response.
        store.apply_live(server_msg(99, 1, 2, 0));
        assert_eq!(store.len(), 2);

        assert_eq!(store.reconcile(local_id, 99), Reconcile::DroppedDuplicate);
        assert_eq!(store.len(), 1);
        assert!(store.contains(MessageId::Server(99)));
    }

    #[test]
    fn test_reconcile_unknown_local_is_noop() {
        let mut store = ConversationStore::new(key());
        assert_eq!(
            store.reconcile(Uuid::new_v4(), 1),
            Reconcile::UnknownLocal
        );
    }

    #[test]
    fn test_retract_removes_provisional() {
        let mut store = ConversationStore::new(key());
        let msg = Message::provisional(1, 2, "draft".to_string());
        let local_id = match msg.id {
            MessageId::Local(u) => u,
            _ => unreachable!(),
        };
        store.insert_provisional(msg);

        let removed = store.retract(local_id).unwrap();
        assert_eq!(removed.content, "draft");
        assert!(store.is_empty());

        // Second retract finds nothing.
        assert!(store.retract(local_id).is_none());
    }

    #[test]
    fn test_unread_received_ids_skips_own_and_pending() {
        let mut store = ConversationStore::new(key());
        store.merge_history(vec![server_msg(1, 2, 1, 0), server_msg(2, 1, 2, 1)]);
        store.insert_provisional(Message::provisional(1, 2, "x".to_string()));

        assert_eq!(store.unread_received_ids(1), vec![1]);

        store.mark_received_read(1);
        assert!(store.unread_received_ids(1).is_empty());
    }
}
