//! Conversation identity

use serde::{Deserialize, Serialize};

/// Identifies the message history between the current user and one contact.
///
/// The pair drives both the live-channel naming scheme (one channel per
/// direction, see `push::channel`) and local cache-key derivation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversationKey {
    pub user_id: u64,
    pub contact_id: u64,
}

impl ConversationKey {
    pub fn new(user_id: u64, contact_id: u64) -> Self {
        Self {
            user_id,
            contact_id,
        }
    }

    /// Key under which this conversation's history is cached locally.
    pub fn cache_key(&self) -> String {
        format!("messages.{}.{}", self.user_id, self.contact_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_key_is_directional() {
        let a = ConversationKey::new(1, 2);
        let b = ConversationKey::new(2, 1);
        assert_eq!(a.cache_key(), "messages.1.2");
        assert_ne!(a.cache_key(), b.cache_key());
    }
}
