//! Channel naming scheme and private-channel authorization
//!
//! Conversation channels are directional: `private-chat.{sender}.{recipient}`.
//! The client keeps one inbound notification channel per contact, and for
//! the active conversation also the outbound direction plus both typing
//! channels. Typing channels mirror the scheme under `private-typing.`.

use std::collections::BTreeSet;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::api::client::ChatClient;

/// Event published on conversation channels when a message is persisted.
pub const MESSAGE_EVENT: &str = "mensaje-enviado";
/// Event published on typing channels.
pub const TYPING_EVENT: &str = "usuario-escribiendo";

const CHAT_PREFIX: &str = "private-chat.";
const TYPING_PREFIX: &str = "private-typing.";

/// Conversation channel carrying messages from `sender_id` to `recipient_id`.
pub fn chat_channel(sender_id: u64, recipient_id: u64) -> String {
    format!("{}{}.{}", CHAT_PREFIX, sender_id, recipient_id)
}

/// Typing-indicator channel from `sender_id` to `recipient_id`.
pub fn typing_channel(sender_id: u64, recipient_id: u64) -> String {
    format!("{}{}.{}", TYPING_PREFIX, sender_id, recipient_id)
}

/// Parse a conversation channel name into its (sender, recipient) pair.
pub fn parse_chat_channel(name: &str) -> Option<(u64, u64)> {
    parse_pair(name.strip_prefix(CHAT_PREFIX)?)
}

/// Parse a typing channel name into its (sender, recipient) pair.
pub fn parse_typing_channel(name: &str) -> Option<(u64, u64)> {
    parse_pair(name.strip_prefix(TYPING_PREFIX)?)
}

fn parse_pair(rest: &str) -> Option<(u64, u64)> {
    let (a, b) = rest.split_once('.')?;
    Some((a.parse().ok()?, b.parse().ok()?))
}

/// Laravel's event name convention may prefix broadcast events with a dot.
pub fn event_matches(event: &str, expected: &str) -> bool {
    event == expected || event.strip_prefix('.') == Some(expected)
}

/// The channel set the client wants to be on: one inbound notification
/// channel per contact, plus both directions (messages and typing) for the
/// active conversation.
pub fn subscription_plan(
    user_id: u64,
    contact_ids: &[u64],
    active: Option<u64>,
) -> BTreeSet<String> {
    let mut plan = BTreeSet::new();

    for &contact_id in contact_ids {
        plan.insert(chat_channel(contact_id, user_id));
    }

    if let Some(contact_id) = active {
        plan.insert(chat_channel(user_id, contact_id));
        plan.insert(typing_channel(contact_id, user_id));
        plan.insert(typing_channel(user_id, contact_id));
    }

    plan
}

/// Channels to subscribe and unsubscribe to move from `current` to `desired`.
pub fn plan_delta(
    current: &BTreeSet<String>,
    desired: &BTreeSet<String>,
) -> (Vec<String>, Vec<String>) {
    let subscribe = desired.difference(current).cloned().collect();
    let unsubscribe = current.difference(desired).cloned().collect();
    (subscribe, unsubscribe)
}

#[derive(Debug, Deserialize)]
struct AuthResponse {
    auth: String,
}

/// Fetch the subscription signature for a private channel.
pub async fn authorize(client: &ChatClient, socket_id: &str, channel: &str) -> Result<String> {
    let body = serde_json::json!({
        "socket_id": socket_id,
        "channel_name": channel,
    });

    let resp = client.post("/broadcasting/auth", &body).await?;
    let auth: AuthResponse = resp
        .json()
        .await
        .with_context(|| format!("Failed to parse channel auth for {}", channel))?;
    Ok(auth.auth)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_names_are_directional() {
        assert_eq!(chat_channel(1, 2), "private-chat.1.2");
        assert_eq!(chat_channel(2, 1), "private-chat.2.1");
        assert_eq!(typing_channel(1, 2), "private-typing.1.2");
    }

    #[test]
    fn test_parse_roundtrip() {
        assert_eq!(parse_chat_channel("private-chat.5.9"), Some((5, 9)));
        assert_eq!(parse_typing_channel("private-typing.5.9"), Some((5, 9)));
        assert_eq!(parse_chat_channel("private-typing.5.9"), None);
        assert_eq!(parse_chat_channel("private-chat.5"), None);
        assert_eq!(parse_chat_channel("private-chat.x.y"), None);
    }

    #[test]
    fn test_event_matches_dotted_convention() {
        assert!(event_matches("mensaje-enviado", MESSAGE_EVENT));
        assert!(event_matches(".mensaje-enviado", MESSAGE_EVENT));
        assert!(!event_matches("otro-evento", MESSAGE_EVENT));
    }

    #[test]
    fn test_plan_covers_contacts_and_active_pair() {
        let plan = subscription_plan(1, &[2, 3], Some(2));

        // One inbound channel per contact.
        assert!(plan.contains("private-chat.2.1"));
        assert!(plan.contains("private-chat.3.1"));
        // Active conversation adds the outbound direction and typing.
        assert!(plan.contains("private-chat.1.2"));
        assert!(plan.contains("private-typing.1.2"));
        assert!(plan.contains("private-typing.2.1"));
        assert_eq!(plan.len(), 5);
    }

    #[test]
    fn test_plan_delta_on_selection_change() {
        let before = subscription_plan(1, &[2, 3], Some(2));
        let after = subscription_plan(1, &[2, 3], Some(3));

        let (subscribe, unsubscribe) = plan_delta(&before, &after);
        // Notification channels stay; only the active-pair extras move.
        assert!(subscribe.contains(&"private-chat.1.3".to_string()));
        assert!(unsubscribe.contains(&"private-chat.1.2".to_string()));
        assert!(!unsubscribe.contains(&"private-chat.2.1".to_string()));
        assert_eq!(subscribe.len(), 3);
        assert_eq!(unsubscribe.len(), 3);
    }
}
