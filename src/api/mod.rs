//! API client module for the CondoChat backend

pub mod client;
mod contacts;
mod messages;

use anyhow::Result;

pub use contacts::list_contacts_data;
pub use messages::{fetch_history, mark_read, notify_typing, send_data};

/// List contacts
pub async fn list_contacts() -> Result<()> {
    contacts::list_contacts().await
}

/// Read messages from a conversation
pub async fn read_messages(contact_id: u64, limit: usize) -> Result<()> {
    messages::read_messages(contact_id, limit).await
}

/// Send a message to a contact
pub async fn send_message(contact_id: u64, content: &str) -> Result<()> {
    messages::send_message(contact_id, content).await
}

/// Show the server-side unread count
pub async fn unread() -> Result<()> {
    messages::unread().await
}

/// Send a typing indicator to a contact
pub async fn typing(contact_id: u64) -> Result<()> {
    messages::typing(contact_id).await
}
