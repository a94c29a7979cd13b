//! Conversation history, send, read-receipt, and typing endpoints

use anyhow::{Context, Result};
use serde::Deserialize;

use super::client::ChatClient;
use super::contacts::list_contacts_data;
use crate::models::{Contact, Message};

/// Send response: the server-assigned id of the persisted message.
#[derive(Debug, Deserialize)]
struct SendResponse {
    id: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct UnreadResponse {
    unread_count: u64,
}

/// Fetch the full history of one conversation, oldest first.
pub async fn fetch_history(
    client: &ChatClient,
    contact_id: u64,
    unit_id: u64,
) -> Result<Vec<Message>> {
    let resp = client
        .get(
            "/api/chat/messages",
            &[
                ("id_depa", unit_id.to_string()),
                ("contacto_id", contact_id.to_string()),
            ],
        )
        .await?;

    resp.json().await.context("Failed to parse messages response")
}

/// Persist a message on the backend. Returns the server-assigned id, or
/// `None` if the backend answered success without one.
pub async fn send_data(
    client: &ChatClient,
    recipient_id: u64,
    unit_id: u64,
    content: &str,
) -> Result<Option<u64>> {
    let user = client.user()?;
    let body = serde_json::json!({
        "remitente_id": user.id,
        "destinatario_id": recipient_id,
        "id_depa": unit_id,
        "contenido": content,
        "tipo": "personal",
    });

    let resp = client.post("/api/chat/send", &body).await?;
    let receipt: SendResponse = resp.json().await.context("Failed to parse send response")?;
    if receipt.id.is_none() {
        tracing::warn!("Send succeeded but the backend returned no message id");
    }
    Ok(receipt.id)
}

/// Mark one message read on the backend.
pub async fn mark_read(client: &ChatClient, message_id: u64) -> Result<()> {
    client
        .put(&format!("/api/chat/{}/read", message_id))
        .await?;
    Ok(())
}

/// Server-side unread count for the current user.
pub async fn unread_count_data(client: &ChatClient) -> Result<u64> {
    let user = client.user()?;
    let resp = client
        .get(
            &format!("/api/chat/{}/unread", user.id),
            &[("id_depa", user.unit_id.to_string())],
        )
        .await?;

    let body: UnreadResponse = resp.json().await.context("Failed to parse unread response")?;
    Ok(body.unread_count)
}

/// Broadcast a typing indicator toward a contact. Best-effort on the UI
/// path; callers decide whether the error matters.
pub async fn notify_typing(client: &ChatClient, recipient_id: u64, unit_id: u64) -> Result<()> {
    let user = client.user()?;
    let body = serde_json::json!({
        "usuario_id": user.id,
        "destinatario_id": recipient_id,
        "id_depa": unit_id,
        "nombre_usuario": user.display_name(),
    });
    client.post("/api/chat/typing", &body).await?;
    Ok(())
}

/// Find a contact by id, fetching the directory.
async fn resolve_contact(client: &ChatClient, contact_id: u64) -> Result<Contact> {
    let contacts = list_contacts_data(client).await?;
    contacts
        .into_iter()
        .find(|c| c.id == contact_id)
        .with_context(|| format!("No contact with id {}", contact_id))
}

/// Read messages from a conversation (prints to stdout).
pub async fn read_messages(contact_id: u64, limit: usize) -> Result<()> {
    let client = ChatClient::new()?;
    let user = client.user()?;
    let contact = resolve_contact(&client, contact_id).await?;
    let history = fetch_history(&client, contact.id, contact.unit_id).await?;

    if history.is_empty() {
        println!("(no messages)");
        return Ok(());
    }

    let skip = history.len().saturating_sub(limit);
    for msg in &history[skip..] {
        let sender = if msg.is_from(user.id) {
            "me".to_string()
        } else {
            contact.display_name()
        };
        let time = msg.sent_at.format("%Y-%m-%d %H:%M");
        println!("[{}] {}: {}", time, sender, msg.content);
    }

    Ok(())
}

/// Send a message to a contact (prints to stdout).
pub async fn send_message(contact_id: u64, content: &str) -> Result<()> {
    let client = ChatClient::new()?;
    let contact = resolve_contact(&client, contact_id).await?;

    match send_data(&client, contact.id, contact.unit_id, content).await? {
        Some(id) => println!("Message sent (id {}).", id),
        None => println!("Message sent."),
    }
    Ok(())
}

/// Show the server-side unread count (prints to stdout).
pub async fn unread() -> Result<()> {
    let client = ChatClient::new()?;
    let count = unread_count_data(&client).await?;
    println!("{} unread message(s)", count);
    Ok(())
}

/// Send a typing indicator (prints to stdout).
pub async fn typing(contact_id: u64) -> Result<()> {
    let client = ChatClient::new()?;
    let contact = resolve_contact(&client, contact_id).await?;
    notify_typing(&client, contact.id, contact.unit_id).await?;
    println!("Typing indicator sent.");
    Ok(())
}
