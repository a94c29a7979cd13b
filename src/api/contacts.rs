//! Contact directory endpoint

use anyhow::{Context, Result};

use super::client::ChatClient;
use crate::models::Contact;

/// Fetch the contact list and return structured data.
///
/// The backend already excludes the requesting user; we filter again in
/// case an older backend version leaks it.
pub async fn list_contacts_data(client: &ChatClient) -> Result<Vec<Contact>> {
    let user = client.user()?;

    let resp = client
        .get(
            "/api/usuarios/contactos",
            &[("usuario_actual_id", user.id.to_string())],
        )
        .await?;

    let mut contacts: Vec<Contact> = resp
        .json()
        .await
        .context("Failed to parse contacts response")?;

    contacts.retain(|c| c.id != user.id);
    Ok(contacts)
}

/// List contacts (prints to stdout).
pub async fn list_contacts() -> Result<()> {
    let client = ChatClient::new()?;
    let contacts = list_contacts_data(&client).await?;

    println!("\nContacts:");
    println!("{:-<60}", "");

    if contacts.is_empty() {
        println!("  (no contacts found)");
        return Ok(());
    }

    for contact in &contacts {
        let presence = if contact.online { "*" } else { " " };
        println!("{} {}  (id {})", presence, contact.display_name(), contact.id);
        println!("    Unit: {}", contact.unit_id);
        if let Some(ref email) = contact.email {
            println!("    Email: {}", email);
        }
        if let Some(ref preview) = contact.preview {
            if !preview.trim().is_empty() {
                println!("    Last: {}", preview.trim());
            }
        }
        println!();
    }

    Ok(())
}
