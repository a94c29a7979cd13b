//! Contact-related models

use serde::{Deserialize, Serialize};

/// A contact from the directory: another resident or building staff member.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contact {
    pub id: u64,
    #[serde(rename = "nombre")]
    pub first_name: String,
    #[serde(rename = "apellido", default)]
    pub last_name: String,
    /// Whether the contact currently has an active session.
    #[serde(default)]
    pub online: bool,
    /// Department (apartment unit) the contact belongs to.
    #[serde(rename = "depa", default)]
    pub unit_id: u64,
    #[serde(default)]
    pub email: Option<String>,
    /// Server-provided preview of the last message, if any.
    #[serde(rename = "mensaje", default)]
    pub preview: Option<String>,
}

impl Contact {
    pub fn display_name(&self) -> String {
        if self.last_name.is_empty() {
            self.first_name.clone()
        } else {
            format!("{} {}", self.first_name, self.last_name)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contact_parses_wire_names() {
        let contact: Contact = serde_json::from_str(
            r#"{"id": 3, "nombre": "Lorenzo", "apellido": "Herrera",
                "online": true, "depa": 103, "email": "lorenzo@example.com"}"#,
        )
        .unwrap();
        assert_eq!(contact.id, 3);
        assert_eq!(contact.display_name(), "Lorenzo Herrera");
        assert!(contact.online);
        assert_eq!(contact.unit_id, 103);
    }

    #[test]
    fn test_contact_optional_fields_default() {
        let contact: Contact = serde_json::from_str(r#"{"id": 9, "nombre": "Maria"}"#).unwrap();
        assert_eq!(contact.display_name(), "Maria");
        assert!(!contact.online);
        assert!(contact.email.is_none());
        assert!(contact.preview.is_none());
    }
}
