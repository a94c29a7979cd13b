//! User-related models

use serde::{Deserialize, Serialize};

/// The authenticated user on whose behalf the client operates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentUser {
    pub id: u64,
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    /// Department (apartment unit) id, sent with history and send requests.
    pub unit_id: u64,
}

impl CurrentUser {
    pub fn display_name(&self) -> String {
        if self.last_name.is_empty() {
            self.first_name.clone()
        } else {
            format!("{} {}", self.first_name, self.last_name)
        }
    }
}
