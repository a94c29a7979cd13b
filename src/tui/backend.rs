//! Async backend: bridges the TUI event loop with REST API calls.
//!
//! Uses an mpsc channel pair. The TUI sends `BackendCommand` values, and a
//! background tokio task executes them and sends `BackendResponse` values
//! back.

use std::sync::Arc;

use anyhow::Result;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::api;
use crate::api::client::ChatClient;
use crate::config::Config;
use crate::models::{Contact, ConversationKey, Message};

/// Commands sent from the TUI event loop to the async backend.
pub enum BackendCommand {
    LoadContacts,
    LoadHistory {
        key: ConversationKey,
        unit_id: u64,
    },
    SendMessage {
        local_id: Uuid,
        recipient_id: u64,
        unit_id: u64,
        content: String,
    },
    /// Read receipts, best-effort: failures are logged, not reported back.
    MarkRead {
        message_ids: Vec<u64>,
    },
    /// Typing indicator, best-effort.
    NotifyTyping {
        recipient_id: u64,
        unit_id: u64,
    },
}

/// Responses from the async backend to the TUI.
pub enum BackendResponse {
    Contacts(Result<Vec<Contact>>),
    History {
        key: ConversationKey,
        result: Result<Vec<Message>>,
    },
    /// Outcome of one optimistic send, keyed by its provisional id.
    SendResult {
        local_id: Uuid,
        result: Result<Option<u64>>,
    },
}

/// Handle for interacting with the backend from the TUI side.
pub struct Backend {
    cmd_tx: mpsc::UnboundedSender<BackendCommand>,
    resp_rx: mpsc::UnboundedReceiver<BackendResponse>,
}

impl Backend {
    /// Start the backend. Spawns a tokio task that processes commands.
    pub fn start(config: Config) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (resp_tx, resp_rx) = mpsc::unbounded_channel();

        tokio::spawn(backend_loop(config, cmd_rx, resp_tx));

        Self { cmd_tx, resp_rx }
    }

    /// Send a command to the backend (non-blocking).
    pub fn send(&self, cmd: BackendCommand) {
        if self.cmd_tx.send(cmd).is_err() {
            tracing::error!("Backend channel closed -- command dropped");
        }
    }

    /// Receive a response from the backend.
    ///
    /// Suspends until a response is available. Designed to be used inside
    /// `tokio::select!`.
    pub async fn recv(&mut self) -> Option<BackendResponse> {
        self.resp_rx.recv().await
    }
}

/// Background loop that processes commands.
///
/// Creates a ChatClient once and reuses it across all API calls. Each
/// command runs as its own task so a slow request doesn't block the rest.
async fn backend_loop(
    config: Config,
    mut cmd_rx: mpsc::UnboundedReceiver<BackendCommand>,
    resp_tx: mpsc::UnboundedSender<BackendResponse>,
) {
    let client = Arc::new(ChatClient::with_config(config));

    while let Some(cmd) = cmd_rx.recv().await {
        let client = Arc::clone(&client);
        let resp_tx = resp_tx.clone();

        tokio::spawn(async move {
            match cmd {
                BackendCommand::LoadContacts => {
                    let result = api::list_contacts_data(&client).await;
                    let _ = resp_tx.send(BackendResponse::Contacts(result));
                }
                BackendCommand::LoadHistory { key, unit_id } => {
                    let result = api::fetch_history(&client, key.contact_id, unit_id).await;
                    let _ = resp_tx.send(BackendResponse::History { key, result });
                }
                BackendCommand::SendMessage {
                    local_id,
                    recipient_id,
                    unit_id,
                    content,
                } => {
                    let result = api::send_data(&client, recipient_id, unit_id, &content).await;
                    let _ = resp_tx.send(BackendResponse::SendResult { local_id, result });
                }
                BackendCommand::MarkRead { message_ids } => {
                    for id in message_ids {
                        if let Err(e) = api::mark_read(&client, id).await {
                            tracing::warn!("Read receipt for {} failed: {:#}", id, e);
                        }
                    }
                }
                BackendCommand::NotifyTyping {
                    recipient_id,
                    unit_id,
                } => {
                    if let Err(e) = api::notify_typing(&client, recipient_id, unit_id).await {
                        tracing::debug!("Typing indicator failed: {:#}", e);
                    }
                }
            }
        });
    }
}
