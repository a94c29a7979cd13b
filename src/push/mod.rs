//! Echo push client
//!
//! Connects to the Laravel Echo websocket endpoint to receive real-time
//! message and typing events, maintaining the per-contact subscription plan
//! as the active conversation changes.

pub mod channel;
pub mod socket;

use std::collections::BTreeSet;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio::time;

use crate::api::client::ChatClient;
use crate::config::Config;
use crate::models::Message;
use socket::EchoSocket;

/// Events forwarded to the consumer (TUI loop or `listen` command).
#[derive(Debug)]
pub enum PushEvent {
    /// Connection established and the subscription plan applied.
    Connected,
    /// A message event from a conversation channel.
    Message(Message),
    /// A typing indicator from the active conversation's typing channel.
    Typing { sender_id: u64, name: Option<String> },
    /// Connection lost; a reconnect attempt follows.
    Disconnected,
}

/// Control messages from the consumer.
#[derive(Debug)]
pub enum PushControl {
    /// The active conversation changed; re-plan subscriptions.
    SetActive(Option<u64>),
    /// The contact list changed; re-plan subscriptions.
    SetContacts(Vec<u64>),
}

/// Wire payload of a typing event.
#[derive(Debug, Deserialize)]
struct TypingPayload {
    usuario_id: u64,
    #[serde(default)]
    nombre_usuario: Option<String>,
}

/// Subscription inputs that survive reconnects.
struct PlanState {
    user_id: u64,
    contacts: Vec<u64>,
    active: Option<u64>,
}

impl PlanState {
    fn desired(&self) -> BTreeSet<String> {
        channel::subscription_plan(self.user_id, &self.contacts, self.active)
    }
}

/// Reason the inner connection loop exited.
enum DisconnectReason {
    /// Clean shutdown (consumer dropped the control channel). Do not reconnect.
    Shutdown,
    /// Error or server-initiated close. Should reconnect.
    Error(anyhow::Error),
}

/// Run the push connection with automatic reconnection.
///
/// On transient errors or server-initiated disconnects, reconnects with
/// exponential backoff (1s, 2s, 4s, ... capped at 64s). Exits cleanly when
/// the consumer drops the control channel sender.
pub async fn run(
    config: Config,
    contact_ids: Vec<u64>,
    events: mpsc::UnboundedSender<PushEvent>,
    mut ctrl: mpsc::UnboundedReceiver<PushControl>,
) -> Result<()> {
    let user = config.current_user()?;
    let mut state = PlanState {
        user_id: user.id,
        contacts: contact_ids,
        active: None,
    };

    let mut backoff = 1u64;

    loop {
        match run_inner(&config, &mut state, &events, &mut ctrl).await {
            Ok(DisconnectReason::Shutdown) => {
                return Ok(());
            }
            Ok(DisconnectReason::Error(e)) => {
                // Connection was stable (>60s), reset backoff before reconnecting.
                backoff = 1;
                tracing::warn!(
                    "Push disconnected after stable session: {:#}. Reconnecting in 1s...",
                    e,
                );
                let _ = events.send(PushEvent::Disconnected);
                time::sleep(Duration::from_secs(1)).await;
            }
            Err(e) => {
                tracing::warn!("Push disconnected: {:#}. Reconnecting in {}s...", e, backoff);
                let _ = events.send(PushEvent::Disconnected);
                time::sleep(Duration::from_secs(backoff)).await;
                backoff = (backoff * 2).min(64);
            }
        }
    }
}

/// Run one full push session: connect, handshake, subscribe, event loop.
///
/// Returns `DisconnectReason::Shutdown` on clean exit, or
/// `DisconnectReason::Error` when the connection should be retried.
async fn run_inner(
    config: &Config,
    state: &mut PlanState,
    events: &mpsc::UnboundedSender<PushEvent>,
    ctrl: &mut mpsc::UnboundedReceiver<PushControl>,
) -> Result<DisconnectReason> {
    let client = ChatClient::with_config(config.clone());

    // 1. Connect and wait for the handshake (carries socket_id).
    let mut sock = EchoSocket::connect(&config.push_url()).await?;
    let info = sock.wait_established().await?;

    // 2. Subscribe the full plan for this fresh session.
    let mut subscribed = BTreeSet::new();
    apply_plan(&mut sock, &client, &info.socket_id, &mut subscribed, state.desired()).await?;

    if events.send(PushEvent::Connected).is_err() {
        return Ok(DisconnectReason::Shutdown);
    }

    // 3. Event loop: recv frames, keep-alive pings, re-plan on control
    //    messages.
    let connected_at = Instant::now();
    let mut keepalive = time::interval(Duration::from_secs(info.activity_timeout.max(30)));
    keepalive.tick().await; // skip first immediate tick

    // Stability threshold: reset backoff after 60s of successful connection.
    let stability_threshold = Duration::from_secs(60);

    let disconnect_reason = loop {
        tokio::select! {
            frame = sock.recv_frame() => {
                match frame {
                    Ok(Some(frame)) => {
                        if handle_frame(&frame, events).is_err() {
                            break DisconnectReason::Shutdown;
                        }
                    }
                    Ok(None) => {
                        break DisconnectReason::Error(anyhow::anyhow!("WebSocket closed by server"));
                    }
                    Err(e) => {
                        break DisconnectReason::Error(e.context("WebSocket recv error"));
                    }
                }
            }
            _ = keepalive.tick() => {
                if let Err(e) = sock.send_event(socket::EV_PING, serde_json::json!({})).await {
                    break DisconnectReason::Error(e.context("Keep-alive ping failed"));
                }
            }
            msg = ctrl.recv() => {
                match msg {
                    Some(PushControl::SetActive(active)) => {
                        state.active = active;
                    }
                    Some(PushControl::SetContacts(contacts)) => {
                        state.contacts = contacts;
                    }
                    None => {
                        break DisconnectReason::Shutdown;
                    }
                }
                if let Err(e) = apply_plan(&mut sock, &client, &info.socket_id, &mut subscribed, state.desired()).await {
                    break DisconnectReason::Error(e.context("Re-planning subscriptions failed"));
                }
            }
        }
    };

    // If we were connected long enough, signal stability so the caller
    // resets the backoff.
    if connected_at.elapsed() >= stability_threshold {
        return Ok(disconnect_reason);
    }

    match disconnect_reason {
        DisconnectReason::Shutdown => Ok(DisconnectReason::Shutdown),
        DisconnectReason::Error(e) => Err(e),
    }
}

/// Subscribe/unsubscribe the delta between the current set and the plan.
async fn apply_plan(
    sock: &mut EchoSocket,
    client: &ChatClient,
    socket_id: &str,
    subscribed: &mut BTreeSet<String>,
    desired: BTreeSet<String>,
) -> Result<()> {
    let (subscribe, unsubscribe) = channel::plan_delta(subscribed, &desired);

    for name in unsubscribe {
        sock.unsubscribe(&name).await?;
        subscribed.remove(&name);
        tracing::debug!("Unsubscribed from {}", name);
    }

    for name in subscribe {
        let auth = channel::authorize(client, socket_id, &name)
            .await
            .with_context(|| format!("Channel auth for {} failed", name))?;
        sock.subscribe(&name, Some(&auth)).await?;
        subscribed.insert(name.clone());
        tracing::debug!("Subscribed to {}", name);
    }

    Ok(())
}

/// Classify an incoming frame and forward chat traffic to the consumer.
///
/// Returns `Err(())` only when the consumer is gone and the session should
/// shut down.
fn handle_frame(
    frame: &socket::EchoFrame,
    events: &mpsc::UnboundedSender<PushEvent>,
) -> std::result::Result<(), ()> {
    if channel::event_matches(&frame.event, channel::MESSAGE_EVENT) {
        let Some(name) = frame.channel.as_deref() else {
            tracing::warn!("Message event without a channel, dropping");
            return Ok(());
        };
        let Some((sender, recipient)) = channel::parse_chat_channel(name) else {
            tracing::warn!("Message event on non-conversation channel {}", name);
            return Ok(());
        };

        match frame.payload::<Message>() {
            Ok(msg) => {
                if msg.sender_id != sender || msg.recipient_id != recipient {
                    tracing::warn!(
                        "Message {} addressing ({} -> {}) disagrees with channel {}",
                        msg.id,
                        msg.sender_id,
                        msg.recipient_id,
                        name
                    );
                }
                return events.send(PushEvent::Message(msg)).map_err(|_| ());
            }
            Err(e) => {
                tracing::warn!("Unparseable message payload on {}: {:#}", name, e);
                return Ok(());
            }
        }
    }

    if channel::event_matches(&frame.event, channel::TYPING_EVENT) {
        let Some((sender, _)) = frame
            .channel
            .as_deref()
            .and_then(channel::parse_typing_channel)
        else {
            tracing::warn!("Typing event on non-typing channel {:?}", frame.channel);
            return Ok(());
        };

        match frame.payload::<TypingPayload>() {
            Ok(payload) => {
                if payload.usuario_id != sender {
                    tracing::debug!(
                        "Typing payload user {} disagrees with channel sender {}",
                        payload.usuario_id,
                        sender
                    );
                }
                return events
                    .send(PushEvent::Typing {
                        sender_id: payload.usuario_id,
                        name: payload.nombre_usuario,
                    })
                    .map_err(|_| ());
            }
            Err(e) => {
                tracing::warn!("Unparseable typing payload: {:#}", e);
                return Ok(());
            }
        }
    }

    match frame.event.as_str() {
        socket::EV_SUBSCRIBED => {
            tracing::debug!("Subscription confirmed: {:?}", frame.channel);
        }
        socket::EV_ERROR => {
            tracing::warn!(
                "Server error event: {:?}",
                frame.payload::<serde_json::Value>()
            );
        }
        other => {
            tracing::debug!("Unhandled event {} on {:?}", other, frame.channel);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_run_requires_configured_user() {
        let config = Config::default();
        let (ev_tx, _ev_rx) = mpsc::unbounded_channel();
        let (_ctrl_tx, ctrl_rx) = mpsc::unbounded_channel();

        // No user_id configured: the supervisor must bail before connecting.
        let result = run(config, Vec::new(), ev_tx, ctrl_rx).await;
        assert!(result.is_err());
    }
}

/// Connect and print routed events to stdout until Ctrl+C.
pub async fn listen() -> Result<()> {
    let config = Config::load().context("Failed to load config")?;
    let client = ChatClient::with_config(config.clone());
    let user = config.current_user()?;

    let contacts = crate::api::list_contacts_data(&client).await?;
    let contact_ids: Vec<u64> = contacts.iter().map(|c| c.id).collect();

    let (ev_tx, mut ev_rx) = mpsc::unbounded_channel();
    let (_ctrl_tx, ctrl_rx) = mpsc::unbounded_channel();

    let run_fut = run(config, contact_ids, ev_tx, ctrl_rx);
    tokio::pin!(run_fut);

    println!("Listening for events... (Ctrl-C to stop)");

    loop {
        tokio::select! {
            res = &mut run_fut => {
                return res.map_err(|e| e.context("Push connection ended"));
            }
            ev = ev_rx.recv() => {
                match ev {
                    Some(PushEvent::Connected) => println!("[CONNECTED]"),
                    Some(PushEvent::Message(msg)) => {
                        let sender = contacts
                            .iter()
                            .find(|c| c.id == msg.sender_id)
                            .map(|c| c.display_name())
                            .unwrap_or_else(|| format!("user {}", msg.sender_id));
                        let direction = if msg.is_from(user.id) { "sent" } else { "recv" };
                        println!("[MSG {}] {}: {}", direction, sender, msg.content);
                    }
                    Some(PushEvent::Typing { sender_id, name }) => {
                        let name = name.unwrap_or_else(|| format!("user {}", sender_id));
                        println!("[TYPING] {}", name);
                    }
                    Some(PushEvent::Disconnected) => println!("[DISCONNECTED]"),
                    None => break,
                }
            }
            _ = tokio::signal::ctrl_c() => {
                println!("Shutting down...");
                break;
            }
        }
    }

    Ok(())
}
