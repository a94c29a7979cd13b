//! Echo WebSocket connection and frame handling
//!
//! Speaks the Pusher wire protocol (version 7) the Laravel Echo server
//! publishes on: JSON frames with `event`, optional `channel`, and a `data`
//! payload that is usually a string of JSON rather than inline JSON.

use anyhow::{Context, Result};
use futures::{SinkExt, StreamExt};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tokio_tungstenite::{connect_async, tungstenite::Message};

type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

pub const EV_ESTABLISHED: &str = "pusher:connection_established";
pub const EV_PING: &str = "pusher:ping";
pub const EV_PONG: &str = "pusher:pong";
pub const EV_ERROR: &str = "pusher:error";
pub const EV_SUBSCRIBE: &str = "pusher:subscribe";
pub const EV_UNSUBSCRIBE: &str = "pusher:unsubscribe";
pub const EV_SUBSCRIBED: &str = "pusher_internal:subscription_succeeded";

/// One parsed frame from the server.
#[derive(Debug, Clone, Deserialize)]
pub struct EchoFrame {
    pub event: String,
    #[serde(default)]
    pub channel: Option<String>,
    #[serde(default)]
    data: serde_json::Value,
}

impl EchoFrame {
    /// Decode the payload. Pusher double-encodes `data` as a JSON string;
    /// some servers inline it. Accept both.
    pub fn payload<T: DeserializeOwned>(&self) -> Result<T> {
        match &self.data {
            serde_json::Value::String(raw) => {
                serde_json::from_str(raw).context("Failed to parse string-encoded event payload")
            }
            other => serde_json::from_value(other.clone())
                .context("Failed to parse inline event payload"),
        }
    }
}

/// Payload of `pusher:connection_established`.
#[derive(Debug, Deserialize)]
pub struct ConnectionEstablished {
    pub socket_id: String,
    #[serde(default = "default_activity_timeout")]
    pub activity_timeout: u64,
}

fn default_activity_timeout() -> u64 {
    120
}

pub struct EchoSocket {
    stream: WsStream,
}

impl EchoSocket {
    /// Connect to the Echo websocket endpoint.
    ///
    /// The app key in the URL path is the only connection-level auth;
    /// private channels authenticate per-subscription.
    pub async fn connect(ws_url: &str) -> Result<Self> {
        tracing::info!("Connecting WebSocket to {}", ws_url);

        let (stream, response) = connect_async(ws_url)
            .await
            .context("WebSocket connection failed")?;

        tracing::info!("WebSocket connected (status={})", response.status());

        Ok(Self { stream })
    }

    /// Send one protocol event.
    pub async fn send_event(&mut self, event: &str, data: serde_json::Value) -> Result<()> {
        let frame = serde_json::json!({ "event": event, "data": data }).to_string();
        tracing::debug!("WS send: {}", frame);
        self.stream
            .send(Message::Text(frame))
            .await
            .context("Failed to send WebSocket message")
    }

    /// Subscribe to a channel. Private channels carry the signature from
    /// the authorization endpoint.
    pub async fn subscribe(&mut self, channel: &str, auth: Option<&str>) -> Result<()> {
        let data = match auth {
            Some(auth) => serde_json::json!({ "channel": channel, "auth": auth }),
            None => serde_json::json!({ "channel": channel }),
        };
        self.send_event(EV_SUBSCRIBE, data).await
    }

    pub async fn unsubscribe(&mut self, channel: &str) -> Result<()> {
        self.send_event(EV_UNSUBSCRIBE, serde_json::json!({ "channel": channel }))
            .await
    }

    /// Receive the next protocol frame, ignoring transport noise.
    ///
    /// Transport pings and `pusher:ping` events are answered automatically;
    /// without the pong the server drops the connection at its activity
    /// timeout. Returns `None` when the server closes the socket.
    pub async fn recv_frame(&mut self) -> Result<Option<EchoFrame>> {
        loop {
            match self.stream.next().await {
                Some(Ok(Message::Text(text))) => {
                    tracing::debug!("WS recv: {}", text);

                    let frame: EchoFrame = match serde_json::from_str(&text) {
                        Ok(frame) => frame,
                        Err(e) => {
                            tracing::warn!("Unparseable frame ({}): {}", e, text);
                            continue;
                        }
                    };

                    if frame.event == EV_PING {
                        self.send_event(EV_PONG, serde_json::json!({})).await?;
                        continue;
                    }
                    if frame.event == EV_PONG {
                        tracing::debug!("Pong from server");
                        continue;
                    }

                    return Ok(Some(frame));
                }
                Some(Ok(Message::Ping(data))) => {
                    self.stream
                        .send(Message::Pong(data))
                        .await
                        .context("Failed to send pong")?;
                }
                Some(Ok(Message::Close(frame))) => {
                    tracing::info!("WebSocket closed: {:?}", frame);
                    return Ok(None);
                }
                Some(Ok(other)) => {
                    tracing::debug!("WS frame (ignored): {:?}", other);
                }
                Some(Err(e)) => {
                    return Err(e).context("WebSocket receive error");
                }
                None => {
                    return Ok(None);
                }
            }
        }
    }

    /// Wait for the `pusher:connection_established` handshake.
    pub async fn wait_established(&mut self) -> Result<ConnectionEstablished> {
        loop {
            let frame = self
                .recv_frame()
                .await?
                .context("Connection closed before handshake")?;

            match frame.event.as_str() {
                EV_ESTABLISHED => {
                    let info: ConnectionEstablished = frame.payload()?;
                    tracing::info!(
                        "Echo connection established (socket_id={}, activity_timeout={}s)",
                        info.socket_id,
                        info.activity_timeout
                    );
                    return Ok(info);
                }
                EV_ERROR => {
                    anyhow::bail!("Server rejected connection: {:?}", frame.payload::<serde_json::Value>());
                }
                other => {
                    tracing::warn!("Expected {}, got: {}", EV_ESTABLISHED, other);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_payload_string_encoded() {
        let frame: EchoFrame = serde_json::from_str(
            r#"{"event":"pusher:connection_established",
                "data":"{\"socket_id\":\"218.32\",\"activity_timeout\":120}"}"#,
        )
        .unwrap();

        let info: ConnectionEstablished = frame.payload().unwrap();
        assert_eq!(info.socket_id, "218.32");
        assert_eq!(info.activity_timeout, 120);
    }

    #[test]
    fn test_frame_payload_inline_json() {
        let frame: EchoFrame = serde_json::from_str(
            r#"{"event":"mensaje-enviado","channel":"private-chat.2.1",
                "data":{"id":5,"remitente_id":2,"destinatario_id":1,
                        "contenido":"hola","fecha":"2026-08-08T10:00:00Z"}}"#,
        )
        .unwrap();

        assert_eq!(frame.channel.as_deref(), Some("private-chat.2.1"));
        let msg: crate::models::Message = frame.payload().unwrap();
        assert_eq!(msg.sender_id, 2);
        assert_eq!(msg.content, "hola");
    }

    #[test]
    fn test_activity_timeout_defaults() {
        let frame: EchoFrame = serde_json::from_str(
            r#"{"event":"pusher:connection_established","data":"{\"socket_id\":\"1.1\"}"}"#,
        )
        .unwrap();
        let info: ConnectionEstablished = frame.payload().unwrap();
        assert_eq!(info.activity_timeout, 120);
    }
}
