//! WebSocket endpoint payee wallets connect to.
//!
//! A connection joins the channel named in the path. Messages published to
//! that channel are written to the socket as JSON text frames; frames read
//! from the socket are decoded as [`Message`] and sent to the hub's inbound
//! stream, where the reply listener matches them to waiting calls.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message as WsMessage, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::response::Response;
use channel_bus::{ChannelHub, ChannelPeer, Message};
use futures::{SinkExt, StreamExt};
use tracing::{debug, info, warn};

use crate::domain::{CorrelationId, ProxyError};
use crate::http::AppState;

/// Limits applied to each wallet connection.
#[derive(Debug, Clone)]
pub struct SocketSettings {
    /// Frames larger than this are dropped.
    pub max_message_bytes: usize,
    /// Disconnect after this long without traffic.
    pub idle_timeout: Duration,
}

impl Default for SocketSettings {
    fn default() -> Self {
        Self {
            max_message_bytes: channel_bus::DEFAULT_MAX_MESSAGE_BYTES,
            idle_timeout: Duration::from_secs(7200),
        }
    }
}

/// `GET /ws/:channelKey`
pub async fn ws_upgrade(
    ws: WebSocketUpgrade,
    Path(channel_key): Path<String>,
    State(state): State<AppState>,
) -> Result<Response, ProxyError> {
    let Some(hub) = state.hub.clone() else {
        return Err(ProxyError::RouteNotFound(format!("/ws/{channel_key}")));
    };
    let settings = state.sockets.clone();

    Ok(ws.on_upgrade(move |socket| async move {
        WalletConnection::new(hub, channel_key, settings)
            .handle(socket)
            .await;
    }))
}

/// One connected wallet.
pub struct WalletConnection {
    hub: Arc<ChannelHub>,
    channel_key: String,
    connection_id: CorrelationId,
    settings: SocketSettings,
}

impl WalletConnection {
    pub fn new(hub: Arc<ChannelHub>, channel_key: String, settings: SocketSettings) -> Self {
        Self {
            hub,
            channel_key,
            connection_id: CorrelationId::new(),
            settings,
        }
    }

    /// Pump frames both ways until either side goes away.
    pub async fn handle(self, socket: WebSocket) {
        let mut peer = self.hub.join(self.channel_key.clone());
        let (mut sink, mut stream) = socket.split();

        info!(
            connection_id = %self.connection_id,
            channel = %self.channel_key,
            "Wallet connected"
        );

        loop {
            tokio::select! {
                outbound = peer.recv() => {
                    let Some(message) = outbound else {
                        debug!(connection_id = %self.connection_id, "Hub closed");
                        break;
                    };
                    let text = match serde_json::to_string(&message) {
                        Ok(text) => text,
                        Err(e) => {
                            warn!(connection_id = %self.connection_id, error = %e, "Failed to encode message");
                            continue;
                        }
                    };
                    if sink.send(WsMessage::Text(text)).await.is_err() {
                        debug!(connection_id = %self.connection_id, "Socket closed while sending");
                        break;
                    }
                }
                inbound = tokio::time::timeout(self.settings.idle_timeout, stream.next()) => {
                    match inbound {
                        Err(_) => {
                            info!(connection_id = %self.connection_id, "Wallet connection idle, closing");
                            break;
                        }
                        Ok(None) | Ok(Some(Ok(WsMessage::Close(_)))) => break,
                        Ok(Some(Err(e))) => {
                            debug!(connection_id = %self.connection_id, error = %e, "WebSocket error");
                            break;
                        }
                        Ok(Some(Ok(WsMessage::Text(text)))) => self.forward(&peer, text.as_bytes()),
                        Ok(Some(Ok(WsMessage::Binary(data)))) => self.forward(&peer, &data),
                        Ok(Some(Ok(_))) => {}
                    }
                }
            }
        }

        let _ = sink.close().await;
        info!(
            connection_id = %self.connection_id,
            channel = %self.channel_key,
            "Wallet disconnected"
        );
    }

    fn forward(&self, peer: &ChannelPeer, frame: &[u8]) {
        let Some(message) = decode_frame(frame, &self.channel_key, self.settings.max_message_bytes)
        else {
            return;
        };
        if let Err(e) = peer.reply(message) {
            warn!(connection_id = %self.connection_id, error = %e, "Failed to forward reply");
        }
    }
}

/// Decode a wallet frame into a reply bound to `channel_key`.
///
/// Oversize and malformed frames are logged and dropped.
pub fn decode_frame(frame: &[u8], channel_key: &str, max_bytes: usize) -> Option<Message> {
    if frame.len() > max_bytes {
        warn!(
            channel = %channel_key,
            size = frame.len(),
            max = max_bytes,
            "Frame exceeds size limit, dropped"
        );
        return None;
    }

    match serde_json::from_slice::<Message>(frame) {
        Ok(mut message) => {
            message.channel_key = channel_key.to_string();
            Some(message)
        }
        Err(e) => {
            warn!(channel = %channel_key, error = %e, "Malformed frame, dropped");
            None
        }
    }
}
