//! Playback state stream over WebSocket.
//!
//! The server pushes the playback state on connect and after every change.
//! Clients may send JSON commands (`{"action": "play"}`,
//! `{"action": "select", "index": 3}`, ...) on the same socket.

use std::sync::atomic::{AtomicI64, Ordering};
use std::time::{Duration, Instant};

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use motion_studio::{PlaybackDriver, PlaybackError, PlaybackState};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::time::interval;
use tracing::{debug, info, warn};

use crate::metrics;
use crate::state::AppState;

/// Global counter for active WebSocket connections.
static ACTIVE_WS_CONNECTIONS: AtomicI64 = AtomicI64::new(0);

const WS_SEND_BUFFER_SIZE: usize = 32;
const WS_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);
const WS_CLIENT_TIMEOUT: Duration = Duration::from_secs(90);

/// Messages sent to the client.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PlaybackMessage {
    State(PlaybackState),
    Error { message: String },
}

/// Commands accepted from the client.
#[derive(Debug, Deserialize, PartialEq, Eq)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum PlaybackCommand {
    Play,
    Pause,
    Toggle,
    Next,
    Previous,
    Select { index: usize },
    SetRate { fps: u32 },
}

impl PlaybackCommand {
    /// Apply the command; the resulting state reaches the client through
    /// the watch channel.
    fn apply(self, playback: &PlaybackDriver) -> Result<(), PlaybackError> {
        match self {
            PlaybackCommand::Play => {
                playback.play();
            }
            PlaybackCommand::Pause => {
                playback.pause();
            }
            PlaybackCommand::Toggle => {
                playback.toggle();
            }
            PlaybackCommand::Next => {
                playback.next();
            }
            PlaybackCommand::Previous => {
                playback.previous();
            }
            PlaybackCommand::Select { index } => {
                playback.select(index)?;
            }
            PlaybackCommand::SetRate { fps } => {
                playback.set_rate(fps)?;
            }
        }
        Ok(())
    }
}

/// Send a WebSocket message with backpressure handling.
async fn send_ws_message(tx: &mpsc::Sender<Message>, msg: &PlaybackMessage) -> bool {
    let json = match serde_json::to_string(msg) {
        Ok(j) => j,
        Err(_) => return false,
    };
    match tx.try_send(Message::Text(json)) {
        Ok(_) => {
            metrics::record_ws_message_sent("playback");
            true
        }
        Err(mpsc::error::TrySendError::Full(message)) => {
            debug!("WebSocket send buffer full, applying backpressure");
            let sent = tx.send(message).await.is_ok();
            if sent {
                metrics::record_ws_message_sent("playback");
            }
            sent
        }
        Err(mpsc::error::TrySendError::Closed(_)) => false,
    }
}

/// Playback stream endpoint.
pub async fn ws_playback(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    let count = ACTIVE_WS_CONNECTIONS.fetch_add(1, Ordering::SeqCst) + 1;
    metrics::set_ws_active_connections(count);
    metrics::record_ws_connection("playback");

    ws.on_upgrade(|socket| async move {
        handle_playback_socket(socket, state).await;
        let count = ACTIVE_WS_CONNECTIONS.fetch_sub(1, Ordering::SeqCst) - 1;
        metrics::set_ws_active_connections(count);
    })
}

async fn handle_playback_socket(socket: WebSocket, state: AppState) {
    let (ws_sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::channel::<Message>(WS_SEND_BUFFER_SIZE);

    let send_task = tokio::spawn(async move {
        let mut ws_sender = ws_sender;
        while let Some(msg) = rx.recv().await {
            if ws_sender.send(msg).await.is_err() {
                break;
            }
        }
    });

    let playback = state.studio.playback();
    let mut updates = playback.subscribe();
    let mut heartbeat = interval(WS_HEARTBEAT_INTERVAL);
    let mut last_seen = Instant::now();

    info!("Playback stream connected");

    let initial = PlaybackMessage::State(*updates.borrow_and_update());
    if !send_ws_message(&tx, &initial).await {
        drop(tx);
        let _ = send_task.await;
        return;
    }

    loop {
        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = *updates.borrow_and_update();
                if !send_ws_message(&tx, &PlaybackMessage::State(snapshot)).await {
                    break;
                }
            }
            incoming = receiver.next() => {
                let Some(Ok(message)) = incoming else {
                    break;
                };
                last_seen = Instant::now();
                match message {
                    Message::Text(text) => {
                        let outcome = serde_json::from_str::<PlaybackCommand>(&text)
                            .map_err(|e| format!("Invalid command: {}", e))
                            .and_then(|command| command.apply(playback).map_err(|e| e.to_string()));
                        if let Err(message) = outcome {
                            if !send_ws_message(&tx, &PlaybackMessage::Error { message }).await {
                                break;
                            }
                        }
                    }
                    Message::Close(_) => break,
                    _ => {}
                }
            }
            _ = heartbeat.tick() => {
                if last_seen.elapsed() > WS_CLIENT_TIMEOUT {
                    warn!("Playback stream client timed out");
                    break;
                }
                if tx.send(Message::Ping(Vec::new())).await.is_err() {
                    break;
                }
            }
        }
    }

    drop(tx);
    let _ = send_task.await;
    info!("Playback stream disconnected");
}
