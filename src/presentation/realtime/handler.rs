//! Realtime Connection Handler
//!
//! One task per socket. Subscriptions are forwarded into a bounded
//! per-connection queue that a writer task drains onto the socket. A client
//! that stops reading loses frames instead of growing the queue.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use tokio::sync::{broadcast, mpsc};
use tokio::time::interval;
use uuid::Uuid;

use super::gateway::{channel_access, ChannelAccess, ChannelEvent, Gateway};
use super::messages::{ClientMessage, ServerMessage};
use super::session::SessionState;
use crate::domain::UserRepository;
use crate::infrastructure::repositories::PgUserRepository;
use crate::startup::AppState;

type Outbox = mpsc::Sender<ServerMessage>;

/// WebSocket upgrade handler for `GET /realtime`
pub async fn realtime_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.max_message_size(state.gateway.max_message_size())
        .on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let gateway = state.gateway.clone();
    let mut session = SessionState::new(Uuid::new_v4().to_string());
    let session_id = session.session_id.clone();

    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::channel::<ServerMessage>(gateway.outbox_capacity());

    let writer = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            let text = match serde_json::to_string(&msg) {
                Ok(t) => t,
                Err(e) => {
                    tracing::error!("Failed to serialize realtime message: {}", e);
                    continue;
                }
            };
            if sender.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    gateway.connection_opened();
    tracing::debug!(session_id = %session_id, "Realtime connection opened");

    queue(
        &tx,
        ServerMessage::Hello {
            heartbeat_interval: gateway.heartbeat_interval(),
        },
        &session_id,
    );

    let timeout_ms = gateway.heartbeat_timeout();
    let mut heartbeat_check = interval(Duration::from_millis(gateway.heartbeat_interval().max(1)));
    heartbeat_check.tick().await;

    loop {
        tokio::select! {
            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        handle_message(&text, &mut session, &tx, &state).await;
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        tracing::debug!(session_id = %session_id, "Connection closed");
                        break;
                    }
                    Some(Err(e)) => {
                        tracing::debug!(session_id = %session_id, error = %e, "WebSocket error");
                        break;
                    }
                    _ => {}
                }
            }

            _ = heartbeat_check.tick() => {
                if !session.is_alive(timeout_ms) {
                    tracing::info!(session_id = %session_id, "Heartbeat timeout, closing connection");
                    break;
                }
            }
        }
    }

    session.clear();
    writer.abort();
    gateway.connection_closed();

    tracing::debug!(
        session_id = %session_id,
        user_id = ?session.user_id,
        "Realtime connection closed"
    );
}

async fn handle_message(text: &str, session: &mut SessionState, tx: &Outbox, state: &AppState) {
    let message = match serde_json::from_str::<ClientMessage>(text) {
        Ok(message) => message,
        Err(e) => {
            tracing::debug!(session_id = %session.session_id, error = %e, "Unreadable frame");
            queue(tx, ServerMessage::error("Invalid message"), &session.session_id);
            return;
        }
    };

    match message {
        ClientMessage::Heartbeat => {
            session.heartbeat();
            queue(tx, ServerMessage::HeartbeatAck, &session.session_id);
        }
        ClientMessage::Identify { token } => match identify(&token, state).await {
            Some(user_id) => {
                if session.user_id != Some(user_id) {
                    let dropped = session.remove_where(|channel| {
                        matches!(channel_access(channel), Some(ChannelAccess::Owner(_)))
                    });
                    for channel in dropped {
                        queue(tx, ServerMessage::Unsubscribed { channel }, &session.session_id);
                    }
                }
                session.user_id = Some(user_id);
                tracing::debug!(session_id = %session.session_id, user_id, "Realtime client identified");
                queue(
                    tx,
                    ServerMessage::Identified {
                        user_id: user_id.to_string(),
                    },
                    &session.session_id,
                );
            }
            None => {
                queue(tx, ServerMessage::error("Invalid token"), &session.session_id);
            }
        },
        ClientMessage::Subscribe { channel } => {
            let reply = subscribe(session, &state.gateway, tx, channel);
            queue(tx, reply, &session.session_id);
        }
        ClientMessage::Unsubscribe { channel } => {
            session.remove_subscription(&channel);
            queue(tx, ServerMessage::Unsubscribed { channel }, &session.session_id);
        }
    }
}

/// Queue a frame without waiting. A full outbox drops the frame with a
/// warning. Returns false once the writer is gone.
fn queue(tx: &Outbox, message: ServerMessage, session_id: &str) -> bool {
    match tx.try_send(message) {
        Ok(()) => true,
        Err(mpsc::error::TrySendError::Full(_)) => {
            tracing::warn!(session_id = %session_id, "Realtime outbox full, dropping frame");
            true
        }
        Err(mpsc::error::TrySendError::Closed(_)) => false,
    }
}

/// Resolve a token to an existing user id.
async fn identify(token: &str, state: &AppState) -> Option<i64> {
    let user_id = state.tokens.verify(token).ok()?;
    match PgUserRepository::new(state.db.clone()).find_by_id(user_id).await {
        Ok(Some(user)) => Some(user.id),
        Ok(None) => None,
        Err(e) => {
            tracing::warn!(user_id, error = %e, "Realtime identify lookup failed");
            None
        }
    }
}

fn subscribe(
    session: &mut SessionState,
    gateway: &Arc<Gateway>,
    tx: &Outbox,
    channel: String,
) -> ServerMessage {
    match channel_access(&channel) {
        None => return ServerMessage::error(format!("Unknown channel {}", channel)),
        Some(ChannelAccess::Owner(owner)) if session.user_id != Some(owner) => {
            return ServerMessage::error(format!("Not authorized to subscribe to {}", channel));
        }
        Some(_) => {}
    }

    if !session.is_subscribed(&channel) {
        let receiver = gateway.subscribe(&channel);
        let task = tokio::spawn(forward(receiver, tx.clone(), session.session_id.clone()));
        session.add_subscription(channel.clone(), task);
    }

    ServerMessage::Subscribed { channel }
}

/// Copy channel events into the connection's outbox until either side goes away.
async fn forward(
    mut receiver: broadcast::Receiver<ChannelEvent>,
    tx: Outbox,
    session_id: String,
) {
    loop {
        match receiver.recv().await {
            Ok(event) => {
                let message = ServerMessage::Event {
                    channel: event.channel,
                    event: event.event,
                    data: event.data,
                };
                if !queue(&tx, message, &session_id) {
                    break;
                }
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(session_id = %session_id, skipped, "Realtime receiver lagged");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}
