//! WebSocket stream of friendship notifications.
//!
//! Connect to `/api/v1/ws/notifications`. The user is taken from the
//! `x-rumble-user` header, or from `?user=` for browsers that cannot set
//! headers on an upgrade. Only events that concern that user are forwarded.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    http::HeaderMap,
    response::{IntoResponse, Response},
};
use rumble_social::FriendshipEvent;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, error, info, warn};

use crate::api::{current_user, AppState};
use crate::error::Error;

/// Seconds between keep-alive frames.
const HEARTBEAT_SECS: u64 = 30;

/// Frames sent to the client.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WsMessage {
    Notification { event: FriendshipEvent },
    /// Keep-alive
    Heartbeat { timestamp: u64 },
    /// Some events were skipped because the client fell behind
    Lagged { skipped: u64 },
}

#[derive(Debug, Default, Deserialize)]
pub struct WsParams {
    user: Option<String>,
}

/// WebSocket handler for notifications
pub async fn ws_notifications_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(params): Query<WsParams>,
    headers: HeaderMap,
) -> Response {
    let user = match current_user(&headers) {
        Ok(user) => user,
        Err(e) => match params.user.filter(|u| !u.trim().is_empty()) {
            Some(user) => user.trim().to_string(),
            None => return e.into_response(),
        },
    };

    // Subscribe before the upgrade so nothing sent in between is lost
    let rx = state.read().await.notifier.subscribe();
    ws.on_upgrade(move |socket| handle_notification_socket(socket, user, rx))
}

/// Handle a WebSocket connection for one user
async fn handle_notification_socket(
    mut socket: WebSocket,
    user: String,
    mut rx: broadcast::Receiver<FriendshipEvent>,
) {
    info!(user = %user, "notification client connected");

    let mut interval = tokio::time::interval(tokio::time::Duration::from_secs(HEARTBEAT_SECS));

    loop {
        tokio::select! {
            // Handle incoming messages from client
            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        debug!("Received from client: {}", text);
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        info!(user = %user, "notification client disconnected");
                        break;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if let Err(e) = socket.send(Message::Pong(data)).await {
                            warn!("Failed to send pong: {}", e);
                            break;
                        }
                    }
                    Some(Err(e)) => {
                        error!("WebSocket error: {}", e);
                        break;
                    }
                    _ => {}
                }
            }
            event = rx.recv() => {
                let frame = match event {
                    Ok(event) => match frame_for(&user, event) {
                        Some(frame) => frame,
                        None => continue,
                    },
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(user = %user, skipped, "notification client lagging");
                        WsMessage::Lagged { skipped }
                    }
                    Err(RecvError::Closed) => break,
                };
                if let Err(e) = send_event(&mut socket, &frame).await {
                    warn!("Failed to send notification: {}", e);
                    break;
                }
            }
            _ = interval.tick() => {
                let heartbeat = WsMessage::Heartbeat {
                    timestamp: rumble_social::now_millis() / 1000,
                };
                if let Err(e) = send_event(&mut socket, &heartbeat).await {
                    warn!("Failed to send heartbeat: {}", e);
                    break;
                }
            }
        }
    }
}

/// The frame `user` should see for `event`, if any.
pub fn frame_for(user: &str, event: FriendshipEvent) -> Option<WsMessage> {
    event
        .concerns(user)
        .then_some(WsMessage::Notification { event })
}

/// Send a frame over WebSocket
async fn send_event(socket: &mut WebSocket, frame: &WsMessage) -> Result<(), axum::Error> {
    let json = serde_json::to_string(frame).map_err(|e| axum::Error::new(Error::from(e)))?;
    socket.send(Message::Text(json)).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request_sent() -> FriendshipEvent {
        FriendshipEvent::RequestSent {
            edge_id: "e1".into(),
            from: "u1".into(),
            to: "u2".into(),
        }
    }

    #[test]
    fn only_involved_users_get_frames() {
        assert!(frame_for("u1", request_sent()).is_some());
        assert!(frame_for("u2", request_sent()).is_some());
        assert!(frame_for("u3", request_sent()).is_none());
    }

    #[test]
    fn notification_frame_shape() {
        let frame = frame_for("u2", request_sent()).unwrap();
        let json = serde_json::to_value(&frame).unwrap();
        assert_eq!(json["type"], "notification");
        assert_eq!(json["event"]["type"], "request_sent");
        assert_eq!(json["event"]["to"], "u2");
    }

    #[test]
    fn heartbeat_frame_shape() {
        let json = serde_json::to_value(WsMessage::Heartbeat { timestamp: 7 }).unwrap();
        assert_eq!(json["type"], "heartbeat");
        assert_eq!(json["timestamp"], 7);
    }
}
