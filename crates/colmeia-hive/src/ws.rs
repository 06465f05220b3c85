//! Live pending-vote feed over WebSocket.
//!
//! Connect to `/api/v1/groups/:group_id/ws/votes` (identity headers as for
//! the HTTP API). The server sends a snapshot of the group's pending votes
//! on connect and again after every committed change to its votes, so the
//! client can replace its list wholesale.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    response::{IntoResponse, Response},
};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, error, info, warn};

use crate::api::{ApiError, CurrentUser};
use crate::models::{now_millis, Vote};
use crate::node::HiveState;
use crate::storage::{ChangeEvent, ChangeKind, CollectionPath, Subcollection};

/// Seconds between heartbeats.
const HEARTBEAT_SECS: u64 = 30;

/// Messages pushed to vote feed clients
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum VoteFeedEvent {
    /// Every pending vote in the group, oldest first
    Snapshot {
        #[serde(rename = "groupId")]
        group_id: String,
        votes: Vec<Vote>,
    },
    /// The group is gone; the server closes the socket after this
    GroupDeleted {
        #[serde(rename = "groupId")]
        group_id: String,
    },
    /// Heartbeat to keep connection alive
    Heartbeat { timestamp: u64 },
}

/// WebSocket handler for the vote feed. Only members may subscribe.
pub async fn ws_votes_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<HiveState>>,
    CurrentUser(actor): CurrentUser,
    Path(group_id): Path<String>,
) -> Response {
    if let Err(e) = state.voting.groups().require_member(&group_id, &actor) {
        return ApiError(e).into_response();
    }
    ws.on_upgrade(move |socket| handle_votes_socket(socket, state, group_id))
}

/// Handle a WebSocket connection for one group's votes
async fn handle_votes_socket(mut socket: WebSocket, state: Arc<HiveState>, group_id: String) {
    info!("Vote feed client connected for group {}", group_id);

    // Subscribe before the first snapshot so no change slips in between
    let mut changes = state.voting.store().subscribe();
    let votes_path = CollectionPath::group_sub(&group_id, Subcollection::Votes);

    if let Err(e) = send_event(&mut socket, snapshot(&state, &group_id)).await {
        warn!("Failed to send initial snapshot: {}", e);
        return;
    }

    let mut heartbeat =
        tokio::time::interval(tokio::time::Duration::from_secs(HEARTBEAT_SECS));
    heartbeat.tick().await;

    loop {
        tokio::select! {
            // Handle incoming messages from client
            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        debug!("Received from vote feed client: {}", text);
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        info!("Vote feed client disconnected");
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
            // Push a fresh snapshot whenever the group's votes change
            change = changes.recv() => {
                let event = match change {
                    Ok(change) if is_group_removal(&change, &group_id) => {
                        let _ = send_event(&mut socket, VoteFeedEvent::GroupDeleted {
                            group_id: group_id.clone(),
                        }).await;
                        break;
                    }
                    Ok(change) if change.is_in(&votes_path) => snapshot(&state, &group_id),
                    Ok(_) => continue,
                    Err(RecvError::Lagged(skipped)) => {
                        debug!("Vote feed lagged by {} changes, resending snapshot", skipped);
                        snapshot(&state, &group_id)
                    }
                    Err(RecvError::Closed) => break,
                };
                if let Err(e) = send_event(&mut socket, event).await {
                    warn!("Failed to send snapshot update: {}", e);
                    break;
                }
            }
            _ = heartbeat.tick() => {
                let event = VoteFeedEvent::Heartbeat { timestamp: now_millis() };
                if let Err(e) = send_event(&mut socket, event).await {
                    warn!("Failed to send heartbeat: {}", e);
                    break;
                }
            }
        }
    }
}

fn is_group_removal(change: &ChangeEvent, group_id: &str) -> bool {
    change.kind == ChangeKind::Delete
        && change.id == group_id
        && change.is_in(&CollectionPath::groups())
}

/// Current pending votes, or an empty list if they cannot be read
fn snapshot(state: &HiveState, group_id: &str) -> VoteFeedEvent {
    let votes = state.voting.pending_votes(group_id).unwrap_or_else(|e| {
        warn!("Failed to read pending votes for {}: {}", group_id, e);
        Vec::new()
    });
    VoteFeedEvent::Snapshot {
        group_id: group_id.to_string(),
        votes,
    }
}

/// Send a feed event over WebSocket
async fn send_event(socket: &mut WebSocket, event: VoteFeedEvent) -> Result<(), axum::Error> {
    let json = serde_json::to_string(&event).map_err(axum::Error::new)?;
    socket.send(Message::Text(json)).await
}
