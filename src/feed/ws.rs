//! WebSocket endpoint streaming `eco_results` rows for one recipe.
//!
//! Clients connect to `GET /ws/eco_results?recipe_id=<uuid>`. The latest stored
//! row (if any) is sent first, then every new row for that recipe.

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Query, State, WebSocketUpgrade};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use uuid::Uuid;

use super::Subscription;
use crate::models::EcoResultRow;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct FeedQuery {
    pub recipe_id: Uuid,
}

/// GET /ws/eco_results - Upgrade and stream results for a recipe.
pub async fn ws_eco_results(
    ws: WebSocketUpgrade,
    Query(query): Query<FeedQuery>,
    State(state): State<AppState>,
) -> Response {
    // Subscribe before reading the latest row so nothing published in between is lost
    let subscription = state.feed.subscribe(query.recipe_id);
    let initial = match state.repo.latest_eco_result(query.recipe_id).await {
        Ok(row) => row,
        Err(e) => return e.into_response(),
    };

    ws.on_upgrade(move |socket| stream_results(socket, subscription, initial))
}

async fn stream_results(
    mut socket: WebSocket,
    mut subscription: Subscription,
    initial: Option<EcoResultRow>,
) {
    let recipe_id = subscription.recipe_id();
    tracing::debug!(%recipe_id, "eco_results subscriber connected");

    if let Some(row) = initial {
        if !send_row(&mut socket, &row).await {
            return;
        }
    }

    loop {
        tokio::select! {
            next = subscription.next() => {
                match next {
                    Some(row) => {
                        if !send_row(&mut socket, &row).await {
                            tracing::debug!(%recipe_id, "eco_results subscriber disconnected (send failed)");
                            return;
                        }
                    }
                    None => {
                        tracing::debug!("eco_results feed closed, shutting down WebSocket");
                        return;
                    }
                }
            }
            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None => {
                        tracing::debug!(%recipe_id, "eco_results subscriber disconnected");
                        return;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if socket.send(Message::Pong(data)).await.is_err() {
                            return;
                        }
                    }
                    Some(Err(e)) => {
                        tracing::debug!("WebSocket error: {e}");
                        return;
                    }
                    _ => {}
                }
            }
        }
    }
}

/// Returns false when the socket is gone.
async fn send_row(socket: &mut WebSocket, row: &EcoResultRow) -> bool {
    let json = match serde_json::to_string(row) {
        Ok(j) => j,
        Err(e) => {
            tracing::warn!("Failed to serialize eco result: {e}");
            return true;
        }
    };
    socket.send(Message::Text(json.into())).await.is_ok()
}
