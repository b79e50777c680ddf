//! # Change Feed
//!
//! Every committed write is pushed to connected clients so open lists can
//! refresh without polling.
//!
//! ```text
//! ┌──────────────┐  commit   ┌────────────────────┐  broadcast  ┌──────────────┐
//! │  Repository  │ ────────► │   StoreBackend     │ ──────────► │  /api/changes │
//! └──────────────┘           │ (memory | sqlite)  │             │  per socket   │
//!                            └────────────────────┘             └──────┬───────┘
//!                                                                      │ Text
//!                                                                      ▼
//!                          {"collection":"inventory","id":"..","kind":"upserted"}
//! ```
//!
//! A client that falls more than the channel capacity behind receives
//! `{"lagged": n}` and should reload what it shows.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use serde_json::json;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::state::AppState;

pub async fn stream(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut sender, mut receiver) = socket.split();
    let mut changes = state.warehouse.subscribe();
    info!("Change feed client connected");

    let forward = tokio::spawn(async move {
        loop {
            let text = match changes.recv().await {
                Ok(event) => match serde_json::to_string(&event) {
                    Ok(json) => json,
                    Err(e) => {
                        warn!(?e, "Failed to encode change event");
                        continue;
                    }
                },
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    warn!(missed, "Change feed client lagged");
                    json!({ "lagged": missed }).to_string()
                }
                Err(broadcast::error::RecvError::Closed) => break,
            };
            if sender.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    // The feed is one-way; incoming frames only tell us the client is gone.
    while let Some(msg) = receiver.next().await {
        match msg {
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                debug!(?e, "Change feed socket error");
                break;
            }
        }
    }

    forward.abort();
    info!("Change feed client disconnected");
}
