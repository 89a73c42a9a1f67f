//! `/ws/jobs`: live job events.
//!
//! A client gets a `jobs_sync` snapshot on connect (and again whenever it
//! lags behind the broadcast), then every `job_created` / `job_updated` /
//! `job_deleted` event as JSON text frames. Client text frames are ignored.

use std::sync::Arc;

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::IntoResponse;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

use super::AppState;
use crate::jobs::{JobEvent, JobStore};

pub(super) async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    info!("Job event client connecting");
    ws.on_upgrade(|socket| handle_socket(socket, state.store))
}

/// Send the full job list. Returns false once the client is gone.
async fn send_sync(socket: &mut WebSocket, store: &JobStore) -> bool {
    let sync = JobEvent::JobsSync {
        jobs: store.list().await,
    };
    send_event(socket, &sync).await
}

async fn send_event(socket: &mut WebSocket, event: &JobEvent) -> bool {
    match serde_json::to_string(event) {
        Ok(json) => socket.send(Message::Text(json.into())).await.is_ok(),
        Err(e) => {
            warn!(error = %e, "Failed to serialise job event");
            true
        }
    }
}

async fn handle_socket(mut socket: WebSocket, store: Arc<JobStore>) {
    // Subscribe before the snapshot so no event falls between the two
    let mut rx = store.subscribe();

    if !send_sync(&mut socket, &store).await {
        warn!("Failed to send initial sync, client disconnected");
        return;
    }

    loop {
        tokio::select! {
            result = rx.recv() => {
                match result {
                    Ok(event) => {
                        if !send_event(&mut socket, &event).await {
                            debug!("Client disconnected during send");
                            break;
                        }
                    }
                    Err(RecvError::Lagged(n)) => {
                        warn!(missed = n, "Job event client lagged behind broadcast");
                        if !send_sync(&mut socket, &store).await {
                            break;
                        }
                    }
                    Err(RecvError::Closed) => {
                        debug!("Job event channel closed");
                        break;
                    }
                }
            }

            result = socket.recv() => {
                match result {
                    Some(Ok(Message::Ping(data))) => {
                        if socket.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        info!("Job event client disconnected");
                        break;
                    }
                    Some(Err(e)) => {
                        warn!(error = %e, "WebSocket error");
                        break;
                    }
                    _ => {}
                }
            }
        }
    }
}
