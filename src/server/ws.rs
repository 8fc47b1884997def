//! WebSocket stream of one session's message log.

use std::collections::HashSet;
use std::sync::Arc;

use axum::{
    extract::{
        Path, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::AppState;
use super::routes::ApiError;
use crate::conversation::{ChatMessage, LogEvent};
use crate::render::{RenderedMessage, render, render_all};
use crate::session::Session;

/// Server → client events.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WsEvent {
    /// Full log, sent on connect and after the client lagged.
    LogSync { messages: Vec<RenderedMessage> },
    MessageAppended { message: RenderedMessage },
    LogCleared { messages: Vec<RenderedMessage> },
}

/// Client → server messages.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WsCommand {
    Say { content: String },
    Location { location: String },
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response, ApiError> {
    let session = state.store.get(id).await?;
    info!(session_id = %id, "WebSocket client connecting");
    Ok(ws.on_upgrade(move |socket| handle_socket(socket, session)).into_response())
}

/// Ids sent in the last full sync that may still arrive as appends.
#[derive(Debug, Default)]
struct Synced(HashSet<Uuid>);

impl Synced {
    fn reset(&mut self, messages: &[ChatMessage]) {
        self.0 = messages.iter().map(|m| m.id).collect();
    }

    fn clear(&mut self) {
        self.0.clear();
    }

    /// False for a message the client already got in the sync.
    fn is_fresh(&mut self, id: Uuid) -> bool {
        !self.0.remove(&id)
    }
}

async fn sync_event(session: &Session, synced: &mut Synced) -> WsEvent {
    let engine = session.engine();
    let messages = engine.messages().await;
    let catalog = engine.catalog().await;
    synced.reset(&messages);
    WsEvent::LogSync {
        messages: render_all(&messages, &catalog),
    }
}

async fn send_event(socket: &mut WebSocket, event: &WsEvent) -> bool {
    match serde_json::to_string(event) {
        Ok(json) => socket.send(Message::Text(json.into())).await.is_ok(),
        Err(e) => {
            warn!(error = %e, "Failed to encode WS event");
            true
        }
    }
}

async fn handle_socket(mut socket: WebSocket, session: Arc<Session>) {
    info!(session_id = %session.id, "WebSocket client connected");

    // Subscribe before the snapshot so nothing appended in between is lost
    let mut rx = session.engine().log().subscribe();
    let mut synced = Synced::default();

    if !send_event(&mut socket, &sync_event(&session, &mut synced).await).await {
        warn!("Failed to send initial sync, client disconnected");
        return;
    }

    loop {
        tokio::select! {
            result = rx.recv() => {
                let event = match result {
                    Ok(LogEvent::Appended(message)) => {
                        if !synced.is_fresh(message.id) {
                            debug!(message_id = %message.id, "Append already covered by sync");
                            continue;
                        }
                        let catalog = session.engine().catalog().await;
                        WsEvent::MessageAppended { message: render(&message, &catalog) }
                    }
                    Ok(LogEvent::Cleared(messages)) => {
                        synced.clear();
                        let catalog = session.engine().catalog().await;
                        WsEvent::LogCleared { messages: render_all(&messages, &catalog) }
                    }
                    Err(RecvError::Lagged(n)) => {
                        warn!(missed = n, "WS client lagged behind log");
                        sync_event(&session, &mut synced).await
                    }
                    Err(RecvError::Closed) => {
                        debug!("Log channel closed");
                        break;
                    }
                };
                if !send_event(&mut socket, &event).await {
                    debug!("Client disconnected during send");
                    break;
                }
            }

            result = socket.recv() => {
                match result {
                    Some(Ok(Message::Text(text))) => {
                        handle_command(&text, &session).await;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if socket.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        info!("WebSocket client disconnected");
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

    info!(session_id = %session.id, "WebSocket connection closed");
}

async fn handle_command(text: &str, session: &Session) {
    match serde_json::from_str::<WsCommand>(text) {
        Ok(WsCommand::Say { content }) => {
            let outcome = session.engine().handle_utterance(&content).await;
            debug!(outcome = ?outcome, "Utterance handled via WS");
        }
        Ok(WsCommand::Location { location }) => {
            if let Err(e) = session.engine().submit_location(&location).await {
                warn!(error = %e, "Location rejected via WS");
            }
        }
        Err(e) => {
            debug!(error = %e, text = text, "Unrecognized WS message from client");
        }
    }
}
