//! Message log: append-only, in-memory, with broadcast to live listeners.

use tokio::sync::{RwLock, broadcast};
use tracing::{debug, info};

use super::message::ChatMessage;

/// Default broadcast channel capacity.
const DEFAULT_BROADCAST_CAPACITY: usize = 256;

/// A change to the log, fanned out to WebSocket clients and the terminal.
#[derive(Debug, Clone)]
pub enum LogEvent {
    Appended(ChatMessage),
    /// The log was reset; carries the new contents.
    Cleared(Vec<ChatMessage>),
}

/// Ordered conversation log.
///
/// Messages are only ever appended; [`MessageLog::reset`] is the single way to
/// drop history.
pub struct MessageLog {
    messages: RwLock<Vec<ChatMessage>>,
    tx: broadcast::Sender<LogEvent>,
}

impl MessageLog {
    /// Create a log holding just `greeting`.
    pub fn new(greeting: ChatMessage) -> Self {
        let (tx, _rx) = broadcast::channel(DEFAULT_BROADCAST_CAPACITY);
        Self {
            messages: RwLock::new(vec![greeting]),
            tx,
        }
    }

    /// Subscribe to log events.
    pub fn subscribe(&self) -> broadcast::Receiver<LogEvent> {
        self.tx.subscribe()
    }

    /// Append a message and broadcast it.
    pub async fn append(&self, message: ChatMessage) {
        debug!(
            message_id = %message.id,
            role = %message.role,
            has_action = message.action.is_some(),
            "Message appended"
        );
        {
            let mut messages = self.messages.write().await;
            messages.push(message.clone());
        }
        // ok if nobody is listening
        let _ = self.tx.send(LogEvent::Appended(message));
    }

    /// Replace the whole log with a single greeting.
    pub async fn reset(&self, greeting: ChatMessage) {
        let snapshot = vec![greeting];
        {
            let mut messages = self.messages.write().await;
            *messages = snapshot.clone();
        }
        info!("Message log cleared");
        let _ = self.tx.send(LogEvent::Cleared(snapshot));
    }

    /// Copy of the current log, oldest first.
    pub async fn snapshot(&self) -> Vec<ChatMessage> {
        self.messages.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.messages.read().await.len()
    }
}
