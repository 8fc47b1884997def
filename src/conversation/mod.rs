//! Conversation: message log, intent routing, search sub-flows.

pub mod engine;
pub mod intent;
pub mod log;
pub mod message;
pub mod subflow;
pub mod templates;

pub use engine::{ConversationEngine, Outcome};
pub use intent::{Intent, IntentRouter};
pub use log::{LogEvent, MessageLog};
pub use message::{ActionKind, ChatMessage, MessageAction, Role};
pub use subflow::SubFlowState;
