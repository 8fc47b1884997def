//! Chat message data model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Who produced a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    /// Assistant replies and result items.
    Ai,
    /// Scripted status lines ("Searching...").
    System,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Ai => write!(f, "ai"),
            Self::System => write!(f, "system"),
        }
    }
}

/// What an action button on a message does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    /// Open the medical booking wizard for a service.
    BookService,
    /// Open the insurance application wizard for a policy.
    ChoosePolicy,
}

impl ActionKind {
    /// Button label shown next to the item.
    pub fn label(&self) -> &'static str {
        match self {
            Self::BookService => "Book Appointment",
            Self::ChoosePolicy => "Choose This Policy",
        }
    }
}

/// Marker prefix, as used by the legacy `kind:id` text protocol.
impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BookService => write!(f, "book-service"),
            Self::ChoosePolicy => write!(f, "choose-policy"),
        }
    }
}

impl std::str::FromStr for ActionKind {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "book-service" => Ok(Self::BookService),
            "choose-policy" => Ok(Self::ChoosePolicy),
            _ => Err(format!("Unknown action kind: {}", s)),
        }
    }
}

/// Structured action attached to a message, bound to one catalog item.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageAction {
    pub kind: ActionKind,
    pub target_id: String,
}

impl MessageAction {
    pub fn book_service(id: impl Into<String>) -> Self {
        Self {
            kind: ActionKind::BookService,
            target_id: id.into(),
        }
    }

    pub fn choose_policy(id: impl Into<String>) -> Self {
        Self {
            kind: ActionKind::ChoosePolicy,
            target_id: id.into(),
        }
    }
}

impl std::fmt::Display for MessageAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.kind, self.target_id)
    }
}

/// One entry in the conversation log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: Uuid,
    pub role: Role,
    pub content: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<MessageAction>,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            role,
            content: content.into(),
            created_at: Utc::now(),
            action: None,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn ai(content: impl Into<String>) -> Self {
        Self::new(Role::Ai, content)
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn with_action(mut self, action: MessageAction) -> Self {
        self.action = Some(action);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_marker_round_trips_through_display_and_from_str() {
        let action = MessageAction::choose_policy("3");
        assert_eq!(action.to_string(), "choose-policy:3");
        assert_eq!("book-service".parse::<ActionKind>(), Ok(ActionKind::BookService));
        assert!("cancel-service".parse::<ActionKind>().is_err());
    }

    #[test]
    fn messages_get_distinct_ids() {
        let a = ChatMessage::ai("one");
        let b = ChatMessage::ai("one");
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn serialized_message_omits_missing_action() {
        let plain = serde_json::to_value(ChatMessage::system("Searching...")).unwrap();
        assert_eq!(plain["role"], "system");
        assert!(plain.get("action").is_none());

        let with = serde_json::to_value(
            ChatMessage::ai("**Clinic**").with_action(MessageAction::book_service("1")),
        )
        .unwrap();
        assert_eq!(with["action"]["kind"], "book_service");
        assert_eq!(with["action"]["target_id"], "1");
    }
}
