//! Message rendering: lightweight markdown to fragments, actions to buttons.

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::advisory::Catalog;
use crate::conversation::{ActionKind, ChatMessage, MessageAction, Role};

/// Bold first so `**x**` is never read as two italics.
static INLINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*(.+?)\*\*|\*(.+?)\*|`(.+?)`").unwrap());

/// Legacy `kind:id` marker embedded in message text.
static MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(book-service|choose-policy):([A-Za-z0-9_-]+)").unwrap());

/// A run of text with one style.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "style", content = "text", rename_all = "snake_case")]
pub enum Fragment {
    Text(String),
    Bold(String),
    Italic(String),
    Code(String),
}

/// Button bound to one catalog item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionButton {
    pub kind: ActionKind,
    pub target_id: String,
    pub label: String,
    /// Name of the referenced item, when it is in the current catalog.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_name: Option<String>,
    /// False when the id is not in the current catalog (stale result).
    pub available: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderedMessage {
    pub id: Uuid,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    /// One entry per text line.
    pub lines: Vec<Vec<Fragment>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<ActionButton>,
}

/// Render one message against the current catalog.
pub fn render(message: &ChatMessage, catalog: &Catalog) -> RenderedMessage {
    let (text, action) = match &message.action {
        Some(action) => (message.content.clone(), Some(action.clone())),
        None => extract_marker(&message.content),
    };

    RenderedMessage {
        id: message.id,
        role: message.role,
        created_at: message.created_at,
        lines: text.split('\n').map(format_line).collect(),
        action: action.map(|a| bind(a, catalog)),
    }
}

pub fn render_all(messages: &[ChatMessage], catalog: &Catalog) -> Vec<RenderedMessage> {
    messages.iter().map(|m| render(m, catalog)).collect()
}

/// Pull the first legacy marker out of `content`.
fn extract_marker(content: &str) -> (String, Option<MessageAction>) {
    let Some(caps) = MARKER.captures(content) else {
        return (content.to_string(), None);
    };
    let (Some(whole), Some(kind), Some(id)) = (caps.get(0), caps.get(1), caps.get(2)) else {
        return (content.to_string(), None);
    };
    let Ok(kind) = kind.as_str().parse::<ActionKind>() else {
        return (content.to_string(), None);
    };

    let mut text = String::with_capacity(content.len());
    text.push_str(&content[..whole.start()]);
    text.push_str(&content[whole.end()..]);
    let action = MessageAction {
        kind,
        target_id: id.as_str().to_string(),
    };
    (text.trim_end().to_string(), Some(action))
}

fn format_line(line: &str) -> Vec<Fragment> {
    let mut fragments = Vec::new();
    let mut last = 0;

    for caps in INLINE.captures_iter(line) {
        let Some(whole) = caps.get(0) else { continue };
        push_text(&mut fragments, &line[last..whole.start()]);

        let fragment = if let Some(m) = caps.get(1) {
            Fragment::Bold(m.as_str().to_string())
        } else if let Some(m) = caps.get(2) {
            Fragment::Italic(m.as_str().to_string())
        } else if let Some(m) = caps.get(3) {
            Fragment::Code(m.as_str().to_string())
        } else {
            Fragment::Text(whole.as_str().to_string())
        };
        fragments.push(fragment);
        last = whole.end();
    }

    push_text(&mut fragments, &line[last..]);
    fragments
}

fn push_text(fragments: &mut Vec<Fragment>, text: &str) {
    if !text.is_empty() {
        fragments.push(Fragment::Text(text.to_string()));
    }
}

fn bind(action: MessageAction, catalog: &Catalog) -> ActionButton {
    let item_name = match action.kind {
        ActionKind::BookService => catalog.service(&action.target_id).map(|s| s.name.clone()),
        ActionKind::ChoosePolicy => catalog.policy(&action.target_id).map(|p| p.name.clone()),
    };
    ActionButton {
        kind: action.kind,
        label: action.kind.label().to_string(),
        available: item_name.is_some(),
        item_name,
        target_id: action.target_id,
    }
}

/// Flatten fragments back to display text, markdown markers dropped.
pub fn plain_text(rendered: &RenderedMessage) -> String {
    rendered
        .lines
        .iter()
        .map(|line| {
            line.iter()
                .map(|f| match f {
                    Fragment::Text(s) | Fragment::Bold(s) | Fragment::Italic(s) | Fragment::Code(s) => {
                        s.as_str()
                    }
                })
                .collect::<String>()
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::advisory::{CatalogSource, InsurancePolicy, MedicalService};

    fn text(s: &str) -> Fragment {
        Fragment::Text(s.to_string())
    }

    #[test]
    fn inline_styles() {
        assert_eq!(
            format_line("**Bold** then *soft* and `code`."),
            vec![
                Fragment::Bold("Bold".to_string()),
                text(" then "),
                Fragment::Italic("soft".to_string()),
                text(" and "),
                Fragment::Code("code".to_string()),
                text("."),
            ]
        );
    }

    #[test]
    fn unmatched_delimiters_stay_literal() {
        assert_eq!(format_line("2 * 3 = 6"), vec![text("2 * 3 = 6")]);
        assert_eq!(format_line("**unclosed"), vec![text("**unclosed")]);
        assert_eq!(format_line(""), Vec::<Fragment>::new());
    }

    #[test]
    fn leftmost_match_wins() {
        assert_eq!(
            format_line("`a*b*` *c*"),
            vec![
                Fragment::Code("a*b*".to_string()),
                text(" "),
                Fragment::Italic("c".to_string()),
            ]
        );
    }

    #[test]
    fn lines_are_rendered_separately() {
        let msg = ChatMessage::ai("**Clinic**\n📍 1 Road\n\nBook?");
        let rendered = render(&msg, &Catalog::new());
        assert_eq!(rendered.lines.len(), 4);
        assert_eq!(rendered.lines[0], vec![Fragment::Bold("Clinic".to_string())]);
        assert!(rendered.lines[2].is_empty());
        assert_eq!(plain_text(&rendered), "Clinic\n📍 1 Road\n\nBook?");
    }

    #[test]
    fn structured_action_binds_to_catalog_item() {
        let mut catalog = Catalog::new();
        catalog.replace_services(vec![MedicalService::fallback("Agra")], CatalogSource::Fallback);

        let msg = ChatMessage::ai("**General Hospital**")
            .with_action(MessageAction::book_service("fallback-1"));
        let button = render(&msg, &catalog).action.unwrap();
        assert_eq!(button.label, "Book Appointment");
        assert_eq!(button.item_name.as_deref(), Some("General Hospital"));
        assert!(button.available);
    }

    #[test]
    fn legacy_marker_is_extracted_and_formatting_still_applies() {
        let mut catalog = Catalog::new();
        catalog.replace_policies(vec![InsurancePolicy::fallback()], CatalogSource::Fallback);

        let msg = ChatMessage::ai("**Basic Health Insurance**\nchoose-policy:fallback-1");
        let rendered = render(&msg, &catalog);
        assert_eq!(
            rendered.lines[0],
            vec![Fragment::Bold("Basic Health Insurance".to_string())]
        );
        assert!(!plain_text(&rendered).contains("choose-policy"));
        let button = rendered.action.unwrap();
        assert_eq!(button.kind, ActionKind::ChoosePolicy);
        assert_eq!(button.target_id, "fallback-1");
        assert!(button.available);
    }

    #[test]
    fn stale_ids_render_unavailable_buttons() {
        let msg = ChatMessage::ai("Old result book-service:7");
        let button = render(&msg, &Catalog::new()).action.unwrap();
        assert_eq!(button.target_id, "7");
        assert!(!button.available);
        assert_eq!(button.item_name, None);
    }

    #[test]
    fn plain_messages_have_no_action() {
        let rendered = render(&ChatMessage::user("book a doctor"), &Catalog::new());
        assert!(rendered.action.is_none());
    }
}
