//! Typed parsing of structured (JSON) model replies.
//!
//! The model is asked for a bare JSON object but frequently wraps it in a
//! markdown code fence. Replies are unfenced, parsed into an [`Envelope`] and
//! then validated before anything downstream sees them.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::error::LlmError;

static CODE_FENCE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"```(?:json)?\n?").unwrap());

/// Remove every markdown code-fence delimiter and trim surrounding whitespace.
pub fn strip_code_fences(raw: &str) -> String {
    CODE_FENCE.replace_all(raw.trim(), "").trim().to_string()
}

/// Items carried in a structured reply must be addressable by id.
pub trait Identified {
    fn id(&self) -> &str;
}

/// `{ "type": ..., "message": ..., "data": ... }` as returned by the model.
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope<D> {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub message: String,
    pub data: D,
}

/// Parse a raw model reply into a validated envelope.
///
/// `expected_kind` is the required `type` tag; `items` projects the item list
/// out of the payload so ids can be checked for presence and uniqueness.
pub fn parse_envelope<D, T, F>(
    provider: &str,
    raw: &str,
    expected_kind: &str,
    items: F,
) -> Result<Envelope<D>, LlmError>
where
    D: DeserializeOwned,
    T: Identified,
    F: Fn(&D) -> &[T],
{
    let cleaned = strip_code_fences(raw);
    let envelope: Envelope<D> = serde_json::from_str(&cleaned)?;

    if envelope.kind != expected_kind {
        return Err(LlmError::InvalidResponse {
            provider: provider.to_string(),
            reason: format!("expected type {:?}, got {:?}", expected_kind, envelope.kind),
        });
    }

    let list = items(&envelope.data);
    if list.is_empty() {
        return Err(LlmError::InvalidResponse {
            provider: provider.to_string(),
            reason: "result list is empty".to_string(),
        });
    }

    let mut seen = HashSet::new();
    for item in list {
        let id = item.id().trim();
        if id.is_empty() {
            return Err(LlmError::InvalidResponse {
                provider: provider.to_string(),
                reason: "item with empty id".to_string(),
            });
        }
        if !seen.insert(id) {
            return Err(LlmError::InvalidResponse {
                provider: provider.to_string(),
                reason: format!("duplicate item id {:?}", id),
            });
        }
    }

    Ok(envelope)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize)]
    struct Thing {
        id: String,
    }

    impl Identified for Thing {
        fn id(&self) -> &str {
            &self.id
        }
    }

    #[derive(Debug, Deserialize)]
    struct Things {
        things: Vec<Thing>,
    }

    fn parse(raw: &str) -> Result<Envelope<Things>, LlmError> {
        parse_envelope("test", raw, "things", |d: &Things| d.things.as_slice())
    }

    #[test]
    fn strips_json_fences() {
        let raw = "```json\n{\"a\": 1}\n```";
        assert_eq!(strip_code_fences(raw), "{\"a\": 1}");
    }

    #[test]
    fn strips_bare_fences_and_whitespace() {
        let raw = "  ```\n{\"a\": 1}```  ";
        assert_eq!(strip_code_fences(raw), "{\"a\": 1}");
    }

    #[test]
    fn leaves_plain_json_alone() {
        assert_eq!(strip_code_fences("{\"a\": 1}"), "{\"a\": 1}");
    }

    #[test]
    fn parses_valid_envelope() {
        let env = parse(
            "```json\n{\"type\":\"things\",\"message\":\"ok\",\"data\":{\"things\":[{\"id\":\"1\"},{\"id\":\"2\"}]}}\n```",
        )
        .unwrap();
        assert_eq!(env.message, "ok");
        assert_eq!(env.data.things.len(), 2);
    }

    #[test]
    fn missing_message_defaults_to_empty() {
        let env = parse("{\"type\":\"things\",\"data\":{\"things\":[{\"id\":\"1\"}]}}").unwrap();
        assert!(env.message.is_empty());
    }

    #[test]
    fn malformed_json_is_a_json_error() {
        let err = parse("Sure! Here are some things: [").unwrap_err();
        assert!(matches!(err, LlmError::Json(_)));
    }

    #[test]
    fn wrong_type_tag_is_rejected() {
        let err = parse("{\"type\":\"error\",\"data\":{\"things\":[{\"id\":\"1\"}]}}").unwrap_err();
        assert!(matches!(err, LlmError::InvalidResponse { .. }));
    }

    #[test]
    fn empty_list_is_rejected() {
        let err = parse("{\"type\":\"things\",\"data\":{\"things\":[]}}").unwrap_err();
        assert!(matches!(err, LlmError::InvalidResponse { .. }));
    }

    #[test]
    fn duplicate_or_blank_ids_are_rejected() {
        let dup = parse("{\"type\":\"things\",\"data\":{\"things\":[{\"id\":\"1\"},{\"id\":\"1\"}]}}");
        assert!(matches!(dup, Err(LlmError::InvalidResponse { .. })));

        let blank = parse("{\"type\":\"things\",\"data\":{\"things\":[{\"id\":\" \"}]}}");
        assert!(matches!(blank, Err(LlmError::InvalidResponse { .. })));
    }
}
