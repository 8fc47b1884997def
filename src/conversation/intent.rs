//! Intent routing for user utterances.
//!
//! An ordered rule table, evaluated top-down, first match wins:
//! - insurance keywords → insurance search (checked first)
//! - service/appointment keywords → ask for a location
//! - anything else → free-text chat

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// What to do with an utterance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    InsuranceSearch,
    ServiceSearch,
    Chat,
}

/// How a rule decides whether it applies.
#[derive(Debug, Clone)]
pub enum Matcher {
    /// Any keyword is a substring of the lowercased utterance.
    Keywords(Vec<String>),
    /// Regex over the raw utterance.
    Pattern(Regex),
}

impl Matcher {
    fn is_match(&self, text: &str, lowered: &str) -> bool {
        match self {
            Self::Keywords(words) => words.iter().any(|w| lowered.contains(w.as_str())),
            Self::Pattern(re) => re.is_match(text),
        }
    }
}

/// One row of the routing table.
#[derive(Debug, Clone)]
pub struct IntentRule {
    /// Human-readable name, used in logs.
    pub name: String,
    pub matcher: Matcher,
    pub intent: Intent,
}

pub const INSURANCE_KEYWORDS: &[&str] = &[
    "insurance",
    "policy",
    "policies",
    "premium",
    "coverage",
    "mediclaim",
];

pub const SERVICE_KEYWORDS: &[&str] = &["find", "book", "appointment", "doctor", "hospital"];

/// Ordered predicate → intent table.
pub struct IntentRouter {
    rules: Vec<IntentRule>,
    fallback: Intent,
}

impl IntentRouter {
    /// Insurance rule, then service rule, falling back to chat.
    pub fn default_rules() -> Self {
        let mut router = Self::empty();
        router.add_keyword_rule("insurance keywords", INSURANCE_KEYWORDS, Intent::InsuranceSearch);
        router.add_keyword_rule("service keywords", SERVICE_KEYWORDS, Intent::ServiceSearch);
        router
    }

    /// A router with no rules; everything is chat.
    pub fn empty() -> Self {
        Self {
            rules: Vec::new(),
            fallback: Intent::Chat,
        }
    }

    /// Append a keyword rule at the lowest priority.
    pub fn add_keyword_rule(&mut self, name: &str, keywords: &[&str], intent: Intent) {
        self.rules.push(IntentRule {
            name: name.into(),
            matcher: Matcher::Keywords(keywords.iter().map(|k| k.to_lowercase()).collect()),
            intent,
        });
    }

    /// Append a regex rule at the lowest priority.
    pub fn add_pattern_rule(
        &mut self,
        name: &str,
        pattern: &str,
        intent: Intent,
    ) -> Result<(), regex::Error> {
        self.rules.push(IntentRule {
            name: name.into(),
            matcher: Matcher::Pattern(Regex::new(pattern)?),
            intent,
        });
        Ok(())
    }

    /// Route an utterance. Never fails: unmatched text is chat.
    pub fn evaluate(&self, text: &str) -> Intent {
        let lowered = text.to_lowercase();
        for rule in &self.rules {
            if rule.matcher.is_match(text, &lowered) {
                debug!(rule = %rule.name, intent = ?rule.intent, "Intent rule matched");
                return rule.intent;
            }
        }
        self.fallback
    }

    pub fn rules(&self) -> &[IntentRule] {
        &self.rules
    }
}

impl Default for IntentRouter {
    fn default() -> Self {
        Self::default_rules()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insurance_preempts_service_keywords() {
        let router = IntentRouter::default_rules();
        for text in [
            "Find me an insurance policy",
            "book a doctor and tell me about premium plans",
            "Which HOSPITAL accepts my MEDICLAIM?",
            "coverage for appointments",
        ] {
            assert_eq!(router.evaluate(text), Intent::InsuranceSearch, "{text}");
        }
    }

    #[test]
    fn service_keywords_route_to_service_search() {
        let router = IntentRouter::default_rules();
        for text in ["I need a Doctor", "book an appointment", "nearest hospital?", "help me find care"] {
            assert_eq!(router.evaluate(text), Intent::ServiceSearch, "{text}");
        }
    }

    #[test]
    fn keywords_match_as_substrings() {
        let router = IntentRouter::default_rules();
        // "findings" contains "find"; "notebook" contains "book"
        assert_eq!(router.evaluate("my lab findings"), Intent::ServiceSearch);
        assert_eq!(router.evaluate("lost my notebook"), Intent::ServiceSearch);
        assert_eq!(router.evaluate("policyholder question"), Intent::InsuranceSearch);
    }

    #[test]
    fn everything_else_is_chat() {
        let router = IntentRouter::default_rules();
        assert_eq!(router.evaluate("Is turmeric good for inflammation?"), Intent::Chat);
        assert_eq!(IntentRouter::empty().evaluate("book a doctor"), Intent::Chat);
    }

    #[test]
    fn rules_are_evaluated_in_insertion_order() {
        let mut router = IntentRouter::empty();
        router.add_keyword_rule("service first", SERVICE_KEYWORDS, Intent::ServiceSearch);
        router.add_keyword_rule("insurance second", INSURANCE_KEYWORDS, Intent::InsuranceSearch);
        assert_eq!(router.evaluate("book insurance"), Intent::ServiceSearch);
        assert_eq!(router.rules().len(), 2);
    }

    #[test]
    fn pattern_rules_are_supported() {
        let mut router = IntentRouter::empty();
        router
            .add_pattern_rule("clinic word", r"(?i)\bclinic\b", Intent::ServiceSearch)
            .unwrap();
        assert_eq!(router.evaluate("any Clinic open?"), Intent::ServiceSearch);
        assert_eq!(router.evaluate("clinical trial"), Intent::Chat);
        assert!(router.add_pattern_rule("bad", "(", Intent::Chat).is_err());
    }
}
