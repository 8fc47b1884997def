//! User profile collected once at intake.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl std::fmt::Display for Gender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Male => write!(f, "male"),
            Self::Female => write!(f, "female"),
            Self::Other => write!(f, "other"),
        }
    }
}

impl std::str::FromStr for Gender {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "male" => Ok(Self::Male),
            "female" => Ok(Self::Female),
            "other" => Ok(Self::Other),
            _ => Err(()),
        }
    }
}

/// Who the assistant is talking to.
///
/// Built by [`super::ProfileForm::validate`] and never mutated afterwards;
/// sessions share it behind an `Arc`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub name: String,
    /// Whole years, 1..=120.
    pub age: u8,
    pub gender: Gender,
    pub phone: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub medical_history: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_symptoms: Option<String>,
}

impl UserProfile {
    /// The opening assistant message of every conversation.
    pub fn greeting(&self) -> String {
        format!(
            "Hello {}! I'm Arogya AI, your personal health assistant. I can help you find medical services, book appointments, find health insurance, or answer health-related questions. How can I assist you today?",
            self.name
        )
    }

    /// Compact `Name/Age/Gender` line used in search prompts.
    pub fn summary_line(&self) -> String {
        format!(
            "Name: {}, Age: {}, Gender: {}",
            self.name, self.age, self.gender
        )
    }
}
