//! Profile intake form and its validation.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::model::{Gender, UserProfile};
use crate::error::IntakeError;

static EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap());

const MIN_AGE: u8 = 1;
const MAX_AGE: u8 = 120;
const MIN_PHONE_DIGITS: usize = 7;
const MAX_PHONE_DIGITS: usize = 15;

/// Raw intake fields, as a browser form or the terminal would post them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProfileForm {
    pub name: String,
    pub age: String,
    pub gender: String,
    pub phone: String,
    pub email: String,
    pub medical_history: Option<String>,
    pub current_symptoms: Option<String>,
}

impl ProfileForm {
    /// Check every field and build the immutable profile.
    ///
    /// Fields are checked in form order; the first failure is returned.
    pub fn validate(&self) -> Result<UserProfile, IntakeError> {
        let name = required("name", &self.name)?;

        let age_raw = required("age", &self.age)?;
        let age = age_raw
            .parse::<u8>()
            .ok()
            .filter(|a| (MIN_AGE..=MAX_AGE).contains(a))
            .ok_or_else(|| IntakeError::InvalidAge(age_raw.clone()))?;

        let gender_raw = required("gender", &self.gender)?;
        let gender = gender_raw
            .parse::<Gender>()
            .map_err(|_| IntakeError::InvalidGender(gender_raw.clone()))?;

        let phone = required("phone", &self.phone)?;
        if !is_valid_phone(&phone) {
            return Err(IntakeError::InvalidPhone(phone));
        }

        let email = required("email", &self.email)?;
        if !EMAIL.is_match(&email) {
            return Err(IntakeError::InvalidEmail(email));
        }

        Ok(UserProfile {
            name,
            age,
            gender,
            phone,
            email,
            medical_history: optional(&self.medical_history),
            current_symptoms: optional(&self.current_symptoms),
        })
    }
}

fn required(field: &'static str, value: &str) -> Result<String, IntakeError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(IntakeError::MissingField(field))
    } else {
        Ok(trimmed.to_string())
    }
}

fn optional(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn is_valid_phone(phone: &str) -> bool {
    let allowed = phone
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | '(' | ')' | ' '));
    let digits = phone.chars().filter(char::is_ascii_digit).count();
    allowed && (MIN_PHONE_DIGITS..=MAX_PHONE_DIGITS).contains(&digits)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form() -> ProfileForm {
        ProfileForm {
            name: "  Ravi Kumar ".to_string(),
            age: "42".to_string(),
            gender: "male".to_string(),
            phone: "+91 (22) 5555-0101".to_string(),
            email: "ravi@example.in".to_string(),
            medical_history: Some("  ".to_string()),
            current_symptoms: Some(" mild fever ".to_string()),
        }
    }

    #[test]
    fn valid_form_builds_trimmed_profile() {
        let profile = form().validate().unwrap();
        assert_eq!(profile.name, "Ravi Kumar");
        assert_eq!(profile.age, 42);
        assert_eq!(profile.gender, Gender::Male);
        assert_eq!(profile.medical_history, None);
        assert_eq!(profile.current_symptoms.as_deref(), Some("mild fever"));
    }

    #[test]
    fn missing_fields_are_reported_in_order() {
        let mut f = form();
        f.name = " ".to_string();
        f.email.clear();
        assert_eq!(f.validate(), Err(IntakeError::MissingField("name")));

        let mut f = form();
        f.gender.clear();
        assert_eq!(f.validate(), Err(IntakeError::MissingField("gender")));
    }

    #[test]
    fn age_bounds() {
        for bad in ["0", "121", "-3", "forty", "4.5", "300"] {
            let mut f = form();
            f.age = bad.to_string();
            assert_eq!(f.validate(), Err(IntakeError::InvalidAge(bad.to_string())), "{bad}");
        }
        for good in ["1", "120"] {
            let mut f = form();
            f.age = good.to_string();
            assert!(f.validate().is_ok(), "{good}");
        }
    }

    #[test]
    fn unknown_gender_is_rejected() {
        let mut f = form();
        f.gender = "robot".to_string();
        assert_eq!(f.validate(), Err(IntakeError::InvalidGender("robot".to_string())));
    }

    #[test]
    fn phone_rules() {
        assert!(is_valid_phone("5550101"));
        assert!(is_valid_phone("+1-555-0123"));
        assert!(!is_valid_phone("555-01"));
        assert!(!is_valid_phone("1234567890123456"));
        assert!(!is_valid_phone("555 0101 ext 4"));
    }

    #[test]
    fn email_must_have_domain_and_tld() {
        for bad in ["ravi", "ravi@", "ravi@example", "ra vi@example.com"] {
            let mut f = form();
            f.email = bad.to_string();
            assert!(matches!(f.validate(), Err(IntakeError::InvalidEmail(_))), "{bad}");
        }
    }

    #[test]
    fn deserializes_camel_case_with_missing_optionals() {
        let f: ProfileForm = serde_json::from_str(
            r#"{"name":"A","age":"30","gender":"other","phone":"5550101","email":"a@b.co","currentSymptoms":"cough"}"#,
        )
        .unwrap();
        assert_eq!(f.medical_history, None);
        assert_eq!(f.validate().unwrap().current_symptoms.as_deref(), Some("cough"));
    }
}
