//! Insurance application wizard.

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::{WizardForm, optional, required};
use crate::advisory::InsurancePolicy;
use crate::error::WizardError;
use crate::profile::UserProfile;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IncomeBracket {
    #[serde(rename = "below-3lakh")]
    Below3Lakh,
    #[serde(rename = "3-5lakh")]
    From3To5Lakh,
    #[serde(rename = "5-10lakh")]
    From5To10Lakh,
    #[serde(rename = "10-20lakh")]
    From10To20Lakh,
    #[serde(rename = "above-20lakh")]
    Above20Lakh,
}

impl IncomeBracket {
    pub const ALL: [IncomeBracket; 5] = [
        Self::Below3Lakh,
        Self::From3To5Lakh,
        Self::From5To10Lakh,
        Self::From10To20Lakh,
        Self::Above20Lakh,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Below3Lakh => "below-3lakh",
            Self::From3To5Lakh => "3-5lakh",
            Self::From5To10Lakh => "5-10lakh",
            Self::From10To20Lakh => "10-20lakh",
            Self::Above20Lakh => "above-20lakh",
        }
    }
}

impl std::fmt::Display for IncomeBracket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for IncomeBracket {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|b| b.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("Unknown income bracket: {}", s))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContactPreference {
    #[default]
    Email,
    Phone,
    Both,
}

impl std::fmt::Display for ContactPreference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Email => write!(f, "email"),
            Self::Phone => write!(f, "phone"),
            Self::Both => write!(f, "both"),
        }
    }
}

impl std::str::FromStr for ContactPreference {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "email" => Ok(Self::Email),
            "phone" => Ok(Self::Phone),
            "both" => Ok(Self::Both),
            other => Err(format!("Unknown contact preference: {}", other)),
        }
    }
}

fn one() -> u32 {
    1
}

/// Applicant details collected by the form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsuranceDetails {
    pub full_name: String,
    pub date_of_birth: NaiveDate,
    pub occupation: String,
    pub annual_income: IncomeBracket,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub existing_conditions: Option<String>,
    #[serde(default = "one")]
    pub family_members: u32,
    /// Defaults to the chosen policy's coverage.
    #[serde(default)]
    pub preferred_coverage: Option<String>,
    #[serde(default)]
    pub contact_preference: ContactPreference,
}

impl WizardForm for InsuranceDetails {
    type Item = InsurancePolicy;
    const KIND: &'static str = "insurance";

    fn normalize(self, policy: &InsurancePolicy) -> Result<Self, WizardError> {
        let full_name = required("fullName", &self.full_name)?;
        if self.date_of_birth > Utc::now().date_naive() {
            return Err(WizardError::InvalidField {
                field: "dateOfBirth",
                reason: format!("{} is in the future", self.date_of_birth),
            });
        }
        let occupation = required("occupation", &self.occupation)?;
        if self.family_members < 1 {
            return Err(WizardError::InvalidField {
                field: "familyMembers",
                reason: "at least one member must be covered".to_string(),
            });
        }
        let preferred_coverage =
            optional(self.preferred_coverage).or_else(|| Some(policy.coverage.clone()));

        Ok(Self {
            full_name,
            occupation,
            existing_conditions: optional(self.existing_conditions),
            preferred_coverage,
            ..self
        })
    }
}

/// Items shown while the application is processed.
pub const PROCESSING_CHECKLIST: [&str; 3] = [
    "Verifying personal details",
    "Calculating premium",
    "Preparing policy documents",
];

/// Chat message appended when the application completes.
pub fn confirmation(
    policy: &InsurancePolicy,
    details: &InsuranceDetails,
    profile: &UserProfile,
) -> String {
    format!(
        "✅ **Application Submitted!**\n🛡️ {} by {}\n👤 Applicant: {} ({} covered)\n💰 Coverage: {} · Premium: {}\n\nA payment link has been sent to {}. Your policy will be activated within 24 hours of payment.",
        policy.name,
        policy.provider,
        details.full_name,
        details.family_members,
        details.preferred_coverage.as_deref().unwrap_or(&policy.coverage),
        policy.premium,
        profile.email,
    )
}
