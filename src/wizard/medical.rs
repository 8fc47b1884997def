//! Medical appointment wizard.

use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::{WizardForm, optional, required};
use crate::advisory::MedicalService;
use crate::error::WizardError;
use crate::profile::UserProfile;
use crate::schedule::Script;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Urgency {
    #[default]
    Normal,
    Urgent,
    Emergency,
}

impl std::fmt::Display for Urgency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Normal => write!(f, "normal"),
            Self::Urgent => write!(f, "urgent"),
            Self::Emergency => write!(f, "emergency"),
        }
    }
}

impl std::str::FromStr for Urgency {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "normal" => Ok(Self::Normal),
            "urgent" => Ok(Self::Urgent),
            "emergency" => Ok(Self::Emergency),
            other => Err(format!("Unknown urgency: {}", other)),
        }
    }
}

/// The fixed appointment slots offered by the form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeSlot {
    #[serde(rename = "09:00")]
    Nine,
    #[serde(rename = "10:00")]
    Ten,
    #[serde(rename = "11:00")]
    Eleven,
    #[serde(rename = "14:00")]
    Fourteen,
    #[serde(rename = "15:00")]
    Fifteen,
    #[serde(rename = "16:00")]
    Sixteen,
}

impl TimeSlot {
    pub const ALL: [TimeSlot; 6] = [
        Self::Nine,
        Self::Ten,
        Self::Eleven,
        Self::Fourteen,
        Self::Fifteen,
        Self::Sixteen,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Nine => "09:00",
            Self::Ten => "10:00",
            Self::Eleven => "11:00",
            Self::Fourteen => "14:00",
            Self::Fifteen => "15:00",
            Self::Sixteen => "16:00",
        }
    }

    /// Display form, e.g. `2:00 PM`.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Nine => "9:00 AM",
            Self::Ten => "10:00 AM",
            Self::Eleven => "11:00 AM",
            Self::Fourteen => "2:00 PM",
            Self::Fifteen => "3:00 PM",
            Self::Sixteen => "4:00 PM",
        }
    }
}

impl std::fmt::Display for TimeSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for TimeSlot {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|slot| slot.as_str() == s || slot.label().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("Unknown time slot: {}", s))
    }
}

/// Appointment details collected by the form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicalDetails {
    pub symptoms: String,
    #[serde(default)]
    pub urgency: Urgency,
    pub preferred_date: NaiveDate,
    pub preferred_time: TimeSlot,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emergency_contact: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_notes: Option<String>,
}

impl WizardForm for MedicalDetails {
    type Item = MedicalService;
    const KIND: &'static str = "medical";

    fn normalize(self, _service: &MedicalService) -> Result<Self, WizardError> {
        let symptoms = required("symptoms", &self.symptoms)?;
        let today = Utc::now().date_naive();
        if self.preferred_date < today {
            return Err(WizardError::InvalidField {
                field: "preferredDate",
                reason: format!("{} is in the past", self.preferred_date),
            });
        }
        Ok(Self {
            symptoms,
            emergency_contact: optional(self.emergency_contact),
            additional_notes: optional(self.additional_notes),
            ..self
        })
    }
}

/// Items shown while the booking is processed.
pub const PROCESSING_CHECKLIST: [&str; 3] = [
    "Verifying medical details",
    "Checking availability",
    "Confirming appointment",
];

/// Stops on the booking progress track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStage {
    Search,
    Details,
    Upload,
    Confirm,
    Completed,
}

/// One stop on the booking progress track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BookingStep {
    pub key: BookingStage,
    pub label: &'static str,
    pub progress: u8,
}

pub const BOOKING_STEPS: [BookingStep; 5] = [
    BookingStep { key: BookingStage::Search, label: "Searching Nearest Service", progress: 25 },
    BookingStep { key: BookingStage::Details, label: "Checking Details", progress: 50 },
    BookingStep { key: BookingStage::Upload, label: "Uploading Your Info", progress: 75 },
    BookingStep { key: BookingStage::Confirm, label: "Confirming Booking", progress: 90 },
    BookingStep { key: BookingStage::Completed, label: "Booking Confirmed", progress: 100 },
];

/// Shown after submit, before the first step is reached.
pub const TRACK_START: &str = "Initiating booking process...";

/// Every step of the track, each `gap` after the previous one.
pub fn booking_track(gap: Duration) -> Script<BookingStep> {
    BOOKING_STEPS
        .into_iter()
        .fold(Script::new(), |script, step| script.then(gap, step))
}

/// How far a submitted booking has got.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookingProgress {
    pub step: Option<BookingStep>,
    pub message: Option<String>,
    /// Minted when the track reaches `Completed`.
    pub reference: Option<String>,
}

impl BookingProgress {
    pub fn reach(&mut self, step: BookingStep, service: &MedicalService, at: DateTime<Utc>) {
        let message = match step.key {
            BookingStage::Search => format!("Found {} - {} away", service.name, service.distance),
            BookingStage::Details => "Verified availability and specialist credentials".to_string(),
            BookingStage::Upload => "Securely uploaded your medical information".to_string(),
            BookingStage::Confirm => "Processing appointment confirmation...".to_string(),
            BookingStage::Completed => {
                let reference = booking_reference(at);
                let message = format!("Appointment confirmed! Booking ID: {}", reference);
                self.reference = Some(reference);
                message
            }
        };
        self.step = Some(step);
        self.message = Some(message);
    }
}

/// `ARG-` followed by the last six digits of the millisecond clock.
pub fn booking_reference(at: DateTime<Utc>) -> String {
    format!("ARG-{:06}", at.timestamp_millis().rem_euclid(1_000_000))
}

/// Chat message appended when the booking completes.
pub fn confirmation(
    service: &MedicalService,
    details: &MedicalDetails,
    reference: &str,
    profile: &UserProfile,
) -> String {
    format!(
        "✅ **Appointment Confirmed!**\nBooking ID: `{}`\n🏥 {} ({})\n📍 {}\n📅 {} at {}\n⚡ Urgency: {}\n\nYou'll receive a confirmation email shortly at {}.",
        reference,
        service.name,
        service.specialty,
        service.address,
        details.preferred_date.format("%Y-%m-%d"),
        details.preferred_time.label(),
        details.urgency,
        profile.email,
    )
}
