//! Sessions: one profile, one conversation, at most one open wizard.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use crate::advisory::AdvisoryClient;
use crate::config::Timings;
use crate::conversation::{ChatMessage, ConversationEngine};
use crate::error::{IntakeError, SessionError, WizardError};
use crate::profile::{ProfileForm, UserProfile};
use crate::wizard::medical::{self, BookingProgress, BookingStep};
use crate::wizard::{
    InsuranceDetails, MedicalDetails, Wizard, WizardPhase, WizardTimings, insurance,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WizardKind {
    Medical,
    Insurance,
}

impl std::fmt::Display for WizardKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Medical => write!(f, "medical"),
            Self::Insurance => write!(f, "insurance"),
        }
    }
}

/// The wizard currently open in a session.
pub enum ActiveWizard {
    Medical {
        wizard: Arc<Wizard<MedicalDetails>>,
        progress: Arc<RwLock<BookingProgress>>,
    },
    Insurance {
        wizard: Arc<Wizard<InsuranceDetails>>,
    },
}

impl ActiveWizard {
    pub fn kind(&self) -> WizardKind {
        match self {
            Self::Medical { .. } => WizardKind::Medical,
            Self::Insurance { .. } => WizardKind::Insurance,
        }
    }

    async fn cancel(&self) {
        match self {
            Self::Medical { wizard, .. } => wizard.cancel().await,
            Self::Insurance { wizard } => wizard.cancel().await,
        }
    }

    async fn settle(&self) {
        match self {
            Self::Medical { wizard, .. } => wizard.settle().await,
            Self::Insurance { wizard } => wizard.settle().await,
        }
    }

    async fn status(&self) -> WizardStatus {
        match self {
            Self::Medical { wizard, progress } => {
                let phase = wizard.phase().await;
                let service = wizard.item();
                let progress = progress.read().await.clone();
                let step_message = match progress.message {
                    Some(message) => Some(message),
                    None if phase == WizardPhase::Processing => {
                        Some(medical::TRACK_START.to_string())
                    }
                    None => None,
                };
                WizardStatus {
                    kind: WizardKind::Medical,
                    phase,
                    item_id: service.id.clone(),
                    item_name: service.name.clone(),
                    step: progress.step,
                    step_message,
                    checklist: checklist(phase, &medical::PROCESSING_CHECKLIST),
                    booking_reference: progress.reference,
                }
            }
            Self::Insurance { wizard } => {
                let phase = wizard.phase().await;
                let policy = wizard.item();
                WizardStatus {
                    kind: WizardKind::Insurance,
                    phase,
                    item_id: policy.id.clone(),
                    item_name: policy.name.clone(),
                    step: None,
                    step_message: None,
                    checklist: checklist(phase, &insurance::PROCESSING_CHECKLIST),
                    booking_reference: None,
                }
            }
        }
    }
}

fn checklist(phase: WizardPhase, items: &[&'static str]) -> Vec<&'static str> {
    if phase == WizardPhase::Processing {
        items.to_vec()
    } else {
        Vec::new()
    }
}

/// Snapshot of the open wizard, for clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WizardStatus {
    pub kind: WizardKind,
    pub phase: WizardPhase,
    pub item_id: String,
    pub item_name: String,
    /// Progress track position (medical only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step: Option<BookingStep>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step_message: Option<String>,
    /// Shown while processing.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub checklist: Vec<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub booking_reference: Option<String>,
}

/// One user's conversation.
pub struct Session {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    profile: Arc<UserProfile>,
    engine: Arc<ConversationEngine>,
    wizard: RwLock<Option<ActiveWizard>>,
    timings: Timings,
}

impl Session {
    pub fn new(profile: UserProfile, advisory: AdvisoryClient, timings: Timings) -> Self {
        let profile = Arc::new(profile);
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            engine: Arc::new(ConversationEngine::new(profile.clone(), advisory, timings)),
            profile,
            wizard: RwLock::new(None),
            timings,
        }
    }

    pub fn profile(&self) -> &Arc<UserProfile> {
        &self.profile
    }

    pub fn engine(&self) -> &Arc<ConversationEngine> {
        &self.engine
    }

    /// Open the booking wizard for a service in the current results.
    ///
    /// Any wizard already open is cancelled first.
    pub async fn open_medical(&self, service_id: &str) -> Result<WizardStatus, WizardError> {
        let service = self
            .engine
            .service(service_id)
            .await
            .ok_or_else(|| WizardError::UnknownItem {
                kind: "service",
                id: service_id.to_string(),
            })?;
        info!(session_id = %self.id, service_id = %service_id, "Opening medical wizard");

        let wizard = ActiveWizard::Medical {
            wizard: Arc::new(Wizard::new(
                service,
                WizardTimings {
                    processing: Duration::ZERO,
                    completion: self.timings.medical_completion,
                },
            )),
            progress: Arc::new(RwLock::new(BookingProgress::default())),
        };
        self.replace_wizard(wizard).await
    }

    /// Open the application wizard for a policy in the current results.
    pub async fn open_insurance(&self, policy_id: &str) -> Result<WizardStatus, WizardError> {
        let policy = self
            .engine
            .policy(policy_id)
            .await
            .ok_or_else(|| WizardError::UnknownItem {
                kind: "policy",
                id: policy_id.to_string(),
            })?;
        info!(session_id = %self.id, policy_id = %policy_id, "Opening insurance wizard");

        let wizard = ActiveWizard::Insurance {
            wizard: Arc::new(Wizard::new(
                policy,
                WizardTimings {
                    processing: self.timings.insurance_processing,
                    completion: self.timings.insurance_completion,
                },
            )),
        };
        self.replace_wizard(wizard).await
    }

    async fn replace_wizard(&self, wizard: ActiveWizard) -> Result<WizardStatus, WizardError> {
        let status = wizard.status().await;
        let previous = self.wizard.write().await.replace(wizard);
        if let Some(previous) = previous {
            previous.cancel().await;
        }
        Ok(status)
    }

    /// Submit the medical form. The confirmation lands in the chat log.
    pub async fn submit_medical(&self, details: MedicalDetails) -> Result<WizardStatus, WizardError> {
        let guard = self.wizard.read().await;
        let Some(active) = guard.as_ref() else {
            return Err(WizardError::NotOpen("medical"));
        };
        let ActiveWizard::Medical { wizard, progress } = active else {
            return Err(WizardError::NotOpen("medical"));
        };

        let track_progress = progress.clone();
        let track_service = wizard.item().clone();
        let on_step = move |step: BookingStep| {
            let progress = track_progress.clone();
            let service = track_service.clone();
            async move {
                debug!(step = ?step.key, "Booking track advanced");
                progress.write().await.reach(step, &service, Utc::now());
            }
        };

        let engine = self.engine.clone();
        let profile = self.profile.clone();
        let service = wizard.item().clone();
        let progress = progress.clone();
        wizard
            .submit_tracked(
                details,
                medical::booking_track(self.timings.booking_step),
                on_step,
                move |details| async move {
                    let reference = progress
                        .read()
                        .await
                        .reference
                        .clone()
                        .unwrap_or_else(|| medical::booking_reference(Utc::now()));
                    let text = medical::confirmation(&service, &details, &reference, &profile);
                    engine.post(ChatMessage::ai(text)).await;
                },
            )
            .await?;

        Ok(active.status().await)
    }

    /// Submit the insurance form. The confirmation lands in the chat log.
    pub async fn submit_insurance(
        &self,
        details: InsuranceDetails,
    ) -> Result<WizardStatus, WizardError> {
        let guard = self.wizard.read().await;
        let Some(active) = guard.as_ref() else {
            return Err(WizardError::NotOpen("insurance"));
        };
        let ActiveWizard::Insurance { wizard } = active else {
            return Err(WizardError::NotOpen("insurance"));
        };

        let engine = self.engine.clone();
        let profile = self.profile.clone();
        let policy = wizard.item().clone();
        wizard
            .submit(details, move |details| async move {
                let text = insurance::confirmation(&policy, &details, &profile);
                engine.post(ChatMessage::ai(text)).await;
            })
            .await?;

        Ok(active.status().await)
    }

    pub async fn wizard_status(&self) -> Option<WizardStatus> {
        match self.wizard.read().await.as_ref() {
            Some(active) => Some(active.status().await),
            None => None,
        }
    }

    /// Dismiss the open wizard, aborting its pending steps.
    pub async fn cancel_wizard(&self) -> Result<WizardKind, WizardError> {
        let active = self
            .wizard
            .write()
            .await
            .take()
            .ok_or(WizardError::NotOpen("booking"))?;
        active.cancel().await;
        Ok(active.kind())
    }

    /// Wait for all background work (searches, replies, wizard scripts).
    pub async fn settle(&self) {
        self.engine.settle().await;
        if let Some(active) = self.wizard.read().await.as_ref() {
            active.settle().await;
        }
        // a wizard callback may have appended after the first pass
        self.engine.settle().await;
    }

    /// Abort everything pending.
    pub async fn shutdown(&self) {
        self.engine.shutdown().await;
        if let Some(active) = self.wizard.write().await.take() {
            active.cancel().await;
        }
    }
}

/// All live sessions, keyed by id.
pub struct SessionStore {
    sessions: RwLock<HashMap<Uuid, Arc<Session>>>,
    advisory: AdvisoryClient,
    timings: Timings,
}

impl SessionStore {
    pub fn new(advisory: AdvisoryClient, timings: Timings) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            advisory,
            timings,
        }
    }

    /// Validate the intake form and start a session for it.
    pub async fn create(&self, form: &ProfileForm) -> Result<Arc<Session>, IntakeError> {
        let profile = form.validate()?;
        let session = Arc::new(Session::new(profile, self.advisory.clone(), self.timings));
        info!(session_id = %session.id, name = %session.profile.name, "Session created");
        self.sessions
            .write()
            .await
            .insert(session.id, session.clone());
        Ok(session)
    }

    pub async fn get(&self, id: Uuid) -> Result<Arc<Session>, SessionError> {
        self.sessions
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(SessionError::NotFound(id))
    }

    /// End a session, cancelling its pending work.
    pub async fn remove(&self, id: Uuid) -> Result<(), SessionError> {
        let session = self
            .sessions
            .write()
            .await
            .remove(&id)
            .ok_or(SessionError::NotFound(id))?;
        session.shutdown().await;
        info!(session_id = %id, "Session ended");
        Ok(())
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LlmError;
    use crate::llm::LlmProvider;
    use crate::wizard::{ContactPreference, IncomeBracket, TimeSlot, Urgency};
    use async_trait::async_trait;
    use chrono::Days;

    struct FailingLlm;

    #[async_trait]
    impl LlmProvider for FailingLlm {
        fn model_name(&self) -> &str {
            "failing"
        }

        fn provider_name(&self) -> &str {
            "failing"
        }

        async fn generate(&self, _prompt: &str) -> Result<String, LlmError> {
            Err(LlmError::HttpStatus {
                provider: "failing".to_string(),
                status: 503,
            })
        }
    }

    fn form() -> ProfileForm {
        ProfileForm {
            name: "Arjun".to_string(),
            age: "33".to_string(),
            gender: "male".to_string(),
            phone: "+91 98200 00000".to_string(),
            email: "arjun@example.com".to_string(),
            ..Default::default()
        }
    }

    fn store(timings: Timings) -> SessionStore {
        SessionStore::new(AdvisoryClient::new(Arc::new(FailingLlm)), timings)
    }

    fn medical_details() -> MedicalDetails {
        MedicalDetails {
            symptoms: "knee pain".to_string(),
            urgency: Urgency::Normal,
            preferred_date: Utc::now().date_naive() + Days::new(3),
            preferred_time: TimeSlot::Ten,
            emergency_contact: None,
            additional_notes: None,
        }
    }

    /// Run a search that falls back, leaving `fallback-1` in the catalog.
    async fn with_fallback_service(session: &Session) {
        session.engine().handle_utterance("find a doctor").await;
        session.engine().handle_utterance("Indore").await;
        session.settle().await;
    }

    #[tokio::test]
    async fn invalid_intake_creates_no_session() {
        let store = store(Timings::immediate());
        let mut bad = form();
        bad.age = "0".to_string();
        assert!(store.create(&bad).await.is_err());
        assert_eq!(store.len().await, 0);
    }

    #[tokio::test]
    async fn sessions_can_be_fetched_and_removed() {
        let store = store(Timings::immediate());
        let session = store.create(&form()).await.unwrap();
        assert_eq!(store.get(session.id).await.unwrap().profile().name, "Arjun");

        store.remove(session.id).await.unwrap();
        assert_eq!(store.get(session.id).await.err(), Some(SessionError::NotFound(session.id)));
        assert!(store.remove(session.id).await.is_err());
    }

    #[tokio::test]
    async fn unknown_item_cannot_be_booked() {
        let store = store(Timings::immediate());
        let session = store.create(&form()).await.unwrap();
        let err = session.open_medical("1").await.unwrap_err();
        assert_eq!(
            err,
            WizardError::UnknownItem {
                kind: "service",
                id: "1".to_string()
            }
        );
    }

    #[tokio::test]
    async fn medical_booking_appends_confirmation_once() {
        let store = store(Timings {
            booking_step: Duration::from_millis(5),
            medical_completion: Duration::from_millis(20),
            ..Timings::immediate()
        });
        let session = store.create(&form()).await.unwrap();
        with_fallback_service(&session).await;

        let status = session.open_medical("fallback-1").await.unwrap();
        assert_eq!(status.phase, WizardPhase::Form);
        assert_eq!(status.item_name, "General Hospital");

        let status = session.submit_medical(medical_details()).await.unwrap();
        assert_eq!(status.phase, WizardPhase::Processing);
        assert_eq!(status.checklist.len(), 3);
        assert_eq!(status.booking_reference, None);
        session.settle().await;

        let status = session.wizard_status().await.unwrap();
        assert_eq!(status.phase, WizardPhase::Completed);
        let reference = status.booking_reference.unwrap();
        assert!(reference.starts_with("ARG-"));

        let messages = session.engine().messages().await;
        let confirmations: Vec<_> = messages
            .iter()
            .filter(|m| m.content.contains("Appointment Confirmed"))
            .collect();
        assert_eq!(confirmations.len(), 1);
        assert!(confirmations[0].content.contains(&reference));
    }

    #[tokio::test]
    async fn booking_track_advances_in_order_then_completes() {
        let store = store(Timings {
            booking_step: Duration::from_millis(40),
            ..Timings::immediate()
        });
        let session = store.create(&form()).await.unwrap();
        with_fallback_service(&session).await;
        session.open_medical("fallback-1").await.unwrap();

        let status = session.submit_medical(medical_details()).await.unwrap();
        assert_eq!(status.step, None);
        assert_eq!(status.step_message.as_deref(), Some(medical::TRACK_START));

        let mut seen: Vec<u8> = Vec::new();
        loop {
            let status = session.wizard_status().await.unwrap();
            if let Some(step) = status.step {
                if seen.last() != Some(&step.progress) {
                    seen.push(step.progress);
                }
            }
            if status.phase == WizardPhase::Completed {
                assert!(status.step_message.unwrap().contains("Booking ID: ARG-"));
                break;
            }
            if status.booking_reference.is_some() {
                assert_eq!(status.step.map(|s| s.progress), Some(100));
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        session.settle().await;

        assert!(seen.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(seen.first(), Some(&25));
        assert_eq!(seen.last(), Some(&100));
    }

    #[tokio::test]
    async fn submitting_the_wrong_form_is_rejected() {
        let store = store(Timings::immediate());
        let session = store.create(&form()).await.unwrap();
        with_fallback_service(&session).await;
        session.open_medical("fallback-1").await.unwrap();

        let details = InsuranceDetails {
            full_name: "Arjun".to_string(),
            date_of_birth: chrono::NaiveDate::from_ymd_opt(1991, 2, 3).unwrap(),
            occupation: "Teacher".to_string(),
            annual_income: IncomeBracket::From3To5Lakh,
            existing_conditions: None,
            family_members: 2,
            preferred_coverage: None,
            contact_preference: ContactPreference::Both,
        };
        assert_eq!(
            session.submit_insurance(details).await.unwrap_err(),
            WizardError::NotOpen("insurance")
        );
    }

    #[tokio::test]
    async fn cancelled_booking_never_confirms() {
        let timings = Timings {
            booking_step: Duration::from_millis(50),
            medical_completion: Duration::from_millis(50),
            ..Timings::immediate()
        };
        let store = store(timings);
        let session = store.create(&form()).await.unwrap();
        with_fallback_service(&session).await;

        session.open_medical("fallback-1").await.unwrap();
        session.submit_medical(medical_details()).await.unwrap();
        assert_eq!(session.cancel_wizard().await.unwrap(), WizardKind::Medical);
        tokio::time::sleep(Duration::from_millis(200)).await;
        session.settle().await;

        assert!(session.wizard_status().await.is_none());
        let messages = session.engine().messages().await;
        assert!(messages.iter().all(|m| !m.content.contains("Appointment Confirmed")));
        assert_eq!(session.cancel_wizard().await.unwrap_err(), WizardError::NotOpen("booking"));
    }

    #[tokio::test]
    async fn insurance_application_flow() {
        let store = store(Timings::immediate());
        let session = store.create(&form()).await.unwrap();
        session.engine().handle_utterance("any good insurance?").await;
        session.settle().await;

        session.open_insurance("fallback-1").await.unwrap();
        let details: InsuranceDetails = serde_json::from_str(
            r#"{"fullName":"Arjun Rao","dateOfBirth":"1991-02-03","occupation":"Teacher","annualIncome":"3-5lakh","familyMembers":3}"#,
        )
        .unwrap();
        session.submit_insurance(details).await.unwrap();
        session.settle().await;

        let last = session.engine().messages().await.pop().unwrap();
        assert!(last.content.contains("Application Submitted"));
        assert!(last.content.contains("3 covered"));
    }
}
