//! Booking and application wizards.
//!
//! Every wizard runs `form → processing → completed`. Submitting validated
//! details starts a scripted task that may first play a progress track, then
//! advances the phase after a fixed delay and, after a further delay, hands
//! the details to the completion callback. Cancelling aborts the script, so
//! neither the remaining track steps nor the callback fire.

pub mod insurance;
pub mod medical;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};

use crate::error::WizardError;
use crate::schedule::{ScheduledTask, Script};

pub use insurance::{ContactPreference, IncomeBracket, InsuranceDetails};
pub use medical::{MedicalDetails, TimeSlot, Urgency};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WizardPhase {
    #[default]
    Form,
    Processing,
    Completed,
    Cancelled,
}

impl WizardPhase {
    /// Check if a transition from `self` to `target` is valid.
    pub fn can_transition_to(&self, target: WizardPhase) -> bool {
        use WizardPhase::*;
        matches!(
            (self, target),
            (Form, Processing) | (Processing, Completed) | (Form | Processing | Completed, Cancelled)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }
}

impl std::fmt::Display for WizardPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Form => "form",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        };
        write!(f, "{s}")
    }
}

/// Details a wizard collects for one catalog item.
pub trait WizardForm: Clone + Send + Sync + 'static {
    /// The catalog item the wizard was opened for.
    type Item: Clone + Send + Sync + 'static;

    /// Short name for logs and errors.
    const KIND: &'static str;

    /// Validate and fill defaults. Returns the details the callback receives.
    fn normalize(self, item: &Self::Item) -> Result<Self, WizardError>;
}

/// Delays of the scripted processing phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WizardTimings {
    /// processing → completed
    pub processing: Duration,
    /// completed → callback
    pub completion: Duration,
}

/// One open wizard for one item.
pub struct Wizard<D: WizardForm> {
    item: D::Item,
    timings: WizardTimings,
    phase: Arc<RwLock<WizardPhase>>,
    submitted: RwLock<Option<D>>,
    task: Mutex<Option<ScheduledTask>>,
}

impl<D: WizardForm> Wizard<D> {
    pub fn new(item: D::Item, timings: WizardTimings) -> Self {
        Self {
            item,
            timings,
            phase: Arc::new(RwLock::new(WizardPhase::Form)),
            submitted: RwLock::new(None),
            task: Mutex::new(None),
        }
    }

    pub fn item(&self) -> &D::Item {
        &self.item
    }

    pub async fn phase(&self) -> WizardPhase {
        *self.phase.read().await
    }

    /// The validated details, once submitted.
    pub async fn submitted(&self) -> Option<D> {
        self.submitted.read().await.clone()
    }

    /// Validate `details`, enter processing and start the script.
    ///
    /// `on_complete` runs at most once, after both delays, unless the wizard
    /// is cancelled first. A second submit is rejected.
    pub async fn submit<F, Fut>(&self, details: D, on_complete: F) -> Result<(), WizardError>
    where
        F: FnOnce(D) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.submit_tracked(details, Script::<()>::new(), |_| async {}, on_complete)
            .await
    }

    /// Like [`submit`](Self::submit), but plays `track` through `on_step`
    /// while processing, before the processing delay starts.
    pub async fn submit_tracked<P, S, SFut, F, Fut>(
        &self,
        details: D,
        track: Script<P>,
        on_step: S,
        on_complete: F,
    ) -> Result<(), WizardError>
    where
        P: Send + 'static,
        S: FnMut(P) -> SFut + Send + 'static,
        SFut: Future<Output = ()> + Send + 'static,
        F: FnOnce(D) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        {
            let mut phase = self.phase.write().await;
            if *phase != WizardPhase::Form {
                warn!(wizard = D::KIND, phase = %*phase, "Rejected submit outside the form step");
                return Err(WizardError::AlreadySubmitted {
                    phase: phase.to_string(),
                });
            }
            let details = details.normalize(&self.item)?;
            *self.submitted.write().await = Some(details);
            *phase = WizardPhase::Processing;
        }
        info!(wizard = D::KIND, "Wizard submitted, processing");

        let details = self.submitted().await.ok_or(WizardError::NotOpen(D::KIND))?;
        let phase = self.phase.clone();
        let timings = self.timings;
        let task = ScheduledTask::spawn(D::KIND, async move {
            track.play(on_step).await;
            tokio::time::sleep(timings.processing).await;
            if !advance(&phase, WizardPhase::Completed).await {
                return;
            }
            info!(wizard = D::KIND, "Wizard completed");
            tokio::time::sleep(timings.completion).await;
            on_complete(details).await;
        });
        *self.task.lock().await = Some(task);
        Ok(())
    }

    /// Abort any pending steps. The callback will not run.
    pub async fn cancel(&self) {
        if let Some(task) = self.task.lock().await.take() {
            task.cancel();
        }
        let mut phase = self.phase.write().await;
        if phase.can_transition_to(WizardPhase::Cancelled) {
            *phase = WizardPhase::Cancelled;
            info!(wizard = D::KIND, "Wizard cancelled");
        }
    }

    /// Wait for the scripted phase to finish (or be cancelled).
    pub async fn settle(&self) {
        let task = self.task.lock().await.take();
        if let Some(task) = task {
            task.join().await;
        }
    }
}

async fn advance(phase: &RwLock<WizardPhase>, target: WizardPhase) -> bool {
    let mut phase = phase.write().await;
    if !phase.can_transition_to(target) {
        return false;
    }
    *phase = target;
    true
}

fn required(field: &'static str, value: &str) -> Result<String, WizardError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(WizardError::MissingField(field))
    } else {
        Ok(trimmed.to_string())
    }
}

fn optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
