//! Conversation engine: routes utterances and drives the search sub-flows.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use super::intent::{Intent, IntentRouter};
use super::log::MessageLog;
use super::message::{ChatMessage, MessageAction};
use super::subflow::SubFlowState;
use super::templates;
use crate::advisory::{AdvisoryClient, Catalog, CatalogSource, InsurancePolicy, MedicalService};
use crate::config::Timings;
use crate::error::{LlmError, SessionError};
use crate::profile::UserProfile;
use crate::schedule::{Script, ScheduledTask};

const SERVICE_SEARCH_TASK: &str = "service_search";
const POLICY_SEARCH_TASK: &str = "policy_search";
const CHAT_TASK: &str = "chat_reply";

/// What `handle_utterance` decided to do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    /// Blank input; nothing appended.
    Ignored,
    /// Forwarded to the advisory chat; the reply is appended in the background.
    ChatRequested,
    /// Asked the user for a location.
    LocationRequested,
    ServiceSearchStarted { location: String },
    InsuranceSearchStarted,
}

/// State shared with background tasks.
struct Shared {
    profile: Arc<UserProfile>,
    advisory: AdvisoryClient,
    timings: Timings,
    log: Arc<MessageLog>,
    state: RwLock<SubFlowState>,
    catalog: RwLock<Catalog>,
}

impl Shared {
    /// Move to `target` if the transition is valid.
    async fn transition(&self, target: SubFlowState) -> bool {
        let mut state = self.state.write().await;
        if !state.can_transition_to(target) {
            warn!(from = %*state, to = %target, "Rejected sub-flow transition");
            return false;
        }
        debug!(from = %*state, to = %target, "Sub-flow transition");
        *state = target;
        true
    }

    async fn run_chat(&self, text: String) {
        match self.advisory.chat(&text, &self.profile).await {
            Ok(reply) => {
                if !self.timings.chat_reply.is_zero() {
                    tokio::time::sleep(self.timings.chat_reply).await;
                }
                self.log.append(ChatMessage::ai(reply)).await;
            }
            Err(LlmError::EmptyResponse { .. }) => {
                debug!("Chat reply was empty, asking to rephrase");
                self.log.append(ChatMessage::ai(templates::REPHRASE)).await;
            }
            Err(e) => {
                warn!(error = %e, "Chat request failed");
                self.log.append(ChatMessage::ai(templates::CHAT_APOLOGY)).await;
            }
        }
    }

    async fn run_service_search(&self, location: String) {
        self.play_status(&templates::SERVICE_SEARCH_STATUS).await;

        let (services, source) = match self.advisory.search_services(&location, &self.profile).await
        {
            Ok(found) => {
                self.log
                    .append(ChatMessage::ai(templates::services_intro(
                        found.services.len(),
                        &location,
                    )))
                    .await;
                (found.services, CatalogSource::Live)
            }
            Err(e) => {
                warn!(error = %e, location = %location, "Service search failed, showing fallback");
                self.log
                    .append(ChatMessage::ai(templates::services_unavailable(&location)))
                    .await;
                (vec![MedicalService::fallback(&location)], CatalogSource::Fallback)
            }
        };

        self.catalog
            .write()
            .await
            .replace_services(services.clone(), source);

        let items = services.iter().map(|s| {
            ChatMessage::ai(templates::service_card(s))
                .with_action(MessageAction::book_service(s.id.clone()))
        });
        self.play_items(items).await;

        info!(count = services.len(), source = ?source, "Service results shown");
        self.transition(SubFlowState::ServicesShown).await;
    }

    async fn run_policy_search(&self) {
        self.play_status(&templates::POLICY_SEARCH_STATUS).await;

        let (policies, source) = match self.advisory.search_policies(&self.profile).await {
            Ok(found) => {
                self.log
                    .append(ChatMessage::ai(templates::policies_intro(found.policies.len())))
                    .await;
                (found.policies, CatalogSource::Live)
            }
            Err(e) => {
                warn!(error = %e, "Insurance search failed, showing fallback");
                self.log
                    .append(ChatMessage::ai(templates::POLICIES_UNAVAILABLE))
                    .await;
                (vec![InsurancePolicy::fallback()], CatalogSource::Fallback)
            }
        };

        self.catalog
            .write()
            .await
            .replace_policies(policies.clone(), source);

        let items = policies.iter().map(|p| {
            ChatMessage::ai(templates::policy_card(p))
                .with_action(MessageAction::choose_policy(p.id.clone()))
        });
        self.play_items(items).await;

        info!(count = policies.len(), source = ?source, "Insurance results shown");
        self.transition(SubFlowState::PoliciesShown).await;
    }

    /// Status lines one step apart, then one more step before the request.
    async fn play_status(&self, lines: &[&str]) {
        let log: &MessageLog = &self.log;
        Script::evenly_spaced(self.timings.search_step, lines.iter().copied())
            .play(move |line| log.append(ChatMessage::system(line)))
            .await;
        if !self.timings.search_step.is_zero() {
            tokio::time::sleep(self.timings.search_step).await;
        }
    }

    async fn play_items(&self, items: impl Iterator<Item = ChatMessage>) {
        let log: &MessageLog = &self.log;
        Script::evenly_spaced(self.timings.result_item, items)
            .play(move |message| log.append(message))
            .await;
    }
}

/// Owns one conversation: its log, sub-flow state, catalog and pending work.
pub struct ConversationEngine {
    shared: Arc<Shared>,
    router: IntentRouter,
    tasks: Mutex<Vec<ScheduledTask>>,
}

impl ConversationEngine {
    pub fn new(profile: Arc<UserProfile>, advisory: AdvisoryClient, timings: Timings) -> Self {
        let log = Arc::new(MessageLog::new(ChatMessage::ai(profile.greeting())));
        Self {
            shared: Arc::new(Shared {
                profile,
                advisory,
                timings,
                log,
                state: RwLock::new(SubFlowState::Idle),
                catalog: RwLock::new(Catalog::new()),
            }),
            router: IntentRouter::default_rules(),
            tasks: Mutex::new(Vec::new()),
        }
    }

    /// Replace the routing table.
    pub fn with_router(mut self, router: IntentRouter) -> Self {
        self.router = router;
        self
    }

    pub fn profile(&self) -> &Arc<UserProfile> {
        &self.shared.profile
    }

    pub fn log(&self) -> &Arc<MessageLog> {
        &self.shared.log
    }

    /// Handle one user utterance.
    pub async fn handle_utterance(&self, text: &str) -> Outcome {
        let text = text.trim();
        if text.is_empty() {
            return Outcome::Ignored;
        }

        self.shared.log.append(ChatMessage::user(text)).await;

        let intent = self.router.evaluate(text);
        if intent != Intent::InsuranceSearch && self.subflow_state().await.is_collecting() {
            debug!("Utterance taken as location");
            return self.start_service_search(text.to_string()).await;
        }

        match intent {
            Intent::InsuranceSearch => self.start_policy_search().await,
            Intent::ServiceSearch => {
                self.cancel_searches().await;
                self.shared.transition(SubFlowState::CollectingLocation).await;
                self.shared
                    .log
                    .append(ChatMessage::ai(templates::LOCATION_PROMPT))
                    .await;
                Outcome::LocationRequested
            }
            Intent::Chat => {
                let shared = self.shared.clone();
                let text = text.to_string();
                self.track(ScheduledTask::spawn(CHAT_TASK, async move {
                    shared.run_chat(text).await;
                }))
                .await;
                Outcome::ChatRequested
            }
        }
    }

    /// Answer an outstanding location request.
    pub async fn submit_location(&self, location: &str) -> Result<Outcome, SessionError> {
        let location = location.trim();
        if location.is_empty() {
            return Err(SessionError::EmptyLocation);
        }
        let state = self.subflow_state().await;
        if !state.is_collecting() {
            return Err(SessionError::UnexpectedLocation(state.to_string()));
        }
        Ok(self.start_service_search(location.to_string()).await)
    }

    /// Stop any running search and return to idle. History is kept.
    pub async fn abandon_subflow(&self) {
        self.cancel_searches().await;
        self.shared.transition(SubFlowState::Idle).await;
        info!("Sub-flow abandoned");
    }

    /// Cancel everything pending and reset the log to the greeting.
    pub async fn clear(&self) {
        let tasks = std::mem::take(&mut *self.tasks.lock().await);
        cancel_and_join(tasks).await;
        self.shared.transition(SubFlowState::Idle).await;
        self.shared.catalog.write().await.clear();
        self.shared
            .log
            .reset(ChatMessage::ai(self.shared.profile.greeting()))
            .await;
    }

    /// Append a message produced outside the engine (wizard confirmations).
    pub async fn post(&self, message: ChatMessage) {
        self.shared.log.append(message).await;
    }

    pub async fn messages(&self) -> Vec<ChatMessage> {
        self.shared.log.snapshot().await
    }

    pub async fn catalog(&self) -> Catalog {
        self.shared.catalog.read().await.clone()
    }

    pub async fn service(&self, id: &str) -> Option<MedicalService> {
        self.shared.catalog.read().await.service(id).cloned()
    }

    pub async fn policy(&self, id: &str) -> Option<InsurancePolicy> {
        self.shared.catalog.read().await.policy(id).cloned()
    }

    pub async fn subflow_state(&self) -> SubFlowState {
        *self.shared.state.read().await
    }

    /// Wait until every background task has finished or been cancelled.
    pub async fn settle(&self) {
        loop {
            let tasks = std::mem::take(&mut *self.tasks.lock().await);
            if tasks.is_empty() {
                return;
            }
            for task in tasks {
                task.join().await;
            }
        }
    }

    /// Cancel every pending task, e.g. when the session ends.
    pub async fn shutdown(&self) {
        for task in self.tasks.lock().await.drain(..) {
            task.cancel();
        }
    }

    async fn start_service_search(&self, location: String) -> Outcome {
        self.cancel_searches().await;
        self.shared.transition(SubFlowState::SearchingServices).await;
        info!(location = %location, "Starting service search");

        let shared = self.shared.clone();
        let task_location = location.clone();
        self.track(ScheduledTask::spawn(SERVICE_SEARCH_TASK, async move {
            shared.run_service_search(task_location).await;
        }))
        .await;
        Outcome::ServiceSearchStarted { location }
    }

    async fn start_policy_search(&self) -> Outcome {
        self.cancel_searches().await;
        self.shared.transition(SubFlowState::SearchingPolicies).await;
        info!("Starting insurance search");

        let shared = self.shared.clone();
        self.track(ScheduledTask::spawn(POLICY_SEARCH_TASK, async move {
            shared.run_policy_search().await;
        }))
        .await;
        Outcome::InsuranceSearchStarted
    }

    async fn cancel_searches(&self) {
        let searches = {
            let mut tasks = self.tasks.lock().await;
            let (searches, rest): (Vec<_>, Vec<_>) = std::mem::take(&mut *tasks)
                .into_iter()
                .partition(|task| matches!(task.label(), SERVICE_SEARCH_TASK | POLICY_SEARCH_TASK));
            *tasks = rest;
            searches
        };
        cancel_and_join(searches).await;
    }

    async fn track(&self, task: ScheduledTask) {
        let mut tasks = self.tasks.lock().await;
        tasks.retain(|t| !t.is_finished());
        tasks.push(task);
    }
}

/// Abort the tasks and wait until none of them can append again.
async fn cancel_and_join(tasks: Vec<ScheduledTask>) {
    for task in &tasks {
        task.cancel();
    }
    for task in tasks {
        task.join().await;
    }
}
