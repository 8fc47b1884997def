//! Advisory client: the three call shapes the conversation needs, built on
//! a single [`LlmProvider`].

pub mod catalog;
pub mod prompts;

use std::sync::Arc;

use tracing::{debug, info};

use crate::error::LlmError;
use crate::llm::LlmProvider;
use crate::llm::structured::parse_envelope;
use crate::profile::UserProfile;

pub use catalog::{
    Catalog, CatalogSource, InsurancePolicy, MedicalService, PolicySearch, ServiceSearch,
};

/// Thin wrapper turning prompts into chat text or validated search payloads.
#[derive(Clone)]
pub struct AdvisoryClient {
    llm: Arc<dyn LlmProvider>,
}

impl AdvisoryClient {
    pub fn new(llm: Arc<dyn LlmProvider>) -> Self {
        Self { llm }
    }

    /// Free-text answer to `message`. A blank reply is `EmptyResponse`.
    pub async fn chat(&self, message: &str, profile: &UserProfile) -> Result<String, LlmError> {
        let prompt = prompts::chat_prompt(message, profile);
        let reply = self.llm.generate(&prompt).await?;
        if reply.trim().is_empty() {
            return Err(LlmError::EmptyResponse {
                provider: self.llm.provider_name().to_string(),
            });
        }
        debug!(reply_len = reply.len(), "Chat reply received");
        Ok(reply)
    }

    /// Medical services near `location`, validated.
    pub async fn search_services(
        &self,
        location: &str,
        profile: &UserProfile,
    ) -> Result<ServiceSearch, LlmError> {
        let prompt = prompts::service_search_prompt(location, profile);
        let raw = self.llm.generate(&prompt).await?;
        let envelope = parse_envelope(self.llm.provider_name(), &raw, "services", |d: &ServiceSearch| {
            d.services.as_slice()
        })?;
        info!(
            location = %location,
            count = envelope.data.services.len(),
            "Service search returned results"
        );
        Ok(envelope.data)
    }

    /// Insurance policies suited to the profile, validated.
    pub async fn search_policies(&self, profile: &UserProfile) -> Result<PolicySearch, LlmError> {
        let prompt = prompts::policy_search_prompt(profile);
        let raw = self.llm.generate(&prompt).await?;
        let envelope = parse_envelope(self.llm.provider_name(), &raw, "insurance", |d: &PolicySearch| {
            d.policies.as_slice()
        })?;
        info!(
            count = envelope.data.policies.len(),
            "Insurance search returned results"
        );
        Ok(envelope.data)
    }
}
