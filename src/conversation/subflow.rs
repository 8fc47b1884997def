//! Search sub-flow state machine.

use serde::{Deserialize, Serialize};

/// Where the conversation is in a search sub-flow.
///
/// Service search: Idle → CollectingLocation → SearchingServices → ServicesShown.
/// Insurance search skips input collection: Idle → SearchingPolicies → PoliciesShown.
/// Any state may return to Idle (abandon/clear), and a new search may start
/// from any state, replacing the running one. An insurance request while
/// collecting drops the pending location prompt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubFlowState {
    #[default]
    Idle,
    CollectingLocation,
    SearchingServices,
    ServicesShown,
    SearchingPolicies,
    PoliciesShown,
}

impl SubFlowState {
    /// Check if a transition from `self` to `target` is valid.
    pub fn can_transition_to(&self, target: SubFlowState) -> bool {
        use SubFlowState::*;
        matches!(
            (self, target),
            (_, Idle)
                | (
                    Idle | SearchingServices | ServicesShown | SearchingPolicies | PoliciesShown,
                    CollectingLocation | SearchingPolicies
                )
                | (CollectingLocation, SearchingServices | SearchingPolicies)
                | (SearchingServices, ServicesShown)
                | (SearchingPolicies, PoliciesShown)
        )
    }

    /// While collecting, the next utterance is the location.
    pub fn is_collecting(&self) -> bool {
        matches!(self, Self::CollectingLocation)
    }

    pub fn is_searching(&self) -> bool {
        matches!(self, Self::SearchingServices | Self::SearchingPolicies)
    }
}

impl std::fmt::Display for SubFlowState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::CollectingLocation => "collecting_location",
            Self::SearchingServices => "searching_services",
            Self::ServicesShown => "services_shown",
            Self::SearchingPolicies => "searching_policies",
            Self::PoliciesShown => "policies_shown",
        };
        write!(f, "{s}")
    }
}
