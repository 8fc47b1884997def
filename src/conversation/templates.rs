//! Canned assistant text and the result-item message templates.

use crate::advisory::{InsurancePolicy, MedicalService};

pub const LOCATION_PROMPT: &str = "I can help you find medical services! Please share your location so I can search for nearby healthcare providers.";

pub const CHAT_APOLOGY: &str =
    "I apologize, but I'm having trouble processing your request right now. Please try again.";

pub const REPHRASE: &str =
    "I'm here to help with your health questions. Could you please rephrase that?";

pub const SERVICE_SEARCH_STATUS: [&str; 3] = [
    "Searching for medical services near you...",
    "Checking availability and ratings...",
    "Preparing your options...",
];

pub const POLICY_SEARCH_STATUS: [&str; 4] = [
    "Analyzing your health profile...",
    "Searching for suitable insurance policies...",
    "Comparing coverage and premiums...",
    "Preparing personalized recommendations...",
];

pub fn services_intro(count: usize, location: &str) -> String {
    format!("Great! I found {count} medical services near {location}. Here are your options:")
}

pub fn policies_intro(count: usize) -> String {
    format!("Great! I found {count} insurance policies suitable for you. Here are your options:")
}

pub fn services_unavailable(location: &str) -> String {
    format!(
        "Sorry, I couldn't find medical services right now. Live results are unavailable, so here is a general option near {location} you can still book:"
    )
}

pub const POLICIES_UNAVAILABLE: &str = "Sorry, I couldn't find insurance policies right now. Live results are unavailable, so here is a basic plan you can still consider:";

/// One result message per service.
pub fn service_card(service: &MedicalService) -> String {
    format!(
        "**{}**\n📍 {}\n⭐ {}/5 rating\n🏥 {}\n📞 {}\n💰 Starting from {}\n🕒 Available: {}\n\nWould you like to book an appointment here?",
        service.name,
        service.address,
        service.rating,
        service.specialty,
        service.phone,
        service.price,
        service.availability.join(", "),
    )
}

/// One result message per policy.
pub fn policy_card(policy: &InsurancePolicy) -> String {
    format!(
        "**{}**\n🏢 {}\n📋 {} plan\n🛡️ Coverage: {}\n💰 Premium: {}\n💳 Deductible: {}\n⭐ {}/5 rating\n👤 Age limit: {}\n⏳ Waiting period: {}\n✅ Benefits: {}\n\nWould you like to apply for this policy?",
        policy.name,
        policy.provider,
        policy.policy_type,
        policy.coverage,
        policy.premium,
        policy.deductible,
        policy.rating,
        policy.age_limit,
        policy.waiting_period,
        policy.benefits.join(", "),
    )
}
