//! Prompt templates for the advisory endpoint.

use crate::profile::UserProfile;

const PERSONA: &str = "You are Arogya AI, a medical assistant.";

const JSON_ONLY: &str = "IMPORTANT: You must respond with ONLY a valid JSON object, no other text.";

/// Free-text chat prompt: the user's message plus their profile as JSON.
pub fn chat_prompt(message: &str, profile: &UserProfile) -> String {
    let context = serde_json::to_string(profile).unwrap_or_default();
    format!(
        "You are Arogya AI, a helpful medical assistant chatbot.\n\
User message: \"{message}\"\n\
User context: {context}\n\n\
Provide a helpful, professional medical response. Be empathetic and informative but always \
recommend consulting with healthcare professionals for serious concerns."
    )
}

/// Structured prompt asking for medical services near `location`.
pub fn service_search_prompt(location: &str, profile: &UserProfile) -> String {
    let mut lines = vec![
        format!("{PERSONA} A user in {location} is looking for medical services."),
        format!("User Info: {}", profile.summary_line()),
    ];
    if let Some(ref symptoms) = profile.current_symptoms {
        lines.push(format!("Current Symptoms: {symptoms}"));
    }
    lines.push(String::new());
    lines.push(format!(
        "{JSON_ONLY} Generate realistic medical services for {location}."
    ));
    lines.push(String::new());
    lines.push(service_example(location));
    lines.join("\n")
}

/// Structured prompt asking for insurance policies suited to the profile.
pub fn policy_search_prompt(profile: &UserProfile) -> String {
    let mut lines = vec![
        format!("{PERSONA} A user is looking for health insurance policies."),
        format!("User Info: {}", profile.summary_line()),
    ];
    if let Some(ref symptoms) = profile.current_symptoms {
        lines.push(format!("Current Health Concerns: {symptoms}"));
    }
    if let Some(ref history) = profile.medical_history {
        lines.push(format!("Medical History: {history}"));
    }
    lines.push(String::new());
    lines.push(format!(
        "{JSON_ONLY} Generate realistic health insurance policies suitable for this user."
    ));
    lines.push(String::new());
    lines.push(POLICY_EXAMPLE.to_string());
    lines.join("\n")
}

fn service_example(location: &str) -> String {
    serde_json::to_string_pretty(&serde_json::json!({
        "type": "services",
        "message": "Found medical services near your location",
        "data": {
            "services": [
                {
                    "id": "1",
                    "name": "City General Hospital",
                    "specialty": "General Medicine",
                    "rating": 4.5,
                    "distance": "2.3 km",
                    "address": format!("123 Medical St, {location}"),
                    "phone": "+1-555-0123",
                    "availability": ["9:00 AM", "2:00 PM", "4:30 PM"],
                    "price": "$150"
                },
                {
                    "id": "2",
                    "name": "Heart Care Clinic",
                    "specialty": "Cardiology",
                    "rating": 4.8,
                    "distance": "1.8 km",
                    "address": format!("456 Health Ave, {location}"),
                    "phone": "+1-555-0124",
                    "availability": ["10:00 AM", "3:00 PM", "5:00 PM"],
                    "price": "$200"
                },
                {
                    "id": "3",
                    "name": "Family Health Center",
                    "specialty": "Family Medicine",
                    "rating": 4.3,
                    "distance": "3.1 km",
                    "address": format!("789 Wellness Blvd, {location}"),
                    "phone": "+1-555-0125",
                    "availability": ["8:00 AM", "1:00 PM", "6:00 PM"],
                    "price": "$120"
                }
            ]
        }
    }))
    .unwrap_or_default()
}

const POLICY_EXAMPLE: &str = r#"{
  "type": "insurance",
  "message": "Found health insurance policies suitable for you",
  "data": {
    "policies": [
      {
        "id": "1",
        "name": "Comprehensive Health Plus",
        "provider": "HealthGuard Insurance",
        "type": "Individual",
        "coverage": "₹10,00,000",
        "premium": "₹15,000/year",
        "deductible": "₹5,000",
        "benefits": ["Hospitalization", "Pre & Post Hospitalization", "Day Care Procedures", "Ambulance", "Health Checkups"],
        "ageLimit": "18-65 years",
        "waitingPeriod": "30 days",
        "rating": 4.6
      },
      {
        "id": "2",
        "name": "Family Care Shield",
        "provider": "MediSecure Ltd",
        "type": "Family Floater",
        "coverage": "₹15,00,000",
        "premium": "₹22,000/year",
        "deductible": "₹7,500",
        "benefits": ["Family Coverage", "Maternity Benefits", "Critical Illness", "Mental Health", "Telemedicine"],
        "ageLimit": "18-70 years",
        "waitingPeriod": "45 days",
        "rating": 4.8
      },
      {
        "id": "3",
        "name": "Basic Health Protect",
        "provider": "SafeHealth Corp",
        "type": "Individual",
        "coverage": "₹5,00,000",
        "premium": "₹8,500/year",
        "deductible": "₹3,000",
        "benefits": ["Basic Hospitalization", "Emergency Care", "Diagnostic Tests", "Pharmacy Benefits"],
        "ageLimit": "18-60 years",
        "waitingPeriod": "30 days",
        "rating": 4.2
      },
      {
        "id": "4",
        "name": "Premium Health Elite",
        "provider": "EliteHealth Insurance",
        "type": "Individual",
        "coverage": "₹25,00,000",
        "premium": "₹35,000/year",
        "deductible": "₹10,000",
        "benefits": ["Worldwide Coverage", "Organ Transplant", "Cancer Treatment", "Preventive Care", "Wellness Programs"],
        "ageLimit": "21-75 years",
        "waitingPeriod": "90 days",
        "rating": 4.9
      }
    ]
  }
}"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::advisory::catalog::{PolicySearch, ServiceSearch};
    use crate::llm::structured::Envelope;
    use crate::profile::Gender;

    fn profile(symptoms: Option<&str>, history: Option<&str>) -> UserProfile {
        UserProfile {
            name: "Meera".to_string(),
            age: 29,
            gender: Gender::Female,
            phone: "5550101".to_string(),
            email: "meera@example.com".to_string(),
            medical_history: history.map(str::to_string),
            current_symptoms: symptoms.map(str::to_string),
        }
    }

    #[test]
    fn service_prompt_includes_symptoms_only_when_present() {
        let with = service_search_prompt("Chennai", &profile(Some("back pain"), None));
        assert!(with.contains("A user in Chennai is looking for medical services."));
        assert!(with.contains("Name: Meera, Age: 29, Gender: female"));
        assert!(with.contains("Current Symptoms: back pain"));

        let without = service_search_prompt("Chennai", &profile(None, None));
        assert!(!without.contains("Current Symptoms"));
    }

    #[test]
    fn policy_prompt_includes_history_only_when_present() {
        let p = policy_search_prompt(&profile(None, Some("asthma")));
        assert!(p.contains("Medical History: asthma"));
        assert!(!p.contains("Current Health Concerns"));
    }

    #[test]
    fn chat_prompt_embeds_profile_json() {
        let p = chat_prompt("Is ginger tea good for a cold?", &profile(Some("cold"), None));
        assert!(p.contains("User message: \"Is ginger tea good for a cold?\""));
        assert!(p.contains("\"currentSymptoms\":\"cold\""));
    }

    #[test]
    fn embedded_examples_match_the_typed_payloads() {
        let services: Envelope<ServiceSearch> =
            serde_json::from_str(&service_example("Delhi")).unwrap();
        assert_eq!(services.data.services.len(), 3);
        assert_eq!(services.data.services[1].address, "456 Health Ave, Delhi");

        let policies: Envelope<PolicySearch> = serde_json::from_str(POLICY_EXAMPLE).unwrap();
        assert_eq!(policies.kind, "insurance");
        assert_eq!(policies.data.policies.len(), 4);
    }
}
