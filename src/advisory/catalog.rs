//! Catalog items returned by searches, and the per-session lookup set.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::llm::structured::Identified;

/// A bookable medical service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MedicalService {
    pub id: String,
    pub name: String,
    pub specialty: String,
    pub rating: f64,
    pub distance: String,
    pub address: String,
    pub phone: String,
    #[serde(default)]
    pub availability: Vec<String>,
    pub price: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl Identified for MedicalService {
    fn id(&self) -> &str {
        &self.id
    }
}

impl MedicalService {
    /// The single substitute shown when a live search fails.
    pub fn fallback(location: &str) -> Self {
        Self {
            id: "fallback-1".to_string(),
            name: "General Hospital".to_string(),
            specialty: "General Medicine".to_string(),
            rating: 4.2,
            distance: "2.5 km".to_string(),
            address: format!("Main Street, {}", location),
            phone: "+1-555-0100".to_string(),
            availability: vec![
                "9:00 AM".to_string(),
                "2:00 PM".to_string(),
                "4:00 PM".to_string(),
            ],
            price: "$150".to_string(),
            image: None,
        }
    }
}

/// A health insurance policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsurancePolicy {
    pub id: String,
    pub name: String,
    pub provider: String,
    #[serde(rename = "type")]
    pub policy_type: String,
    pub coverage: String,
    pub premium: String,
    pub deductible: String,
    #[serde(default)]
    pub benefits: Vec<String>,
    pub age_limit: String,
    pub waiting_period: String,
    pub rating: f64,
}

impl Identified for InsurancePolicy {
    fn id(&self) -> &str {
        &self.id
    }
}

impl InsurancePolicy {
    /// The single substitute shown when a live search fails.
    pub fn fallback() -> Self {
        Self {
            id: "fallback-1".to_string(),
            name: "Basic Health Insurance".to_string(),
            provider: "General Insurance Co".to_string(),
            policy_type: "Individual".to_string(),
            coverage: "₹5,00,000".to_string(),
            premium: "₹12,000/year".to_string(),
            deductible: "₹5,000".to_string(),
            benefits: vec![
                "Hospitalization".to_string(),
                "Emergency Care".to_string(),
                "Diagnostic Tests".to_string(),
            ],
            age_limit: "18-65 years".to_string(),
            waiting_period: "30 days".to_string(),
            rating: 4.0,
        }
    }
}

/// `data` payload of a service search reply.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceSearch {
    pub services: Vec<MedicalService>,
}

/// `data` payload of an insurance search reply.
#[derive(Debug, Clone, Deserialize)]
pub struct PolicySearch {
    pub policies: Vec<InsurancePolicy>,
}

/// Where the current catalog entries came from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CatalogSource {
    /// Nothing searched yet.
    #[default]
    Empty,
    /// Returned by the advisory endpoint.
    Live,
    /// Hard-coded substitute after a failed search.
    Fallback,
}

/// Lookup set for the most recent results of each kind.
///
/// Services and policies are keyed separately: both kinds use small numeric
/// ids and would collide in one map.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    services: HashMap<String, MedicalService>,
    service_order: Vec<String>,
    service_source: CatalogSource,
    policies: HashMap<String, InsurancePolicy>,
    policy_order: Vec<String>,
    policy_source: CatalogSource,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace all services wholesale.
    pub fn replace_services(&mut self, services: Vec<MedicalService>, source: CatalogSource) {
        self.service_order = services.iter().map(|s| s.id.clone()).collect();
        self.services = services.into_iter().map(|s| (s.id.clone(), s)).collect();
        self.service_source = source;
    }

    /// Replace all policies wholesale.
    pub fn replace_policies(&mut self, policies: Vec<InsurancePolicy>, source: CatalogSource) {
        self.policy_order = policies.iter().map(|p| p.id.clone()).collect();
        self.policies = policies.into_iter().map(|p| (p.id.clone(), p)).collect();
        self.policy_source = source;
    }

    pub fn service(&self, id: &str) -> Option<&MedicalService> {
        self.services.get(id)
    }

    pub fn policy(&self, id: &str) -> Option<&InsurancePolicy> {
        self.policies.get(id)
    }

    /// Services in the order they were returned.
    pub fn services(&self) -> Vec<&MedicalService> {
        self.service_order
            .iter()
            .filter_map(|id| self.services.get(id))
            .collect()
    }

    /// Policies in the order they were returned.
    pub fn policies(&self) -> Vec<&InsurancePolicy> {
        self.policy_order
            .iter()
            .filter_map(|id| self.policies.get(id))
            .collect()
    }

    pub fn service_source(&self) -> CatalogSource {
        self.service_source
    }

    pub fn policy_source(&self) -> CatalogSource {
        self.policy_source
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service(id: &str, name: &str) -> MedicalService {
        MedicalService {
            id: id.to_string(),
            name: name.to_string(),
            ..MedicalService::fallback("Pune")
        }
    }

    #[test]
    fn policy_deserializes_camel_case_fields() {
        let json = r#"{
            "id": "2",
            "name": "Family Care Shield",
            "provider": "MediSecure Ltd",
            "type": "Family Floater",
            "coverage": "₹15,00,000",
            "premium": "₹22,000/year",
            "deductible": "₹7,500",
            "benefits": ["Family Coverage", "Maternity Benefits"],
            "ageLimit": "18-70 years",
            "waitingPeriod": "45 days",
            "rating": 4.8
        }"#;
        let policy: InsurancePolicy = serde_json::from_str(json).unwrap();
        assert_eq!(policy.policy_type, "Family Floater");
        assert_eq!(policy.age_limit, "18-70 years");
        assert_eq!(policy.waiting_period, "45 days");
    }

    #[test]
    fn fallback_service_uses_location() {
        let s = MedicalService::fallback("Mumbai");
        assert_eq!(s.id, "fallback-1");
        assert_eq!(s.address, "Main Street, Mumbai");
        assert_eq!(s.availability.len(), 3);
    }

    #[test]
    fn replace_is_wholesale_and_ordered() {
        let mut catalog = Catalog::new();
        catalog.replace_services(
            vec![service("2", "B"), service("1", "A")],
            CatalogSource::Live,
        );
        let names: Vec<_> = catalog.services().iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["B", "A"]);

        catalog.replace_services(vec![service("3", "C")], CatalogSource::Fallback);
        assert!(catalog.service("1").is_none());
        assert_eq!(catalog.service("3").unwrap().name, "C");
        assert_eq!(catalog.service_source(), CatalogSource::Fallback);
    }

    #[test]
    fn services_and_policies_do_not_collide() {
        let mut catalog = Catalog::new();
        catalog.replace_services(vec![MedicalService::fallback("X")], CatalogSource::Fallback);
        catalog.replace_policies(vec![InsurancePolicy::fallback()], CatalogSource::Fallback);
        assert_eq!(catalog.service("fallback-1").unwrap().name, "General Hospital");
        assert_eq!(catalog.policy("fallback-1").unwrap().name, "Basic Health Insurance");

        catalog.clear();
        assert!(catalog.services().is_empty());
        assert_eq!(catalog.policy_source(), CatalogSource::Empty);
    }
}
