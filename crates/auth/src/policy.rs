use cloud::GuardrailRef;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Group name -> guardrail id, all at one version
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuardrailPolicies {
    pub version: String,
    pub groups: HashMap<String, String>,
}

impl GuardrailPolicies {
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            groups: HashMap::new(),
        }
    }

    pub fn with_group(mut self, group: &str, guardrail_id: &str) -> Self {
        self.groups.insert(group.to_string(), guardrail_id.to_string());
        self
    }

    pub fn for_group(&self, group: &str) -> Option<GuardrailRef> {
        self.groups.get(group).map(|id| GuardrailRef {
            id: id.clone(),
            version: self.version.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup() {
        let policies = GuardrailPolicies::new("DRAFT").with_group("Doctor", "p3lgqv4onhcc");

        let guardrail = policies.for_group("Doctor").unwrap();
        assert_eq!(guardrail.id, "p3lgqv4onhcc");
        assert_eq!(guardrail.version, "DRAFT");
        assert!(policies.for_group("doctor").is_none());
    }
}
