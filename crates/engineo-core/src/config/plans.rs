//! Plan tier eligibility and quota defaults.

use serde::{Deserialize, Serialize};

/// Which plan tiers may run bulk automation, and the fallback daily quota
/// used when the entitlements collaborator does not supply one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlansConfig {
    /// Plan identifiers that are not eligible for bulk automation.
    #[serde(default = "default_bulk_ineligible")]
    pub bulk_ineligible: Vec<String>,

    /// Default daily AI token budget when a plan does not define one.
    #[serde(default = "default_daily_limit")]
    pub default_daily_limit: u64,
}

impl PlansConfig {
    /// Whether the given plan tier may run bulk automation playbooks.
    pub fn is_eligible(&self, plan: &str) -> bool {
        !self.bulk_ineligible.iter().any(|p| p == plan)
    }
}

impl Default for PlansConfig {
    fn default() -> Self {
        Self {
            bulk_ineligible: default_bulk_ineligible(),
            default_daily_limit: default_daily_limit(),
        }
    }
}

fn default_bulk_ineligible() -> Vec<String> {
    vec!["free".to_string()]
}

fn default_daily_limit() -> u64 {
    10_000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn free_plan_is_ineligible_by_default() {
        let plans = PlansConfig::default();
        assert!(!plans.is_eligible("free"));
        assert!(plans.is_eligible("starter"));
        assert!(plans.is_eligible("pro"));
    }
}
