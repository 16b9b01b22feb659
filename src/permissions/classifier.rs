use crate::config::PolicyConfig;
use crate::types::RiskTier;
use std::collections::HashMap;

/// Maps operation names to risk tiers.
///
/// Built once from a [`PolicyConfig`] and immutable afterwards, so a single
/// instance can be shared across tasks without locking.
#[derive(Debug, Clone)]
pub struct RiskClassifier {
    tiers: HashMap<String, RiskTier>,
    unknown: RiskTier,
}

impl RiskClassifier {
    pub fn new(policy: &PolicyConfig) -> Self {
        let mut tiers = HashMap::new();

        // Inserted from least to most severe so that, should a table overlap
        // slip past validation, the stricter tier wins.
        for name in &policy.risky_operations {
            tiers.insert(name.clone(), RiskTier::Risky);
        }
        for name in &policy.dangerous_operations {
            tiers.insert(name.clone(), RiskTier::Dangerous);
        }
        for name in &policy.forbidden_operations {
            tiers.insert(name.clone(), RiskTier::Forbidden);
        }

        Self {
            tiers,
            unknown: policy.unknown_operation_tier,
        }
    }

    /// Total over the name space: names in no table get the unknown tier.
    pub fn classify(&self, operation_name: &str) -> RiskTier {
        self.tiers
            .get(operation_name)
            .copied()
            .unwrap_or(self.unknown)
    }

    pub fn is_known(&self, operation_name: &str) -> bool {
        self.tiers.contains_key(operation_name)
    }

    /// All names listed with the given tier, sorted.
    pub fn names_with_tier(&self, tier: RiskTier) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .tiers
            .iter()
            .filter(|(_, t)| **t == tier)
            .map(|(name, _)| name.as_str())
            .collect();
        names.sort_unstable();
        names
    }
}

impl Default for RiskClassifier {
    fn default() -> Self {
        Self::new(&PolicyConfig::default())
    }
}
