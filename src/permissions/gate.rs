use super::classifier::RiskClassifier;
use super::confirmation::has_confirmation_code;
use super::paths::ForbiddenPathSet;
use crate::config::PolicyConfig;
use crate::types::{Decision, Operation, PermissionMode, RiskTier};
use anyhow::Result;
use tracing::{debug, info, warn};

/// Turns (operation, mode) into an allow/deny decision with a reason.
///
/// The gate holds no mutable state: it is `Send + Sync` and can be called
/// from any number of tasks at once. Recording the decision is the caller's
/// job (see [`crate::enforcer::PermissionEnforcer`]).
#[derive(Debug, Clone)]
pub struct PermissionGate {
    classifier: RiskClassifier,
    forbidden_paths: ForbiddenPathSet,
    confirmation_code: String,
}

impl PermissionGate {
    pub fn new(policy: &PolicyConfig) -> Result<Self> {
        policy.validate()?;
        Ok(Self {
            classifier: RiskClassifier::new(policy),
            forbidden_paths: ForbiddenPathSet::new(&policy.forbidden_paths)?,
            confirmation_code: policy.confirmation_code.clone(),
        })
    }

    pub fn classifier(&self) -> &RiskClassifier {
        &self.classifier
    }

    pub fn forbidden_paths(&self) -> &ForbiddenPathSet {
        &self.forbidden_paths
    }

    /// Evaluate an operation. Checks run in a fixed order and the first one
    /// that applies decides:
    ///
    /// 1. forbidden path anywhere in the parameters
    /// 2. forbidden operation name
    /// 3. dangerous: confirmation code required, whatever the mode
    /// 4. risky: mode must be risky or dangerous
    /// 5. safe: always allowed
    pub fn decide(&self, operation: &Operation, mode: PermissionMode) -> Decision {
        let name = operation.name.as_str();

        if let Some(found) = self.forbidden_paths.find(&operation.parameters) {
            warn!(
                "Denied '{}': parameter '{}' matches forbidden path pattern '{}'",
                name, found.value, found.pattern
            );
            return Decision::deny(
                RiskTier::Forbidden,
                format!(
                    "Operation '{}' targets a forbidden path ('{}'); forbidden system paths can never be accessed",
                    name, found.value
                ),
            );
        }

        let tier = self.classifier.classify(name);
        match tier {
            RiskTier::Forbidden => {
                warn!("Denied forbidden operation '{}'", name);
                Decision::deny(
                    tier,
                    format!("FORBIDDEN operation '{name}' is never allowed, in any mode"),
                )
            }
            RiskTier::Dangerous => {
                if has_confirmation_code(&operation.justification, &self.confirmation_code) {
                    warn!(
                        "Dangerous operation '{}' authorized with confirmation code in {} mode",
                        name, mode
                    );
                    Decision::allow(
                        tier,
                        format!("DANGEROUS operation '{name}' authorized by confirmation code"),
                    )
                } else {
                    warn!("Denied dangerous operation '{}': no confirmation code", name);
                    Decision::deny(
                        tier,
                        format!(
                            "DANGEROUS operation '{name}' requires the confirmation code in the request"
                        ),
                    )
                }
            }
            RiskTier::Risky => {
                if mode.allows_risky() {
                    info!("Risky operation '{}' allowed in {} mode", name, mode);
                    Decision::allow(
                        tier,
                        format!("RISKY operation '{name}' allowed in {mode} mode"),
                    )
                } else {
                    warn!("Denied risky operation '{}' in {} mode", name, mode);
                    Decision::deny(
                        tier,
                        format!(
                            "RISKY operation '{name}' blocked in {mode} mode; requires risky or dangerous mode"
                        ),
                    )
                }
            }
            RiskTier::Safe => {
                debug!("Safe operation '{}' allowed", name);
                Decision::allow(tier, format!("SAFE operation '{name}'"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const CODE: &str = "yesyesyes45";
    const ALL_MODES: [PermissionMode; 3] = [
        PermissionMode::Safe,
        PermissionMode::Risky,
        PermissionMode::Dangerous,
    ];

    fn gate() -> PermissionGate {
        PermissionGate::new(&PolicyConfig::default()).unwrap()
    }

    fn op(name: &str, params: serde_json::Value, justification: &str) -> Operation {
        Operation::from_json(name, params).with_justification(justification)
    }

    #[test]
    fn test_scenario_safe_read() {
        let decision = gate().decide(
            &op("read_file", json!({"path": "/tmp/a.txt"}), ""),
            PermissionMode::Safe,
        );
        assert!(decision.allowed);
        assert_eq!(decision.tier, RiskTier::Safe);
    }

    #[test]
    fn test_scenario_risky_write_in_safe_mode() {
        let decision = gate().decide(
            &op("write_file", json!({"path": "/tmp/a.txt"}), ""),
            PermissionMode::Safe,
        );
        assert!(!decision.allowed);
        assert_eq!(decision.tier, RiskTier::Risky);
        let reason = decision.reason.to_lowercase();
        assert!(reason.contains("risky") && reason.contains("mode"));
    }

    #[test]
    fn test_scenario_dangerous_delete_with_code() {
        let decision = gate().decide(
            &op("delete_file", json!({"path": "/tmp/a.txt"}), CODE),
            PermissionMode::Risky,
        );
        assert!(decision.allowed);
        assert_eq!(decision.tier, RiskTier::Dangerous);
    }

    #[test]
    fn test_scenario_forbidden_path_overrides_code() {
        let decision = gate().decide(
            &op(
                "write_file",
                json!({"path": "C:\\Windows\\System32\\x.dll"}),
                CODE,
            ),
            PermissionMode::Dangerous,
        );
        assert!(!decision.allowed);
        assert_eq!(decision.tier, RiskTier::Forbidden);
        assert!(decision.reason.contains("forbidden path"));
    }

    #[test]
    fn test_scenario_forbidden_name() {
        let decision = gate().decide(&op("format_disk", json!({}), ""), PermissionMode::Dangerous);
        assert!(!decision.allowed);
        assert_eq!(decision.tier, RiskTier::Forbidden);
    }

    #[test]
    fn test_forbidden_names_denied_everywhere() {
        let gate = gate();
        for name in gate.classifier().names_with_tier(RiskTier::Forbidden) {
            for mode in ALL_MODES {
                for justification in ["", CODE] {
                    let decision = gate.decide(&op(name, json!({}), justification), mode);
                    assert!(!decision.allowed, "{name} allowed in {mode} mode");
                    assert_eq!(decision.tier, RiskTier::Forbidden);
                    assert!(!decision.retry_with_code());
                }
            }
        }
    }

    #[test]
    fn test_forbidden_path_beats_safe_and_risky() {
        let gate = gate();
        for name in ["read_file", "list_directory", "write_file", "run_command"] {
            for mode in ALL_MODES {
                let decision = gate.decide(&op(name, json!({"path": "/etc/shadow"}), CODE), mode);
                assert!(!decision.allowed, "{name} reached /etc/shadow in {mode} mode");
                assert_eq!(decision.tier, RiskTier::Forbidden);
            }
        }
    }

    #[test]
    fn test_risky_requires_mode() {
        let gate = gate();
        for name in gate.classifier().names_with_tier(RiskTier::Risky) {
            let params = json!({"path": "/tmp/a.txt"});
            assert!(!gate.decide(&op(name, params.clone(), ""), PermissionMode::Safe).allowed);
            assert!(gate.decide(&op(name, params.clone(), ""), PermissionMode::Risky).allowed);
            assert!(gate.decide(&op(name, params, ""), PermissionMode::Dangerous).allowed);
        }
    }

    #[test]
    fn test_dangerous_requires_code_in_every_mode() {
        let gate = gate();
        for name in gate.classifier().names_with_tier(RiskTier::Dangerous) {
            for mode in [PermissionMode::Risky, PermissionMode::Dangerous] {
                let params = json!({"path": "/tmp/a.txt"});
                let without = gate.decide(&op(name, params.clone(), "please do it"), mode);
                assert!(!without.allowed, "{name} allowed without code in {mode} mode");
                assert!(without.retry_with_code());
                assert!(without.reason.contains("confirmation code"));

                let wrong = gate.decide(&op(name, params.clone(), "yesyesyes44"), mode);
                assert!(!wrong.allowed);

                let with = gate.decide(&op(name, params, "ok YESYESYES45 go"), mode);
                assert!(with.allowed, "{name} denied with code in {mode} mode");
            }
        }
    }

    #[test]
    fn test_decide_is_idempotent() {
        let gate = gate();
        let operation = op("delete_file", json!({"path": "/tmp/a.txt"}), CODE);
        let first = gate.decide(&operation, PermissionMode::Risky);
        let second = gate.decide(&operation, PermissionMode::Risky);
        assert_eq!(first, second);
    }

    #[test]
    fn test_every_reason_is_specific() {
        let gate = gate();
        let cases = [
            op("read_file", json!({"path": "/tmp/a"}), ""),
            op("write_file", json!({"path": "/tmp/a"}), ""),
            op("delete_file", json!({"path": "/tmp/a"}), ""),
            op("delete_file", json!({"path": "/tmp/a"}), CODE),
            op("modify_bios", json!({}), ""),
            op("read_file", json!({"path": "/etc/passwd"}), ""),
        ];
        for operation in &cases {
            for mode in ALL_MODES {
                let decision = gate.decide(operation, mode);
                assert!(!decision.reason.trim().is_empty());
                assert!(decision.reason.contains(&operation.name));
            }
        }
    }

    #[test]
    fn test_custom_code() {
        let policy = PolicyConfig {
            confirmation_code: "open-sesame".to_string(),
            ..PolicyConfig::default()
        };
        let gate = PermissionGate::new(&policy).unwrap();
        let mode = PermissionMode::Dangerous;
        assert!(!gate.decide(&op("delete_file", json!({}), CODE), mode).allowed);
        assert!(gate.decide(&op("delete_file", json!({}), "OPEN-SESAME"), mode).allowed);
    }

    #[test]
    fn test_invalid_policy_rejected() {
        let mut policy = PolicyConfig::default();
        policy.forbidden_operations.insert("write_file".to_string());
        assert!(PermissionGate::new(&policy).is_err());
    }

    #[test]
    fn test_gate_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<PermissionGate>();
    }
}
