use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// A named effect request coming from the orchestration layer.
///
/// Built once per call and never mutated; the gate and the dispatcher only
/// ever borrow it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    pub name: String,
    #[serde(default)]
    pub parameters: Map<String, Value>,
    /// Raw end-user text. Only scanned for the confirmation code.
    #[serde(default)]
    pub justification: String,
}

impl Operation {
    pub fn new(name: impl Into<String>, parameters: Map<String, Value>) -> Self {
        Self {
            name: name.into(),
            parameters,
            justification: String::new(),
        }
    }

    pub fn with_justification(mut self, justification: impl Into<String>) -> Self {
        self.justification = justification.into();
        self
    }

    /// Convenience constructor from a `serde_json::json!({...})` object.
    /// Non-object values yield an empty parameter map.
    pub fn from_json(name: impl Into<String>, parameters: Value) -> Self {
        let parameters = match parameters {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self::new(name, parameters)
    }
}

/// Risk classification of an operation, ordered by severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskTier {
    Safe,
    Risky,
    Dangerous,
    Forbidden,
}

impl RiskTier {
    pub fn as_str(self) -> &'static str {
        match self {
            RiskTier::Safe => "safe",
            RiskTier::Risky => "risky",
            RiskTier::Dangerous => "dangerous",
            RiskTier::Forbidden => "forbidden",
        }
    }

    /// Uppercase label for human-readable reasons (`"RISKY"`, ...).
    pub fn label(self) -> &'static str {
        match self {
            RiskTier::Safe => "SAFE",
            RiskTier::Risky => "RISKY",
            RiskTier::Dangerous => "DANGEROUS",
            RiskTier::Forbidden => "FORBIDDEN",
        }
    }
}

impl fmt::Display for RiskTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Authorization ceiling of a calling context. Fixed per enforcer.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Default,
    Serialize,
    Deserialize,
    clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum PermissionMode {
    #[default]
    #[serde(alias = "safe_mode")]
    #[value(alias = "safe_mode")]
    Safe,
    #[serde(alias = "risky_mode")]
    #[value(alias = "risky_mode")]
    Risky,
    #[serde(alias = "dangerous_mode")]
    #[value(alias = "dangerous_mode")]
    Dangerous,
}

impl PermissionMode {
    pub fn as_str(self) -> &'static str {
        match self {
            PermissionMode::Safe => "safe",
            PermissionMode::Risky => "risky",
            PermissionMode::Dangerous => "dangerous",
        }
    }

    pub fn allows_risky(self) -> bool {
        self >= PermissionMode::Risky
    }
}

impl fmt::Display for PermissionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PermissionMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "safe" | "safe_mode" => Ok(PermissionMode::Safe),
            "risky" | "risky_mode" => Ok(PermissionMode::Risky),
            "dangerous" | "dangerous_mode" => Ok(PermissionMode::Dangerous),
            other => Err(anyhow::anyhow!(
                "Unknown permission mode '{other}' (expected safe, risky or dangerous)"
            )),
        }
    }
}

/// Why a decision came out negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DenialKind {
    /// Path or operation name is categorically banned. No retry possible.
    Forbidden,
    /// Dangerous operation without the confirmation code.
    ConfirmationRequired,
    /// Risky operation in a mode that does not permit it.
    ModeTooLow,
}

/// Outcome of evaluating an operation against a permission mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    pub allowed: bool,
    pub reason: String,
    pub tier: RiskTier,
}

impl Decision {
    pub fn allow(tier: RiskTier, reason: impl Into<String>) -> Self {
        Self {
            allowed: true,
            reason: reason.into(),
            tier,
        }
    }

    pub fn deny(tier: RiskTier, reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            reason: reason.into(),
            tier,
        }
    }

    pub fn denial(&self) -> Option<DenialKind> {
        if self.allowed {
            return None;
        }
        match self.tier {
            RiskTier::Forbidden => Some(DenialKind::Forbidden),
            RiskTier::Dangerous => Some(DenialKind::ConfirmationRequired),
            // A denied safe operation cannot come out of the gate; treat it
            // like a mode problem rather than inventing a new kind.
            RiskTier::Risky | RiskTier::Safe => Some(DenialKind::ModeTooLow),
        }
    }

    /// Whether the caller may offer a "retry with confirmation code" path.
    pub fn retry_with_code(&self) -> bool {
        self.denial() == Some(DenialKind::ConfirmationRequired)
    }
}
