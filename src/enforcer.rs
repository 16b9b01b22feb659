use crate::audit::{AuditEntry, AuditLog};
use crate::config::Settings;
use crate::permissions::PermissionGate;
use crate::tools::{ToolDispatcher, ToolError, ToolErrorKind, ToolOutput};
use crate::types::{Decision, DenialKind, Operation, PermissionMode, RiskTier};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// What the orchestration layer gets back for one operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResponse {
    pub tool: String,
    pub success: bool,
    pub tier: RiskTier,
    /// Reason given by the permission gate
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ToolErrorKind>,
    #[serde(default)]
    pub permission_denied: bool,
    #[serde(default)]
    pub forbidden: bool,
    #[serde(default)]
    pub retry_with_code: bool,
}

impl ToolResponse {
    fn base(operation: &Operation, decision: &Decision) -> Self {
        Self {
            tool: operation.name.clone(),
            success: false,
            tier: decision.tier,
            reason: decision.reason.clone(),
            result: None,
            message: None,
            error: None,
            error_kind: None,
            permission_denied: false,
            forbidden: false,
            retry_with_code: false,
        }
    }

    pub fn denied(operation: &Operation, decision: &Decision) -> Self {
        Self {
            error: Some(decision.reason.clone()),
            permission_denied: true,
            forbidden: decision.denial() == Some(DenialKind::Forbidden),
            retry_with_code: decision.retry_with_code(),
            ..Self::base(operation, decision)
        }
    }

    pub fn completed(operation: &Operation, decision: &Decision, output: &ToolOutput) -> Self {
        match serde_json::to_value(output) {
            Ok(result) => Self {
                success: true,
                result: Some(result),
                message: Some(output.format_message()),
                ..Self::base(operation, decision)
            },
            Err(e) => Self {
                error: Some(format!("Failed to serialize tool result: {e}")),
                error_kind: Some(ToolErrorKind::Io),
                ..Self::base(operation, decision)
            },
        }
    }

    pub fn failed(operation: &Operation, decision: &Decision, error: &ToolError) -> Self {
        // Keep the process output around; it usually explains the failure
        let result = match error {
            ToolError::NonZeroExit {
                code,
                stdout,
                stderr,
            } => Some(json!({"exit_code": code, "stdout": stdout, "stderr": stderr})),
            _ => None,
        };

        Self {
            result,
            error: Some(error.to_string()),
            error_kind: Some(error.kind()),
            ..Self::base(operation, decision)
        }
    }
}

/// Gate, audit log and dispatcher wired together for one permission mode.
///
/// Cloning is cheap and clones share the audit log, so one enforcer can be
/// handed to many concurrent tasks.
#[derive(Clone)]
pub struct PermissionEnforcer {
    gate: Arc<PermissionGate>,
    mode: PermissionMode,
    audit: Arc<AuditLog>,
    dispatcher: Arc<ToolDispatcher>,
}

impl PermissionEnforcer {
    pub fn new(
        gate: PermissionGate,
        mode: PermissionMode,
        audit: AuditLog,
        dispatcher: ToolDispatcher,
    ) -> Self {
        Self {
            gate: Arc::new(gate),
            mode,
            audit: Arc::new(audit),
            dispatcher: Arc::new(dispatcher),
        }
    }

    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let gate = PermissionGate::new(&settings.policy)?;
        settings.audit.validate()?;

        let mut audit = match settings.audit.capacity {
            Some(capacity) => AuditLog::with_capacity(capacity),
            None => AuditLog::new(),
        };
        if let Some(log_file) = &settings.audit.log_file {
            audit = audit.with_sink(log_file)?;
        }

        let dispatcher = ToolDispatcher::with_default_executor(settings.execution.clone())?;

        info!("Permission enforcer running in {} mode", settings.mode);
        Ok(Self::new(gate, settings.mode, audit, dispatcher))
    }

    pub fn mode(&self) -> PermissionMode {
        self.mode
    }

    pub fn gate(&self) -> &PermissionGate {
        &self.gate
    }

    pub fn audit_log(&self) -> &AuditLog {
        &self.audit
    }

    /// Gate only: nothing is recorded or executed.
    pub fn decide(&self, operation: &Operation) -> Decision {
        self.gate.decide(operation, self.mode)
    }

    /// Decide, record, and run the operation if it was allowed.
    pub async fn process(&self, operation: &Operation) -> ToolResponse {
        let decision = self.decide(operation);

        let entry = AuditEntry::new(operation, self.mode, &decision);
        if let Err(e) = self.audit.record(entry) {
            warn!("Failed to persist audit entry for '{}': {:#}", operation.name, e);
        }

        if !decision.allowed {
            return ToolResponse::denied(operation, &decision);
        }

        match self.dispatcher.execute(operation).await {
            Ok(output) => {
                debug!("Operation '{}' completed", operation.name);
                ToolResponse::completed(operation, &decision, &output)
            }
            Err(e) => {
                warn!("Operation '{}' failed: {}", operation.name, e);
                ToolResponse::failed(operation, &decision, &e)
            }
        }
    }
}
