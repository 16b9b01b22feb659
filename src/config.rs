use crate::types::{PermissionMode, RiskTier};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const MODE_ENV: &str = "AEGIS_PERMISSION_MODE";
pub const CONFIRMATION_CODE_ENV: &str = "AEGIS_CONFIRMATION_CODE";

const DEFAULT_CONFIRMATION_CODE: &str = "yesyesyes45";

/// Directory holding `settings.json`
pub fn config_dir() -> Result<PathBuf> {
    let dir = dirs::config_dir()
        .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
    Ok(dir.join("aegis"))
}

pub fn default_settings_path() -> Result<PathBuf> {
    Ok(config_dir()?.join("settings.json"))
}

/// Everything a deployment can tune. All sections are optional in the file.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Settings {
    /// Authorization ceiling for enforcers built from these settings
    pub mode: PermissionMode,
    pub policy: PolicyConfig,
    pub execution: ExecutionConfig,
    pub audit: AuditConfig,
}

/// Immutable policy tables consumed by the classifier and the gate.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    pub confirmation_code: String,
    pub forbidden_operations: BTreeSet<String>,
    pub dangerous_operations: BTreeSet<String>,
    pub risky_operations: BTreeSet<String>,
    /// Tier for names found in none of the tables
    pub unknown_operation_tier: RiskTier,
    /// Case-insensitive regular expressions matched against parameter values
    pub forbidden_paths: Vec<String>,
}

fn names(list: &[&str]) -> BTreeSet<String> {
    list.iter().map(|s| s.to_string()).collect()
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            confirmation_code: DEFAULT_CONFIRMATION_CODE.to_string(),
            forbidden_operations: names(&[
                "modify_bios",
                "modify_uefi",
                "delete_system32",
                "disable_firewall",
                "install_rootkit",
                "format_disk",
                "rm_rf_root",
                "kill_process_1",
            ]),
            dangerous_operations: names(&[
                "delete_file",
                "delete_directory",
                "force_delete",
                "kill_process",
                "modify_system_file",
                "format_drive",
                "change_network_config",
                "execute_system_command",
                "modify_registry",
                "change_permissions",
            ]),
            risky_operations: names(&[
                "write_file",
                "create_file",
                "edit_file",
                "modify_file",
                "create_directory",
                "copy_file",
                "move_file",
                "run_command",
                "run_tests",
                "git_commit",
                "git_push",
                "install_package",
            ]),
            unknown_operation_tier: RiskTier::Safe,
            forbidden_paths: vec![
                r"c:[\\/]+windows[\\/]+system32".to_string(),
                r"c:[\\/]+windows[\\/]+syswow64".to_string(),
                r"c:[\\/]+windows[\\/]+boot".to_string(),
                r"system32".to_string(),
                r"/etc/passwd".to_string(),
                r"/etc/shadow".to_string(),
                r"/etc/sudoers".to_string(),
                // Any character that cannot be part of a path segment may precede /boot
                r"(^|[^\w.~/\\-])/boot([\\/]|$|[^\w.-])".to_string(),
            ],
        }
    }
}

impl PolicyConfig {
    /// Reject configurations the gate cannot enforce consistently.
    pub fn validate(&self) -> Result<()> {
        if self.confirmation_code.trim().is_empty() {
            anyhow::bail!("Confirmation code must not be empty");
        }

        let tables = [
            ("forbidden", &self.forbidden_operations),
            ("dangerous", &self.dangerous_operations),
            ("risky", &self.risky_operations),
        ];
        for (i, (left_name, left)) in tables.iter().enumerate() {
            for (right_name, right) in &tables[i + 1..] {
                if let Some(overlap) = left.intersection(right).next() {
                    anyhow::bail!(
                        "Operation '{overlap}' is listed as both {left_name} and {right_name}"
                    );
                }
            }
        }

        for pattern in &self.forbidden_paths {
            regex::Regex::new(pattern)
                .with_context(|| format!("Invalid forbidden path pattern '{pattern}'"))?;
        }

        Ok(())
    }
}

/// Limits and external programs used by the tool handlers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
    pub command_timeout_secs: u64,
    pub analysis_timeout_secs: u64,
    pub test_timeout_secs: u64,
    pub http_timeout_secs: u64,
    /// Where `delete_file` puts its backups
    pub backup_dir: PathBuf,
    /// Program plus leading arguments; the target path is appended
    pub analysis_command: Vec<String>,
    pub test_command: Vec<String>,
    pub max_url_content_chars: usize,
    pub max_search_results: usize,
    pub search_endpoint: String,
    pub user_agent: String,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            command_timeout_secs: 30,
            analysis_timeout_secs: 120,
            test_timeout_secs: 300,
            http_timeout_secs: 30,
            backup_dir: PathBuf::from("data/backups"),
            analysis_command: vec![
                "pylint".to_string(),
                "--output-format=text".to_string(),
                "--reports=n".to_string(),
            ],
            test_command: vec!["pytest".to_string(), "-v".to_string()],
            max_url_content_chars: 8000,
            max_search_results: 5,
            search_endpoint: "https://html.duckduckgo.com/html/".to_string(),
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36".to_string(),
        }
    }
}

impl ExecutionConfig {
    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }

    pub fn analysis_timeout(&self) -> Duration {
        Duration::from_secs(self.analysis_timeout_secs)
    }

    pub fn test_timeout(&self) -> Duration {
        Duration::from_secs(self.test_timeout_secs)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AuditConfig {
    /// Append one JSON line per decision to this file
    pub log_file: Option<PathBuf>,
    /// Keep at most this many entries in memory (oldest dropped first)
    pub capacity: Option<usize>,
}

impl AuditConfig {
    pub fn validate(&self) -> Result<()> {
        if self.capacity == Some(0) {
            anyhow::bail!("audit.capacity must be at least 1 (omit it for an unbounded log)");
        }
        Ok(())
    }
}

impl Settings {
    /// Load settings from `path`, or from the default location when it exists.
    /// Environment overrides are applied and the result is validated.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut settings = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let default_path = default_settings_path()?;
                if default_path.exists() {
                    Self::from_file(&default_path)?
                } else {
                    Self::default()
                }
            }
        };

        settings.apply_env(|key| std::env::var(key).ok())?;
        settings.policy.validate()?;
        settings.audit.validate()?;
        Ok(settings)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings from {}", path.display()))?;
        let settings: Settings = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse settings from {}", path.display()))?;
        tracing::debug!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    /// Apply environment overrides. `lookup` is `std::env::var` outside of tests.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(mode) = lookup(MODE_ENV) {
            self.mode = mode
                .parse()
                .with_context(|| format!("Invalid {MODE_ENV}"))?;
        }

        if let Some(code) = lookup(CONFIRMATION_CODE_ENV) {
            self.policy.confirmation_code = code;
        } else if let Some(resolved) = substitute_env_vars(&self.policy.confirmation_code, &lookup)
        {
            // Allows "${SOME_VAR}" in the settings file so the code stays out of it
            self.policy.confirmation_code = resolved;
        }

        Ok(())
    }
}

fn substitute_env_vars(input: &str, lookup: &impl Fn(&str) -> Option<String>) -> Option<String> {
    let mut result = input.to_string();
    let mut changed = false;
    // Substituted values are never rescanned
    let mut search_from = 0;
    while let Some(offset) = result[search_from..].find("${") {
        let start = search_from + offset;
        let end = start + result[start..].find('}')?;
        let var_name = &result[start + 2..end];
        let var_value = lookup(var_name)?;
        result.replace_range(start..=end, &var_value);
        search_from = start + var_value.len();
        changed = true;
    }

    if changed {
        Some(result)
    } else {
        None
    }
}
