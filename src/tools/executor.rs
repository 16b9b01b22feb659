use super::definitions::ToolCall;
use super::error::ToolError;
use super::impls;
use super::parse::parse_operation;
use super::result::ToolOutput;
use crate::config::ExecutionConfig;
use crate::types::Operation;
use crate::utils::{BackupManager, CommandExecutor, DefaultCommandExecutor};
use crate::web::WebClient;
use std::sync::Arc;
use tracing::debug;

/// Runs operations that already passed the permission gate.
pub struct ToolDispatcher {
    command_executor: Arc<dyn CommandExecutor>,
    web_client: WebClient,
    backups: BackupManager,
    config: ExecutionConfig,
}

impl ToolDispatcher {
    pub fn new(
        config: ExecutionConfig,
        command_executor: Arc<dyn CommandExecutor>,
    ) -> Result<Self, ToolError> {
        let web_client = WebClient::new(&config)
            .map_err(|e| ToolError::Network(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            command_executor,
            web_client,
            backups: BackupManager::new(config.backup_dir.clone()),
            config,
        })
    }

    pub fn with_default_executor(config: ExecutionConfig) -> Result<Self, ToolError> {
        Self::new(config, Arc::new(DefaultCommandExecutor))
    }

    pub fn config(&self) -> &ExecutionConfig {
        &self.config
    }

    pub async fn execute(&self, operation: &Operation) -> Result<ToolOutput, ToolError> {
        let call = parse_operation(operation)?;
        self.execute_call(&call).await
    }

    pub async fn execute_call(&self, call: &ToolCall) -> Result<ToolOutput, ToolError> {
        debug!("Executing {}", call.name());
        let executor = self.command_executor.as_ref();

        match call {
            ToolCall::ReadFile { path } => impls::read_file(path).await,
            ToolCall::WriteFile { path, content } => impls::write_file(path, content).await,
            ToolCall::DeleteFile { path } => impls::delete_file(path, &self.backups).await,
            ToolCall::ListDirectory { path } => impls::list_directory(path).await,
            ToolCall::CheckFileExists { path } => impls::check_file_exists(path).await,
            ToolCall::RunCommand { command, cwd } => {
                impls::run_command(
                    executor,
                    command,
                    cwd.as_deref(),
                    self.config.command_timeout(),
                )
                .await
            }
            ToolCall::SearchWeb { query } => {
                impls::search_web(&self.web_client, query, self.config.http_timeout()).await
            }
            ToolCall::ReadUrl { url } => {
                impls::read_url(&self.web_client, url, self.config.http_timeout()).await
            }
            ToolCall::AnalyzeCode { path } => {
                impls::analyze_code(
                    executor,
                    &self.config.analysis_command,
                    path,
                    self.config.analysis_timeout(),
                )
                .await
            }
            ToolCall::RunTests { path } => {
                impls::run_tests(
                    executor,
                    &self.config.test_command,
                    path,
                    self.config.test_timeout(),
                )
                .await
            }
        }
    }
}
