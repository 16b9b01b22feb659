use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, warn};

/// What to run: a shell command line, or a program with explicit arguments
/// (no shell involved, so paths need no quoting).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandLine {
    Shell(String),
    Program { program: String, args: Vec<String> },
}

impl CommandLine {
    pub fn program(program: impl Into<String>, args: Vec<String>) -> Self {
        CommandLine::Program {
            program: program.into(),
            args,
        }
    }

    pub fn display(&self) -> String {
        match self {
            CommandLine::Shell(line) => line.clone(),
            CommandLine::Program { program, args } => {
                std::iter::once(program.as_str())
                    .chain(args.iter().map(String::as_str))
                    .collect::<Vec<_>>()
                    .join(" ")
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct CommandOutput {
    /// `None` when the process was terminated by a signal
    pub exit_code: Option<i32>,
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("Empty command line")]
    Empty,
    #[error("Working directory does not exist: {}", .0.display())]
    MissingWorkingDir(PathBuf),
    #[error("Path is not a directory: {}", .0.display())]
    NotADirectory(PathBuf),
    #[error("Failed to start '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Command timed out after {}s", .0.as_secs())]
    Timeout(Duration),
    #[error("I/O error while running command: {0}")]
    Io(#[from] std::io::Error),
}

#[async_trait::async_trait]
pub trait CommandExecutor: Send + Sync {
    /// Run to completion, or fail with [`CommandError::Timeout`] once `timeout`
    /// elapses. A timed-out child is killed.
    async fn execute(
        &self,
        command: &CommandLine,
        working_dir: Option<&Path>,
        timeout: Duration,
    ) -> Result<CommandOutput, CommandError>;
}

pub struct DefaultCommandExecutor;

#[async_trait::async_trait]
impl CommandExecutor for DefaultCommandExecutor {
    async fn execute(
        &self,
        command: &CommandLine,
        working_dir: Option<&Path>,
        timeout: Duration,
    ) -> Result<CommandOutput, CommandError> {
        // Validate working_dir first
        if let Some(dir) = working_dir {
            if !dir.exists() {
                return Err(CommandError::MissingWorkingDir(dir.to_path_buf()));
            }
            if !dir.is_dir() {
                return Err(CommandError::NotADirectory(dir.to_path_buf()));
            }
        }

        let (program, mut cmd) = match command {
            CommandLine::Shell(line) => {
                if line.trim().is_empty() {
                    return Err(CommandError::Empty);
                }

                #[cfg(target_family = "unix")]
                let shell = std::env::var("SHELL").unwrap_or_else(|_| "/bin/sh".to_string());
                #[cfg(target_family = "unix")]
                let mut cmd = Command::new(&shell);
                #[cfg(target_family = "unix")]
                cmd.args(["-c", line]);

                #[cfg(target_family = "windows")]
                let shell = "cmd".to_string();
                #[cfg(target_family = "windows")]
                let mut cmd = Command::new(&shell);
                #[cfg(target_family = "windows")]
                cmd.args(["/C", line]);

                (shell, cmd)
            }
            CommandLine::Program { program, args } => {
                if program.trim().is_empty() {
                    return Err(CommandError::Empty);
                }
                let mut cmd = Command::new(program);
                cmd.args(args);
                (program.clone(), cmd)
            }
        };

        if let Some(dir) = working_dir {
            cmd.current_dir(dir);
        }
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        debug!("Running command: {}", command.display());
        let child = cmd
            .spawn()
            .map_err(|source| CommandError::Spawn { program, source })?;

        // Dropping the wait future on timeout drops the child, which kills it.
        let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(output) => output?,
            Err(_) => {
                warn!(
                    "Command timed out after {}s: {}",
                    timeout.as_secs(),
                    command.display()
                );
                return Err(CommandError::Timeout(timeout));
            }
        };

        Ok(CommandOutput {
            exit_code: output.status.code(),
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}
