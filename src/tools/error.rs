use crate::utils::{BackupError, CommandError};
use crate::web::WebError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),
    #[error("Malformed input: {0}")]
    MalformedInput(String),
    #[error("Path not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("Not a file: {}", .0.display())]
    NotAFile(PathBuf),
    #[error("Not a directory: {}", .0.display())]
    NotADirectory(PathBuf),
    #[error("Permission denied by the operating system: {}", .0.display())]
    PermissionDenied(PathBuf),
    #[error("Timed out after {}s", .0.as_secs())]
    Timeout(Duration),
    #[error("Process exited with {}", exit_description(.code))]
    NonZeroExit {
        code: Option<i32>,
        stdout: String,
        stderr: String,
    },
    #[error("HTTP status {status} from {url}")]
    Http { url: String, status: u16 },
    #[error("Network error: {0}")]
    Network(String),
    #[error("Failed to start '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Backup failed, nothing was deleted: {0}")]
    Backup(#[from] BackupError),
}

fn exit_description(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {code}"),
        None => "no exit code (terminated by signal)".to_string(),
    }
}

/// Stable, machine-readable error category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolErrorKind {
    UnknownTool,
    MalformedInput,
    NotFound,
    NotAFile,
    NotADirectory,
    PermissionDenied,
    Timeout,
    NonZeroExit,
    HttpStatus,
    Network,
    Spawn,
    Io,
    Backup,
}

impl ToolErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ToolErrorKind::UnknownTool => "unknown_tool",
            ToolErrorKind::MalformedInput => "malformed_input",
            ToolErrorKind::NotFound => "not_found",
            ToolErrorKind::NotAFile => "not_a_file",
            ToolErrorKind::NotADirectory => "not_a_directory",
            ToolErrorKind::PermissionDenied => "permission_denied",
            ToolErrorKind::Timeout => "timeout",
            ToolErrorKind::NonZeroExit => "non_zero_exit",
            ToolErrorKind::HttpStatus => "http_status",
            ToolErrorKind::Network => "network",
            ToolErrorKind::Spawn => "spawn",
            ToolErrorKind::Io => "io",
            ToolErrorKind::Backup => "backup",
        }
    }
}

impl fmt::Display for ToolErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ToolError {
    pub fn kind(&self) -> ToolErrorKind {
        match self {
            ToolError::UnknownTool(_) => ToolErrorKind::UnknownTool,
            ToolError::MalformedInput(_) => ToolErrorKind::MalformedInput,
            ToolError::NotFound(_) => ToolErrorKind::NotFound,
            ToolError::NotAFile(_) => ToolErrorKind::NotAFile,
            ToolError::NotADirectory(_) => ToolErrorKind::NotADirectory,
            ToolError::PermissionDenied(_) => ToolErrorKind::PermissionDenied,
            ToolError::Timeout(_) => ToolErrorKind::Timeout,
            ToolError::NonZeroExit { .. } => ToolErrorKind::NonZeroExit,
            ToolError::Http { .. } => ToolErrorKind::HttpStatus,
            ToolError::Network(_) => ToolErrorKind::Network,
            ToolError::Spawn { .. } => ToolErrorKind::Spawn,
            ToolError::Io { .. } => ToolErrorKind::Io,
            ToolError::Backup(_) => ToolErrorKind::Backup,
        }
    }

    /// Map an I/O error on `path` onto the specific variants where possible.
    pub fn io(path: &Path, source: std::io::Error) -> Self {
        match source.kind() {
            std::io::ErrorKind::NotFound => ToolError::NotFound(path.to_path_buf()),
            std::io::ErrorKind::PermissionDenied => ToolError::PermissionDenied(path.to_path_buf()),
            _ => ToolError::Io {
                context: format!("I/O error on {}", path.display()),
                source,
            },
        }
    }

    /// `timeout` is the client timeout, reported when a request expires.
    pub fn from_web(error: WebError, timeout: Duration) -> Self {
        match error {
            WebError::InvalidUrl { url, reason } => {
                ToolError::MalformedInput(format!("Invalid URL '{url}': {reason}"))
            }
            WebError::Status { url, status } => ToolError::Http { url, status },
            WebError::Timeout { .. } => ToolError::Timeout(timeout),
            WebError::Request { .. } => ToolError::Network(error.to_string()),
            WebError::Content(message) => ToolError::MalformedInput(message),
        }
    }
}

impl From<CommandError> for ToolError {
    fn from(error: CommandError) -> Self {
        match error {
            CommandError::Empty => ToolError::MalformedInput("Command must not be empty".to_string()),
            CommandError::MissingWorkingDir(dir) => ToolError::NotFound(dir),
            CommandError::NotADirectory(dir) => ToolError::NotADirectory(dir),
            CommandError::Spawn { program, source } => ToolError::Spawn { program, source },
            CommandError::Timeout(after) => ToolError::Timeout(after),
            CommandError::Io(source) => ToolError::Io {
                context: "I/O error while running command".to_string(),
                source,
            },
        }
    }
}
