use serde::Serialize;
use std::path::PathBuf;

/// Every tool the dispatcher can run. Operation names that do not map onto
/// one of these are rejected before anything executes.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "tool", content = "params", rename_all = "snake_case")]
pub enum ToolCall {
    ReadFile {
        path: PathBuf,
    },
    WriteFile {
        path: PathBuf,
        content: String,
    },
    /// Backed up before removal
    DeleteFile {
        path: PathBuf,
    },
    ListDirectory {
        path: PathBuf,
    },
    CheckFileExists {
        path: PathBuf,
    },
    RunCommand {
        command: String,
        cwd: Option<PathBuf>,
    },
    SearchWeb {
        query: String,
    },
    ReadUrl {
        url: String,
    },
    AnalyzeCode {
        path: PathBuf,
    },
    RunTests {
        path: PathBuf,
    },
}

pub struct ToolSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub parameters: &'static [&'static str],
}

pub const TOOL_SPECS: &[ToolSpec] = &[
    ToolSpec {
        name: "read_file",
        description: "Read a UTF-8 text file",
        parameters: &["path"],
    },
    ToolSpec {
        name: "write_file",
        description: "Write a file, creating parent directories",
        parameters: &["path", "content"],
    },
    ToolSpec {
        name: "delete_file",
        description: "Back up a file, then delete it",
        parameters: &["path"],
    },
    ToolSpec {
        name: "list_directory",
        description: "List the immediate children of a directory",
        parameters: &["path"],
    },
    ToolSpec {
        name: "check_file_exists",
        description: "Check whether a path exists and what it is",
        parameters: &["path"],
    },
    ToolSpec {
        name: "run_command",
        description: "Run a shell command with a timeout",
        parameters: &["command", "cwd?"],
    },
    ToolSpec {
        name: "search_web",
        description: "Search the web and return the top results",
        parameters: &["query"],
    },
    ToolSpec {
        name: "read_url",
        description: "Fetch a web page as markdown",
        parameters: &["url"],
    },
    ToolSpec {
        name: "analyze_code",
        description: "Run the static analyzer on a path",
        parameters: &["path"],
    },
    ToolSpec {
        name: "run_tests",
        description: "Run the test suite on a path",
        parameters: &["path"],
    },
];

impl ToolCall {
    pub fn name(&self) -> &'static str {
        match self {
            ToolCall::ReadFile { .. } => "read_file",
            ToolCall::WriteFile { .. } => "write_file",
            ToolCall::DeleteFile { .. } => "delete_file",
            ToolCall::ListDirectory { .. } => "list_directory",
            ToolCall::CheckFileExists { .. } => "check_file_exists",
            ToolCall::RunCommand { .. } => "run_command",
            ToolCall::SearchWeb { .. } => "search_web",
            ToolCall::ReadUrl { .. } => "read_url",
            ToolCall::AnalyzeCode { .. } => "analyze_code",
            ToolCall::RunTests { .. } => "run_tests",
        }
    }

    pub fn is_supported(name: &str) -> bool {
        TOOL_SPECS.iter().any(|spec| spec.name == name)
    }
}
