use crate::web::{WebPage, WebSearchResult};
use serde::Serialize;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DirectoryEntry {
    pub name: String,
    pub path: PathBuf,
    pub is_file: bool,
    pub is_dir: bool,
    /// Only reported for files
    pub size: Option<u64>,
}

/// Successful result of a tool. Serialized without a tag; the tool name
/// travels next to it in the response.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ToolOutput {
    ReadFile {
        path: PathBuf,
        content: String,
        size: u64,
        lines: usize,
    },
    WriteFile {
        path: PathBuf,
        size: u64,
    },
    DeleteFile {
        path: PathBuf,
        backup: PathBuf,
    },
    ListDirectory {
        path: PathBuf,
        entries: Vec<DirectoryEntry>,
        count: usize,
    },
    CheckFileExists {
        path: PathBuf,
        exists: bool,
        is_file: bool,
        is_dir: bool,
    },
    RunCommand {
        command: String,
        exit_code: Option<i32>,
        stdout: String,
        stderr: String,
    },
    SearchWeb {
        query: String,
        results: Vec<WebSearchResult>,
        total: usize,
    },
    ReadUrl(WebPage),
    AnalyzeCode {
        path: PathBuf,
        exit_code: Option<i32>,
        issues: usize,
        output: String,
    },
    RunTests {
        path: PathBuf,
        passed: bool,
        exit_code: Option<i32>,
        output: String,
    },
}

impl ToolOutput {
    // Format a short human-readable summary of the result
    pub fn format_message(&self) -> String {
        match self {
            ToolOutput::ReadFile {
                path, size, lines, ..
            } => format!("Read {} ({} bytes, {} lines)", path.display(), size, lines),
            ToolOutput::WriteFile { path, size } => {
                format!("Wrote {} bytes to {}", size, path.display())
            }
            ToolOutput::DeleteFile { path, backup } => format!(
                "Deleted {} (backup at {})",
                path.display(),
                backup.display()
            ),
            ToolOutput::ListDirectory { path, entries, .. } => {
                let mut msg = format!("Contents of {}:", path.display());
                if entries.is_empty() {
                    msg.push_str(" (empty)");
                }
                for entry in entries {
                    let marker = if entry.is_dir { "/" } else { "" };
                    msg.push_str(&format!("\n- {}{}", entry.name, marker));
                }
                msg
            }
            ToolOutput::CheckFileExists {
                path,
                exists,
                is_dir,
                ..
            } => match (exists, is_dir) {
                (false, _) => format!("{} does not exist", path.display()),
                (true, true) => format!("{} exists (directory)", path.display()),
                (true, false) => format!("{} exists (file)", path.display()),
            },
            ToolOutput::RunCommand {
                command,
                stdout,
                stderr,
                ..
            } => {
                let mut msg = format!("Command '{}' succeeded", command);
                if !stdout.is_empty() {
                    msg.push_str(&format!("\nOutput:\n{}", stdout));
                }
                if !stderr.is_empty() {
                    msg.push_str(&format!("\nErrors:\n{}", stderr));
                }
                msg
            }
            ToolOutput::SearchWeb {
                query,
                results,
                total,
            } => {
                let mut msg = format!(
                    "Search results for '{}' (showing {} of {}):",
                    query,
                    results.len(),
                    total
                );
                for (i, result) in results.iter().enumerate() {
                    msg.push_str(&format!(
                        "\n{}. {}\n   {}\n   {}",
                        i + 1,
                        result.title,
                        result.url,
                        result.snippet
                    ));
                }
                msg
            }
            ToolOutput::ReadUrl(page) => {
                let mut msg = format!("Page: {}\nURL: {}\n\n{}", page.title, page.url, page.content);
                if page.truncated {
                    msg.push_str(&format!("\n\n[truncated, {} characters total]", page.length));
                }
                msg
            }
            ToolOutput::AnalyzeCode {
                path,
                issues,
                output,
                ..
            } => format!(
                "Analysis of {} found {} issue(s)\n{}",
                path.display(),
                issues,
                output
            ),
            ToolOutput::RunTests {
                path,
                passed,
                output,
                ..
            } => format!(
                "Tests in {} {}\n{}",
                path.display(),
                if *passed { "passed" } else { "failed" },
                output
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_untagged_serialization() {
        let output = ToolOutput::WriteFile {
            path: PathBuf::from("/tmp/a.txt"),
            size: 5,
        };
        assert_eq!(
            serde_json::to_value(&output).unwrap(),
            json!({"path": "/tmp/a.txt", "size": 5})
        );

        let output = ToolOutput::ReadUrl(WebPage {
            url: "http://x/".to_string(),
            title: "X".to_string(),
            content: "body".to_string(),
            length: 4,
            truncated: false,
        });
        assert_eq!(serde_json::to_value(&output).unwrap()["title"], json!("X"));
    }

    #[test]
    fn test_format_messages() {
        let output = ToolOutput::CheckFileExists {
            path: PathBuf::from("/tmp/none"),
            exists: false,
            is_file: false,
            is_dir: false,
        };
        assert_eq!(output.format_message(), "/tmp/none does not exist");

        let output = ToolOutput::ListDirectory {
            path: PathBuf::from("/src"),
            entries: vec![
                DirectoryEntry {
                    name: "lib".to_string(),
                    path: PathBuf::from("/src/lib"),
                    is_file: false,
                    is_dir: true,
                    size: None,
                },
                DirectoryEntry {
                    name: "main.rs".to_string(),
                    path: PathBuf::from("/src/main.rs"),
                    is_file: true,
                    is_dir: false,
                    size: Some(10),
                },
            ],
            count: 2,
        };
        assert_eq!(output.format_message(), "Contents of /src:\n- lib/\n- main.rs");

        let output = ToolOutput::RunTests {
            path: PathBuf::from("tests"),
            passed: false,
            exit_code: Some(1),
            output: "1 failed".to_string(),
        };
        assert_eq!(output.format_message(), "Tests in tests failed\n1 failed");
    }
}
