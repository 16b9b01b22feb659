use super::definitions::ToolCall;
use super::error::ToolError;
use crate::types::Operation;
use serde_json::{Map, Value};
use std::path::PathBuf;
use tracing::trace;

fn optional_string(params: &Map<String, Value>, name: &str) -> Result<Option<String>, ToolError> {
    match params.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(value)) => Ok(Some(value.clone())),
        Some(other) => Err(ToolError::MalformedInput(format!(
            "Parameter '{name}' must be a string, got {other}"
        ))),
    }
}

fn required_string(params: &Map<String, Value>, name: &str) -> Result<String, ToolError> {
    optional_string(params, name)?
        .ok_or_else(|| ToolError::MalformedInput(format!("Missing required parameter: {name}")))
}

fn required_non_empty(params: &Map<String, Value>, name: &str) -> Result<String, ToolError> {
    let value = required_string(params, name)?;
    if value.trim().is_empty() {
        return Err(ToolError::MalformedInput(format!(
            "Parameter '{name}' must not be empty"
        )));
    }
    Ok(value)
}

fn required_path(params: &Map<String, Value>) -> Result<PathBuf, ToolError> {
    required_non_empty(params, "path").map(PathBuf::from)
}

/// Turn an operation into a typed tool call.
pub fn parse_operation(operation: &Operation) -> Result<ToolCall, ToolError> {
    trace!("Parsing operation {}: {:?}", operation.name, operation.parameters);
    let params = &operation.parameters;

    match operation.name.as_str() {
        "read_file" => Ok(ToolCall::ReadFile {
            path: required_path(params)?,
        }),
        "write_file" => Ok(ToolCall::WriteFile {
            path: required_path(params)?,
            // Empty content is a valid way to truncate a file
            content: required_string(params, "content")?,
        }),
        "delete_file" => Ok(ToolCall::DeleteFile {
            path: required_path(params)?,
        }),
        "list_directory" => Ok(ToolCall::ListDirectory {
            path: required_path(params)?,
        }),
        "check_file_exists" => Ok(ToolCall::CheckFileExists {
            path: required_path(params)?,
        }),
        "run_command" => Ok(ToolCall::RunCommand {
            command: required_non_empty(params, "command")?,
            cwd: optional_string(params, "cwd")?
                .filter(|cwd| !cwd.trim().is_empty())
                .map(PathBuf::from),
        }),
        "search_web" => Ok(ToolCall::SearchWeb {
            query: required_non_empty(params, "query")?,
        }),
        "read_url" => Ok(ToolCall::ReadUrl {
            url: required_non_empty(params, "url")?.trim().to_string(),
        }),
        "analyze_code" => Ok(ToolCall::AnalyzeCode {
            path: required_path(params)?,
        }),
        "run_tests" => Ok(ToolCall::RunTests {
            path: required_path(params)?,
        }),
        other => Err(ToolError::UnknownTool(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::ToolErrorKind;
    use serde_json::json;

    fn parse(name: &str, params: Value) -> Result<ToolCall, ToolError> {
        parse_operation(&Operation::from_json(name, params))
    }

    #[test]
    fn test_parse_file_tools() {
        assert_eq!(
            parse("read_file", json!({"path": "/tmp/a.txt"})).unwrap(),
            ToolCall::ReadFile {
                path: PathBuf::from("/tmp/a.txt")
            }
        );
        assert_eq!(
            parse("write_file", json!({"path": "out.txt", "content": ""})).unwrap(),
            ToolCall::WriteFile {
                path: PathBuf::from("out.txt"),
                content: String::new()
            }
        );
    }

    #[test]
    fn test_parse_run_command() {
        assert_eq!(
            parse("run_command", json!({"command": "ls", "cwd": "/tmp"})).unwrap(),
            ToolCall::RunCommand {
                command: "ls".to_string(),
                cwd: Some(PathBuf::from("/tmp"))
            }
        );
        assert_eq!(
            parse("run_command", json!({"command": "ls", "cwd": null})).unwrap(),
            ToolCall::RunCommand {
                command: "ls".to_string(),
                cwd: None
            }
        );
    }

    #[test]
    fn test_malformed_parameters() {
        let cases = [
            ("read_file", json!({})),
            ("read_file", json!({"path": ""})),
            ("read_file", json!({"path": 42})),
            ("write_file", json!({"path": "a.txt"})),
            ("run_command", json!({"command": "   "})),
            ("run_command", json!({"command": "ls", "cwd": ["/tmp"]})),
            ("search_web", json!({"query": ""})),
        ];
        for (name, params) in cases {
            let err = parse(name, params.clone()).unwrap_err();
            assert_eq!(err.kind(), ToolErrorKind::MalformedInput, "{name} {params}");
        }
    }

    #[test]
    fn test_unknown_tool() {
        let err = parse("format_disk", json!({})).unwrap_err();
        assert!(matches!(err, ToolError::UnknownTool(name) if name == "format_disk"));
    }
}
