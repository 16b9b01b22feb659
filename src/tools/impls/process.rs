use crate::tools::error::ToolError;
use crate::tools::result::ToolOutput;
use crate::utils::{CommandExecutor, CommandLine, CommandOutput};
use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;
use std::time::Duration;
use tracing::{debug, warn};

/// pylint sets this bit in its exit status for command line usage errors.
const ANALYZER_USAGE_ERROR: i32 = 32;

pub async fn run_command(
    executor: &dyn CommandExecutor,
    command: &str,
    cwd: Option<&Path>,
    timeout: Duration,
) -> Result<ToolOutput, ToolError> {
    let output = executor
        .execute(&CommandLine::Shell(command.to_string()), cwd, timeout)
        .await?;

    if !output.success {
        warn!("Command '{}' exited with {:?}", command, output.exit_code);
        return Err(ToolError::NonZeroExit {
            code: output.exit_code,
            stdout: output.stdout,
            stderr: output.stderr,
        });
    }

    Ok(ToolOutput::RunCommand {
        command: command.to_string(),
        exit_code: output.exit_code,
        stdout: output.stdout,
        stderr: output.stderr,
    })
}

/// Build `<program> <configured args...> <path>` from a configured command.
fn command_for(configured: &[String], path: &Path, setting: &str) -> Result<CommandLine, ToolError> {
    let (program, args) = configured.split_first().ok_or_else(|| {
        ToolError::MalformedInput(format!("Setting '{setting}' has no program"))
    })?;
    let mut args = args.to_vec();
    args.push(path.to_string_lossy().into_owned());
    Ok(CommandLine::program(program.clone(), args))
}

async fn ensure_exists(path: &Path) -> Result<(), ToolError> {
    tokio::fs::metadata(path)
        .await
        .map(|_| ())
        .map_err(|e| ToolError::io(path, e))
}

fn combined_output(output: &CommandOutput) -> String {
    match (output.stdout.is_empty(), output.stderr.is_empty()) {
        (_, true) => output.stdout.clone(),
        (true, false) => output.stderr.clone(),
        (false, false) => format!("{}\n{}", output.stdout, output.stderr),
    }
}

/// Count analyzer messages of the form `file.py:12:4: W0611: ...`.
fn count_issues(output: &str) -> usize {
    static MESSAGE: OnceLock<Regex> = OnceLock::new();
    let pattern = MESSAGE.get_or_init(|| {
        Regex::new(r"(?m)^.+:\d+:\d+: [A-Z]\d{4}\b").expect("valid regex")
    });
    pattern.find_iter(output).count()
}

/// Findings are a normal result; only usage errors and signals fail.
pub async fn analyze_code(
    executor: &dyn CommandExecutor,
    analysis_command: &[String],
    path: &Path,
    timeout: Duration,
) -> Result<ToolOutput, ToolError> {
    ensure_exists(path).await?;
    let command = command_for(analysis_command, path, "analysis_command")?;
    let output = executor.execute(&command, None, timeout).await?;

    match output.exit_code {
        Some(code) if code & ANALYZER_USAGE_ERROR == 0 => {
            let text = combined_output(&output);
            debug!("Analyzer exited with {} for {}", code, path.display());
            Ok(ToolOutput::AnalyzeCode {
                path: path.to_path_buf(),
                exit_code: Some(code),
                issues: count_issues(&text),
                output: text,
            })
        }
        code => Err(ToolError::NonZeroExit {
            code,
            stdout: output.stdout,
            stderr: output.stderr,
        }),
    }
}

/// A failing suite is a result with `passed: false`, not an error.
pub async fn run_tests(
    executor: &dyn CommandExecutor,
    test_command: &[String],
    path: &Path,
    timeout: Duration,
) -> Result<ToolOutput, ToolError> {
    ensure_exists(path).await?;
    let command = command_for(test_command, path, "test_command")?;
    let output = executor.execute(&command, None, timeout).await?;

    Ok(ToolOutput::RunTests {
        path: path.to_path_buf(),
        passed: output.success,
        exit_code: output.exit_code,
        output: combined_output(&output),
    })
}
