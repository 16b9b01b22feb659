use super::mocks::{exited, MockCommandExecutor};
use crate::audit::{read_jsonl, AuditLog};
use crate::config::{ExecutionConfig, PolicyConfig, Settings};
use crate::enforcer::PermissionEnforcer;
use crate::permissions::PermissionGate;
use crate::tools::{ToolDispatcher, ToolErrorKind};
use crate::types::{Operation, PermissionMode, RiskTier};
use crate::utils::CommandLine;
use futures::future::join_all;
use serde_json::json;
use std::path::Path;
use std::sync::Arc;

const CODE: &str = "yesyesyes45";

fn enforcer_with(
    mode: PermissionMode,
    workspace: &Path,
    executor: MockCommandExecutor,
) -> PermissionEnforcer {
    let config = ExecutionConfig {
        backup_dir: workspace.join("backups"),
        ..ExecutionConfig::default()
    };
    PermissionEnforcer::new(
        PermissionGate::new(&PolicyConfig::default()).unwrap(),
        mode,
        AuditLog::new(),
        ToolDispatcher::new(config, Arc::new(executor)).unwrap(),
    )
}

fn enforcer(mode: PermissionMode, workspace: &Path) -> PermissionEnforcer {
    enforcer_with(mode, workspace, MockCommandExecutor::default())
}

#[tokio::test]
async fn test_safe_read_executes_and_is_audited() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("a.txt");
    std::fs::write(&path, "hello").unwrap();
    let enforcer = enforcer(PermissionMode::Safe, dir.path());

    let response = enforcer
        .process(&Operation::from_json("read_file", json!({"path": path})))
        .await;

    assert!(response.success, "{response:?}");
    assert_eq!(response.tier, RiskTier::Safe);
    assert_eq!(response.result.unwrap()["content"], json!("hello"));

    let entries = enforcer.audit_log().export();
    assert_eq!(entries.len(), 1);
    assert!(entries[0].decision.allowed);
    assert_eq!(entries[0].operation_name, "read_file");
    assert_eq!(entries[0].mode, PermissionMode::Safe);
}

#[tokio::test]
async fn test_risky_write_blocked_in_safe_mode() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("a.txt");
    let enforcer = enforcer(PermissionMode::Safe, dir.path());

    let response = enforcer
        .process(&Operation::from_json(
            "write_file",
            json!({"path": path, "content": "x"}),
        ))
        .await;

    assert!(!response.success);
    assert!(response.permission_denied);
    assert!(!response.forbidden);
    assert!(!response.retry_with_code);
    assert!(response.reason.contains("RISKY"));
    assert!(!path.exists());

    let entries = enforcer.audit_log().export();
    assert_eq!(entries.len(), 1);
    assert!(!entries[0].decision.allowed);
    assert_eq!(entries[0].tier, RiskTier::Risky);
}

#[tokio::test]
async fn test_risky_write_runs_in_risky_mode() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out/a.txt");
    let enforcer = enforcer(PermissionMode::Risky, dir.path());

    let response = enforcer
        .process(&Operation::from_json(
            "write_file",
            json!({"path": path, "content": "written"}),
        ))
        .await;

    assert!(response.success, "{response:?}");
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "written");
}

#[tokio::test]
async fn test_dangerous_delete_with_code_leaves_backup() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("a.txt");
    std::fs::write(&path, "contents").unwrap();
    let enforcer = enforcer(PermissionMode::Risky, dir.path());

    let operation = Operation::from_json("delete_file", json!({"path": path}))
        .with_justification(format!("Clean up please, {}", CODE.to_uppercase()));
    let response = enforcer.process(&operation).await;

    assert!(response.success, "{response:?}");
    assert_eq!(response.tier, RiskTier::Dangerous);
    assert!(!path.exists());

    let backup = response.result.unwrap()["backup"]
        .as_str()
        .unwrap()
        .to_string();
    assert!(Path::new(&backup).starts_with(dir.path().join("backups")));
    assert_eq!(std::fs::read_to_string(backup).unwrap(), "contents");
}

#[tokio::test]
async fn test_dangerous_delete_without_code_is_retryable() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("a.txt");
    std::fs::write(&path, "contents").unwrap();
    let enforcer = enforcer(PermissionMode::Dangerous, dir.path());

    let response = enforcer
        .process(
            &Operation::from_json("delete_file", json!({"path": path}))
                .with_justification("just do it"),
        )
        .await;

    assert!(response.permission_denied);
    assert!(response.retry_with_code);
    assert!(!response.reason.contains(CODE));
    assert!(path.exists());
    assert!(!dir.path().join("backups").exists());
}

#[tokio::test]
async fn test_forbidden_path_beats_confirmation_code() {
    let dir = tempfile::tempdir().unwrap();
    let enforcer = enforcer(PermissionMode::Dangerous, dir.path());

    let response = enforcer
        .process(
            &Operation::from_json(
                "write_file",
                json!({"path": r"C:\Windows\System32\x.dll", "content": "MZ"}),
            )
            .with_justification(CODE),
        )
        .await;

    assert!(response.permission_denied);
    assert!(response.forbidden);
    assert!(!response.retry_with_code);
    assert!(response.reason.contains("forbidden path"));
    assert_eq!(enforcer.audit_log().export()[0].tier, RiskTier::Forbidden);
}

#[tokio::test]
async fn test_forbidden_operation_never_runs() {
    let dir = tempfile::tempdir().unwrap();
    let enforcer = enforcer(PermissionMode::Dangerous, dir.path());

    let response = enforcer
        .process(&Operation::from_json("format_disk", json!({})).with_justification(CODE))
        .await;

    assert!(response.forbidden);
    assert!(response.error.unwrap().contains("format_disk"));
}

#[tokio::test]
async fn test_unknown_operation_is_audited_but_not_executed() {
    let dir = tempfile::tempdir().unwrap();
    let enforcer = enforcer(PermissionMode::Safe, dir.path());

    let response = enforcer
        .process(&Operation::from_json("summon_daemon", json!({})))
        .await;

    assert!(!response.success);
    assert!(!response.permission_denied);
    assert_eq!(response.error_kind, Some(ToolErrorKind::UnknownTool));

    let entries = enforcer.audit_log().export();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].tier, RiskTier::Safe);
}

#[tokio::test]
async fn test_execution_failure_reported_with_kind() {
    let dir = tempfile::tempdir().unwrap();
    let enforcer = enforcer(PermissionMode::Safe, dir.path());

    let response = enforcer
        .process(&Operation::from_json(
            "read_file",
            json!({"path": dir.path().join("missing.txt")}),
        ))
        .await;

    assert!(!response.success);
    assert!(!response.permission_denied);
    assert_eq!(response.error_kind, Some(ToolErrorKind::NotFound));
}

#[tokio::test]
async fn test_run_tests_through_enforcer() {
    let dir = tempfile::tempdir().unwrap();
    let executor = MockCommandExecutor::with_responses(vec![exited(1, "2 passed, 1 failed")]);
    let enforcer = enforcer_with(PermissionMode::Risky, dir.path(), executor.clone());

    let response = enforcer
        .process(&Operation::from_json(
            "run_tests",
            json!({"path": dir.path()}),
        ))
        .await;

    assert!(response.success, "{response:?}");
    let result = response.result.unwrap();
    assert_eq!(result["passed"], json!(false));
    assert_eq!(result["output"], json!("2 passed, 1 failed"));

    let calls = executor.calls();
    assert_eq!(calls.len(), 1);
    assert!(matches!(&calls[0], CommandLine::Program { program, .. } if program == "pytest"));
}

#[tokio::test]
async fn test_run_command_blocked_in_safe_mode_never_spawns() {
    let dir = tempfile::tempdir().unwrap();
    let executor = MockCommandExecutor::default();
    let enforcer = enforcer_with(PermissionMode::Safe, dir.path(), executor.clone());

    let response = enforcer
        .process(&Operation::from_json("run_command", json!({"command": "ls"})))
        .await;

    assert!(response.permission_denied);
    assert!(executor.calls().is_empty());
}

#[tokio::test]
async fn test_concurrent_processing_records_every_decision() {
    let dir = tempfile::tempdir().unwrap();
    let enforcer = enforcer(PermissionMode::Safe, dir.path());

    let handles = (0..24).map(|i| {
        let enforcer = enforcer.clone();
        let target = dir.path().join(format!("file_{i}.txt"));
        tokio::spawn(async move {
            let name = if i % 2 == 0 { "check_file_exists" } else { "write_file" };
            let operation = Operation::from_json(name, json!({"path": target, "content": "x"}));
            enforcer.process(&operation).await
        })
    });
    for response in join_all(handles).await {
        response.unwrap();
    }

    let entries = enforcer.audit_log().export();
    assert_eq!(entries.len(), 24);
    assert_eq!(entries.iter().filter(|e| e.decision.allowed).count(), 12);
}

#[tokio::test]
async fn test_from_settings_persists_audit_log() {
    let dir = tempfile::tempdir().unwrap();
    let log_file = dir.path().join("logs/audit.jsonl");

    let mut settings = Settings::default();
    settings.mode = PermissionMode::Risky;
    settings.execution.backup_dir = dir.path().join("backups");
    settings.audit.log_file = Some(log_file.clone());

    let enforcer = PermissionEnforcer::from_settings(&settings).unwrap();
    assert_eq!(enforcer.mode(), PermissionMode::Risky);

    enforcer
        .process(&Operation::from_json(
            "check_file_exists",
            json!({"path": dir.path()}),
        ))
        .await;
    enforcer
        .process(&Operation::from_json("kill_process_1", json!({})))
        .await;

    let persisted = read_jsonl(&log_file).unwrap();
    assert_eq!(persisted.len(), 2);
    assert!(persisted[0].decision.allowed);
    assert!(!persisted[1].decision.allowed);
    assert_eq!(persisted, enforcer.audit_log().export());
}

#[test]
fn test_decide_does_not_record() {
    let dir = tempfile::tempdir().unwrap();
    let enforcer = enforcer(PermissionMode::Safe, dir.path());

    let decision = enforcer.decide(&Operation::from_json("write_file", json!({"path": "/tmp/a"})));
    assert!(!decision.allowed);
    assert!(enforcer.audit_log().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_authorized_deletes_get_distinct_backups() {
    let dir = tempfile::tempdir().unwrap();
    let enforcer = enforcer(PermissionMode::Dangerous, dir.path());

    let handles = (0..12).map(|i| {
        let enforcer = enforcer.clone();
        let parent = dir.path().join(format!("job_{i}"));
        std::fs::create_dir(&parent).unwrap();
        let path = parent.join("report.txt");
        std::fs::write(&path, format!("report {i}")).unwrap();
        tokio::spawn(async move {
            let operation = Operation::from_json("delete_file", json!({"path": path}))
                .with_justification(CODE);
            enforcer.process(&operation).await
        })
    });

    let mut backups = std::collections::HashSet::new();
    for (i, response) in join_all(handles).await.into_iter().enumerate() {
        let response = response.unwrap();
        assert!(response.success, "{response:?}");
        let backup = response.result.unwrap()["backup"]
            .as_str()
            .unwrap()
            .to_string();
        assert_eq!(std::fs::read_to_string(&backup).unwrap(), format!("report {i}"));
        assert!(backups.insert(backup));
    }
    assert_eq!(enforcer.audit_log().len(), 12);
}

#[tokio::test]
async fn test_boot_behind_redirect_is_forbidden() {
    let dir = tempfile::tempdir().unwrap();
    let executor = MockCommandExecutor::default();
    let enforcer = enforcer_with(PermissionMode::Dangerous, dir.path(), executor.clone());

    let response = enforcer
        .process(
            &Operation::from_json("run_command", json!({"command": "echo x>/boot/evil"}))
                .with_justification(CODE),
        )
        .await;

    assert!(response.forbidden);
    assert!(executor.calls().is_empty());
}

#[test]
fn test_from_settings_rejects_zero_audit_capacity() {
    let mut settings = Settings::default();
    settings.audit.capacity = Some(0);
    assert!(PermissionEnforcer::from_settings(&settings).is_err());
}
