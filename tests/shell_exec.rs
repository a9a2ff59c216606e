// tests/shell_exec.rs
#![cfg(unix)]

use std::fs;
use std::io::Write;
use std::time::Duration;

use tempfile::NamedTempFile;
use tokio::sync::mpsc;

use taskvisor::config::load_and_validate;
use taskvisor::exec::{run_command, shell_task, with_shell_revert};
use taskvisor::plan::build_plan;
use taskvisor::supervisor::Supervisor;
use taskvisor_test_utils::{describe, drain, init_tracing, with_timeout};

#[tokio::test]
async fn test_run_command_reports_exit_status() {
    init_tracing();
    assert!(run_command("ok", "true", None).await.is_ok());

    let err = run_command("bad", "exit 3", None).await.unwrap_err();
    assert!(err.to_string().contains("exited with code 3"));
}

#[tokio::test]
async fn test_shell_tasks_run_and_revert_in_order() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("log.txt");
    let log = log.display();

    let a = with_shell_revert(
        shell_task("a", &format!("echo a >> {log}")),
        &format!("echo -a >> {log}"),
    );
    let b = with_shell_revert(
        shell_task("b", &format!("echo b >> {log}")),
        &format!("echo -b >> {log}"),
    )
    .after(&a);

    let supervisor = Supervisor::new(&a);
    supervisor.dispatch(None).unwrap();
    let report = with_timeout(supervisor.wait_finished()).await.unwrap();
    assert!(report.is_success());
    assert_eq!(report.started(), &[a.clone(), b.clone()]);

    supervisor.revert(None).await.unwrap();
    with_timeout(supervisor.wait_reverted()).await.unwrap();

    let contents = fs::read_to_string(dir.path().join("log.txt")).unwrap();
    assert_eq!(contents, "a\nb\n-b\n-a\n");
}

#[tokio::test]
async fn test_failing_command_strands_downstream() {
    init_tracing();
    let a = shell_task("a", "exit 1");
    let b = shell_task("b", "true").after(&a);

    let supervisor = Supervisor::new(&a);
    let (tx, rx) = mpsc::channel(8);
    supervisor.dispatch(Some(tx)).unwrap();
    let events = drain(rx).await;

    assert_eq!(describe(&events), vec!["a!"]);
    let report = with_timeout(supervisor.wait_finished()).await.unwrap();
    assert_eq!(report.stranded(), &[b.clone()]);
}

#[tokio::test]
async fn test_cancel_kills_running_process() {
    init_tracing();
    let slow = shell_task("slow", "sleep 30");

    let supervisor = Supervisor::new(&slow);
    supervisor.dispatch(None).unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    supervisor.cancel();

    let report = with_timeout(supervisor.wait_finished()).await.unwrap();
    assert!(report.was_cancelled());
    assert!(report.is_failed(slow.id()));
}

#[tokio::test]
async fn test_plan_file_runs_end_to_end() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out.txt");

    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
[task.first]
cmd = "echo first >> {out}"
uses = ["out"]

[task.second]
cmd = "echo second >> {out}"
uses = ["out"]

[task.last]
cmd = "echo last >> {out}"
after = ["first", "second"]
"#,
        out = out.display()
    )
    .unwrap();

    let plan = build_plan(&load_and_validate(file.path()).unwrap());
    let supervisor = plan.supervisor();
    supervisor.dispatch(None).unwrap();
    let report = with_timeout(supervisor.wait_finished()).await.unwrap();
    assert!(report.is_success());

    let contents = fs::read_to_string(&out).unwrap();
    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[2], "last");
}
