use job_shell::command::JobState;
use job_shell::{Config, Interpreter, ShellError};
use nix::libc::STDOUT_FILENO;
use nix::sys::signal::{Signal, kill};
use nix::sys::stat::fstat;
use std::os::unix::fs::MetadataExt;
use std::path::Path;
use std::time::{Duration, Instant};

fn shell() -> Interpreter {
    Interpreter::new(Config::default()).expect("interpreter")
}

fn run(sh: &mut Interpreter, line: &str) -> String {
    let mut out = Vec::new();
    sh.execute_line(line, &mut out).expect("command should run");
    String::from_utf8(out).expect("utf8")
}

/// Reap until something is printed or the timeout expires.
fn reap_until_output(sh: &mut Interpreter, timeout: Duration) -> String {
    let deadline = Instant::now() + timeout;
    loop {
        let mut out = Vec::new();
        sh.reap(&mut out).expect("reap");
        if !out.is_empty() || Instant::now() > deadline {
            return String::from_utf8(out).expect("utf8");
        }
        std::thread::sleep(Duration::from_millis(20));
    }
}

fn wait_for_file(path: &Path, expected: &str) -> String {
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        let content = std::fs::read_to_string(path).unwrap_or_default();
        if content == expected || Instant::now() > deadline {
            return content;
        }
        std::thread::sleep(Duration::from_millis(20));
    }
}

#[test]
fn test_output_redirect_does_not_leak_into_shell() {
    let dir = tempfile::tempdir().expect("tempdir");
    let target = dir.path().join("out.txt");
    let mut sh = shell();

    let before = fstat(STDOUT_FILENO).expect("fstat stdout");
    let printed = run(&mut sh, &format!("echo hi > {}", target.display()));
    let after = fstat(STDOUT_FILENO).expect("fstat stdout");
    assert_eq!(printed, "");
    assert_eq!(std::fs::read_to_string(&target).unwrap(), "hi\n");
    // The test process's own stdout is the same open file as before.
    assert_eq!((before.st_dev, before.st_ino), (after.st_dev, after.st_ino));
    let file = std::fs::metadata(&target).unwrap();
    assert_ne!(
        (after.st_dev as u64, after.st_ino as u64),
        (file.dev(), file.ino())
    );

    // The shell's own output still goes to the caller's writer.
    let printed = run(&mut sh, "jobs");
    assert_eq!(printed, "");
    assert_eq!(std::fs::read_to_string(&target).unwrap(), "hi\n");
}

#[test]
fn test_output_redirect_truncates_existing_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let target = dir.path().join("out.txt");
    std::fs::write(&target, "a much longer previous content\n").unwrap();
    let mut sh = shell();

    run(&mut sh, &format!("echo hi > {}", target.display()));
    assert_eq!(std::fs::read_to_string(&target).unwrap(), "hi\n");
}

#[test]
fn test_input_redirect_and_pipe() {
    let dir = tempfile::tempdir().expect("tempdir");
    let input = dir.path().join("in.txt");
    let output = dir.path().join("out.txt");
    std::fs::write(&input, "b.txt\na.rs\nc.txt\n").unwrap();
    let mut sh = shell();

    run(
        &mut sh,
        &format!(
            "cat < {} | grep txt > {}",
            input.display(),
            output.display()
        ),
    );
    assert_eq!(wait_for_file(&output, "b.txt\nc.txt\n"), "b.txt\nc.txt\n");
}

#[test]
fn test_three_stage_pipeline() {
    let dir = tempfile::tempdir().expect("tempdir");
    let output = dir.path().join("out.txt");
    let mut sh = shell();

    run(
        &mut sh,
        &format!("echo hello | tr a-z A-Z | tr -d L > {}", output.display()),
    );
    assert_eq!(wait_for_file(&output, "HEO\n"), "HEO\n");
}

#[test]
fn test_missing_input_file_fails_in_child() {
    let mut sh = shell();
    let mut out = Vec::new();
    let code = sh
        .execute_line("cat < /nonexistent/input.txt", &mut out)
        .unwrap();
    assert_eq!(code, 1);
}

#[test]
fn test_background_redirect_failure_is_reported_as_exit() {
    let mut sh = shell();
    run(&mut sh, "cat < /nonexistent/x &");

    let printed = reap_until_output(&mut sh, Duration::from_secs(5));
    assert_eq!(printed, "[0]\tExit\t1\tcat < /nonexistent/x\n");
    assert_eq!(sh.jobs().get(0).unwrap().state(), JobState::Done);
    assert_eq!(reap_until_output(&mut sh, Duration::from_millis(100)), "");
}

#[test]
fn test_background_job_is_registered_and_reported_once() {
    let mut sh = shell();
    let started = Instant::now();
    let printed = run(&mut sh, "sleep 1 &");
    assert!(started.elapsed() < Duration::from_millis(900));

    let job = sh.jobs().get(0).expect("slot 0");
    let pid = job.pid().expect("pid");
    assert_eq!(printed, format!("[0]\t{}\n", pid));
    assert_eq!(job.state(), JobState::Running);
    assert_eq!(run(&mut sh, "jobs"), "[0]\tRunning\t\tsleep 1 &\n");

    let done = reap_until_output(&mut sh, Duration::from_secs(5));
    assert_eq!(done, "[0]\tDone\t\tsleep 1\n");
    assert_eq!(sh.jobs().get(0).unwrap().state(), JobState::Done);

    for _ in 0..3 {
        let mut out = Vec::new();
        assert_eq!(sh.reap(&mut out).unwrap(), 0);
        assert!(out.is_empty());
    }
    assert_eq!(run(&mut sh, "jobs"), "");
}

#[test]
fn test_background_failure_reports_exit_code() {
    let mut sh = shell();
    run(&mut sh, "false &");
    run(&mut sh, "no-such-program-xyz &");

    let mut reported = String::new();
    let deadline = Instant::now() + Duration::from_secs(5);
    while reported.lines().count() < 2 && Instant::now() < deadline {
        reported.push_str(&reap_until_output(&mut sh, Duration::from_millis(200)));
    }
    assert!(reported.contains("[0]\tExit\t1\tfalse\n"), "{:?}", reported);
    assert!(
        reported.contains("[1]\tExit\t127\tno-such-program-xyz\n"),
        "{:?}",
        reported
    );
}

#[test]
fn test_killed_job_is_reported_as_terminated() {
    let mut sh = shell();
    run(&mut sh, "sleep 30 &");
    let pid = sh.jobs().get(0).unwrap().pid().unwrap();
    kill(pid, Signal::SIGTERM).expect("kill");

    let printed = reap_until_output(&mut sh, Duration::from_secs(5));
    assert_eq!(printed, "[0]\tTerminated\tsleep 30\n");
    assert_eq!(reap_until_output(&mut sh, Duration::from_millis(100)), "");
}

#[test]
fn test_bg_out_of_range_is_rejected() {
    let mut sh = shell();
    run(&mut sh, "sleep 1 &");

    let mut out = Vec::new();
    let err = sh.execute_line("bg 5", &mut out).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ShellError>(),
        Some(ShellError::NoSuchJob(5))
    ));
    assert_eq!(sh.jobs().len(), 1);
    assert_eq!(sh.jobs().get(0).unwrap().state(), JobState::Running);
}

#[test]
fn test_parse_errors_launch_nothing() {
    let mut sh = shell();
    let mut out = Vec::new();
    let err = sh.execute_line("sleep 1 | &", &mut out).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ShellError>(),
        Some(ShellError::Parse(_))
    ));
    assert!(out.is_empty());
    assert!(sh.jobs().is_empty());
}

#[test]
fn test_exit_builtin() {
    let mut sh = shell();
    assert_eq!(run(&mut sh, ""), "");
    assert!(!sh.env().should_exit);
    let mut out = Vec::new();
    assert_eq!(sh.execute_line("exit 2", &mut out).unwrap(), 2);
    assert!(sh.env().should_exit);
}

#[test]
fn test_job_table_capacity() {
    let mut sh = Interpreter::new(Config {
        max_jobs: 1,
        ..Config::default()
    })
    .unwrap();
    run(&mut sh, "true &");

    let mut out = Vec::new();
    let err = sh.execute_line("true &", &mut out).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ShellError>(),
        Some(ShellError::RegistryFull(1))
    ));
    assert_eq!(sh.jobs().len(), 1);
}
