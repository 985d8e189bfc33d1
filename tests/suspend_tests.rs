//! Raises SIGTSTP at the whole test process, so everything lives in a single
//! test to keep other interpreters from seeing the signal.

use job_shell::command::JobState;
use job_shell::{Config, Interpreter};
use nix::sys::signal::{Signal, raise};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

const EXIT_STOPPED: i32 = 128 + Signal::SIGTSTP as i32;

fn suspend_after(delay: Duration) -> JoinHandle<()> {
    thread::spawn(move || {
        thread::sleep(delay);
        raise(Signal::SIGTSTP).expect("raise SIGTSTP");
    })
}

fn execute(sh: &mut Interpreter, line: &str) -> (i32, String) {
    let mut out = Vec::new();
    let code = sh.execute_line(line, &mut out).expect("command should run");
    (code, String::from_utf8(out).expect("utf8"))
}

fn reap_until_output(sh: &mut Interpreter) -> String {
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        let mut out = Vec::new();
        sh.reap(&mut out).expect("reap");
        if !out.is_empty() || Instant::now() > deadline {
            return String::from_utf8(out).expect("utf8");
        }
        thread::sleep(Duration::from_millis(20));
    }
}

#[test]
fn test_suspend_handling() {
    suspend_resume_and_report();
    suspend_with_full_table_keeps_waiting();
}

fn suspend_resume_and_report() {
    let mut sh = Interpreter::new(Config::default()).expect("interpreter");

    // Ctrl-Z on a foreground job moves it into the registry as stopped.
    let raiser = suspend_after(Duration::from_millis(300));
    let (code, printed) = execute(&mut sh, "sleep 1");
    raiser.join().unwrap();
    assert_eq!(code, EXIT_STOPPED);
    assert_eq!(printed, "[0]\tStopped\t\tsleep 1\n");
    assert_eq!(sh.jobs().get(0).unwrap().state(), JobState::Stopped);

    let (_, listing) = execute(&mut sh, "jobs");
    assert_eq!(listing, "[0]\tStopped\t\tsleep 1\n");

    // A stopped job is never reported as finished.
    let mut out = Vec::new();
    assert_eq!(sh.reap(&mut out).unwrap(), 0);

    // bg lets it run to completion, which the reaper reports exactly once.
    execute(&mut sh, "bg 0");
    assert_eq!(sh.jobs().get(0).unwrap().state(), JobState::Running);
    assert_eq!(reap_until_output(&mut sh), "[0]\tDone\t\tsleep 1\n");
    for _ in 0..3 {
        let mut out = Vec::new();
        assert_eq!(sh.reap(&mut out).unwrap(), 0);
    }

    // fg on a stopped job: stopping it again keeps the same slot.
    let raiser = suspend_after(Duration::from_millis(300));
    let (code, printed) = execute(&mut sh, "sleep 1");
    raiser.join().unwrap();
    assert_eq!(code, EXIT_STOPPED);
    assert_eq!(printed, "[1]\tStopped\t\tsleep 1\n");

    let raiser = suspend_after(Duration::from_millis(200));
    let (code, printed) = execute(&mut sh, "fg 1");
    raiser.join().unwrap();
    assert_eq!(code, EXIT_STOPPED);
    assert_eq!(printed, "sleep 1\n[1]\tStopped\t\tsleep 1\n");
    assert_eq!(sh.jobs().len(), 2);

    // Waited for in the foreground: finished, but nothing left to report.
    let (code, printed) = execute(&mut sh, "fg 1");
    assert_eq!(code, 0);
    assert_eq!(printed, "sleep 1\n");
    assert_eq!(sh.jobs().get(1).unwrap().state(), JobState::Done);
    let mut out = Vec::new();
    assert_eq!(sh.reap(&mut out).unwrap(), 0);

    let (_, listing) = execute(&mut sh, "jobs");
    assert_eq!(listing, "");

    // Finished jobs cannot be resumed.
    let mut out = Vec::new();
    assert!(sh.execute_line("bg 1", &mut out).is_err());
}

fn suspend_with_full_table_keeps_waiting() {
    let mut sh = Interpreter::new(Config {
        max_jobs: 0,
        ..Config::default()
    })
    .expect("interpreter");

    // With nowhere to register it, the stopped job is continued and waited for.
    let started = Instant::now();
    let raiser = suspend_after(Duration::from_millis(300));
    let (code, printed) = execute(&mut sh, "sleep 1");
    raiser.join().unwrap();
    assert_eq!(code, 0);
    assert_eq!(printed, "job_shell: job table is full (0 jobs)\n");
    assert!(started.elapsed() >= Duration::from_millis(900));
    assert!(sh.jobs().is_empty());
}
