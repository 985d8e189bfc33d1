//! Code that runs in a freshly forked child: redirections, pipeline wiring and exec.
//!
//! Nothing here returns to the caller. Every failure is printed to stderr and
//! turned into the child's exit status, which the parent later observes.

use crate::external::{ExternalProgram, PreparedLaunch};
use nix::errno::Errno;
use nix::fcntl::{OFlag, open};
use nix::libc::{STDIN_FILENO, STDOUT_FILENO};
use nix::sys::signal::{SigHandler, Signal, signal};
use nix::sys::stat::Mode;
use nix::unistd::{ForkResult, Pid, close, dup2, execv, fork, pipe, setpgid};
use std::os::fd::{AsRawFd, OwnedFd, RawFd};
use std::path::Path;

/// Mode for files created by `>`; the umask still applies.
const OUTPUT_MODE: Mode = Mode::from_bits_truncate(0o644);

const EXIT_FAILURE: i32 = 1;
const EXIT_NOT_EXECUTABLE: i32 = 126;
const EXIT_NOT_FOUND: i32 = 127;

/// Turn the calling process into the command described by `prepared`.
///
/// The caller becomes the first pipeline stage. Every further stage is forked
/// from the previous one and reads its stdin from a pipe whose write end becomes
/// the previous stage's stdout. With a single `|` this is exactly one extra process.
pub(crate) fn launch(prepared: &PreparedLaunch) -> ! {
    restore_default_signals();
    if prepared.background {
        // Keeps terminal-generated SIGINT/SIGTSTP away from background jobs.
        let _ = setpgid(Pid::from_raw(0), Pid::from_raw(0));
    }

    if let Some(path) = &prepared.input {
        redirect(path, OFlag::O_RDONLY, STDIN_FILENO);
    }
    if let Some(path) = &prepared.output {
        redirect(
            path,
            OFlag::O_WRONLY | OFlag::O_CREAT | OFlag::O_TRUNC,
            STDOUT_FILENO,
        );
    }

    let mut index = 0;
    while index + 1 < prepared.programs.len() {
        let (read_end, write_end) = pipe().unwrap_or_else(|err| fail("pipe", err, EXIT_FAILURE));
        // SAFETY: the child only manipulates file descriptors and execs.
        match unsafe { fork() } {
            Ok(ForkResult::Child) => {
                connect(&read_end, STDIN_FILENO);
                drop((read_end, write_end));
                index += 1;
            }
            Ok(ForkResult::Parent { .. }) => {
                connect(&write_end, STDOUT_FILENO);
                drop((read_end, write_end));
                break;
            }
            Err(err) => fail("fork", err, EXIT_FAILURE),
        }
    }

    exec(&prepared.programs[index])
}

fn restore_default_signals() {
    for sig in [Signal::SIGTSTP, Signal::SIGINT] {
        // SAFETY: installing SIG_DFL does not run any Rust code in signal context.
        let _ = unsafe { signal(sig, SigHandler::SigDfl) };
    }
}

fn redirect(path: &Path, flags: OFlag, target: RawFd) {
    let fd = open(path, flags, OUTPUT_MODE)
        .unwrap_or_else(|err| fail(&path.display().to_string(), err, EXIT_FAILURE));
    if let Err(err) = dup2(fd, target) {
        fail("dup2", err, EXIT_FAILURE);
    }
    let _ = close(fd);
}

fn connect(fd: &OwnedFd, target: RawFd) {
    if let Err(err) = dup2(fd.as_raw_fd(), target) {
        fail("dup2", err, EXIT_FAILURE);
    }
}

fn exec(program: &ExternalProgram) -> ! {
    let Some(path) = &program.path else {
        eprintln!("job_shell: {}: command not found", program.name);
        terminate(EXIT_NOT_FOUND);
    };
    let err = match execv(path, &program.argv) {
        Ok(never) => match never {},
        Err(err) => err,
    };
    let code = match err {
        Errno::ENOENT => EXIT_NOT_FOUND,
        _ => EXIT_NOT_EXECUTABLE,
    };
    fail(&program.name, err, code)
}

fn fail(what: &str, err: Errno, code: i32) -> ! {
    eprintln!("job_shell: {}: {}", what, err.desc());
    terminate(code)
}

/// Leave the forked child without running the parent's atexit handlers.
fn terminate(code: i32) -> ! {
    // SAFETY: _exit only ends the calling process.
    unsafe { nix::libc::_exit(code) }
}
