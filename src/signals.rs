//! Suspend-signal handling for the interactive session.
//!
//! The SIGTSTP handler only touches two atomics: it reads the pid of the current
//! foreground process, forwards the signal to it and raises a "suspend requested"
//! flag. Moving the stopped command into the job registry is left to the main
//! loop, which consumes the flag with [`SignalCoordinator::take_suspend`] once
//! its foreground wait returns.

use nix::sys::signal::{Signal, kill};
use nix::unistd::Pid;
use signal_hook::SigId;
use signal_hook::consts::{SIGINT, SIGTSTP};
use signal_hook::low_level;
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};

const NO_FOREGROUND: i32 = 0;

#[derive(Debug)]
pub struct SignalCoordinator {
    foreground: Arc<AtomicI32>,
    suspended: Arc<AtomicBool>,
    handlers: Vec<SigId>,
}

impl SignalCoordinator {
    /// A coordinator with no handlers installed; suspend events never arrive.
    pub fn detached() -> Self {
        Self {
            foreground: Arc::new(AtomicI32::new(NO_FOREGROUND)),
            suspended: Arc::new(AtomicBool::new(false)),
            handlers: Vec::new(),
        }
    }

    /// Install the SIGTSTP forwarder and keep SIGINT from killing the shell.
    ///
    /// Both actions stay registered until the coordinator is dropped. Programs
    /// started afterwards get default dispositions back on exec.
    pub fn install() -> io::Result<Self> {
        let mut coordinator = Self::detached();

        let foreground = Arc::clone(&coordinator.foreground);
        let suspended = Arc::clone(&coordinator.suspended);
        // SAFETY: the action only performs atomic loads/stores and kill(2),
        // all of which are async-signal-safe.
        let id = unsafe {
            low_level::register(SIGTSTP, move || forward_suspend(&foreground, &suspended))?
        };
        coordinator.handlers.push(id);

        // SAFETY: empty action.
        let id = unsafe { low_level::register(SIGINT, || {})? };
        coordinator.handlers.push(id);

        tracing::debug!("signal handlers installed");
        Ok(coordinator)
    }

    pub fn set_foreground(&self, pid: Pid) {
        self.foreground.store(pid.as_raw(), Ordering::SeqCst);
    }

    pub fn clear_foreground(&self) {
        self.foreground.store(NO_FOREGROUND, Ordering::SeqCst);
    }

    pub fn foreground(&self) -> Option<Pid> {
        match self.foreground.load(Ordering::SeqCst) {
            pid if pid > 0 => Some(Pid::from_raw(pid)),
            _ => None,
        }
    }

    /// Consume a pending suspend event, if any.
    pub fn take_suspend(&self) -> bool {
        self.suspended.swap(false, Ordering::SeqCst)
    }
}

impl Drop for SignalCoordinator {
    fn drop(&mut self) {
        for id in self.handlers.drain(..) {
            low_level::unregister(id);
        }
    }
}

/// Body of the SIGTSTP action. Runs in signal context.
fn forward_suspend(foreground: &AtomicI32, suspended: &AtomicBool) {
    let pid = foreground.load(Ordering::SeqCst);
    if pid > 0 {
        let _ = kill(Pid::from_raw(pid), Signal::SIGTSTP);
        suspended.store(true, Ordering::SeqCst);
    }
}
