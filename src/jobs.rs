use crate::command::{Command, ExitCode, JobState};
use crate::error::{Result, ShellError};
use nix::unistd::Pid;
use std::fmt;

/// Stable job identifier, assigned in registration order starting at 0.
pub type Slot = usize;

/// Default number of jobs a session can register.
pub const DEFAULT_CAPACITY: usize = 100;

/// A registered command and the slot it was given.
#[derive(Debug, Clone)]
pub struct Job {
    slot: Slot,
    pub command: Command,
}

impl Job {
    pub fn slot(&self) -> Slot {
        self.slot
    }

    pub fn pid(&self) -> Option<Pid> {
        self.command.pid
    }

    pub fn state(&self) -> JobState {
        self.command.state
    }
}

/// Append-only table of background and stopped jobs.
///
/// Entries are never removed or renumbered, so a slot keeps identifying the same
/// job for the whole session. The table is owned by the main loop; nothing else
/// mutates it.
#[derive(Debug)]
pub struct JobRegistry {
    jobs: Vec<Job>,
    capacity: usize,
}

impl JobRegistry {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            jobs: Vec::new(),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Fails with [`ShellError::RegistryFull`] when no slot is left.
    pub fn ensure_capacity(&self) -> Result<()> {
        if self.jobs.len() >= self.capacity {
            return Err(ShellError::RegistryFull(self.capacity));
        }
        Ok(())
    }

    /// Append `command` and return its new slot.
    pub fn register(&mut self, command: Command) -> Result<Slot> {
        self.ensure_capacity()?;
        let slot = self.jobs.len();
        tracing::debug!(slot, pid = ?command.pid, state = %command.state, "job registered");
        self.jobs.push(Job { slot, command });
        Ok(slot)
    }

    pub fn get(&self, slot: Slot) -> Option<&Job> {
        self.jobs.get(slot)
    }

    pub fn get_mut(&mut self, slot: Slot) -> Option<&mut Job> {
        self.jobs.get_mut(slot)
    }

    /// Like [`get_mut`](Self::get_mut), but reports unknown slots as an error.
    pub fn lookup_mut(&mut self, slot: Slot) -> Result<&mut Job> {
        self.jobs.get_mut(slot).ok_or(ShellError::NoSuchJob(slot))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Job> {
        self.jobs.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Job> {
        self.jobs.iter_mut()
    }
}

impl Default for JobRegistry {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

/// A line printed to the user about a job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice<'a> {
    Launched { slot: Slot, pid: Pid },
    Running { slot: Slot, text: &'a str },
    Stopped { slot: Slot, text: &'a str },
    Done { slot: Slot, text: &'a str },
    Exit { slot: Slot, code: ExitCode, text: &'a str },
    Terminated { slot: Slot, text: &'a str },
}

impl fmt::Display for Notice<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::Launched { slot, pid } => write!(f, "[{}]\t{}", slot, pid),
            Notice::Running { slot, text } => write!(f, "[{}]\tRunning\t\t{}", slot, text),
            Notice::Stopped { slot, text } => write!(f, "[{}]\tStopped\t\t{}", slot, text),
            Notice::Done { slot, text } => write!(f, "[{}]\tDone\t\t{}", slot, text),
            Notice::Exit { slot, code, text } => write!(f, "[{}]\tExit\t{}\t{}", slot, code, text),
            Notice::Terminated { slot, text } => write!(f, "[{}]\tTerminated\t{}", slot, text),
        }
    }
}
