//! The job table: every child the shell is tracking, keyed by pid.
//!
//! The table is shared between the main flow and the signal bridge through [`JobControl`].
//! Holding the table lock is the shell's critical section: a child is spawned and registered
//! under one lock, so the reaper can never observe a pid the table does not know yet.
use std::{
    fmt, slice,
    sync::{Condvar, Mutex, MutexGuard, PoisonError},
};

use nix::{sys::wait::WaitStatus, unistd::Pid};
use tracing::debug;

use crate::error::{Result, ShellError};

/// Default capacity of the job table
pub const MAX_JOBS: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Foreground,
    Background,
    Stopped,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub pid: Pid,
    pub jid: usize,
    pub state: JobState,
    /// The line as the user typed it, trailing newline included
    pub cmdline: String,
}

/// Status line used by background launches, `bg` and `jobs`
impl fmt::Display for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] ({}) {}", self.jid, self.pid, self.cmdline)
    }
}

/// What the reaper has to tell the user about a child state change.
/// Normal exits are silent and never produce one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    Terminated { jid: usize, pid: Pid, signal: i32 },
    Stopped { jid: usize, pid: Pid, signal: i32 },
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::Terminated { jid, pid, signal } => {
                write!(f, "Job [{}] ({}) terminated by signal {}", jid, pid, signal)
            }
            Notice::Stopped { jid, pid, signal } => {
                write!(f, "Job [{}] ({}) stopped by signal {}", jid, pid, signal)
            }
        }
    }
}

/// Bounded registry of active jobs.
/// Jobs are kept sorted by jid, so listing needs no extra work.
#[derive(Debug)]
pub struct JobTable {
    jobs: Vec<Job>,
    capacity: usize,
}

impl Default for JobTable {
    fn default() -> Self {
        JobTable::new(MAX_JOBS)
    }
}

impl JobTable {
    pub fn new(capacity: usize) -> JobTable {
        JobTable {
            jobs: Vec::with_capacity(capacity),
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

    pub fn is_full(&self) -> bool {
        self.jobs.len() >= self.capacity
    }

    /// Registers a job under the smallest free jid and returns that jid.
    pub fn add(&mut self, pid: Pid, state: JobState, cmdline: &str) -> Result<usize> {
        if self.is_full() {
            return Err(ShellError::CapacityExceeded(self.capacity));
        }
        if state == JobState::Foreground {
            if let Some(fg) = self.foreground() {
                return Err(ShellError::ForegroundBusy(fg));
            }
        }
        // The pid is the kernel's to keep unique, a stale entry can only mean a missed reap
        self.remove(pid);

        // Sorted jids: the first gap is the smallest unused one
        let mut jid = 1;
        let mut slot = self.jobs.len();
        for (i, job) in self.jobs.iter().enumerate() {
            if job.jid != jid {
                slot = i;
                break;
            }
            jid += 1;
        }

        self.jobs.insert(
            slot,
            Job {
                pid,
                jid,
                state,
                cmdline: cmdline.to_owned(),
            },
        );
        debug!(jid, %pid, ?state, "added job");
        Ok(jid)
    }

    /// Returns whether the job existed. Removing twice is harmless.
    pub fn remove(&mut self, pid: Pid) -> bool {
        match self.jobs.iter().position(|j| j.pid == pid) {
            Some(i) => {
                let job = self.jobs.remove(i);
                debug!(jid = job.jid, %pid, "removed job");
                true
            }
            None => false,
        }
    }

    pub fn find_by_pid(&self, pid: Pid) -> Option<&Job> {
        self.jobs.iter().find(|j| j.pid == pid)
    }

    pub fn find_by_jid(&self, jid: usize) -> Option<&Job> {
        self.jobs.iter().find(|j| j.jid == jid)
    }

    /// Pid of the foreground job, if any
    pub fn foreground(&self) -> Option<Pid> {
        self.jobs
            .iter()
            .find(|j| j.state == JobState::Foreground)
            .map(|j| j.pid)
    }

    /// Moves a job to a new state. Returns `false` if no job has this pid.
    pub fn set_state(&mut self, pid: Pid, state: JobState) -> Result<bool> {
        if state == JobState::Foreground {
            match self.foreground() {
                Some(fg) if fg != pid => return Err(ShellError::ForegroundBusy(fg)),
                _ => {}
            }
        }
        match self.jobs.iter_mut().find(|j| j.pid == pid) {
            Some(job) => {
                debug!(jid = job.jid, %pid, from = ?job.state, to = ?state, "job state change");
                job.state = state;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Jobs in ascending jid order. The iterator borrows the table, so whoever holds
    /// the lock sees a consistent snapshot; clone it to walk the jobs again.
    pub fn list(&self) -> slice::Iter<'_, Job> {
        self.jobs.iter()
    }

    /// Applies one observed child state change to the table.
    ///
    /// Unknown pids are ignored, so a duplicate notification for a job that is already gone
    /// is a no-op.
    pub fn reconcile(&mut self, status: WaitStatus) -> Option<Notice> {
        match status {
            WaitStatus::Exited(pid, code) => {
                debug!(%pid, code, "child exited");
                self.remove(pid);
                None
            }
            WaitStatus::Signaled(pid, signal, _) => {
                let jid = self.find_by_pid(pid)?.jid;
                self.remove(pid);
                Some(Notice::Terminated {
                    jid,
                    pid,
                    signal: signal as i32,
                })
            }
            WaitStatus::Stopped(pid, signal) => {
                let jid = self.find_by_pid(pid)?.jid;
                if let Some(job) = self.jobs.iter_mut().find(|j| j.pid == pid) {
                    job.state = JobState::Stopped;
                }
                Some(Notice::Stopped {
                    jid,
                    pid,
                    signal: signal as i32,
                })
            }
            _ => None,
        }
    }
}

/// The job table together with the condition variable the reaper uses to wake a waiting
/// foreground.
#[derive(Debug)]
pub struct JobControl {
    table: Mutex<JobTable>,
    changed: Condvar,
}

impl JobControl {
    pub fn new(capacity: usize) -> JobControl {
        JobControl {
            table: Mutex::new(JobTable::new(capacity)),
            changed: Condvar::new(),
        }
    }

    /// Enters the critical section.
    pub fn lock(&self) -> MutexGuard<'_, JobTable> {
        // A panicking holder cannot leave the table half-updated, every mutation is one call
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Wakes anyone blocked in [`JobControl::wait_foreground`]
    pub fn notify(&self) {
        self.changed.notify_all();
    }

    /// Blocks until `pid` no longer holds the foreground, i.e. until the reaper removed or
    /// stopped it. The lock is released while blocked and held again on return.
    pub fn wait_foreground<'a>(
        &'a self,
        table: MutexGuard<'a, JobTable>,
        pid: Pid,
    ) -> MutexGuard<'a, JobTable> {
        debug!(%pid, "waiting for foreground job");
        self.changed
            .wait_while(table, |t| t.foreground() == Some(pid))
            .unwrap_or_else(PoisonError::into_inner)
    }
}
