//! The signal bridge: keeps the job table in line with what the kernel says about our children,
//! and forwards keyboard signals to the foreground job.
//!
//! `signal-hook` turns the asynchronous deliveries into an iterator drained by one dedicated
//! thread, so handlers never nest and never run inside a main-flow critical section: each one
//! takes the job table lock like any other caller.
use std::{
    io::{self, Write},
    process,
    sync::Arc,
    thread,
};

use nix::{
    errno::Errno,
    sys::{
        signal::{killpg, Signal},
        wait::{waitpid, WaitPidFlag, WaitStatus},
    },
    unistd::Pid,
};
use signal_hook::{
    consts::signal::{SIGCHLD, SIGINT, SIGQUIT, SIGTSTP},
    iterator::Signals,
};
use tracing::{debug, warn};

use crate::{
    error::Result,
    job::{JobControl, JobTable},
};

/// Starts the signal bridge thread. From here on Ctrl-C and Ctrl-Z no longer reach the shell
/// itself, only the foreground job.
pub fn install(jobs: Arc<JobControl>) -> Result<()> {
    let mut signals = Signals::new([SIGCHLD, SIGINT, SIGTSTP, SIGQUIT])?;
    thread::Builder::new()
        .name("signal-bridge".to_owned())
        .spawn(move || {
            for signal in signals.forever() {
                let outcome = match signal {
                    SIGCHLD => reap(&jobs, &mut io::stdout()),
                    SIGINT => forward(&jobs, Signal::SIGINT).map(drop),
                    SIGTSTP => forward(&jobs, Signal::SIGTSTP).map(drop),
                    SIGQUIT => {
                        println!("Terminating after receipt of SIGQUIT signal");
                        process::exit(1);
                    }
                    _ => unreachable!(),
                };
                if let Err(e) = outcome {
                    warn!(signal, "signal handling failed: {}", e);
                }
            }
        })?;
    Ok(())
}

/// Reaps every child whose state changed since the last call, without blocking, and reports
/// the changes to `out`. A single SIGCHLD may stand for several coalesced changes.
pub fn reap<W: Write>(jobs: &JobControl, out: &mut W) -> Result<()> {
    let mut table = jobs.lock();
    let result = drain(&mut table, out, || {
        waitpid(
            None::<Pid>,
            Some(WaitPidFlag::WNOHANG | WaitPidFlag::WUNTRACED),
        )
    });
    // Messages are out before anyone waiting on the foreground wakes up
    drop(table);
    jobs.notify();
    result
}

/// Applies wait results to the table until `next_status` reports that nothing is pending.
/// All pending changes are drained, stops included.
fn drain<W, F>(table: &mut JobTable, out: &mut W, mut next_status: F) -> Result<()>
where
    W: Write,
    F: FnMut() -> nix::Result<WaitStatus>,
{
    loop {
        match next_status() {
            Ok(WaitStatus::StillAlive) | Err(Errno::ECHILD) => break,
            Err(Errno::EINTR) => continue,
            Err(e) => return Err(e.into()),
            Ok(status) => {
                debug!(?status, "child state changed");
                if let Some(notice) = table.reconcile(status) {
                    writeln!(out, "{}", notice)?;
                }
            }
        }
    }
    out.flush()?;
    Ok(())
}

/// Sends `signal` to the whole process group of the foreground job, if there is one.
/// The table is left alone; the resulting state change comes back through SIGCHLD.
pub fn forward(jobs: &JobControl, signal: Signal) -> Result<Option<Pid>> {
    let table = jobs.lock();
    match table.foreground() {
        Some(pid) => {
            killpg(pid, signal)?;
            debug!(%pid, ?signal, "forwarded to foreground job");
            Ok(Some(pid))
        }
        None => Ok(None),
    }
}
