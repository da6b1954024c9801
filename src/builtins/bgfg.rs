use nix::{
    sys::signal::{killpg, Signal},
    unistd::Pid,
};
use tracing::debug;

use crate::{
    error::Result,
    job::{JobControl, JobState, JobTable},
    step::StepOutput,
};

/// How the user named the job: a bare pid or `%jid`
#[derive(Debug, PartialEq, Eq)]
enum Target {
    Pid(Pid),
    Jid(usize),
}

/// Value of the leading run of decimal digits, `0` if there is none
fn leading_number<T: std::str::FromStr + Default>(s: &str) -> Option<T> {
    let end = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    if end == 0 {
        return Some(T::default());
    }
    s[..end].parse().ok()
}

/// Parses the argument of `bg`/`fg`, or returns the usage message to print.
fn parse_target(args: &[String]) -> std::result::Result<Target, String> {
    let cmd = args.first().map(String::as_str).unwrap_or_default();
    let arg = match args.get(1) {
        Some(arg) => arg,
        None => return Err(format!("{} command requires PID or %jobid argument\n", cmd)),
    };

    if arg.starts_with(|c: char| c.is_ascii_digit()) {
        match leading_number::<i32>(arg) {
            Some(pid) => Ok(Target::Pid(Pid::from_raw(pid))),
            None => Err(format!("({}): No such process\n", arg)),
        }
    } else if let Some(jid) = arg.strip_prefix('%') {
        match leading_number::<usize>(jid) {
            Some(jid) => Ok(Target::Jid(jid)),
            None => Err(format!("{}: No such job\n", arg)),
        }
    } else {
        Err(format!("{}: argument must be a PID or %jobid\n", cmd))
    }
}

/// Finds the pid of the named job, or the message to print if there is none
fn resolve(table: &JobTable, args: &[String]) -> std::result::Result<Pid, String> {
    match parse_target(args)? {
        Target::Pid(pid) => table
            .find_by_pid(pid)
            .map(|j| j.pid)
            .ok_or_else(|| format!("({}): No such process\n", pid)),
        Target::Jid(jid) => table
            .find_by_jid(jid)
            .map(|j| j.pid)
            .ok_or_else(|| format!("{}: No such job\n", args[1])),
    }
}

/// Moves the job to `state` and continues its whole process group.
/// The old state is put back if the group cannot be signalled.
fn continue_as(table: &mut JobTable, pid: Pid, state: JobState) -> Result<()> {
    let previous = table.find_by_pid(pid).map(|j| j.state);
    table.set_state(pid, state)?;
    if let Err(e) = killpg(pid, Signal::SIGCONT) {
        if let Some(previous) = previous {
            table.set_state(pid, previous)?;
        }
        return Err(e.into());
    }
    debug!(%pid, ?state, "sent SIGCONT");
    Ok(())
}

/// Continues a job in the background and prints its status line
pub fn run_bg(jobs: &JobControl, args: &[String]) -> Result<StepOutput> {
    let mut table = jobs.lock();
    let pid = match resolve(&table, args) {
        Ok(pid) => pid,
        Err(msg) => return Ok(StepOutput::failure(msg)),
    };
    continue_as(&mut table, pid, JobState::Background)?;

    let line = table
        .find_by_pid(pid)
        .map(|job| job.to_string())
        .unwrap_or_default();
    Ok(StepOutput::with_stdout(line))
}

/// Continues a job in the foreground and blocks until it leaves the foreground
pub fn run_fg(jobs: &JobControl, args: &[String]) -> Result<StepOutput> {
    let mut table = jobs.lock();
    let pid = match resolve(&table, args) {
        Ok(pid) => pid,
        Err(msg) => return Ok(StepOutput::failure(msg)),
    };
    continue_as(&mut table, pid, JobState::Foreground)?;
    drop(jobs.wait_foreground(table, pid));
    Ok(StepOutput::ok())
}
