pub mod builtin;
pub mod builtins;
pub mod config;
pub mod error;
pub mod input_handler;
pub mod job;
pub mod signals;
pub mod step;

use std::sync::Arc;

use tracing::debug;

pub use builtin::Builtin;
pub use error::{Result, ShellError};
pub use job::{Job, JobControl, JobState, JobTable};
pub use step::{Step, StepOutput};

/// Splits a command line into words and tells whether it asks for a background job.
/// Quoted spans (`'...'` or `"..."`) make a single word, quotes removed; a final `&` word
/// marks a background job and is dropped. No other expansion happens.
pub fn parse_line(line: &str) -> (Vec<String>, bool) {
    let mut words = Vec::new();
    let mut word = String::new();
    let mut in_word = false;
    let mut quote: Option<char> = None;

    for c in line.chars() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => word.push(c),
            None if c == '\'' || c == '"' => {
                quote = Some(c);
                in_word = true;
            }
            None if c.is_whitespace() => {
                if in_word {
                    words.push(std::mem::take(&mut word));
                    in_word = false;
                }
            }
            None => {
                word.push(c);
                in_word = true;
            }
        }
    }
    if in_word {
        words.push(word);
    }

    let background = words.last().map_or(false, |w| w == "&");
    if background {
        words.pop();
    }
    (words, background)
}

/// The command dispatcher. Owns the handle on the job table it shares with the signal bridge.
pub struct Shell {
    jobs: Arc<JobControl>,
}

impl Shell {
    pub fn new(max_jobs: usize) -> Shell {
        Shell {
            jobs: Arc::new(JobControl::new(max_jobs)),
        }
    }

    pub fn jobs(&self) -> &Arc<JobControl> {
        &self.jobs
    }

    /// Evaluates one command line as typed, trailing newline included.
    pub fn eval(&self, cmdline: &str) -> Result<StepOutput> {
        let (argv, background) = parse_line(cmdline);
        self.run(&argv, background, cmdline)
    }

    /// Runs a builtin in place, or starts the program as a new job. A foreground job is
    /// waited for before returning; a background job yields its status line.
    pub fn run(&self, argv: &[String], background: bool, cmdline: &str) -> Result<StepOutput> {
        if let Some(builtin) = Builtin::new(argv) {
            debug!(builtin = builtin.name(), "running builtin");
            return builtin.run(&self.jobs);
        }
        let mut step = match Step::new(argv) {
            Some(step) => step,
            None => return Ok(StepOutput::ok()),
        };

        // Spawn and register in one critical section, the reaper must not see the child first
        let mut table = self.jobs.lock();
        if table.is_full() {
            return Err(ShellError::CapacityExceeded(table.capacity()));
        }
        let pid = step.spawn()?;
        let state = if background {
            JobState::Background
        } else {
            JobState::Foreground
        };
        let jid = table.add(pid, state, cmdline)?;

        if background {
            Ok(StepOutput::with_stdout(format!("[{}] ({}) {}", jid, pid, cmdline)))
        } else {
            drop(self.jobs.wait_foreground(table, pid));
            Ok(StepOutput::ok())
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use nix::{
        sys::{
            signal::{kill, Signal},
            wait::{waitpid, WaitStatus},
        },
        unistd::Pid,
    };
    use std::{thread, time::Duration};

    fn words(ws: &[&str]) -> Vec<String> {
        ws.iter().map(|w| w.to_string()).collect()
    }

    fn only_job(shell: &Shell) -> Job {
        let table = shell.jobs().lock();
        assert_eq!(table.len(), 1);
        table.list().next().unwrap().clone()
    }

    fn kill_and_reap(pid: Pid) {
        kill(pid, Signal::SIGKILL).unwrap();
        waitpid(pid, None).unwrap();
    }

    #[test]
    fn parse_simple_lines() {
        assert_eq!(parse_line("sleep 5\n"), (words(&["sleep", "5"]), false));
        assert_eq!(parse_line("sleep 5 &\n"), (words(&["sleep", "5"]), true));
        assert_eq!(parse_line("  \n"), (vec![], false));
        assert_eq!(parse_line("&\n"), (vec![], true));
        // Only a separate trailing word counts
        assert_eq!(parse_line("sleep 5&\n"), (words(&["sleep", "5&"]), false));
    }

    #[test]
    fn parse_quoted_words() {
        assert_eq!(
            parse_line("echo 'a b' \"c  d\"e\n"),
            (words(&["echo", "a b", "c  de"]), false)
        );
        assert_eq!(parse_line("echo ''\n"), (words(&["echo", ""]), false));
        assert_eq!(parse_line("echo $HOME ~\n"), (words(&["echo", "$HOME", "~"]), false));
    }

    #[test]
    fn blank_line_does_nothing() {
        let shell = Shell::new(4);
        assert_eq!(shell.eval("\n").unwrap(), StepOutput::ok());
        assert!(shell.jobs().lock().is_empty());
    }

    #[test]
    fn background_job_is_registered_and_announced() {
        let shell = Shell::new(4);
        let out = shell.eval("sleep 5 &\n").unwrap();
        let job = only_job(&shell);
        assert_eq!(job.jid, 1);
        assert_eq!(job.state, JobState::Background);
        assert_eq!(job.cmdline, "sleep 5 &\n");
        assert_eq!(
            String::from_utf8(out.stdout).unwrap(),
            format!("[1] ({}) sleep 5 &\n", job.pid)
        );

        let listing = shell.eval("jobs\n").unwrap();
        assert_eq!(
            String::from_utf8(listing.stdout).unwrap(),
            format!("[1] ({}) sleep 5 &\n", job.pid)
        );
        kill_and_reap(job.pid);
    }

    #[test]
    fn full_table_spawns_nothing() {
        let shell = Shell::new(1);
        shell.eval("sleep 5 &\n").unwrap();
        let first = only_job(&shell);
        match shell.eval("sleep 6 &\n") {
            Err(e @ ShellError::CapacityExceeded(1)) => {
                assert_eq!(e.to_string(), "Tried to create too many jobs (max 1)")
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(only_job(&shell), first);
        kill_and_reap(first.pid);
    }

    #[test]
    fn unknown_program_registers_nothing() {
        let shell = Shell::new(4);
        match shell.eval("./no-such-program arg\n") {
            Err(e) => assert_eq!(e.to_string(), "./no-such-program: Command not found"),
            Ok(out) => panic!("unexpected {:?}", out),
        }
        assert!(shell.jobs().lock().is_empty());
    }

    #[test]
    fn quit_asks_to_exit() {
        let shell = Shell::new(4);
        assert_eq!(shell.eval("quit\n").unwrap().exit, Some(0));
    }

    #[test]
    fn foreground_job_blocks_until_reaped() {
        let shell = Shell::new(4);
        let jobs = Arc::clone(shell.jobs());
        let reaper = thread::spawn(move || loop {
            let fg = jobs.lock().foreground();
            match fg {
                Some(pid) => {
                    let status = waitpid(pid, None).unwrap();
                    jobs.lock().reconcile(status);
                    jobs.notify();
                    return status;
                }
                None => thread::sleep(Duration::from_millis(10)),
            }
        });

        let out = shell.eval("sleep 0.2\n").unwrap();
        assert!(out.success);
        assert!(shell.jobs().lock().is_empty());
        assert!(matches!(reaper.join().unwrap(), WaitStatus::Exited(_, 0)));
    }
}
