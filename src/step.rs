use std::{
    io::{self, ErrorKind},
    os::unix::process::CommandExt,
    process::{Command, Stdio},
};

use nix::unistd::Pid;
use tracing::debug;

use crate::error::{Result, ShellError};

/// Step, the basic unit of execution: an external program about to become a job.
/// Design wise - std's `Command` already restores the child's signal mask and dispositions before
/// exec, so the child side only needs a process group of its own.
#[derive(Debug)]
pub struct Step {
    program: String,
    command: Command,
}

/// Roughly analogous to process::Output mixed with process::ExitStatus.
/// Since process::ExitStatus is sealed, we can't instantiate it directly. With our own struct,
/// builtins and the dispatcher can all report through it.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct StepOutput {
    pub success: bool,
    /// Everything meant for the user, failure reports included
    pub stdout: Vec<u8>,
    /// Set by `quit`: the shell must terminate with this code
    pub exit: Option<i32>,
}

impl StepOutput {
    pub fn ok() -> StepOutput {
        StepOutput {
            success: true,
            ..Default::default()
        }
    }

    pub fn with_stdout(line: String) -> StepOutput {
        StepOutput {
            success: true,
            stdout: line.into_bytes(),
            ..Default::default()
        }
    }

    /// A user error: reported, nothing else happens
    pub fn failure(line: String) -> StepOutput {
        StepOutput {
            success: false,
            stdout: line.into_bytes(),
            ..Default::default()
        }
    }

    pub fn exit(code: i32) -> StepOutput {
        StepOutput {
            success: true,
            exit: Some(code),
            ..Default::default()
        }
    }
}

impl Step {
    /// Creates a new Step from an argument vector. `None` if it is empty.
    pub fn new(argv: &[String]) -> Option<Step> {
        let (program, args) = argv.split_first()?;
        let mut command = Command::new(program);
        command
            .args(args)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            // Own process group, so keyboard signals aimed at the shell's group miss the job
            .process_group(0);
        Some(Step {
            program: program.clone(),
            command,
        })
    }

    /// Starts the child without waiting for it and returns its pid, which is also its
    /// process group id. The child is reaped by the signal bridge, never here.
    pub fn spawn(&mut self) -> Result<Pid> {
        match self.command.spawn() {
            Ok(child) => {
                let pid = Pid::from_raw(child.id() as i32);
                debug!(program = %self.program, %pid, "spawned");
                // Dropping `Child` neither waits nor kills
                Ok(pid)
            }
            Err(e) if is_not_loadable(&e) => Err(ShellError::CommandNotFound(self.program.clone())),
            Err(e) => Err(ShellError::Spawn(e)),
        }
    }
}

fn is_not_loadable(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        ErrorKind::NotFound | ErrorKind::PermissionDenied | ErrorKind::InvalidInput
    ) || e.raw_os_error() == Some(nix::libc::ENOEXEC)
}

#[cfg(test)]
mod test {
    use super::*;

    fn argv(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn empty_argv_is_no_step() {
        assert!(Step::new(&[]).is_none());
    }

    #[test]
    fn missing_program_is_command_not_found() {
        let mut step = Step::new(&argv(&["./definitely-not-a-program"])).unwrap();
        match step.spawn() {
            Err(e @ ShellError::CommandNotFound(_)) => {
                assert_eq!(e.to_string(), "./definitely-not-a-program: Command not found")
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn spawned_child_leads_its_own_group() {
        use nix::{
            sys::wait::{waitpid, WaitStatus},
            unistd::getpgid,
        };

        let mut step = Step::new(&argv(&["sleep", "0.2"])).unwrap();
        let pid = step.spawn().unwrap();
        assert_eq!(getpgid(Some(pid)).unwrap(), pid);
        assert_eq!(waitpid(pid, None).unwrap(), WaitStatus::Exited(pid, 0));
    }
}
