use std::io;

use nix::unistd::Pid;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ShellError {
    #[error("Tried to create too many jobs (max {0})")]
    CapacityExceeded(usize),

    /// Only one job may hold the foreground at a time
    #[error("({0}) is already running in the foreground")]
    ForegroundBusy(Pid),

    #[error("{0}: Command not found")]
    CommandNotFound(String),

    #[error("fork error: {0}")]
    Spawn(#[source] io::Error),

    #[error("{0}")]
    Sys(#[from] nix::Error),

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error(transparent)]
    Readline(#[from] rustyline::error::ReadlineError),
}

impl ShellError {
    /// Reports the user sees in the shell's own output, as opposed to system failures
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            ShellError::CapacityExceeded(_)
                | ShellError::ForegroundBusy(_)
                | ShellError::CommandNotFound(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, ShellError>;
