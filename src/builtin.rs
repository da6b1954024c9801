use crate::builtins::{bgfg, jobs, quit};
use crate::error::Result;
use crate::job::JobControl;
use crate::step::StepOutput;
/*
## Built-in Commands

* `quit` terminates the shell at once, abandoning any job still registered
* `jobs` lists the active jobs
* `bg <pid|%jid>` continues a job in the background
* `fg <pid|%jid>` continues a job in the foreground and waits for it
  A built-in always wins over an external program of the same name.
*/
use std::fmt;

/// Jobs, Args (argv[0] included)
pub type BuiltinFn = fn(&JobControl, &[String]) -> Result<StepOutput>;

pub struct Builtin {
    name: String,
    args: Vec<String>,
    function: BuiltinFn,
}

impl fmt::Debug for Builtin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Builtin")
            .field("name", &self.name)
            .field("args", &self.args)
            .finish()
    }
}

///Roughly analogous to process::Command
impl Builtin {
    fn function_map(name: &str) -> Option<BuiltinFn> {
        match name {
            "quit" => Some(quit::run),
            "jobs" => Some(jobs::run),
            "bg" => Some(bgfg::run_bg),
            "fg" => Some(bgfg::run_fg),
            _ => None,
        }
    }

    /// Returns the builtin named by `argv[0]`, if there is one
    pub fn new(argv: &[String]) -> Option<Builtin> {
        let name = argv.first()?;
        let function = Builtin::function_map(name)?;
        Some(Builtin {
            name: name.clone(),
            args: argv.to_vec(),
            function,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Runs synchronously, only `fg` ever blocks
    pub fn run(self, jobs: &JobControl) -> Result<StepOutput> {
        (self.function)(jobs, &self.args)
    }
}
