use crate::{error::Result, job::JobControl, step::StepOutput};

/// Terminates the shell. Registered jobs are abandoned, process teardown reclaims them.
pub fn run(_jobs: &JobControl, _args: &[String]) -> Result<StepOutput> {
    Ok(StepOutput::exit(0))
}
