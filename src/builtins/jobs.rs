use crate::{error::Result, job::JobControl, step::StepOutput};

/// Lists every active job, one status line each, in jid order
pub fn run(jobs: &JobControl, _args: &[String]) -> Result<StepOutput> {
    let table = jobs.lock();
    let listing: String = table.list().map(|job| job.to_string()).collect();
    Ok(StepOutput::with_stdout(listing))
}
