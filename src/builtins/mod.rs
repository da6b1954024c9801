pub mod bgfg;
pub mod jobs;
pub mod quit;
