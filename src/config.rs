use clap::Parser;
use std::path::PathBuf;

use crate::job::MAX_JOBS;

/// A tiny shell with job control
#[derive(Debug, Parser)]
#[command(name = "tsh", version)]
pub struct Options {
    /// Emit additional diagnostic information
    #[arg(short, long)]
    pub verbose: bool,

    /// Do not print a prompt (handy for automatic testing)
    #[arg(short = 'p', long = "no-prompt")]
    pub no_prompt: bool,

    /// Maximum number of jobs tracked at once
    #[arg(long, default_value_t = MAX_JOBS)]
    pub max_jobs: usize,
}

pub struct Config {
    line_editor_config: rustyline::Config,
    history_file: Option<PathBuf>,
    prompt: Option<String>,
    verbose: bool,
    max_jobs: usize,
}

impl Config {
    pub fn new(options: &Options) -> Config {
        let mut config = Config::from_default();
        config.verbose = options.verbose;
        config.max_jobs = options.max_jobs.max(1);
        if options.no_prompt {
            config.prompt = None;
        }
        config
    }

    pub fn from_default() -> Config {
        let line_editor_config = rustyline::config::Builder::new()
            .auto_add_history(true)
            .completion_type(rustyline::CompletionType::List)
            .max_history_size(2048)
            .build();

        // Only a path: the directory is made when a line editor actually needs it
        let history_file = dirs::config_dir().map(|mut config_path| {
            config_path.push("tsh");
            config_path.push("tsh_history");
            config_path
        });

        Config {
            line_editor_config,
            history_file,
            prompt: Some(String::from("tsh> ")),
            verbose: false,
            max_jobs: MAX_JOBS,
        }
    }

    pub fn line_editor_config(&self) -> &rustyline::Config {
        &self.line_editor_config
    }

    pub fn history_file(&self) -> Option<&PathBuf> {
        self.history_file.as_ref()
    }

    /// `None` when prompting is turned off
    pub fn prompt(&self) -> Option<&str> {
        self.prompt.as_deref()
    }

    pub fn verbose(&self) -> bool {
        self.verbose
    }

    pub fn max_jobs(&self) -> usize {
        self.max_jobs
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn defaults() {
        let options = Options::parse_from(["tsh"]);
        let config = Config::new(&options);
        assert_eq!(config.prompt(), Some("tsh> "));
        assert!(!config.verbose());
        assert_eq!(config.max_jobs(), MAX_JOBS);
    }

    #[test]
    fn flags() {
        let options = Options::parse_from(["tsh", "-v", "-p", "--max-jobs", "4"]);
        let config = Config::new(&options);
        assert_eq!(config.prompt(), None);
        assert!(config.verbose());
        assert_eq!(config.max_jobs(), 4);
    }

    #[test]
    fn history_lives_in_its_own_directory() {
        let config = Config::from_default();
        if let Some(path) = config.history_file() {
            assert!(path.ends_with("tsh/tsh_history"));
        }
    }

    #[test]
    fn unknown_flag_is_rejected() {
        assert!(Options::try_parse_from(["tsh", "-x"]).is_err());
    }
}
