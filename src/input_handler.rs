use std::{
    fs,
    io::{self, IsTerminal, Write},
    path::{Path, PathBuf},
};

use rustyline::{error::ReadlineError, Editor};
use tracing::{debug, warn};

use crate::{config::Config, error::Result};

/// Where command lines come from: the line editor when a user sits at a terminal,
/// plain stdin otherwise (scripts, tests, `-p`).
pub enum InputHandler {
    Editor {
        editor: Editor<()>,
        prompt: String,
        history_file: Option<PathBuf>,
    },
    Plain {
        stdin: io::Stdin,
        prompt: Option<String>,
    },
}

impl InputHandler {
    pub fn new(config: &Config) -> InputHandler {
        let stdin = io::stdin();
        match config.prompt() {
            Some(prompt) if stdin.is_terminal() => {
                let mut editor = Editor::<()>::with_config(config.line_editor_config().clone());
                let history_file = config
                    .history_file()
                    .map(PathBuf::as_path)
                    .and_then(history_dir_ready);
                if let Some(path) = &history_file {
                    // A missing history file is the normal first run
                    if let Err(e) = editor.load_history(path) {
                        debug!("no history loaded from {}: {}", path.display(), e);
                    }
                }
                InputHandler::Editor {
                    editor,
                    prompt: prompt.to_owned(),
                    history_file,
                }
            }
            prompt => InputHandler::Plain {
                stdin,
                prompt: prompt.map(str::to_owned),
            },
        }
    }

    /// Reads the next command line, trailing newline included. `None` at end of input.
    pub fn read_line(&mut self) -> Result<Option<String>> {
        match self {
            InputHandler::Editor { editor, prompt, .. } => match editor.readline(prompt.as_str()) {
                Ok(mut line) => {
                    line.push('\n');
                    Ok(Some(line))
                }
                // Ctrl-C at the prompt throws the line away
                Err(ReadlineError::Interrupted) => Ok(Some(String::new())),
                Err(ReadlineError::Eof) => Ok(None),
                Err(e) => Err(e.into()),
            },
            InputHandler::Plain { stdin, prompt } => {
                if let Some(prompt) = prompt {
                    print!("{}", prompt);
                    io::stdout().flush()?;
                }
                let mut line = String::new();
                if stdin.read_line(&mut line)? == 0 {
                    return Ok(None);
                }
                if !line.ends_with('\n') {
                    line.push('\n');
                }
                Ok(Some(line))
            }
        }
    }

    /// Persists the line editor history, if there is one.
    pub fn save_history(&mut self) {
        if let InputHandler::Editor {
            editor,
            history_file: Some(path),
            ..
        } = self
        {
            if let Err(e) = editor.save_history(path) {
                warn!("could not save history to {}: {}", path.display(), e);
            }
        }
    }
}

/// Makes sure the directory holding the history file exists. History is turned off
/// rather than failing the shell when it cannot be created.
fn history_dir_ready(path: &Path) -> Option<PathBuf> {
    if let Some(dir) = path.parent() {
        if let Err(e) = fs::create_dir_all(dir) {
            warn!("history disabled, cannot create {}: {}", dir.display(), e);
            return None;
        }
    }
    Some(path.to_path_buf())
}
