use std::{
    io::{self, Write},
    process,
    sync::Arc,
};

use clap::Parser;
use tracing_subscriber::EnvFilter;
use tsh::{
    config::{Config, Options},
    input_handler::InputHandler,
    signals, Shell,
};

fn write_output(bytes: &[u8]) -> io::Result<()> {
    let mut stdout = io::stdout().lock();
    stdout.write_all(bytes)?;
    stdout.flush()
}

fn main() {
    let options = Options::parse();
    let config = Config::new(&options);

    let filter = if config.verbose() {
        EnvFilter::new("tsh=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let shell = Shell::new(config.max_jobs());

    if let Err(e) = signals::install(Arc::clone(shell.jobs())) {
        eprintln!("signal error: {}", e);
        process::exit(1);
    }

    let mut input = InputHandler::new(&config);
    loop {
        let line = match input.read_line() {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                eprintln!("read error: {}", e);
                input.save_history();
                process::exit(1);
            }
        };

        match shell.eval(&line) {
            Ok(output) => {
                if let Err(e) = write_output(&output.stdout) {
                    eprintln!("{}", e);
                }
                if let Some(code) = output.exit {
                    input.save_history();
                    process::exit(code);
                }
            }
            Err(e) if e.is_user_facing() => {
                if let Err(e) = write_output(format!("{}\n", e).as_bytes()) {
                    eprintln!("{}", e);
                }
            }
            Err(e) => eprintln!("{}", e),
        }
    }

    input.save_history();
}
