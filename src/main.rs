use std::env;
use std::error::Error;
use std::fs;
use std::io::{self, BufRead, Write};
use std::process;

use alpha::interpreter::Interpreter;
use alpha::RunError;
use tracing::debug;

fn main() {
    init_tracing();

    let args: Vec<String> = env::args().collect();

    if args.len() > 2 {
        println!("Usage: alpha [script]");
        process::exit(64);
    } else if args.len() == 2 {
        if let Err(error) = run_file(&args[1]) {
            eprintln!("Error reading file: {error}");
            process::exit(66);
        }
    } else if let Err(error) = run_prompt() {
        eprintln!("Error reading input: {error}");
        process::exit(74);
    }
}

/// Installs a log subscriber when `RUST_LOG` is set, e.g.
/// `RUST_LOG=alpha=debug alpha script.alpha`.
fn init_tracing() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    if env::var("RUST_LOG").is_ok() {
        tracing_subscriber::registry()
            .with(fmt::layer().with_writer(io::stderr).with_target(true))
            .with(EnvFilter::from_default_env())
            .init();
    }
}

fn run_file(path: &str) -> Result<(), Box<dyn Error>> {
    let text = fs::read_to_string(path)?;
    debug!(path, bytes = text.len(), "running file");

    let mut interpreter = Interpreter::new();
    match alpha::run(&text, &mut interpreter) {
        Ok(()) => Ok(()),
        Err(error) => {
            eprintln!("{error}");
            process::exit(match error {
                RunError::Syntax(_) => 65,
                RunError::Runtime(_) => 70,
            });
        }
    }
}

/// Lines ending in `;` or `}` run as statements; anything else is evaluated
/// as an expression and its value printed.
fn run_prompt() -> io::Result<()> {
    let mut interpreter = Interpreter::new();
    let stdin = io::stdin();
    let mut input = String::new();

    loop {
        print!("> ");
        io::stdout().flush()?;

        input.clear();
        if stdin.lock().read_line(&mut input)? == 0 {
            break;
        }

        let line = input.trim();
        if line.is_empty() {
            continue;
        }

        if line.ends_with(';') || line.ends_with('}') {
            if let Err(error) = alpha::run(line, &mut interpreter) {
                eprintln!("{error}");
            }
        } else {
            match alpha::evaluate(line, &mut interpreter) {
                Ok(value) => println!("{value}"),
                Err(error) => eprintln!("{error}"),
            }
        }
    }

    Ok(())
}
