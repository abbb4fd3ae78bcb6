//! Interactive shell.
//!
//! A rustyline loop feeding lines into the same clap tree as one-shot
//! invocations. The visible surface is shaped by the role-command policy:
//! before login only session commands are offered, afterwards the commands
//! the stored credential's role allows. Errors are printed and the loop
//! continues; only `exit`, `quit`, or Ctrl-D leave.

use clap::Parser;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing::debug;

use crate::AppState;
use crate::commands::{Cli, current_role, dispatch};
use crate::errors::{Error, Result};

const PROMPT: &str = "epicevents> ";

pub async fn run(state: &AppState) -> Result<()> {
    let mut editor = DefaultEditor::new().map_err(|e| Error::Internal {
        operation: format!("create the line editor: {e}"),
    })?;

    let history_path = dirs::home_dir().map(|home| home.join(".epicevents").join("history"));
    if let Some(path) = &history_path {
        // First run has no history yet
        let _ = editor.load_history(path);
    }

    println!("EpicEvents CRM. Type 'help' for commands, 'exit' to leave.");
    print_surface(state);

    loop {
        match editor.readline(PROMPT) {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                let _ = editor.add_history_entry(line);

                match line {
                    "exit" | "quit" => break,
                    "clear" => print!("\x1B[2J\x1B[1;1H"),
                    "help" => {
                        print_help();
                        print_surface(state);
                    }
                    _ => execute_line(state, line).await,
                }
            }
            Err(ReadlineError::Interrupted) => {
                // Ctrl-C drops the current line, not the shell
                println!("^C");
                continue;
            }
            Err(ReadlineError::Eof) => break,
            Err(e) => {
                return Err(Error::Internal {
                    operation: format!("read a line: {e}"),
                });
            }
        }
    }

    if let Some(path) = &history_path {
        if let Err(e) = editor.save_history(path) {
            debug!("Could not save shell history: {e}");
        }
    }

    Ok(())
}

async fn execute_line(state: &AppState, line: &str) {
    let tokens = line.split_whitespace();

    match Cli::try_parse_from(std::iter::once("epicevents").chain(tokens)) {
        Ok(cli) => {
            if let Err(e) = dispatch(state, cli.command).await {
                e.log();
                eprintln!("{}", e.user_message());
            }
        }
        // clap renders its own usage/error text
        Err(e) => {
            let _ = e.print();
        }
    }
}

fn print_help() {
    let mut command = <Cli as clap::CommandFactory>::command();
    let _ = command.print_help();
    println!();
}

/// Policy-filtered view of what the current session may run
fn print_surface(state: &AppState) {
    match current_role(state) {
        Some(role) => {
            let mut allowed = state.policy.allowed_commands(role).to_vec();
            allowed.sort();
            println!("Available to {role}: {}", allowed.join(", "));
        }
        None => println!("Not connected. Available: auth login, auth status, help, exit"),
    }
}
