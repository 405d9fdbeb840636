//! Interactive REPL with readline-style editing and persistent input history.

use anyhow::Result;
use rustyline::config::Configurer;
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::{DefaultEditor, Editor};
use tracing::debug;

use crate::helpers;
use crate::session::ChatSession;

/// A parsed line of REPL input.
#[derive(Debug, PartialEq)]
enum ReplCommand {
    Exit,
    /// Start multi-line input, terminated by `/end`.
    Multi,
    Clear,
    Help,
    /// Show the model, or switch to the given one.
    Model(Option<String>),
    Tools,
    ToolAdd(Vec<String>),
    ToolRemove(Vec<String>),
    Unknown(String),
    Empty,
    Message(String),
}

fn parse_command(input: &str) -> ReplCommand {
    let trimmed = input.trim();
    match trimmed.to_lowercase().as_str() {
        "" => ReplCommand::Empty,
        "/bye" | "/quit" | "/q" | "/exit" => ReplCommand::Exit,
        "/multi" | "/multiline" => ReplCommand::Multi,
        "/clear" => ReplCommand::Clear,
        "/help" | "/?" => ReplCommand::Help,
        "/tool" => ReplCommand::Tools,
        _ if trimmed.starts_with('/') => parse_slash_command(trimmed),
        _ => ReplCommand::Message(trimmed.to_string()),
    }
}

/// Slash commands that take arguments. Arguments keep their case.
fn parse_slash_command(line: &str) -> ReplCommand {
    let mut words = line.split_whitespace();
    let command = words.next().unwrap_or_default().to_lowercase();
    let args: Vec<String> = words.map(str::to_string).collect();

    match (command.as_str(), args.split_first()) {
        ("/model", None) => ReplCommand::Model(None),
        ("/model", Some((name, []))) => ReplCommand::Model(Some(name.clone())),
        ("/tool", Some((sub, names))) if !names.is_empty() => match sub.to_lowercase().as_str() {
            "add" => ReplCommand::ToolAdd(names.to_vec()),
            "rm" => ReplCommand::ToolRemove(names.to_vec()),
            _ => ReplCommand::Unknown(line.to_string()),
        },
        _ => ReplCommand::Unknown(line.to_string()),
    }
}

/// Run the interactive REPL loop.
pub async fn run(session: &mut ChatSession) -> Result<()> {
    helpers::print_banner(session.model(), session.key());

    let mut editor = create_editor()?;

    loop {
        let input = match editor.readline("You: ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("Input error: {e}");
                break;
            }
        };

        let message = match parse_command(&input) {
            ReplCommand::Empty => continue,
            ReplCommand::Exit => {
                println!("\nGoodbye!");
                break;
            }
            ReplCommand::Help => {
                helpers::print_help();
                continue;
            }
            ReplCommand::Clear => {
                match session.clear() {
                    Ok(()) => println!("Conversation cleared.\n"),
                    Err(e) => eprintln!("\nError: {e:#}\n"),
                }
                continue;
            }
            ReplCommand::Model(None) => {
                helpers::print_model(session.model());
                continue;
            }
            ReplCommand::Model(Some(name)) => {
                match session.set_model(&name) {
                    Ok(()) => helpers::print_model(session.model()),
                    Err(e) => helpers::print_error(&format!("{e:#}")),
                }
                continue;
            }
            ReplCommand::Tools => {
                helpers::print_tools(&session.tools().status());
                continue;
            }
            ReplCommand::ToolAdd(names) => {
                for name in names {
                    if let Err(e) = session.tools_mut().enable(&name) {
                        helpers::print_error(&e.to_string());
                    }
                }
                helpers::print_tools(&session.tools().status());
                continue;
            }
            ReplCommand::ToolRemove(names) => {
                for name in names {
                    if let Err(e) = session.tools_mut().disable(&name) {
                        helpers::print_error(&e.to_string());
                    }
                }
                helpers::print_tools(&session.tools().status());
                continue;
            }
            ReplCommand::Unknown(line) => {
                helpers::print_error(&format!("Unknown command {line}"));
                helpers::print_help();
                continue;
            }
            ReplCommand::Multi => match read_multiline(&mut editor) {
                Some(text) if !text.trim().is_empty() => text,
                Some(_) => continue,
                None => break,
            },
            ReplCommand::Message(text) => text,
        };

        let _ = editor.add_history_entry(input.as_str());

        debug!(session = session.key(), chars = message.len(), "processing input");
        helpers::print_thinking();

        let result = session.send(&message).await;
        helpers::clear_thinking();
        match result {
            Ok(outcome) => helpers::print_outcome(&outcome),
            Err(e) => eprintln!("\nError: {e:#}\n"),
        }
    }

    save_history(&mut editor);
    Ok(())
}

/// Collect lines until `/end`. `None` on Ctrl-C / Ctrl-D.
fn read_multiline(editor: &mut Editor<(), DefaultHistory>) -> Option<String> {
    let mut lines = Vec::new();
    loop {
        match editor.readline("... ") {
            Ok(line) if line.trim().eq_ignore_ascii_case("/end") => return Some(lines.join("\n")),
            Ok(line) => lines.push(line),
            Err(_) => return None,
        }
    }
}

fn create_editor() -> Result<Editor<(), DefaultHistory>> {
    let mut editor = DefaultEditor::new()?;
    editor.set_max_history_size(1000)?;

    let path = history_path();
    if path.exists() {
        let _ = editor.load_history(&path);
        debug!("loaded REPL history from {}", path.display());
    }
    Ok(editor)
}

fn save_history(editor: &mut Editor<(), DefaultHistory>) {
    let path = history_path();
    if let Some(parent) = path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    if let Err(e) = editor.save_history(&path) {
        debug!("failed to save REPL history: {e}");
    }
}

/// Readline input history, separate from the conversation histories.
fn history_path() -> std::path::PathBuf {
    structa_core::utils::get_data_path().join("repl_history")
}
