//! Shared CLI output helpers.

use colored::Colorize;

use structa_agent::TurnOutcome;

/// Print the result of one turn.
pub fn print_outcome(outcome: &TurnOutcome) {
    println!();
    println!("{}", "Structa".cyan().bold());
    println!("{}", outcome_text(outcome));
    println!();
}

fn outcome_text(outcome: &TurnOutcome) -> String {
    match outcome.answer_text() {
        Some(text) if text.is_empty() => "(empty answer)".dimmed().to_string(),
        Some(text) => text,
        None => "(no final answer, iteration budget exhausted)"
            .yellow()
            .to_string(),
    }
}

/// Print the banner shown at REPL start.
pub fn print_banner(model: &str, session: &str) {
    let version = env!("CARGO_PKG_VERSION");
    println!();
    println!("{}  v{}", "Structa".cyan().bold(), version.dimmed());
    println!("{}", format!("model {model} · session {session}").dimmed());
    println!("{}", "Type a message, /help for commands.".dimmed());
    println!();
}

pub fn print_help() {
    println!();
    for (command, description) in [
        ("/help, /?", "show this help"),
        ("/bye", "leave (also /quit /q /exit)"),
        ("/clear", "forget this session's conversation"),
        ("/multi", "start multi-line input, finish with /end"),
        ("/model [model]", "show or switch the model (e.g. ollama/mistral, gpt-4o-mini)"),
        ("/tool", "list host tools"),
        ("/tool add <name>...", "enable tools"),
        ("/tool rm <name>...", "disable tools"),
    ] {
        println!("  {} {}", format!("{command:<22}").yellow(), description.dimmed());
    }
    println!();
}

pub fn print_model(model: &str) {
    println!("  {} {}", "Model:".green().bold(), model);
}

/// Print the host tools with an enabled marker.
pub fn print_tools(status: &[(String, bool)]) {
    println!("  {}", "Tools:".green().bold());
    for line in tool_lines(status) {
        println!("  {line}");
    }
}

fn tool_lines(status: &[(String, bool)]) -> Vec<String> {
    status
        .iter()
        .map(|(name, on)| format!("- [{}] {name}", if *on { "x" } else { " " }))
        .collect()
}

pub fn print_error(text: &str) {
    eprintln!("  {}", text.red().bold());
}

/// Print a "thinking" placeholder (for non-log mode).
pub fn print_thinking() {
    eprint!("{}", "thinking...".dimmed());
}

/// Clear the "thinking" placeholder.
pub fn clear_thinking() {
    eprint!("\r{}\r", " ".repeat(40));
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn answer_text_is_printed_verbatim() {
        colored::control::set_override(false);
        assert_eq!(outcome_text(&TurnOutcome::Answer(json!("Paris"))), "Paris");
        assert_eq!(outcome_text(&TurnOutcome::Answer(json!(42))), "42");
    }

    #[test]
    fn tool_lines_mark_enabled_tools() {
        let status = vec![("current_datetime".to_string(), true), ("echo".to_string(), false)];
        assert_eq!(
            tool_lines(&status),
            vec!["- [x] current_datetime", "- [ ] echo"]
        );
    }

    #[test]
    fn no_result_is_explained() {
        colored::control::set_override(false);
        assert!(outcome_text(&TurnOutcome::NoResult).contains("iteration budget"));
    }
}
