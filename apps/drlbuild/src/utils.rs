//! Small console helpers shared by the binary and printers.

use owo_colors::OwoColorize;

pub fn use_colors(output: &str) -> bool {
    output != "json" && std::env::var_os("NO_COLOR").is_none()
}

pub fn error_prefix() -> String {
    if use_colors("human") {
        "error:".red().bold().to_string()
    } else {
        "error:".to_string()
    }
}

pub fn note_prefix() -> String {
    if use_colors("human") {
        "note:".cyan().bold().to_string()
    } else {
        "note:".to_string()
    }
}

/// `file:line`, or just `file` when the line is unknown.
pub fn location(file: &str, line: Option<u32>) -> String {
    match line {
        Some(l) => format!("{}:{}", file, l),
        None => file.to_string(),
    }
}
