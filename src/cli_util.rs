use std::io::{self, IsTerminal, Write};

use nu_ansi_term::Color;

use crate::MachineError;

/// Pretty-print a [`MachineError`] with the offending source line and a caret.
/// If `program` is `Some("bf")`, prefix messages with "bf: ...".
pub fn print_machine_error(program: Option<&str>, code: &str, err: &MachineError) {
    let label = match err {
        MachineError::TapeOverflow { .. } | MachineError::TapeUnderflow { .. } => "Runtime error",
        MachineError::UnmatchedBracket { .. } => "Bracket error",
        MachineError::Io { .. } => "I/O error",
    };
    let label = if io::stderr().is_terminal() {
        Color::Red.bold().paint(label).to_string()
    } else {
        label.to_string()
    };
    let msg = match program {
        Some(p) => format!("{p}: {label}: {err}"),
        None => format!("{label}: {err}"),
    };
    let position = err.position();
    print_error_with_context(&msg, code, position.line, position.column);
}

/// Print `message`, then a window of source line `line` with a caret under `column`.
pub fn print_error_with_context(message: &str, code: &str, line: usize, column: usize) {
    eprintln!("{message}");
    if let Some((text, caret)) = context_window(code, line, column) {
        eprintln!("  {text}");
        eprintln!("  {caret}");
    }
    let _ = io::stderr().flush();
}

/// The slice of `line` around `column` and a matching caret line.
///
/// Lines are split on `\n` only, the same way the machine counts them.
fn context_window(code: &str, line: usize, column: usize) -> Option<(String, String)> {
    // Show a short window around the position for context
    const WINDOW_CHARS: usize = 32;

    let text = code.split('\n').nth(line)?;
    let total_chars = text.chars().count();
    let start_char = column.saturating_sub(WINDOW_CHARS);
    let end_char = (column + WINDOW_CHARS + 1).min(total_chars);
    if start_char > end_char {
        return None;
    }

    let start_byte = char_to_byte_index(text, start_char);
    let end_byte = char_to_byte_index(text, end_char);
    let slice = text[start_byte..end_byte].replace('\t', " ");

    let caret = format!("{}^", " ".repeat(column - start_char));
    Some((slice, caret))
}

/// Convert a char index into a byte index in the given UTF-8 string.
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices().nth(char_idx).map_or(s.len(), |(i, _)| i)
}
