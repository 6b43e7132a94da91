//! Debug trace records.
//!
//! A [`StepSnapshot`] is taken after every step when debug mode is on. It
//! renders as a header line followed by a window of the program around `ip`
//! and a window of the tape around `dp`, each with a caret under the
//! current position:
//!
//! ```text
//! [0, 1] step 1 ip=1 dp=0 instr='>'
//!   code: + >
//!           ^
//!   tape:   1   0   0
//!           ^
//! ```

use std::fmt;

use crate::machine::Position;

/// Cells (and characters) shown on each side of the current one.
pub const TRACE_WINDOW: usize = 10;

const LABEL_WIDTH: usize = "  code: ".len();
const CELL_WIDTH: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepSnapshot {
    pub line: usize,
    pub column: usize,
    pub step: u64,
    pub ip: usize,
    pub dp: usize,
    /// The next character to execute, `None` at end of program.
    pub instruction: Option<char>,
    pub code_start: usize,
    pub code: Vec<char>,
    pub tape_start: usize,
    pub tape: Vec<u8>,
}

impl StepSnapshot {
    pub fn capture(position: Position, source: &[char], tape: &[u8]) -> Self {
        let (code_start, code_end) = window(position.ip, source.len());
        let (tape_start, tape_end) = window(position.dp, tape.len());
        Self {
            line: position.line,
            column: position.column,
            step: position.step,
            ip: position.ip,
            dp: position.dp,
            instruction: source.get(position.ip).copied(),
            code_start,
            code: source[code_start..code_end].to_vec(),
            tape_start,
            tape: tape[tape_start..tape_end].to_vec(),
        }
    }
}

fn window(center: usize, len: usize) -> (usize, usize) {
    let start = center.saturating_sub(TRACE_WINDOW).min(len);
    let end = (center + TRACE_WINDOW + 1).min(len);
    (start, end)
}

/// Whitespace and control characters would break caret alignment.
fn printable(c: char) -> char {
    if c.is_whitespace() || c.is_control() { '·' } else { c }
}

impl fmt::Display for StepSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}, {}] step {} ip={} dp={} instr=",
            self.line, self.column, self.step, self.ip, self.dp
        )?;
        match self.instruction {
            Some(c) => writeln!(f, "'{}'", printable(c))?,
            None => writeln!(f, "<end>")?,
        }

        let code: Vec<String> = self.code.iter().map(|&c| printable(c).to_string()).collect();
        writeln!(f, "  code: {}", code.join(" "))?;
        let code_caret = (self.ip - self.code_start) * 2;
        writeln!(f, "{:width$}^", "", width = LABEL_WIDTH + code_caret)?;

        let tape: Vec<String> = self
            .tape
            .iter()
            .map(|cell| format!("{cell:>width$}", width = CELL_WIDTH))
            .collect();
        writeln!(f, "  tape: {}", tape.join(" "))?;
        let tape_caret = (self.dp - self.tape_start) * (CELL_WIDTH + 1) + CELL_WIDTH - 1;
        write!(f, "{:width$}^", "", width = LABEL_WIDTH + tape_caret)
    }
}
