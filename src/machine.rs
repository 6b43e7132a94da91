//! The tape machine: program text, byte tape and the single-step dispatcher.
//!
//! Behaviors:
//! - The tape is a fixed number of zeroed `u8` cells; `+`/`-` wrap modulo 256.
//! - Strict pointer bounds: moving left from cell 0 or right past the last
//!   cell returns an error and leaves the machine untouched.
//! - Every character of the program is one step, including comments and
//!   newlines. Only the eight instruction symbols have an effect.
//! - Loop brackets are matched lazily by scanning the source each time a
//!   jump is taken, so an unmatched bracket is only reported when control
//!   actually needs its partner.

use std::fmt;
use std::io::{self, Read, Write};
use std::num::NonZeroUsize;
use std::str::FromStr;

use crate::trace::StepSnapshot;

/// Number of cells on a freshly built tape unless configured otherwise.
pub const DEFAULT_TAPE_SIZE: NonZeroUsize = NonZeroUsize::new(30_000).unwrap();

/// What `,` stores in the current cell once the input source is exhausted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EofBehavior {
    /// Store 0.
    #[default]
    Zero,
    /// Leave the cell as it was.
    Unchanged,
    /// Store 255, i.e. a `-1` end-of-stream marker narrowed to a byte.
    Max,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown EOF mode '{0}' (expected zero, unchanged or max)")]
pub struct ParseEofError(pub String);

impl FromStr for EofBehavior {
    type Err = ParseEofError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "zero" | "0" => Ok(EofBehavior::Zero),
            "unchanged" | "keep" => Ok(EofBehavior::Unchanged),
            "max" | "255" | "-1" => Ok(EofBehavior::Max),
            _ => Err(ParseEofError(s.to_string())),
        }
    }
}

/// Where the machine was when something happened.
///
/// `line` and `column` are 0-based and describe the character at `ip`.
/// A taken jump recomputes them for the bracket it lands on, so they can
/// move backwards after a loop repeats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub line: usize,
    pub column: usize,
    pub step: u64,
    pub ip: usize,
    pub dp: usize,
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "line {}, column {} (step {}, ip={}, dp={})",
            self.line, self.column, self.step, self.ip, self.dp
        )
    }
}

/// Which side of the loop was unmatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BracketKind {
    Open,
    Close,
}

impl fmt::Display for BracketKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BracketKind::Open => write!(f, "'['"),
            BracketKind::Close => write!(f, "']'"),
        }
    }
}

/// Errors raised while stepping the machine.
///
/// Every variant carries the [`Position`] of the instruction that failed.
/// The machine is not advanced past that instruction.
#[derive(Debug, thiserror::Error)]
pub enum MachineError {
    /// `>` on the last cell of the tape.
    #[error("data pointer exceeded upper bound of tape at {position}")]
    TapeOverflow { position: Position },

    /// `<` on cell 0.
    #[error("data pointer exceeded lower bound of tape at {position}")]
    TapeUnderflow { position: Position },

    /// A bracket scan ran off the program without finding the partner.
    #[error("unmatched bracket {kind} at {position}")]
    UnmatchedBracket { kind: BracketKind, position: Position },

    /// The input source or output sink failed.
    #[error("I/O error at {position}: {source}")]
    Io {
        position: Position,
        #[source]
        source: io::Error,
    },
}

impl MachineError {
    pub fn position(&self) -> Position {
        match self {
            MachineError::TapeOverflow { position }
            | MachineError::TapeUnderflow { position }
            | MachineError::UnmatchedBracket { position, .. }
            | MachineError::Io { position, .. } => *position,
        }
    }
}

/// A single-threaded tape machine over one program.
///
/// The machine maintains:
/// - the program text as a `Vec<char>` (never modified),
/// - a fixed-size memory tape initialized to zeros,
/// - the instruction pointer, data pointer, step counter and source position.
#[derive(Debug, Clone)]
pub struct TapeMachine {
    source: Vec<char>,
    tape: Vec<u8>,
    ip: usize,
    dp: usize,
    step: u64,
    line: usize,
    column: usize,
    eof: EofBehavior,
}

impl TapeMachine {
    /// Create a machine for `source` with `tape_size` zeroed cells.
    ///
    /// The source is stored verbatim; brackets are not validated up front.
    pub fn new(source: &str, tape_size: NonZeroUsize) -> Self {
        Self {
            source: source.chars().collect(),
            tape: vec![0; tape_size.get()],
            ip: 0,
            dp: 0,
            step: 0,
            line: 0,
            column: 0,
            eof: EofBehavior::default(),
        }
    }

    pub fn with_eof(mut self, eof: EofBehavior) -> Self {
        self.eof = eof;
        self
    }

    /// Execute exactly one character of the program.
    ///
    /// Returns `Ok(false)` without touching any state when the program has
    /// already run off its end.
    pub fn step<R, W>(&mut self, input: &mut R, output: &mut W) -> Result<bool, MachineError>
    where
        R: Read + ?Sized,
        W: Write + ?Sized,
    {
        let Some(&instr) = self.source.get(self.ip) else {
            return Ok(false);
        };

        match instr {
            '>' => {
                if self.dp + 1 >= self.tape.len() {
                    return Err(MachineError::TapeOverflow { position: self.position() });
                }
                self.dp += 1;
            }
            '<' => {
                if self.dp == 0 {
                    return Err(MachineError::TapeUnderflow { position: self.position() });
                }
                self.dp -= 1;
            }
            '+' => {
                self.tape[self.dp] = self.tape[self.dp].wrapping_add(1);
            }
            '-' => {
                self.tape[self.dp] = self.tape[self.dp].wrapping_sub(1);
            }
            '.' => {
                output
                    .write_all(&[self.tape[self.dp]])
                    .map_err(|source| self.io_error(source))?;
            }
            ',' => {
                // Anything the program printed so far must be visible before we block.
                output.flush().map_err(|source| self.io_error(source))?;
                match read_byte(input).map_err(|source| self.io_error(source))? {
                    Some(byte) => self.tape[self.dp] = byte,
                    None => match self.eof {
                        EofBehavior::Zero => self.tape[self.dp] = 0,
                        EofBehavior::Unchanged => {}
                        EofBehavior::Max => self.tape[self.dp] = u8::MAX,
                    },
                }
            }
            '[' => {
                if self.tape[self.dp] == 0 {
                    let Some(close) = match_forward(&self.source, self.ip) else {
                        return Err(MachineError::UnmatchedBracket {
                            kind: BracketKind::Open,
                            position: self.position(),
                        });
                    };
                    self.jump_to(close);
                }
            }
            ']' => {
                if self.tape[self.dp] != 0 {
                    let Some(open) = match_backward(&self.source, self.ip) else {
                        return Err(MachineError::UnmatchedBracket {
                            kind: BracketKind::Close,
                            position: self.position(),
                        });
                    };
                    self.jump_to(open);
                }
            }
            _ => {}
        }

        self.advance_past(instr);
        Ok(true)
    }

    /// Move `ip` to a bracket partner and carry the source position along.
    fn jump_to(&mut self, target: usize) {
        if target > self.ip {
            for &c in &self.source[self.ip..target] {
                if c == '\n' {
                    self.line += 1;
                    self.column = 0;
                } else {
                    self.column += 1;
                }
            }
        } else {
            let crossed = self.source[target..self.ip].iter().filter(|&&c| c == '\n').count();
            self.line -= crossed;
            let line_start = self.source[..target]
                .iter()
                .rposition(|&c| c == '\n')
                .map_or(0, |i| i + 1);
            self.column = target - line_start;
        }
        self.ip = target;
    }

    fn advance_past(&mut self, consumed: char) {
        if consumed == '\n' {
            self.line += 1;
            self.column = 0;
        } else {
            self.column += 1;
        }
        self.ip += 1;
        self.step += 1;
    }

    fn io_error(&self, source: io::Error) -> MachineError {
        MachineError::Io { position: self.position(), source }
    }

    pub fn position(&self) -> Position {
        Position {
            line: self.line,
            column: self.column,
            step: self.step,
            ip: self.ip,
            dp: self.dp,
        }
    }

    /// Capture the state for a debug trace record.
    pub fn snapshot(&self) -> StepSnapshot {
        StepSnapshot::capture(self.position(), &self.source, &self.tape)
    }

    pub fn is_halted(&self) -> bool {
        self.ip >= self.source.len()
    }

    /// The character at `ip`, or `None` once the program has ended.
    pub fn current_instruction(&self) -> Option<char> {
        self.source.get(self.ip).copied()
    }

    pub fn ip(&self) -> usize {
        self.ip
    }

    pub fn dp(&self) -> usize {
        self.dp
    }

    pub fn steps(&self) -> u64 {
        self.step
    }

    pub fn line(&self) -> usize {
        self.line
    }

    pub fn column(&self) -> usize {
        self.column
    }

    pub fn tape(&self) -> &[u8] {
        &self.tape
    }

    pub fn source(&self) -> &[char] {
        &self.source
    }

    pub fn eof(&self) -> EofBehavior {
        self.eof
    }
}

/// Find the `]` closing the `[` at `open`, honoring nesting.
pub fn match_forward(source: &[char], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (i, &c) in source.iter().enumerate().skip(open + 1) {
        match c {
            '[' => depth += 1,
            ']' if depth == 0 => return Some(i),
            ']' => depth -= 1,
            _ => {}
        }
    }
    None
}

/// Find the `[` opening the `]` at `close`, honoring nesting.
pub fn match_backward(source: &[char], close: usize) -> Option<usize> {
    let mut depth = 0usize;
    for i in (0..close.min(source.len())).rev() {
        match source[i] {
            ']' => depth += 1,
            '[' if depth == 0 => return Some(i),
            '[' => depth -= 1,
            _ => {}
        }
    }
    None
}

/// Read exactly one byte; `None` on end of input.
fn read_byte<R: Read + ?Sized>(input: &mut R) -> io::Result<Option<u8>> {
    let mut buf = [0u8; 1];
    loop {
        match input.read(&mut buf) {
            Ok(0) => return Ok(None),
            Ok(_) => return Ok(Some(buf[0])),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn machine(code: &str, size: usize) -> TapeMachine {
        TapeMachine::new(code, NonZeroUsize::new(size).unwrap())
    }

    fn run_to_end(m: &mut TapeMachine) -> Result<(), MachineError> {
        let mut input = io::empty();
        let mut output = io::sink();
        while m.step(&mut input, &mut output)? {}
        Ok(())
    }

    struct FailingIo;

    impl Read for FailingIo {
        fn read(&mut self, _: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::other("input gone"))
        }
    }

    impl Write for FailingIo {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn increments_and_decrements_wrap_around() {
        for (n, m) in [(0, 0), (3, 5), (256, 0), (300, 44), (1, 257)] {
            let code = format!("{}{}", "+".repeat(n), "-".repeat(m));
            let mut tm = machine(&code, 1);
            run_to_end(&mut tm).unwrap();
            let expected = (n as i64 - m as i64).rem_euclid(256) as u8;
            assert_eq!(tm.tape()[0], expected, "{n} increments then {m} decrements");
        }
    }

    #[test]
    fn every_character_counts_as_a_step() {
        let mut tm = machine("+a\n+ b", 4);
        run_to_end(&mut tm).unwrap();
        assert_eq!(tm.steps(), 6);
        assert_eq!(tm.tape()[0], 2);
    }

    #[test]
    fn loops_count_every_consumed_character() {
        // The jump back lands on '[' and resumes after it: 2 + 3 + 2.
        let mut tm = machine("++[-]", 1);
        run_to_end(&mut tm).unwrap();
        assert_eq!(tm.steps(), 7);
    }

    #[test]
    fn stepping_at_end_is_a_no_op() {
        let mut tm = machine("x", 1);
        let (mut input, mut output) = (io::empty(), io::sink());
        assert!(tm.step(&mut input, &mut output).unwrap());
        assert!(!tm.step(&mut input, &mut output).unwrap());
        assert_eq!(tm.steps(), 1);
        assert!(tm.is_halted());
        assert_eq!(tm.current_instruction(), None);
    }

    #[test]
    fn left_from_first_cell_underflows_on_first_step() {
        let mut tm = machine("<", 10);
        let err = run_to_end(&mut tm).unwrap_err();
        assert!(matches!(err, MachineError::TapeUnderflow { .. }));
        assert_eq!(
            err.position(),
            Position { line: 0, column: 0, step: 0, ip: 0, dp: 0 }
        );
        assert_eq!(tm.ip(), 0);
        assert_eq!(tm.steps(), 0);
    }

    #[test]
    fn right_from_last_cell_overflows() {
        // With 3 cells (0..=2), the 3rd '>' attempts to move beyond index 2.
        let mut tm = machine(">>>", 3);
        let err = run_to_end(&mut tm).unwrap_err();
        assert!(matches!(err, MachineError::TapeOverflow { .. }));
        let pos = err.position();
        assert_eq!((pos.ip, pos.dp, pos.step), (2, 2, 2));
        assert_eq!(tm.dp(), 2);
    }

    #[test]
    fn unmatched_open_bracket_errors_only_on_zero_cell() {
        let mut tm = machine("[+", 10);
        let err = run_to_end(&mut tm).unwrap_err();
        assert!(matches!(err, MachineError::UnmatchedBracket { kind: BracketKind::Open, .. }));

        // Non-zero cell falls through into the body, never scanning for ']'.
        let mut tm = machine("+[+", 10);
        run_to_end(&mut tm).unwrap();
        assert_eq!(tm.tape()[0], 2);
    }

    #[test]
    fn unmatched_close_bracket_errors_only_on_nonzero_cell() {
        let mut tm = machine("+]", 10);
        let err = run_to_end(&mut tm).unwrap_err();
        assert!(matches!(err, MachineError::UnmatchedBracket { kind: BracketKind::Close, .. }));
        assert_eq!(err.position().ip, 1);

        let mut tm = machine("+[-]]", 10);
        run_to_end(&mut tm).unwrap();
    }

    #[test]
    fn nested_loops_run() {
        // 3 * 4 into cell 1 via a nested loop, then clear the outer counter.
        let mut tm = machine("+++[>++++[>+<-]<-]", 3);
        run_to_end(&mut tm).unwrap();
        assert_eq!(tm.tape(), &[0, 0, 12]);
    }

    #[test]
    fn bracket_scans_honor_nesting() {
        let src: Vec<char> = "[[][]]]".chars().collect();
        assert_eq!(match_forward(&src, 0), Some(5));
        assert_eq!(match_forward(&src, 1), Some(2));
        assert_eq!(match_backward(&src, 5), Some(0));
        assert_eq!(match_backward(&src, 6), None);

        let src: Vec<char> = "[[]".chars().collect();
        assert_eq!(match_forward(&src, 0), None);
    }

    #[test]
    fn newlines_move_the_source_position() {
        let mut tm = machine("+\n\n <", 10);
        let err = run_to_end(&mut tm).unwrap_err();
        assert_eq!(
            err.position(),
            Position { line: 2, column: 1, step: 4, ip: 4, dp: 0 }
        );
    }

    #[test]
    fn position_follows_jumps_across_lines() {
        let mut tm = machine("++[\n-\n]\n<", 1);
        let err = run_to_end(&mut tm).unwrap_err();
        assert!(matches!(err, MachineError::TapeUnderflow { .. }));
        assert_eq!(
            err.position(),
            Position { line: 3, column: 0, step: 12, ip: 8, dp: 0 }
        );
    }

    #[test]
    fn forward_jump_over_lines_keeps_position() {
        let mut tm = machine("[\n+\n]<", 1);
        let err = run_to_end(&mut tm).unwrap_err();
        assert_eq!(
            err.position(),
            Position { line: 2, column: 1, step: 1, ip: 5, dp: 0 }
        );
    }

    #[test]
    fn output_writes_current_cell() {
        let mut tm = machine("+++.+.", 1);
        let mut out = Vec::new();
        while tm.step(&mut io::empty(), &mut out).unwrap() {}
        assert_eq!(out, vec![3, 4]);
    }

    #[test]
    fn input_reads_one_byte_per_instruction() {
        let mut tm = machine(",>,", 2);
        let mut input: &[u8] = b"AB";
        while tm.step(&mut input, &mut io::sink()).unwrap() {}
        assert_eq!(tm.tape(), b"AB");
    }

    #[test]
    fn eof_behavior_is_configurable() {
        for (eof, expected) in [
            (EofBehavior::Zero, 0),
            (EofBehavior::Unchanged, 1),
            (EofBehavior::Max, 255),
        ] {
            let mut tm = machine("+,", 1).with_eof(eof);
            run_to_end(&mut tm).unwrap();
            assert_eq!(tm.tape()[0], expected, "{eof:?}");
        }
    }

    #[test]
    fn io_failures_keep_their_source() {
        let mut tm = machine("+.", 1);
        let mut sink = FailingIo;
        tm.step(&mut io::empty(), &mut sink).unwrap();
        let err = tm.step(&mut io::empty(), &mut sink).unwrap_err();
        match err {
            MachineError::Io { position, source } => {
                assert_eq!(source.kind(), io::ErrorKind::BrokenPipe);
                assert_eq!(position.ip, 1);
            }
            other => panic!("expected I/O error, got {other:?}"),
        }

        let mut tm = machine(",", 1);
        let err = tm.step(&mut FailingIo, &mut io::sink()).unwrap_err();
        assert!(matches!(err, MachineError::Io { .. }));
    }

    #[test]
    fn eof_modes_parse() {
        assert_eq!("zero".parse::<EofBehavior>(), Ok(EofBehavior::Zero));
        assert_eq!("Unchanged".parse::<EofBehavior>(), Ok(EofBehavior::Unchanged));
        assert_eq!("-1".parse::<EofBehavior>(), Ok(EofBehavior::Max));
        assert!("sometimes".parse::<EofBehavior>().is_err());
    }
}
