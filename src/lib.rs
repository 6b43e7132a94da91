//! A step-driven Brainfuck tape machine.
//!
//! This crate executes Brainfuck one character at a time on a fixed-size
//! tape of bytes (default 30,000 cells) with a single data pointer.
//!
//! Features and behaviors:
//! - Memory tape initialized to 0; cells wrap modulo 256.
//! - Strict pointer bounds: moving left from cell 0 or right past the end
//!   returns an error carrying the line, column, step, ip and dp.
//! - Any character outside `><+-.,[]` is a comment. It has no effect but
//!   still costs one step, and newlines advance the reported source line.
//! - Loop brackets are matched lazily: an unmatched bracket is only an
//!   error once control actually needs its partner.
//! - Optional step budget; execution can be resumed after the budget runs out.
//! - Optional debug trace written after every step.
//!
//! Quick start:
//!
//! ```
//! use bf_tape::{Interpreter, RunOutcome, Settings};
//!
//! let code = "++++++++[>++++[>++>+++>+++>+<<<<-]>+>+>->>+[<]<-]>>.>---.+++++++..+++.>>.<-.<.+++.------.--------.>>+.>++.";
//! let mut bf = Interpreter::new(code, Settings::default(), &b""[..], Vec::new());
//! assert_eq!(bf.execute().expect("program should run"), RunOutcome::Halted);
//! assert_eq!(bf.into_output(), b"Hello World!\n");
//! ```

pub mod cli_util;
pub mod commands;
pub mod config;
pub mod driver;
pub mod machine;
pub mod minify;
pub mod trace;

pub use config::{ConfigError, ConfigLayer, RunConfig};
pub use driver::{Interpreter, RunOutcome, Settings};
pub use machine::{
    BracketKind, DEFAULT_TAPE_SIZE, EofBehavior, MachineError, Position, TapeMachine,
};
pub use minify::{INSTRUCTIONS, is_instruction, minify};
pub use trace::StepSnapshot;
