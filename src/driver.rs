//! Execution driver: owns the I/O streams and runs the machine under a step budget.

use std::io::{self, Read, Write};
use std::num::NonZeroUsize;

use crate::machine::{DEFAULT_TAPE_SIZE, EofBehavior, MachineError, TapeMachine};

/// Interpreter settings, passed by value at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settings {
    /// Write a [`StepSnapshot`](crate::trace::StepSnapshot) to the output after every step.
    pub debug: bool,
    pub tape_size: NonZeroUsize,
    /// Step budget for [`Interpreter::execute`]; 0 means unbounded.
    pub max_steps: u64,
    pub eof: EofBehavior,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            debug: false,
            tape_size: DEFAULT_TAPE_SIZE,
            max_steps: 0,
            eof: EofBehavior::Zero,
        }
    }
}

/// How a call to [`Interpreter::execute_for`] ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// The instruction pointer ran off the end of the program.
    Halted,
    /// The step budget ran out first; execution can be resumed.
    BudgetExhausted { steps: u64 },
}

pub struct Interpreter<R, W> {
    machine: TapeMachine,
    input: R,
    output: W,
    settings: Settings,
}

impl Interpreter<io::StdinLock<'static>, io::StdoutLock<'static>> {
    /// An interpreter reading from stdin and writing to stdout.
    pub fn stdio(source: &str, settings: Settings) -> Self {
        Self::new(source, settings, io::stdin().lock(), io::stdout().lock())
    }
}

impl<R: Read, W: Write> Interpreter<R, W> {
    pub fn new(source: &str, settings: Settings, input: R, output: W) -> Self {
        let machine = TapeMachine::new(source, settings.tape_size).with_eof(settings.eof);
        Self {
            machine,
            input,
            output,
            settings,
        }
    }

    /// Run a single step, tracing it in debug mode.
    pub fn step(&mut self) -> Result<bool, MachineError> {
        let stepped = self.machine.step(&mut self.input, &mut self.output)?;
        if stepped && self.settings.debug {
            let snapshot = self.machine.snapshot();
            writeln!(self.output, "{snapshot}").map_err(|source| self.io_error(source))?;
        }
        Ok(stepped)
    }

    /// Run until the program ends or the configured `max_steps` budget is used up.
    pub fn execute(&mut self) -> Result<RunOutcome, MachineError> {
        self.execute_for(self.settings.max_steps)
    }

    /// Run at most `budget` more steps (0 = unbounded).
    ///
    /// Calling this again after [`RunOutcome::BudgetExhausted`] picks up
    /// exactly where the previous call stopped.
    pub fn execute_for(&mut self, budget: u64) -> Result<RunOutcome, MachineError> {
        let limit = (budget != 0).then(|| self.machine.steps().saturating_add(budget));

        while !self.machine.is_halted() {
            if limit.is_some_and(|limit| self.machine.steps() >= limit) {
                self.flush()?;
                return Ok(RunOutcome::BudgetExhausted { steps: self.machine.steps() });
            }
            self.step()?;
        }

        self.flush()?;
        Ok(RunOutcome::Halted)
    }

    fn flush(&mut self) -> Result<(), MachineError> {
        self.output.flush().map_err(|source| self.io_error(source))
    }

    fn io_error(&self, source: io::Error) -> MachineError {
        MachineError::Io { position: self.machine.position(), source }
    }

    pub fn machine(&self) -> &TapeMachine {
        &self.machine
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn output(&self) -> &W {
        &self.output
    }

    pub fn into_output(self) -> W {
        self.output
    }
}
