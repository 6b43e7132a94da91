use std::fs;
use std::io::{self, Read, Write};
use std::time::{Duration, Instant};

use clap::Args;

use crate::cli_util::print_machine_error;
use crate::config::{ConfigLayer, RunConfig};
use crate::driver::{Interpreter, RunOutcome};
use crate::machine::{EofBehavior, MachineError};
use crate::minify::minify;

/// Steps executed between wall-clock checks when a timeout is set.
const TIMEOUT_SLICE: u64 = 100_000;

#[derive(Args, Debug)]
#[command(disable_help_flag = true)]
pub struct RunArgs {
    /// Print a trace record after every step, interleaved with program output
    #[arg(short = 'd', long = "debug")]
    pub debug: bool,

    /// Strip non-instruction characters before running
    #[arg(short = 'm', long = "minify")]
    pub minify: bool,

    /// Read Brainfuck code from PATH instead of positional "<code>"
    #[arg(short = 'f', long = "file")]
    pub file: Option<String>,

    /// Number of tape cells (fallback BF_TAPE_SIZE; default 30_000)
    #[arg(long = "tape-size", value_name = "CELLS")]
    pub tape_size: Option<usize>,

    /// Maximum interpreter steps before abort (fallback BF_MAX_STEPS; default unlimited)
    #[arg(long = "max-steps", value_name = "N")]
    pub max_steps: Option<u64>,

    /// Wall-clock timeout in milliseconds (fallback BF_TIMEOUT_MS; default none)
    #[arg(long = "timeout", value_name = "MS")]
    pub timeout_ms: Option<u64>,

    /// Value stored by ',' at end of input: zero, unchanged or max (fallback BF_EOF)
    #[arg(long = "eof", value_name = "MODE")]
    pub eof: Option<EofBehavior>,

    /// Concatenated Brainfuck code parts
    #[arg(value_name = "code", trailing_var_arg = true, allow_hyphen_values = true)]
    pub code: Vec<String>,

    /// Show this help
    #[arg(short = 'h', long = "help", action = clap::ArgAction::SetTrue)]
    pub help: bool,
}

/// Why a CLI run stopped.
#[derive(Debug, PartialEq, Eq)]
enum Stop {
    Halted,
    StepLimit(u64),
    TimedOut(Duration),
}

pub fn run(program: &str, args: RunArgs) -> i32 {
    if args.help {
        usage_and_exit(program, 0);
    }

    let RunArgs {
        debug,
        minify: strip,
        file,
        tape_size,
        max_steps,
        timeout_ms,
        eof,
        code,
        ..
    } = args;

    if file.is_none() && code.is_empty() {
        usage_and_exit(program, 2);
    }

    if file.is_some() && !code.is_empty() {
        eprintln!("{program}: cannot use positional code together with --file");
        usage_and_exit(program, 2);
    }

    let source = if let Some(path) = file {
        match fs::read_to_string(&path) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("{program}: failed to read code file as UTF-8: {e}");
                let _ = io::stderr().flush();
                return 1;
            }
        }
    } else {
        code.join("")
    };
    let source = if strip { minify(&source) } else { source };

    // Resolve settings: flags -> env -> config file -> defaults
    let flags = ConfigLayer {
        tape_size,
        max_steps,
        timeout_ms,
        debug: debug.then_some(true),
        eof,
    };
    let config = match flags
        .or(ConfigLayer::from_process_env())
        .or(ConfigLayer::from_config_file())
        .resolve()
    {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{program}: {e}");
            let _ = io::stderr().flush();
            return 2;
        }
    };

    execute(program, &source, config)
}

fn execute(program: &str, source: &str, config: RunConfig) -> i32 {
    let RunConfig { settings, timeout } = config;
    let mut bf = Interpreter::stdio(source, settings);
    let result = run_until(&mut bf, settings.max_steps, timeout);
    drop(bf);
    let _ = io::stdout().flush();

    match result {
        Ok(Stop::Halted) => 0,
        Ok(Stop::StepLimit(steps)) => {
            eprintln!("Execution aborted: step limit exceeded ({steps})");
            let _ = io::stderr().flush();
            1
        }
        Ok(Stop::TimedOut(timeout)) => {
            eprintln!(
                "Execution aborted: wall-clock timeout exceeded ({} ms)",
                timeout.as_millis()
            );
            let _ = io::stderr().flush();
            1
        }
        Err(err) => {
            print_machine_error(Some(program), source, &err);
            1
        }
    }
}

/// Drive `bf` to completion, to `max_steps`, or until `timeout` has passed.
///
/// The machine cannot be interrupted mid-run, so with a timeout the program
/// is executed in budget slices and the clock is checked between them.
fn run_until<R: Read, W: Write>(
    bf: &mut Interpreter<R, W>,
    max_steps: u64,
    timeout: Option<Duration>,
) -> Result<Stop, MachineError> {
    let Some(timeout) = timeout else {
        return Ok(match bf.execute_for(max_steps)? {
            RunOutcome::Halted => Stop::Halted,
            RunOutcome::BudgetExhausted { steps } => Stop::StepLimit(steps),
        });
    };

    let started = Instant::now();
    loop {
        let slice = if max_steps == 0 {
            TIMEOUT_SLICE
        } else {
            max_steps.saturating_sub(bf.machine().steps()).min(TIMEOUT_SLICE)
        };
        if slice == 0 {
            return Ok(Stop::StepLimit(bf.machine().steps()));
        }
        match bf.execute_for(slice)? {
            RunOutcome::Halted => return Ok(Stop::Halted),
            RunOutcome::BudgetExhausted { steps } => {
                if max_steps != 0 && steps >= max_steps {
                    return Ok(Stop::StepLimit(steps));
                }
                if started.elapsed() >= timeout {
                    return Ok(Stop::TimedOut(timeout));
                }
            }
        }
    }
}

fn usage_and_exit(program: &str, code: i32) -> ! {
    eprintln!(
        r#"Usage:
  {0} run [OPTIONS] "<code>"
  {0} run [OPTIONS] --file <PATH>

Options:
  --file,  -f <PATH>    Read Brainfuck code from PATH instead of positional "<code>"
  --debug, -d           Print a trace record after every step
  --minify, -m          Strip non-instruction characters before running
  --tape-size <CELLS>   Number of tape cells (default 30000)
  --max-steps <N>       Abort after N steps (default unlimited)
  --timeout <MS>        Abort after MS milliseconds of wall-clock time
  --eof <MODE>          Value stored by ',' at end of input: zero, unchanged, max
  --help,  -h           Show this help

Notes:
- Input (`,`) reads a single byte from stdin.
- Characters outside of ><+-.,[] are comments, but each one still costs a step.
- Errors report the 0-based line and column of the failing instruction;
  with --minify these refer to the minified program.

Examples:
- Load Brainfuck code from a file:
    {0} run --file ./program.bf
- Read bytes from a file as stdin (`,` will consume file input):
    {0} run ",[.,]" < input.txt
"#,
        program
    );
    let _ = io::stderr().flush();
    std::process::exit(code);
}
