use bf_tape::{Interpreter, RunOutcome, Settings};
use std::io;

fn main() {
    // Run a program a few steps at a time, the way an external debugger would.
    let code = "++[>+++<-]>.";
    let settings = Settings { debug: true, ..Settings::default() };
    let mut bf = Interpreter::new(code, settings, io::empty(), io::stdout().lock());

    loop {
        match bf.execute_for(5) {
            Ok(RunOutcome::Halted) => break,
            Ok(RunOutcome::BudgetExhausted { steps }) => eprintln!("-- paused after {steps} steps"),
            Err(err) => {
                eprintln!("Brainfuck interpreter error: {err}");
                std::process::exit(1);
            }
        }
    }
}
