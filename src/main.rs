use bf_tape::commands::minify::{self, MinifyArgs};
use bf_tape::commands::run::{self, RunArgs};
use clap::{Parser, Subcommand};
use std::env;
use std::io::{self, Write};

fn print_top_usage_and_exit(program: &str, code: i32) -> ! {
    eprintln!(
        r#"Usage:
  {0} run    [OPTIONS] "<code>"       # Run Brainfuck code (args are concatenated)
  {0} run    [OPTIONS] --file <PATH>  # Run Brainfuck code loaded from file
  {0} minify [--file <PATH>] [code]   # Strip everything but ><+-.,[] from a program

Run "{0} <subcommand> --help" for more info.
"#,
        program
    );
    let _ = io::stderr().flush();
    std::process::exit(code);
}

#[derive(Parser, Debug)]
#[command(name = "bf", disable_help_flag = true, disable_help_subcommand = true)]
struct Cli {
    /// Show this help
    #[arg(short = 'h', long = "help", action = clap::ArgAction::SetTrue)]
    help: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    Run(RunArgs),
    Minify(MinifyArgs),
}

fn main() {
    // We still pull the program name for help rendering consistency
    let program = env::args().next().unwrap_or_else(|| String::from("bf"));

    let cli = Cli::parse();

    let code = match cli.command {
        Some(_) if cli.help => print_top_usage_and_exit(&program, 0),
        Some(Command::Run(args)) => run::run(&program, args),
        Some(Command::Minify(args)) => minify::run(&program, args),
        None => print_top_usage_and_exit(&program, if cli.help { 0 } else { 2 }),
    };

    std::process::exit(code);
}
