use std::fs;
use std::io::{self, Read, Write};

use clap::Args;

use crate::minify::minify;

#[derive(Args, Debug)]
#[command(disable_help_flag = true)]
pub struct MinifyArgs {
    /// Read Brainfuck code from PATH (otherwise reads from <code> or STDIN)
    #[arg(short = 'f', long = "file")]
    pub file: Option<String>,

    /// Concatenated Brainfuck code parts
    #[arg(value_name = "code", trailing_var_arg = true, allow_hyphen_values = true)]
    pub code: Vec<String>,

    /// Show this help
    #[arg(short = 'h', long = "help", action = clap::ArgAction::SetTrue)]
    pub help: bool,
}

pub fn run(program: &str, args: MinifyArgs) -> i32 {
    if args.help {
        usage_and_exit(program, 0);
    }

    let MinifyArgs { file, code, .. } = args;

    if file.is_some() && !code.is_empty() {
        eprintln!("{program}: cannot use positional code together with --file");
        usage_and_exit(program, 2);
    }

    let source = match file {
        Some(path) => match fs::read_to_string(&path) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("{program}: failed to read code file as UTF-8: {e}");
                let _ = io::stderr().flush();
                return 1;
            }
        },
        None if !code.is_empty() => code.join(""),
        None => {
            let mut s = String::new();
            if let Err(e) = io::stdin().read_to_string(&mut s) {
                eprintln!("{program}: failed reading UTF-8 from stdin: {e}");
                let _ = io::stderr().flush();
                return 1;
            }
            s
        }
    };

    println!("{}", minify(&source));
    let _ = io::stdout().flush();
    0
}

fn usage_and_exit(program: &str, code: i32) -> ! {
    eprintln!(
        r#"Usage:
  {0} minify "<code>"         # Minify code given as arguments (they are concatenated)
  {0} minify --file <PATH>    # Minify a Brainfuck source file
  {0} minify < program.bf     # Minify code read from STDIN

Options:
  --file,  -f <PATH>  Read code from PATH
  --help,  -h         Show this help

Description:
  Prints the program with every character outside of ><+-.,[] removed,
  newlines included, followed by a newline.
"#,
        program
    );
    let _ = io::stderr().flush();
    std::process::exit(code);
}
