use clap::Parser;
use jsop::evaluator::Environment;
use jsop::json::{expression_to_string, parse_program};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use thiserror::Error;

#[derive(Parser)]
#[command(name = "jsop")]
#[command(about = "Run jsop programs, or start an interactive session when no file is given")]
struct Args {
    /// Program file (JSON)
    file: Option<PathBuf>,

    /// Print the program after macro expansion instead of running it
    #[arg(short, long)]
    expand: bool,

    /// Enable debug logging (overridden by RUST_LOG)
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Error)]
enum CliError {
    #[error("cannot read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error(transparent)]
    Jsop(#[from] jsop::Error),
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose);

    match &args.file {
        Some(path) => match run_file(path, args.expand) {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("{e}");
                ExitCode::FAILURE
            }
        },
        None => repl::run_repl(args.expand),
    }
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();
}

/// Runtime errors are program output; only unreadable or unparsable input fails.
fn run_file(path: &Path, expand: bool) -> Result<(), CliError> {
    let source = fs::read_to_string(path).map_err(|source| CliError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    if expand {
        let expanded = jsop::expand_program(parse_program(&source)?, &Environment::new())?;
        println!("{}", expression_to_string(&expanded)?);
    } else {
        println!("{}", jsop::run(&source)?);
    }
    Ok(())
}

#[cfg(feature = "repl")]
mod repl {
    use jsop::builtinops::builtin_ops;
    use jsop::evaluator::{self, Environment};
    use jsop::json::{expression_to_string, parse_program};
    use jsop::object::Object;
    use jsop::{expand_program, final_object};
    use rustyline::DefaultEditor;
    use rustyline::error::ReadlineError;
    use std::process::ExitCode;

    pub(crate) fn run_repl(show_expansion: bool) -> ExitCode {
        println!("jsop - a Lisp written in JSON");
        println!("Enter a program on one line, e.g. {{\"command\": {{\"symbol\": \"+\", \"args\": [1, 2]}}}}");
        println!("Type :help for more commands, or Ctrl+D to exit.");
        println!();

        let mut rl = match DefaultEditor::new() {
            Ok(rl) => rl,
            Err(err) => {
                eprintln!("Could not initialize REPL: {err}");
                return ExitCode::FAILURE;
            }
        };
        let env = Environment::new();
        let mut show_expansion = show_expansion;

        loop {
            match rl.readline("jsop> ") {
                Ok(line) => {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    let _ = rl.add_history_entry(line);

                    match line {
                        ":help" => {
                            print_help();
                            continue;
                        }
                        ":env" => {
                            print_environment(&env);
                            continue;
                        }
                        ":builtins" => {
                            let names: Vec<_> = builtin_ops().iter().map(|op| op.id).collect();
                            println!("{}", names.join(" "));
                            continue;
                        }
                        ":expand" => {
                            show_expansion = !show_expansion;
                            println!(
                                "Macro expansion display {}",
                                if show_expansion { "on" } else { "off" }
                            );
                            continue;
                        }
                        ":quit" | ":exit" => {
                            println!("Goodbye!");
                            break;
                        }
                        _ => {}
                    }

                    eval_line(line, &env, show_expansion);
                }
                Err(ReadlineError::Eof | ReadlineError::Interrupted) => {
                    println!("Goodbye!");
                    break;
                }
                Err(err) => {
                    println!("Error: {err:?}");
                    return ExitCode::FAILURE;
                }
            }
        }
        ExitCode::SUCCESS
    }

    /// Bindings and macros persist across lines in `env`
    fn eval_line(line: &str, env: &Environment, show_expansion: bool) {
        let expanded = match parse_program(line).and_then(|program| expand_program(program, env)) {
            Ok(expanded) => expanded,
            Err(e) => {
                println!("Error: {e}");
                return;
            }
        };
        if show_expansion && let Ok(json) = expression_to_string(&expanded) {
            println!("→ {json}");
        }

        match evaluator::eval(&expanded, env) {
            Ok(result) => println!("{result}"),
            Err(signal) => match final_object(Err(signal), false) {
                Object::Error(e) => println!("Error: {e}"),
                value => println!("{value}"),
            },
        }
    }

    fn print_help() {
        println!("jsop REPL commands:");
        println!("  :help      - Show this help message");
        println!("  :env       - Show current environment bindings");
        println!("  :builtins  - List builtin operations");
        println!("  :expand    - Toggle display of the macro-expanded program");
        println!("  :quit      - Exit the interpreter");
        println!("  :exit      - Exit the interpreter");
        println!();
        println!("Special forms:");
        println!("  {{\"command\": {{\"symbol\": \"+\", \"args\": [1, 2]}}}}");
        println!("  {{\"set\": {{\"var\": \"$x\", \"val\": 5}}}}");
        println!("  {{\"if\": {{\"cond\": true, \"conseq\": 1, \"alt\": 2}}}}");
        println!("  {{\"loop\": {{\"for\": \"$i\", \"from\": 0, \"until\": 3, \"do\": \"$i\"}}}}");
        println!("  {{\"lambda\": {{\"params\": [\"$a\"], \"body\": \"$a\"}}}}");
        println!("  {{\"defmacro\": {{\"name\": \"m\", \"keys\": [\"k\"], \"body\": ...}}}}");
        println!();
        println!("Strings interpolate bound symbols: \"x is {{ $x }}\"");
        println!();
    }

    fn print_environment(env: &Environment) {
        let bindings = env.get_all_bindings();

        if bindings.is_empty() {
            println!("Environment is empty.");
            return;
        }

        let (macros, values): (Vec<_>, Vec<_>) = bindings
            .into_iter()
            .partition(|(_, value)| matches!(value, Object::Macro { .. }));

        if !values.is_empty() {
            println!("Variables ({}):", values.len());
            for (name, value) in values {
                println!("  {name} = {value}");
            }
        }
        if !macros.is_empty() {
            println!("Macros ({}):", macros.len());
            for (name, _) in macros {
                println!("  {name}");
            }
        }
    }
}

#[cfg(not(feature = "repl"))]
mod repl {
    use std::process::ExitCode;

    pub(crate) fn run_repl(_show_expansion: bool) -> ExitCode {
        eprintln!("jsop was built without the `repl` feature; pass a FILE to run");
        ExitCode::FAILURE
    }
}
