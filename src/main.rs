use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use log::LevelFilter;

use jackc::driver::{self, BootstrapMode};
use jackc::hack::{assemble, Cpu};
use jackc::lexer::Lexer;
use jackc::translator::TranslateOptions;

#[derive(Parser)]
#[command(version, about = "Jack compiler and VM translator for the Hack platform")]
struct Cli {
    /// Increase logging verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compile a .jack file, or every .jack file in a directory, to .vm
    Compile { path: PathBuf },

    /// Translate a .vm file, or a directory of .vm files, to .asm
    Translate {
        path: PathBuf,

        #[arg(long, value_enum, default_value_t = BootstrapMode::Auto)]
        bootstrap: BootstrapMode,

        /// Do not annotate the assembly with the source instructions
        #[arg(long)]
        no_comments: bool,
    },

    /// Compile and translate a program directory
    Build {
        dir: PathBuf,

        #[arg(long, value_enum, default_value_t = BootstrapMode::Auto)]
        bootstrap: BootstrapMode,

        #[arg(long)]
        no_comments: bool,
    },

    /// Print the tokens of a .jack file
    Tokens { file: PathBuf },

    /// Run a .asm file on the Hack emulator
    Run {
        file: PathBuf,

        #[arg(long, default_value_t = 1_000_000)]
        cycles: u64,
    },
}

fn init_logger(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logger(cli.verbose);

    match cli.command {
        Command::Compile { path } => {
            for output in driver::compile_path(&path)? {
                println!("{}", output.display());
            }
        }
        Command::Translate {
            path,
            bootstrap,
            no_comments,
        } => {
            let options = TranslateOptions {
                comments: !no_comments,
            };
            let output = driver::translate_path(&path, bootstrap, options)?;
            println!("{}", output.display());
        }
        Command::Build {
            dir,
            bootstrap,
            no_comments,
        } => {
            let options = TranslateOptions {
                comments: !no_comments,
            };
            let output = driver::build(&dir, bootstrap, options)?;
            println!("{}", output.display());
        }
        Command::Tokens { file } => {
            let source = fs::read_to_string(&file)
                .with_context(|| format!("cannot read {}", file.display()))?;
            let tokens =
                Lexer::tokenize(&source).with_context(|| format!("{}", file.display()))?;
            for token in tokens {
                println!("{} {}", token.kind.category(), token.kind.lexeme());
            }
        }
        Command::Run { file, cycles } => {
            let source = fs::read_to_string(&file)
                .with_context(|| format!("cannot read {}", file.display()))?;
            let program = assemble(&source).with_context(|| format!("{}", file.display()))?;
            let mut cpu = Cpu::new(program);
            let executed = cpu.run(cycles)?;
            println!("cycles: {}", executed);
            println!("pc: {}", cpu.pc());
            println!("sp: {}", cpu.ram()[0]);
            match cpu.stack_top() {
                Some(top) => println!("top: {}", top),
                None => println!("top: <empty>"),
            }
        }
    }
    Ok(())
}
