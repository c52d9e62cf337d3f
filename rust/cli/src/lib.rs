mod commands;
mod utils;

use crate::commands::convert::{convert, ConvertArgs};
use crate::commands::info::{info, InfoArgs};
use crate::commands::validate::{validate, ValidateArgs};
use crate::utils::{init_tracing, CliError, EngineArgs};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::io::{self, Write};
use yamlvus_error::{ErrorCodes, YamlvusError};
use yamlvus_schema::EngineCompat;

#[derive(Subcommand, Debug)]
enum Command {
    /// Validate a YAML schema file
    Validate(ValidateArgs),
    /// Show detailed information about a schema file
    Info(InfoArgs),
    /// Build a schema file and write it out as JSON
    Convert(ConvertArgs),
}

#[derive(Parser, Debug)]
#[command(name = "yamlvus")]
#[command(version = "0.1.0")]
#[command(about = "CLI tools for YAML vector database schemas", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
    #[clap(flatten)]
    engine: EngineArgs,
    #[arg(short, long, global = true, help = "Verbose output")]
    verbose: bool,
}

fn run_command<W: Write>(
    writer: &mut W,
    command: &Command,
    compat: &EngineCompat,
    verbose: bool,
) -> Result<ErrorCodes, CliError> {
    match command {
        Command::Validate(args) => Ok(if validate(writer, args, compat, verbose)? {
            ErrorCodes::Success
        } else {
            ErrorCodes::InvalidArgument
        }),
        Command::Info(args) => info(writer, args).map(|_| ErrorCodes::Success),
        Command::Convert(args) => convert(writer, args, compat).map(|_| ErrorCodes::Success),
    }
}

/// Runs the CLI and returns the process exit status.
pub fn yamlvus_cli(args: Vec<String>) -> i32 {
    let cli = Cli::parse_from(args);
    init_tracing(cli.verbose);

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let outcome = cli
        .engine
        .compat()
        .and_then(|compat| run_command(&mut out, &cli.command, &compat, cli.verbose));
    match outcome {
        Ok(code) => code.exit_code(),
        Err(e) => {
            eprintln!("{}", format!("Error: {}", e).red());
            e.code().exit_code()
        }
    }
}
