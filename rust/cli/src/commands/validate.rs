use std::io::Write;
use std::path::PathBuf;

use clap::Args;
use colored::Colorize;
use yamlvus_schema::api::validate_schema_result;
use yamlvus_schema::{EngineCompat, SchemaLoader, ValidationMessage};

use crate::utils::CliError;

#[derive(Args, Debug)]
pub struct ValidateArgs {
    #[arg(help = "Path to YAML schema file")]
    pub schema_file: PathBuf,
}

fn write_group<W: Write>(
    writer: &mut W,
    heading: String,
    messages: &[&ValidationMessage],
    paint: fn(String) -> colored::ColoredString,
) -> Result<(), CliError> {
    if messages.is_empty() {
        return Ok(());
    }
    writeln!(writer, "{}", paint(heading))?;
    for message in messages {
        writeln!(writer, "  {}", paint(format!("• {}", message.as_prefixed())))?;
    }
    Ok(())
}

fn write_summary<W: Write>(writer: &mut W, args: &ValidateArgs) -> Result<(), CliError> {
    let document = SchemaLoader::open(&args.schema_file)?;
    writeln!(writer, "\n{}", "Schema Info:".bold())?;
    writeln!(writer, "  Name: {}", document.name()?)?;
    writeln!(writer, "  Description: {}", document.description()?)?;
    writeln!(writer, "  Fields: {}", document.fields()?.len())?;
    writeln!(writer, "  Indexes: {}", document.indexes()?.len())?;
    writeln!(writer, "  Functions: {}", document.functions()?.len())?;
    if let Some(settings) = document.settings()? {
        let keys: Vec<&str> = settings.keys().map(String::as_str).collect();
        writeln!(writer, "  Settings: {}", keys.join(", "))?;
    }
    Ok(())
}

/// Prints every message grouped by severity. Returns whether the schema is
/// free of errors.
pub fn validate<W: Write>(
    writer: &mut W,
    args: &ValidateArgs,
    compat: &EngineCompat,
    verbose: bool,
) -> Result<bool, CliError> {
    if !args.schema_file.exists() {
        writeln!(
            writer,
            "{}",
            format!("Error: File '{}' does not exist", args.schema_file.display()).red()
        )?;
        return Ok(false);
    }

    writeln!(
        writer,
        "Validating {}...",
        args.schema_file.display().to_string().blue()
    )?;
    let result = validate_schema_result(&args.schema_file, compat).ordered();

    if !result.has_errors() {
        writeln!(writer, "{}", "✓ Schema is valid!".green())?;
    }
    let errors = result.errors();
    let warnings = result.warnings();
    let infos = result.infos();
    write_group(
        writer,
        format!("✗ Schema has {} error(s):", errors.len()),
        &errors,
        |text| text.red(),
    )?;
    write_group(
        writer,
        format!("⚠ Schema has {} warning(s):", warnings.len()),
        &warnings,
        |text| text.yellow(),
    )?;
    write_group(
        writer,
        format!("i Schema has {} info message(s):", infos.len()),
        &infos,
        |text| text.cyan(),
    )?;

    if !errors.is_empty() {
        return Ok(false);
    }
    if verbose {
        write_summary(writer, args)?;
    }
    Ok(true)
}
