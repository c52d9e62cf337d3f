use std::fs;
use std::io::Write;
use std::path::PathBuf;

use clap::Args;
use colored::Colorize;
use tracing::debug;
use yamlvus_schema::api::CollectionRequest;
use yamlvus_schema::{EngineCompat, SchemaBuilder, SchemaLoader};

use crate::utils::CliError;

#[derive(Args, Debug)]
pub struct ConvertArgs {
    #[arg(help = "Path to YAML schema file")]
    pub schema_file: PathBuf,
    #[arg(short, long, help = "Output file (defaults to stdout)")]
    pub output: Option<PathBuf>,
}

/// Builds the schema and renders everything a client needs as JSON.
pub fn convert<W: Write>(
    writer: &mut W,
    args: &ConvertArgs,
    compat: &EngineCompat,
) -> Result<(), CliError> {
    let document = SchemaLoader::open(&args.schema_file)?;
    let builder = SchemaBuilder::try_new(document, compat.clone(), None)?;
    let request = CollectionRequest::from_builder(&builder)?;
    let json = serde_json::to_string_pretty(&request)?;

    match &args.output {
        Some(output) => {
            fs::write(output, format!("{}\n", json))?;
            debug!(output = %output.display(), bytes = json.len(), "Wrote converted schema");
            writeln!(
                writer,
                "{}",
                format!(
                    "✓ Wrote collection '{}' to {}",
                    request.collection_name,
                    output.display()
                )
                .green()
            )?;
        }
        None => writeln!(writer, "{}", json)?,
    }
    Ok(())
}
