use std::io::Write;
use std::path::PathBuf;

use clap::Args;
use colored::Colorize;
use serde_json::Value;
use yamlvus_schema::{
    display_value, first_alias, name_list, SchemaLoader, FUNCTION_TYPE_KEYS, INPUT_FIELD_KEYS,
    OUTPUT_FIELD_KEYS,
};

use crate::utils::CliError;

const FIELD_PARAMS: &[&str] = &["max_length", "dim", "element_type", "max_capacity"];

#[derive(Args, Debug)]
pub struct InfoArgs {
    #[arg(help = "Path to YAML schema file")]
    pub schema_file: PathBuf,
}

fn text(value: Option<&Value>) -> String {
    value.map(display_value).unwrap_or_default()
}

fn check(value: Option<&Value>) -> String {
    match value {
        Some(Value::Bool(true)) => "✓".to_string(),
        _ => String::new(),
    }
}

fn names(value: Option<(&'static str, &Value)>) -> String {
    value
        .and_then(|(_, value)| name_list(value))
        .map(|names| names.join(", "))
        .unwrap_or_default()
}

fn write_table<W: Write>(
    writer: &mut W,
    headers: &[&str],
    rows: &[Vec<String>],
) -> Result<(), CliError> {
    let widths: Vec<usize> = headers
        .iter()
        .enumerate()
        .map(|(column, header)| {
            rows.iter()
                .map(|row| row.get(column).map_or(0, |cell| cell.chars().count()))
                .chain(std::iter::once(header.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let render = |cells: Vec<String>| -> String {
        cells
            .iter()
            .zip(&widths)
            .map(|(cell, width)| format!("{:<width$}", cell, width = width))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let header = render(headers.iter().map(|h| h.to_string()).collect());
    writeln!(writer, "  {}", header.bold())?;
    for row in rows {
        writeln!(writer, "  {}", render(row.clone()))?;
    }
    Ok(())
}

pub fn info<W: Write>(writer: &mut W, args: &InfoArgs) -> Result<(), CliError> {
    let document = SchemaLoader::open(&args.schema_file)?;

    writeln!(writer, "\n{}", "Schema Information".bold().blue())?;
    writeln!(writer, "{} {}", "File:".bold(), args.schema_file.display())?;
    writeln!(writer, "{} {}", "Name:".bold(), document.name()?)?;
    let description = document.description()?;
    writeln!(
        writer,
        "{} {}",
        "Description:".bold(),
        if description.is_empty() { "None" } else { description }
    )?;
    if let Some(alias) = document.alias()? {
        writeln!(writer, "{} {}", "Alias:".bold(), alias)?;
    }

    let fields = document.fields()?;
    writeln!(writer, "\n{}", format!("Fields ({}):", fields.len()).bold())?;
    let rows: Vec<Vec<String>> = fields
        .iter()
        .map(|field| {
            let params: Vec<String> = FIELD_PARAMS
                .iter()
                .filter_map(|key| {
                    field
                        .get(*key)
                        .map(|value| format!("{}={}", key, display_value(value)))
                })
                .collect();
            vec![
                text(field.get("name")),
                text(field.get("type")),
                check(field.get("is_primary")),
                check(field.get("auto_id")),
                params.join(", "),
            ]
        })
        .collect();
    write_table(
        writer,
        &["Name", "Type", "Primary", "Auto ID", "Parameters"],
        &rows,
    )?;

    let indexes = document.indexes()?;
    if !indexes.is_empty() {
        writeln!(writer, "\n{}", format!("Indexes ({}):", indexes.len()).bold())?;
        let rows: Vec<Vec<String>> = indexes
            .iter()
            .map(|index| {
                let params: Vec<String> = index
                    .get("params")
                    .and_then(Value::as_object)
                    .map(|params| {
                        params
                            .iter()
                            .map(|(key, value)| format!("{}={}", key, display_value(value)))
                            .collect()
                    })
                    .unwrap_or_default();
                let index_type = text(index.get("type"));
                vec![
                    text(index.get("field")),
                    if index_type.is_empty() {
                        "(inferred)".to_string()
                    } else {
                        index_type
                    },
                    text(index.get("metric")),
                    params.join(", "),
                ]
            })
            .collect();
        write_table(writer, &["Field", "Type", "Metric", "Parameters"], &rows)?;
    }

    let functions = document.functions()?;
    if !functions.is_empty() {
        writeln!(
            writer,
            "\n{}",
            format!("Functions ({}):", functions.len()).bold()
        )?;
        let rows: Vec<Vec<String>> = functions
            .iter()
            .map(|func| {
                let Some(func) = func.as_object() else {
                    return vec![display_value(func)];
                };
                vec![
                    text(func.get("name")),
                    text(first_alias(func, FUNCTION_TYPE_KEYS).map(|(_, value)| value)),
                    names(first_alias(func, INPUT_FIELD_KEYS)),
                    names(first_alias(func, OUTPUT_FIELD_KEYS)),
                ]
            })
            .collect();
        write_table(
            writer,
            &["Name", "Type", "Input Fields", "Output Fields"],
            &rows,
        )?;
    }

    if let Some(settings) = document.settings()? {
        writeln!(writer, "\n{}", "Settings:".bold())?;
        for (key, value) in settings {
            writeln!(writer, "  {}: {}", key, display_value(value))?;
        }
    }
    Ok(())
}
