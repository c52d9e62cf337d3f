use std::path::Path;

use thiserror::Error;
use yamlvus_error::{ErrorCodes, YamlvusError};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SchemaError {
    /// The document could not be read or does not have the expected shape.
    #[error("{message}{}", format_location(.file_path, .line, .column))]
    Parse {
        message: String,
        file_path: Option<String>,
        line: Option<usize>,
        column: Option<usize>,
    },
    /// A semantic rule was violated while validating or building.
    #[error("{0}")]
    Conversion(String),
    /// A field or element type is unknown, or not available in the installed engine SDK.
    #[error("{0}")]
    UnsupportedType(String),
}

fn format_location(
    file_path: &Option<String>,
    line: &Option<usize>,
    column: &Option<usize>,
) -> String {
    let mut location = String::new();
    if let Some(file_path) = file_path {
        location.push_str(&format!(" in {}", file_path));
    }
    if let Some(line) = line {
        location.push_str(&format!(" at line {}", line));
    }
    if let Some(column) = column {
        location.push_str(&format!(", column {}", column));
    }
    location
}

impl SchemaError {
    pub fn parse(message: impl Into<String>) -> Self {
        SchemaError::Parse {
            message: message.into(),
            file_path: None,
            line: None,
            column: None,
        }
    }

    pub fn conversion(message: impl Into<String>) -> Self {
        SchemaError::Conversion(message.into())
    }

    pub fn unsupported_type(message: impl Into<String>) -> Self {
        SchemaError::UnsupportedType(message.into())
    }

    /// Attaches a file path to parse errors. Other kinds are returned unchanged.
    pub fn with_file_path(self, path: &Path) -> Self {
        match self {
            SchemaError::Parse {
                message,
                line,
                column,
                ..
            } => SchemaError::Parse {
                message,
                file_path: Some(path.display().to_string()),
                line,
                column,
            },
            other => other,
        }
    }

    pub fn is_unsupported_type(&self) -> bool {
        matches!(self, SchemaError::UnsupportedType(_))
    }

    pub fn is_parse(&self) -> bool {
        matches!(self, SchemaError::Parse { .. })
    }
}

impl YamlvusError for SchemaError {
    fn code(&self) -> ErrorCodes {
        match self {
            SchemaError::Parse { .. } => ErrorCodes::InvalidArgument,
            SchemaError::Conversion(_) => ErrorCodes::InvalidArgument,
            SchemaError::UnsupportedType(_) => ErrorCodes::Unimplemented,
        }
    }
}

pub type Result<T, E = SchemaError> = std::result::Result<T, E>;
