use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;

use crate::document::SchemaDocument;
use crate::error::{Result, SchemaError};

/// Reads schema documents from YAML files on disk.
#[derive(Debug, Clone)]
pub struct SchemaLoader {
    path: PathBuf,
}

impl SchemaLoader {
    pub fn new(path: impl AsRef<Path>) -> Self {
        SchemaLoader {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads and decodes the file, then checks the document's top-level shape.
    /// Every error carries the file path.
    pub fn open(path: impl AsRef<Path>) -> Result<SchemaDocument> {
        Self::new(path).load()
    }

    pub fn load(&self) -> Result<SchemaDocument> {
        let document = self.read_document()?;
        document
            .check_shape()
            .map_err(|e| e.with_file_path(&self.path))?;
        Ok(document)
    }

    /// Reads and decodes the file without the shape checks.
    pub fn read_document(&self) -> Result<SchemaDocument> {
        self.decode().map_err(|e| e.with_file_path(&self.path))
    }

    fn decode(&self) -> Result<SchemaDocument> {
        let text = self.read_text()?;
        if text.trim().is_empty() {
            return Err(SchemaError::parse("Empty schema file"));
        }

        let value: Value = serde_yml::from_str(&text).map_err(|e| {
            let location = e.location();
            SchemaError::Parse {
                message: format!("YAML parsing failed: {}", e),
                file_path: None,
                line: location.as_ref().map(|location| location.line()),
                column: location.as_ref().map(|location| location.column()),
            }
        })?;
        debug!(path = %self.path.display(), "Decoded schema file");
        SchemaDocument::try_from(value)
    }

    fn read_text(&self) -> Result<String> {
        if !self.path.exists() {
            return Err(SchemaError::parse("Schema file not found"));
        }
        if !self.path.is_file() {
            return Err(SchemaError::parse("Path is not a file"));
        }
        fs::read_to_string(&self.path).map_err(|e| match e.kind() {
            ErrorKind::PermissionDenied => SchemaError::parse("Schema file not readable"),
            ErrorKind::InvalidData => {
                SchemaError::parse(format!("Schema file is not valid UTF-8: {}", e))
            }
            _ => SchemaError::parse(format!("Failed to read schema file: {}", e)),
        })
    }
}
