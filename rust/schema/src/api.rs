//! One-call entry points over the loader, validator and builder.
//!
//! The `validate_*` functions never fail: every problem, including a panic
//! inside the pipeline, comes back as an error message in the result. The
//! `build_*`, `load_*` and `create_*` functions fail on the first problem.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, instrument};

use crate::builders::SchemaBuilder;
use crate::compat::EngineCompat;
use crate::descriptor::{CollectionSchema, Function, IndexParams};
use crate::document::SchemaDocument;
use crate::error::{Result, SchemaError};
use crate::loader::SchemaLoader;
use crate::result::{ValidationMessage, ValidationResult};
use crate::validators::SchemaValidator;

/// Loads a schema file and returns its untyped document.
pub fn load_schema_dict(path: impl AsRef<Path>) -> Result<Value> {
    Ok(SchemaLoader::open(path)?.to_value())
}

/// Loads, validates and builds a schema file.
pub fn load_schema(path: impl AsRef<Path>, compat: &EngineCompat) -> Result<CollectionSchema> {
    build_collection_from_yaml(path, compat)
}

pub fn build_collection_from_yaml(
    path: impl AsRef<Path>,
    compat: &EngineCompat,
) -> Result<CollectionSchema> {
    let document = SchemaLoader::open(path)?;
    SchemaBuilder::try_new(document, compat.clone(), None)?.build()
}

pub fn build_collection_from_dict(document: Value, compat: &EngineCompat) -> Result<CollectionSchema> {
    let document = SchemaDocument::try_from(document)?;
    SchemaBuilder::try_new(document, compat.clone(), None)?.build()
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "Unexpected failure during schema validation".to_string()
    }
}

/// Validates an in-memory document.
///
/// Shape problems stop validation early. Otherwise every entity is checked
/// and, when nothing is wrong, a trial build runs so that anything only the
/// builder can detect is reported too.
#[instrument(skip_all)]
pub fn validate_document_result(document: &SchemaDocument, compat: &EngineCompat) -> ValidationResult {
    panic::catch_unwind(AssertUnwindSafe(|| run_validation(document, compat))).unwrap_or_else(
        |payload| {
            let mut result = ValidationResult::new();
            result.add_error(panic_message(payload));
            result
        },
    )
}

fn run_validation(document: &SchemaDocument, compat: &EngineCompat) -> ValidationResult {
    let mut result = ValidationResult::new();
    if let Err(e) = document.check_shape() {
        result.add_error(e.to_string());
        return result;
    }

    let (validation, context) = SchemaValidator::new(document, compat.clone()).validate();
    result.extend(validation);
    if result.has_errors() {
        return result;
    }

    let trial_build = SchemaBuilder::try_new(document.clone(), compat.clone(), Some(context))
        .and_then(|builder| {
            builder.build()?;
            builder.get_milvus_index_params()
        });
    if let Err(e) = trial_build {
        result.add_error(e.to_string());
    }
    debug!(messages = result.len(), "Validated schema document");
    result
}

/// Validates a schema file. Loader failures become a single error message.
pub fn validate_schema_result(path: impl AsRef<Path>, compat: &EngineCompat) -> ValidationResult {
    match SchemaLoader::new(path).read_document() {
        Ok(document) => validate_document_result(&document, compat),
        Err(e) => [ValidationMessage::error(e.to_string())]
            .into_iter()
            .collect(),
    }
}

/// Prefixed messages for a schema file: errors, then warnings, then infos.
pub fn validate_schema(path: impl AsRef<Path>, compat: &EngineCompat) -> Vec<String> {
    validate_schema_result(path, compat).ordered().as_strings()
}

/// Everything a client needs to create a collection and register its indexes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CollectionRequest {
    pub collection_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    pub schema: CollectionSchema,
    pub index_params: IndexParams,
    pub functions: Vec<Function>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consistency_level: Option<String>,
}

impl CollectionRequest {
    pub fn from_builder(builder: &SchemaBuilder) -> Result<Self> {
        let collection_name = builder
            .context()
            .document()
            .name()
            .map_err(|e| SchemaError::conversion(e.to_string()))?
            .to_string();
        Ok(CollectionRequest {
            collection_name,
            alias: builder.alias().map(str::to_string),
            schema: builder.build()?,
            index_params: builder.get_milvus_index_params()?,
            functions: builder.get_milvus_function_objects()?,
            consistency_level: builder.consistency_level().map(str::to_string),
        })
    }
}

/// A vector database client able to create collections.
pub trait CollectionClient {
    type Response;
    type Error: From<SchemaError>;

    fn create_collection(
        &mut self,
        request: CollectionRequest,
    ) -> std::result::Result<Self::Response, Self::Error>;
}

pub fn create_collection_from_dict<C: CollectionClient>(
    document: Value,
    compat: &EngineCompat,
    client: &mut C,
) -> std::result::Result<C::Response, C::Error> {
    let document = SchemaDocument::try_from(document)?;
    let builder = SchemaBuilder::try_new(document, compat.clone(), None)?;
    client.create_collection(CollectionRequest::from_builder(&builder)?)
}

pub fn create_collection_from_yaml<C: CollectionClient>(
    path: impl AsRef<Path>,
    compat: &EngineCompat,
    client: &mut C,
) -> std::result::Result<C::Response, C::Error> {
    let document = SchemaLoader::open(path)?;
    let builder = SchemaBuilder::try_new(document, compat.clone(), None)?;
    client.create_collection(CollectionRequest::from_builder(&builder)?)
}
