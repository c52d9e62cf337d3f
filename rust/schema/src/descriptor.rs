//! Descriptors handed to a vector-database client once a document is built.
//!
//! These mirror the objects a client SDK expects: field and collection
//! schemas, index registration parameters and function descriptors. They are
//! plain data and serialize to JSON for inspection.

use std::collections::HashSet;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use yamlvus_error::{ErrorCodes, YamlvusError};

use crate::document::Mapping;
use crate::registry::{DataType, FunctionType};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DescriptorError {
    #[error("Schema must contain at least one field")]
    NoFields,
    #[error("Duplicate field name '{0}'")]
    DuplicateField(String),
    #[error("Expected exactly one primary field, found {0}")]
    PrimaryCount(usize),
    #[error("Primary field '{name}' must be INT64 or VARCHAR, got {dtype}")]
    InvalidPrimaryType { name: String, dtype: DataType },
    #[error("Field '{0}' enables auto_id, which is only supported on an INT64 primary field")]
    InvalidAutoId(String),
    #[error("Vector field '{0}' has no dimension")]
    MissingDim(String),
    #[error("VARCHAR field '{0}' has no max_length")]
    MissingMaxLength(String),
    #[error("Function name cannot be empty")]
    EmptyFunctionName,
}

impl YamlvusError for DescriptorError {
    fn code(&self) -> ErrorCodes {
        ErrorCodes::InvalidArgument
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldSchema {
    pub name: String,
    pub dtype: DataType,
    pub description: String,
    pub is_primary: bool,
    pub auto_id: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dim: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_length: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub element_type: Option<DataType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_capacity: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_analyzer: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_match: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analyzer_params: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub multi_analyzer_params: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nullable: Option<bool>,
}

impl FieldSchema {
    pub fn new(name: impl Into<String>, dtype: DataType) -> Self {
        FieldSchema {
            name: name.into(),
            dtype,
            description: String::new(),
            is_primary: false,
            auto_id: false,
            dim: None,
            max_length: None,
            element_type: None,
            max_capacity: None,
            enable_analyzer: None,
            enable_match: None,
            analyzer_params: None,
            multi_analyzer_params: None,
            nullable: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CollectionSchema {
    pub fields: Vec<FieldSchema>,
    pub description: String,
    pub enable_dynamic_field: bool,
}

impl CollectionSchema {
    pub fn new(
        fields: Vec<FieldSchema>,
        description: impl Into<String>,
        enable_dynamic_field: bool,
    ) -> Self {
        CollectionSchema {
            fields,
            description: description.into(),
            enable_dynamic_field,
        }
    }

    pub fn primary_field(&self) -> Option<&FieldSchema> {
        self.fields.iter().find(|field| field.is_primary)
    }

    pub fn field(&self, name: &str) -> Option<&FieldSchema> {
        self.fields.iter().find(|field| field.name == name)
    }

    /// Structural checks the engine applies before accepting a schema.
    pub fn verify(&self) -> Result<(), DescriptorError> {
        if self.fields.is_empty() {
            return Err(DescriptorError::NoFields);
        }

        let mut seen = HashSet::new();
        for field in &self.fields {
            if !seen.insert(field.name.as_str()) {
                return Err(DescriptorError::DuplicateField(field.name.clone()));
            }
        }

        let primaries: Vec<&FieldSchema> =
            self.fields.iter().filter(|field| field.is_primary).collect();
        let [primary] = primaries.as_slice() else {
            return Err(DescriptorError::PrimaryCount(primaries.len()));
        };
        if !matches!(primary.dtype, DataType::Int64 | DataType::VarChar) {
            return Err(DescriptorError::InvalidPrimaryType {
                name: primary.name.clone(),
                dtype: primary.dtype,
            });
        }

        for field in &self.fields {
            if field.auto_id && !(field.is_primary && field.dtype == DataType::Int64) {
                return Err(DescriptorError::InvalidAutoId(field.name.clone()));
            }
            if field.dtype.is_dense_vector() && field.dim.is_none() {
                return Err(DescriptorError::MissingDim(field.name.clone()));
            }
            if field.dtype == DataType::VarChar && field.max_length.is_none() {
                return Err(DescriptorError::MissingMaxLength(field.name.clone()));
            }
        }
        Ok(())
    }
}

/// Arguments for one index registration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexParam {
    pub field_name: String,
    pub index_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metric_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Mapping>,
}

/// Ordered index registrations for one collection.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct IndexParams {
    indexes: Vec<IndexParam>,
}

impl IndexParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_index(&mut self, index: IndexParam) {
        self.indexes.push(index);
    }

    pub fn len(&self) -> usize {
        self.indexes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indexes.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, IndexParam> {
        self.indexes.iter()
    }
}

impl<'a> IntoIterator for &'a IndexParams {
    type Item = &'a IndexParam;
    type IntoIter = std::slice::Iter<'a, IndexParam>;

    fn into_iter(self) -> Self::IntoIter {
        self.indexes.iter()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Function {
    pub name: String,
    pub function_type: FunctionType,
    pub input_field_names: Vec<String>,
    pub output_field_names: Vec<String>,
    pub description: String,
    pub params: Mapping,
}

impl Function {
    pub fn new(
        name: impl Into<String>,
        function_type: FunctionType,
        input_field_names: Vec<String>,
        output_field_names: Vec<String>,
        description: impl Into<String>,
        params: Mapping,
    ) -> Result<Self, DescriptorError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(DescriptorError::EmptyFunctionName);
        }
        Ok(Function {
            name,
            function_type,
            input_field_names,
            output_field_names,
            description: description.into(),
            params,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn primary() -> FieldSchema {
        let mut field = FieldSchema::new("id", DataType::Int64);
        field.is_primary = true;
        field
    }

    fn vector() -> FieldSchema {
        let mut field = FieldSchema::new("v", DataType::FloatVector);
        field.dim = Some(8);
        field
    }

    #[test]
    fn test_verify_accepts_minimal_schema() {
        let schema = CollectionSchema::new(vec![primary(), vector()], "", false);
        schema.verify().unwrap();
        assert_eq!(schema.primary_field().map(|f| f.name.as_str()), Some("id"));
    }

    #[test]
    fn test_verify_rejections() {
        assert_eq!(
            CollectionSchema::new(vec![], "", false).verify(),
            Err(DescriptorError::NoFields)
        );
        assert_eq!(
            CollectionSchema::new(vec![vector()], "", false).verify(),
            Err(DescriptorError::PrimaryCount(0))
        );
        assert_eq!(
            CollectionSchema::new(vec![primary(), primary()], "", false).verify(),
            Err(DescriptorError::DuplicateField("id".to_string()))
        );

        let mut float_primary = FieldSchema::new("f", DataType::Float);
        float_primary.is_primary = true;
        assert!(matches!(
            CollectionSchema::new(vec![float_primary], "", false).verify(),
            Err(DescriptorError::InvalidPrimaryType { .. })
        ));

        let mut text_primary = FieldSchema::new("pk", DataType::VarChar);
        text_primary.is_primary = true;
        text_primary.max_length = Some(64);
        text_primary.auto_id = true;
        assert_eq!(
            CollectionSchema::new(vec![text_primary], "", false).verify(),
            Err(DescriptorError::InvalidAutoId("pk".to_string()))
        );

        let mut no_dim = vector();
        no_dim.dim = None;
        assert_eq!(
            CollectionSchema::new(vec![primary(), no_dim], "", false).verify(),
            Err(DescriptorError::MissingDim("v".to_string()))
        );
    }

    #[test]
    fn test_function_requires_name() {
        let err = Function::new("  ", FunctionType::Bm25, vec![], vec![], "", Mapping::new())
            .unwrap_err();
        assert_eq!(err, DescriptorError::EmptyFunctionName);
    }

    #[test]
    fn test_serialization_skips_unset_options() {
        let value = serde_json::to_value(vector()).unwrap();
        assert_eq!(
            value,
            json!({
                "name": "v",
                "dtype": "FLOAT_VECTOR",
                "description": "",
                "is_primary": false,
                "auto_id": false,
                "dim": 8,
            })
        );

        let mut params = IndexParams::new();
        params.add_index(IndexParam {
            field_name: "v".to_string(),
            index_type: "FLAT".to_string(),
            metric_type: None,
            params: None,
        });
        assert_eq!(
            serde_json::to_value(&params).unwrap(),
            json!([{"field_name": "v", "index_type": "FLAT"}])
        );
    }
}
