use std::collections::HashMap;

use serde_json::Value;

use crate::document::{
    display_value, first_alias, is_truthy, name_list, python_list, value_kind, FieldTypes,
    Mapping, BM25_OUTPUT_KEYS, FUNCTION_TYPE_KEYS, INPUT_FIELD_KEYS, OUTPUT_FIELD_KEYS,
};
use crate::error::{Result, SchemaError};
use crate::registry::FunctionType;
use crate::result::ValidationMessage;
use crate::validators::index::declared_index_type;

const FUNCTION_INPUT_TYPES: &[&str] = &["varchar", "json"];
const BM25_PARAMS: &[&str] = &["b", "k1"];

/// Normalized function type of a definition, if it names a known one.
pub fn function_type_of(func_def: &Value) -> Option<FunctionType> {
    func_def
        .as_object()
        .and_then(|func| first_alias(func, FUNCTION_TYPE_KEYS))
        .and_then(|(_, value)| value.as_str())
        .and_then(FunctionType::normalize)
}

/// Whether any BM25 function writes to `field_name`. Each function contributes
/// the names under its first non-empty output key.
pub fn is_bm25_function_output_field(functions: &[Value], field_name: &str) -> bool {
    functions
        .iter()
        .filter(|func| function_type_of(func) == Some(FunctionType::Bm25))
        .filter_map(|func| {
            BM25_OUTPUT_KEYS
                .iter()
                .filter_map(|key| func.get(*key))
                .find(|value| is_truthy(value))
                .and_then(name_list)
        })
        .any(|outputs| outputs.iter().any(|output| output == field_name))
}

/// Output names under the first truthy output key, if any.
fn output_names(func: &Mapping) -> Option<Vec<String>> {
    OUTPUT_FIELD_KEYS
        .iter()
        .filter_map(|(key, _)| func.get(*key))
        .find(|value| is_truthy(value))
        .and_then(name_list)
}

/// Checks one function definition. Stops at the first problem.
pub struct FunctionValidator<'a> {
    field_types: &'a FieldTypes,
    field_definitions: HashMap<&'a str, &'a Value>,
}

impl<'a> FunctionValidator<'a> {
    /// `field_definitions` are the raw field entries, consulted for analyzer flags.
    pub fn new(field_types: &'a FieldTypes, field_definitions: &'a [Value]) -> Self {
        let field_definitions = field_definitions
            .iter()
            .filter_map(|field| {
                field
                    .get("name")
                    .and_then(Value::as_str)
                    .map(|name| (name, field))
            })
            .collect();
        FunctionValidator {
            field_types,
            field_definitions,
        }
    }

    pub fn validate(&self, func_def: &Value) -> Result<()> {
        let func = func_def.as_object().ok_or_else(|| {
            SchemaError::conversion(format!(
                "Function definition must be a mapping, got {}",
                value_kind(func_def)
            ))
        })?;

        let (_, raw_type) = first_alias(func, FUNCTION_TYPE_KEYS)
            .ok_or_else(|| SchemaError::conversion("Function definition missing required 'type'"))?;
        let function_type = raw_type
            .as_str()
            .and_then(FunctionType::normalize)
            .ok_or_else(|| {
                SchemaError::conversion(format!(
                    "Unsupported function type '{}'. Supported types: {}",
                    display_value(raw_type),
                    python_list(FunctionType::supported_names())
                ))
            })?;

        let inputs = self.validate_input_fields(func)?;
        self.validate_output_fields(func)?;

        match function_type {
            FunctionType::TextEmbedding => validate_text_embedding_params(func),
            FunctionType::Bm25 => self.validate_bm25_params(func, &inputs),
            FunctionType::Rerank => Ok(()),
        }
    }

    fn validate_input_fields(&self, func: &Mapping) -> Result<Vec<String>> {
        let (_, value) = first_alias(func, INPUT_FIELD_KEYS).ok_or_else(|| {
            SchemaError::conversion(
                "Function definition missing input field specification. Use \
                 'input_field_names', 'input_fields', 'fields', 'input_field', or 'field'.",
            )
        })?;
        let inputs = name_list(value).ok_or_else(|| {
            SchemaError::conversion(format!(
                "Input fields must be a string or list, got {}",
                value_kind(value)
            ))
        })?;

        for field_name in &inputs {
            let field_type = self.field_types.get(field_name).ok_or_else(|| {
                SchemaError::conversion(format!(
                    "Function input field '{}' does not exist in schema",
                    field_name
                ))
            })?;
            if !FUNCTION_INPUT_TYPES.contains(&field_type) {
                return Err(SchemaError::conversion(format!(
                    "Function input field '{}' has incompatible type '{}'. Functions can only \
                     operate on 'varchar' or 'json' fields.",
                    field_name, field_type
                )));
            }
        }
        Ok(inputs)
    }

    fn validate_output_fields(&self, func: &Mapping) -> Result<()> {
        let (_, value) = first_alias(func, OUTPUT_FIELD_KEYS).ok_or_else(|| {
            SchemaError::conversion(
                "Function definition missing output field specification. \
                 Use 'output_field_names' or 'output_field'.",
            )
        })?;
        let outputs = match value {
            Value::String(name) => vec![name.clone()],
            Value::Array(items) if items.is_empty() => {
                return Err(SchemaError::conversion(
                    "Function output field list cannot be empty",
                ))
            }
            Value::Array(items) => items
                .iter()
                .map(|item| {
                    item.as_str().map(str::to_string).ok_or_else(|| {
                        SchemaError::conversion("All function output fields must be strings")
                    })
                })
                .collect::<Result<Vec<_>>>()?,
            other => {
                return Err(SchemaError::conversion(format!(
                    "Function output field must be a string or list, got {}",
                    value_kind(other)
                )))
            }
        };

        for field_name in &outputs {
            if !self.field_types.contains(field_name) {
                return Err(SchemaError::conversion(format!(
                    "Function output field '{}' must be an existing field",
                    field_name
                )));
            }
        }
        Ok(())
    }

    fn validate_bm25_params(&self, func: &Mapping, inputs: &[String]) -> Result<()> {
        if inputs.is_empty() {
            return Err(SchemaError::conversion(
                "BM25 function missing input field specification; set 'input_field_names' \
                 or 'input_field'.",
            ));
        }
        for field_name in inputs {
            let analyzer_enabled = self
                .field_definitions
                .get(field_name.as_str())
                .and_then(|field| field.get("enable_analyzer"))
                .and_then(Value::as_bool)
                .unwrap_or(false);
            if !analyzer_enabled {
                return Err(SchemaError::conversion(format!(
                    "BM25 function input field '{}' requires enable_analyzer: true",
                    field_name
                )));
            }
        }

        let Some(params) = func.get("params") else {
            return Ok(());
        };
        let params = params
            .as_object()
            .ok_or_else(|| SchemaError::conversion("BM25 function 'params' must be a dictionary"))?;
        for (param_name, param_value) in params {
            if !BM25_PARAMS.contains(&param_name.as_str()) {
                return Err(SchemaError::conversion(format!(
                    "BM25 function has invalid parameter '{}'. Valid parameters: {}",
                    param_name,
                    python_list(BM25_PARAMS.iter())
                )));
            }
            let value = param_value.as_f64().ok_or_else(|| {
                SchemaError::conversion(format!(
                    "BM25 parameter '{}' must be a number, got {}",
                    param_name,
                    value_kind(param_value)
                ))
            })?;
            if value <= 0.0 {
                return Err(SchemaError::conversion(format!(
                    "BM25 parameter '{}' must be positive, got {}",
                    param_name,
                    display_value(param_value)
                )));
            }
        }
        Ok(())
    }

    /// Cross-checks function outputs against the indexes declared on them.
    ///
    /// Missing indexes are warnings. A BM25 output indexed with anything other
    /// than `SPARSE_INVERTED_INDEX` is an error. Index types are compared as
    /// given, so callers resolve implicit types before calling this.
    pub fn validate_function_index_relationships(
        &self,
        functions: &[Value],
        indexes: &[Value],
    ) -> Vec<ValidationMessage> {
        let mut messages = Vec::new();
        for func in functions {
            let Some(outputs) = func.as_object().and_then(output_names) else {
                continue;
            };
            let is_bm25 = function_type_of(func) == Some(FunctionType::Bm25);

            for field_name in &outputs {
                let field_indexes: Vec<&Value> = indexes
                    .iter()
                    .filter(|index| {
                        index.get("field").and_then(Value::as_str) == Some(field_name.as_str())
                    })
                    .collect();

                if field_indexes.is_empty() {
                    messages.push(ValidationMessage::warning(if is_bm25 {
                        format!(
                            "BM25 function output field '{}' has no index. A BM25 output field \
                             requires SPARSE_INVERTED_INDEX for optimal performance.",
                            field_name
                        )
                    } else {
                        format!(
                            "Function output field '{}' has no index. Consider adding an \
                             appropriate index for query performance.",
                            field_name
                        )
                    }));
                    continue;
                }

                if !is_bm25 {
                    continue;
                }
                for index in field_indexes {
                    let index_type = declared_index_type(index).unwrap_or_default();
                    if index_type != "SPARSE_INVERTED_INDEX" {
                        messages.push(ValidationMessage::error(format!(
                            "BM25 function output field '{}' uses '{}' index. BM25 functions \
                             require SPARSE_INVERTED_INDEX.",
                            field_name, index_type
                        )));
                    }
                }
            }
        }
        messages
    }
}

fn validate_text_embedding_params(func: &Mapping) -> Result<()> {
    let params = func.get("params").ok_or_else(|| {
        SchemaError::conversion("TEXT_EMBEDDING function missing required 'params' section")
    })?;
    let params = params.as_object().ok_or_else(|| {
        SchemaError::conversion("TEXT_EMBEDDING function 'params' must be a dictionary")
    })?;
    let model = params.get("model").ok_or_else(|| {
        SchemaError::conversion("TEXT_EMBEDDING function missing required 'model' parameter")
    })?;
    match model.as_str() {
        Some(model) if !model.trim().is_empty() => Ok(()),
        _ => Err(SchemaError::conversion(
            "TEXT_EMBEDDING function 'model' must be a non-empty string",
        )),
    }
}
