use serde_json::Value;

use crate::builders::schema::BuildContext;
use crate::descriptor::Function;
use crate::document::{
    first_alias, name_list, Mapping, FUNCTION_TYPE_KEYS, INPUT_FIELD_KEYS, OUTPUT_FIELD_KEYS,
};
use crate::error::{Result, SchemaError};
use crate::validators::{function_type_of, resolve_index_types, FunctionValidator};

/// Turns function definitions into [`Function`] descriptors.
#[derive(Debug, Default, Clone, Copy)]
pub struct FunctionBuilder;

impl FunctionBuilder {
    fn validator<'a>(&self, context: &'a BuildContext) -> FunctionValidator<'a> {
        FunctionValidator::new(context.field_types(), context.document().field_list())
    }

    pub fn validate_function(&self, context: &BuildContext, func_def: &Value) -> Result<()> {
        self.validator(context).validate(func_def)
    }

    /// Validates every definition, then rewrites alias keys to their canonical
    /// spellings and builds the descriptors.
    pub fn get_milvus_function_objects(&self, context: &BuildContext) -> Result<Vec<Function>> {
        let functions = context.document().function_list();
        for func_def in functions {
            self.validate_function(context, func_def)?;
        }
        functions
            .iter()
            .map(|func_def| normalize_function(func_def))
            .collect()
    }

    /// Relationship messages computed over a copy of the indexes in which
    /// missing types have been inferred the same way the index builder does.
    pub fn get_function_index_warnings(&self, context: &BuildContext) -> Vec<String> {
        let functions = context.document().function_list();
        let resolved = resolve_index_types(
            context.document().index_list(),
            functions,
            context.autoindex(),
        );
        self.validator(context)
            .validate_function_index_relationships(functions, &resolved)
            .iter()
            .map(|message| message.as_prefixed())
            .collect()
    }
}

fn canonical_names(func: &Mapping, table: &[(&'static str, &'static str)]) -> Vec<String> {
    first_alias(func, table)
        .and_then(|(_, value)| name_list(value))
        .unwrap_or_default()
}

fn normalize_function(func_def: &Value) -> Result<Function> {
    let func = func_def
        .as_object()
        .ok_or_else(|| SchemaError::conversion("Function definition must be a mapping"))?;
    let function_type = function_type_of(func_def).ok_or_else(|| {
        let raw = first_alias(func, FUNCTION_TYPE_KEYS)
            .map(|(_, value)| value.to_string())
            .unwrap_or_default();
        SchemaError::conversion(format!("Unsupported function type {}", raw))
    })?;

    let name = func.get("name").and_then(Value::as_str).unwrap_or_default();
    let description = func
        .get("description")
        .and_then(Value::as_str)
        .unwrap_or_default();
    let params = func
        .get("params")
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();

    Function::new(
        name,
        function_type,
        canonical_names(func, INPUT_FIELD_KEYS),
        canonical_names(func, OUTPUT_FIELD_KEYS),
        description,
        params,
    )
    .map_err(|e| SchemaError::conversion(format!("Failed to create Function: {}", e)))
}
