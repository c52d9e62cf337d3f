use serde_json::{json, Value};

use crate::builders::schema::BuildContext;
use crate::descriptor::FieldSchema;
use crate::document::{is_truthy, value_kind};
use crate::error::{Result, SchemaError};
use crate::registry::DataType;
use crate::validators::FieldValidator;

/// Turns validated field definitions into [`FieldSchema`] descriptors.
#[derive(Debug, Default, Clone, Copy)]
pub struct FieldBuilder;

impl FieldBuilder {
    pub fn validate_field_params(&self, context: &BuildContext, field_def: &Value) -> Result<()> {
        FieldValidator::new(context.registry()).validate(field_def)
    }

    /// Validates the definition, then maps it onto a descriptor. Type-specific
    /// sizes become direct attributes rather than nested params.
    pub fn build_field(&self, context: &BuildContext, field_def: &Value) -> Result<FieldSchema> {
        self.validate_field_params(context, field_def)?;

        let (Some(field), Some(name), Some(type_name)) = (
            field_def.as_object(),
            field_def.get("name").and_then(Value::as_str),
            field_def.get("type").and_then(Value::as_str),
        ) else {
            return Err(SchemaError::conversion("Field missing required 'name' attribute"));
        };
        let dtype = context.registry().type_for(type_name).ok_or_else(|| {
            SchemaError::unsupported_type(format!(
                "Unsupported field type '{}' for field '{}'",
                type_name, name
            ))
        })?;

        let mut schema = FieldSchema::new(name, dtype);
        schema.description = match field.get("description") {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(description)) => description.clone(),
            Some(other) => {
                return Err(SchemaError::conversion(format!(
                    "Failed to create FieldSchema for field '{}': description must be a string, \
                     got {}",
                    name,
                    value_kind(other)
                )))
            }
        };

        let flag = |key: &str| field.get(key).and_then(Value::as_bool);
        let int = |key: &str| field.get(key).and_then(Value::as_i64);

        if flag("is_primary").unwrap_or(false) {
            schema.is_primary = true;
            schema.auto_id = flag("auto_id").unwrap_or(false);
        }

        match dtype {
            DataType::VarChar => schema.max_length = int("max_length"),
            DataType::Array => {
                schema.element_type = field
                    .get("element_type")
                    .and_then(Value::as_str)
                    .and_then(|element| context.registry().type_for(element));
                schema.max_capacity = int("max_capacity");
                if schema.element_type == Some(DataType::VarChar) {
                    schema.max_length = int("max_length");
                }
            }
            dtype if dtype.is_vector() => schema.dim = int("dim"),
            _ => {}
        }

        schema.enable_analyzer = flag("enable_analyzer");
        schema.enable_match = flag("enable_match");
        if schema.enable_analyzer == Some(true) {
            schema.analyzer_params = Some(
                field
                    .get("analyzer_params")
                    .filter(|params| is_truthy(params))
                    .cloned()
                    .unwrap_or_else(|| json!({"type": "english"})),
            );
        }
        schema.multi_analyzer_params = field.get("multi_analyzer_params").cloned();
        schema.nullable = flag("nullable");

        Ok(schema)
    }
}
