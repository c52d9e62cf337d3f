use serde_json::Value;

use crate::document::{as_positive_int, display_value, python_list, value_kind, Mapping};
use crate::error::{Result, SchemaError};
use crate::registry::{DataType, TypeRegistry};

pub const VARCHAR_LENGTH_RANGE: (i64, i64) = (1, 65535);
pub const ARRAY_CAPACITY_RANGE: (i64, i64) = (1, 4096);

const BOOLEAN_FLAGS: &[&str] = &[
    "is_primary",
    "auto_id",
    "nullable",
    "enable_match",
    "enable_analyzer",
];

fn positive_int(value: &Value, label: &str) -> Result<i64> {
    as_positive_int(value).ok_or_else(|| {
        SchemaError::conversion(format!(
            "Field '{}' must be a positive integer, got {}",
            label,
            display_value(value)
        ))
    })
}

fn validate_vector_dim(field_name: &str, dim: i64, data_type: DataType) -> Result<()> {
    if let Some((min_dim, max_dim)) = data_type.dim_range() {
        if !(min_dim..=max_dim).contains(&dim) {
            return Err(SchemaError::conversion(format!(
                "Field '{}': {} dimension {} must be between {}-{}",
                field_name,
                data_type.yaml_name(),
                dim,
                min_dim,
                max_dim
            )));
        }
    }
    Ok(())
}

fn validate_varchar_length(field_name: &str, max_length: i64) -> Result<()> {
    let (min_len, max_len) = VARCHAR_LENGTH_RANGE;
    if !(min_len..=max_len).contains(&max_length) {
        return Err(SchemaError::conversion(format!(
            "VARCHAR field '{}' max_length {} must be between {}-{}",
            field_name, max_length, min_len, max_len
        )));
    }
    Ok(())
}

fn validate_array_capacity(field_name: &str, max_capacity: i64) -> Result<()> {
    let (min_cap, max_cap) = ARRAY_CAPACITY_RANGE;
    if !(min_cap..=max_cap).contains(&max_capacity) {
        return Err(SchemaError::conversion(format!(
            "Array field '{}' max_capacity {} must be between {}-{}",
            field_name, max_capacity, min_cap, max_cap
        )));
    }
    Ok(())
}

/// Checks a single field definition. Stops at the first problem.
#[derive(Debug, Clone, Copy)]
pub struct FieldValidator<'a> {
    registry: &'a TypeRegistry,
}

impl<'a> FieldValidator<'a> {
    pub fn new(registry: &'a TypeRegistry) -> Self {
        FieldValidator { registry }
    }

    pub fn validate(&self, field_def: &Value) -> Result<()> {
        let field = field_def.as_object().ok_or_else(|| {
            SchemaError::conversion(format!(
                "Field definition must be a mapping, got {}",
                value_kind(field_def)
            ))
        })?;

        let name = match field.get("name") {
            None | Some(Value::Null) => {
                return Err(SchemaError::conversion(
                    "Field missing required 'name' attribute",
                ))
            }
            Some(name) => name,
        };
        let field_type = match field.get("type") {
            None | Some(Value::Null) => {
                return Err(SchemaError::conversion(format!(
                    "Field '{}' missing required 'type' attribute",
                    display_value(name)
                )))
            }
            Some(field_type) => field_type,
        };

        let name = name.as_str().ok_or_else(|| {
            SchemaError::conversion(format!(
                "Field name must be a string, got {}",
                value_kind(name)
            ))
        })?;
        validate_field_name(name)?;

        let data_type = self.resolve_type(field_type, name)?;
        self.validate_type_params(field, data_type, name)?;

        for flag in BOOLEAN_FLAGS {
            if let Some(value) = field.get(*flag) {
                if !value.is_boolean() {
                    return Err(SchemaError::conversion(format!(
                        "Field '{}': '{}' must be a boolean value",
                        name, flag
                    )));
                }
            }
        }
        Ok(())
    }

    fn resolve_type(&self, field_type: &Value, field_name: &str) -> Result<DataType> {
        let type_name = field_type.as_str().ok_or_else(|| {
            SchemaError::unsupported_type(format!(
                "Field '{}' type must be a string, got {}",
                field_name,
                value_kind(field_type)
            ))
        })?;
        if let Some(requirement) = self.registry.missing_type_requirement(type_name) {
            return Err(SchemaError::unsupported_type(format!(
                "Field type '{}' for field '{}' requires additional support ({}). \
                 Current pymilvus version: {}.",
                type_name,
                field_name,
                requirement,
                self.registry.compat().raw_version()
            )));
        }
        self.registry.type_for(type_name).ok_or_else(|| {
            SchemaError::unsupported_type(format!(
                "Unsupported field type '{}' for field '{}'. Supported types: {}",
                type_name,
                field_name,
                python_list(self.registry.supported_type_names())
            ))
        })
    }

    fn validate_type_params(
        &self,
        field: &Mapping,
        data_type: DataType,
        field_name: &str,
    ) -> Result<()> {
        match data_type {
            DataType::VarChar => {
                let max_length = field.get("max_length").ok_or_else(|| {
                    SchemaError::conversion(format!(
                        "VARCHAR field '{}' missing required 'max_length' parameter",
                        field_name
                    ))
                })?;
                let max_length = positive_int(max_length, &format!("{}.max_length", field_name))?;
                validate_varchar_length(field_name, max_length)
            }
            data_type if data_type.is_dense_vector() => {
                let dim = field.get("dim").ok_or_else(|| {
                    SchemaError::conversion(format!(
                        "Vector field '{}' missing required 'dim' parameter",
                        field_name
                    ))
                })?;
                let dim = positive_int(dim, &format!("{}.dim", field_name))?;
                validate_vector_dim(field_name, dim, data_type)
            }
            DataType::SparseFloatVector => match field.get("dim") {
                Some(dim) => positive_int(dim, &format!("{}.dim", field_name)).map(|_| ()),
                None => Ok(()),
            },
            DataType::Array => self.validate_array_params(field, field_name),
            _ => Ok(()),
        }
    }

    fn validate_array_params(&self, field: &Mapping, field_name: &str) -> Result<()> {
        let element_type = field.get("element_type").ok_or_else(|| {
            SchemaError::conversion(format!(
                "Array field '{}' missing required 'element_type' parameter",
                field_name
            ))
        })?;
        let max_capacity = field.get("max_capacity").ok_or_else(|| {
            SchemaError::conversion(format!(
                "Array field '{}' missing required 'max_capacity' parameter",
                field_name
            ))
        })?;

        let element_type = element_type
            .as_str()
            .and_then(|name| self.registry.type_for(name))
            .ok_or_else(|| {
                SchemaError::unsupported_type(format!(
                    "Unsupported array element type '{}' for field '{}'",
                    display_value(element_type),
                    field_name
                ))
            })?;

        let max_capacity = positive_int(max_capacity, &format!("{}.max_capacity", field_name))?;
        validate_array_capacity(field_name, max_capacity)?;

        if element_type == DataType::VarChar {
            if let Some(max_length) = field.get("max_length") {
                let max_length = positive_int(max_length, &format!("{}.max_length", field_name))?;
                validate_varchar_length(field_name, max_length)?;
            }
        }
        Ok(())
    }
}

/// Letters, digits, underscores and hyphens, not starting with an underscore.
pub fn validate_field_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(SchemaError::conversion("Field name cannot be empty"));
    }
    let allowed = name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '_' || c == '-');
    let has_alnum = name.chars().any(char::is_alphanumeric);
    if !allowed || !has_alnum {
        return Err(SchemaError::conversion(format!(
            "Field name '{}' contains invalid characters. Only alphanumeric characters, \
             underscores, and hyphens are allowed.",
            name
        )));
    }
    if name.starts_with('_') {
        return Err(SchemaError::conversion(format!(
            "Field name '{}' cannot start with underscore (reserved for system fields)",
            name
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compat::EngineCompat;
    use serde_json::json;

    fn check(field: Value) -> Result<()> {
        let registry = TypeRegistry::default();
        FieldValidator::new(&registry).validate(&field)
    }

    fn message(field: Value) -> String {
        check(field).unwrap_err().to_string()
    }

    #[test]
    fn test_valid_fields() {
        check(json!({"name": "id", "type": "int64", "is_primary": true})).unwrap();
        check(json!({"name": "title", "type": "varchar", "max_length": 512})).unwrap();
        check(json!({"name": "vec", "type": "float_vector", "dim": 768})).unwrap();
        check(json!({"name": "bits", "type": "binary_vector", "dim": 262144})).unwrap();
        check(json!({"name": "sparse", "type": "sparse_float_vector"})).unwrap();
        check(json!({"name": "sparse", "type": "sparse_float_vector", "dim": 30000})).unwrap();
        check(json!({"name": "meta-data", "type": "json", "nullable": true})).unwrap();
        check(json!({
            "name": "tags",
            "type": "array",
            "element_type": "varchar",
            "max_capacity": 16,
            "max_length": 64,
        }))
        .unwrap();
    }

    #[test]
    fn test_missing_attributes() {
        assert_eq!(
            message(json!({"type": "int64"})),
            "Field missing required 'name' attribute"
        );
        assert_eq!(
            message(json!({"name": "x"})),
            "Field 'x' missing required 'type' attribute"
        );
        assert_eq!(
            message(json!({"name": "title", "type": "varchar"})),
            "VARCHAR field 'title' missing required 'max_length' parameter"
        );
        assert_eq!(
            message(json!({"name": "v", "type": "float_vector"})),
            "Vector field 'v' missing required 'dim' parameter"
        );
        assert_eq!(
            message(json!({"name": "a", "type": "array", "max_capacity": 4})),
            "Array field 'a' missing required 'element_type' parameter"
        );
        assert_eq!(
            message(json!({"name": "a", "type": "array", "element_type": "int64"})),
            "Array field 'a' missing required 'max_capacity' parameter"
        );
    }

    #[test]
    fn test_name_format() {
        assert!(message(json!({"name": "bad name", "type": "int64"}))
            .contains("contains invalid characters"));
        assert!(message(json!({"name": "_id", "type": "int64"}))
            .contains("cannot start with underscore"));
        assert!(message(json!({"name": "___", "type": "int64"}))
            .contains("contains invalid characters"));
        assert_eq!(
            message(json!({"name": "", "type": "int64"})),
            "Field name cannot be empty"
        );
    }

    #[test]
    fn test_unsupported_types_are_distinguishable() {
        let err = check(json!({"name": "x", "type": "text"})).unwrap_err();
        assert!(err.is_unsupported_type());
        assert!(err
            .to_string()
            .starts_with("Unsupported field type 'text' for field 'x'. Supported types: ['array'"));

        let err = check(json!({
            "name": "a", "type": "array", "element_type": "text", "max_capacity": 4
        }))
        .unwrap_err();
        assert!(err.is_unsupported_type());
        assert_eq!(
            err.to_string(),
            "Unsupported array element type 'text' for field 'a'"
        );

        let err = check(json!({"name": "v", "type": "float_vector", "dim": 0})).unwrap_err();
        assert!(!err.is_unsupported_type());
    }

    #[test]
    fn test_gated_type_reports_requirement() {
        let registry = TypeRegistry::new(EngineCompat::new("2.5.4").unwrap());
        let err = FieldValidator::new(&registry)
            .validate(&json!({"name": "h", "type": "float16_vector", "dim": 8}))
            .unwrap_err();
        assert!(err.is_unsupported_type());
        assert!(err.to_string().contains("Requires pymilvus>=2.6.0"));

        let registry = TypeRegistry::new(EngineCompat::new("2.6.0").unwrap());
        FieldValidator::new(&registry)
            .validate(&json!({"name": "h", "type": "float16_vector", "dim": 8}))
            .unwrap();
    }

    #[test]
    fn test_bounds() {
        assert_eq!(
            message(json!({"name": "v", "type": "float_vector", "dim": 40000})),
            "Field 'v': float_vector dimension 40000 must be between 1-32768"
        );
        assert_eq!(
            message(json!({"name": "t", "type": "varchar", "max_length": 70000})),
            "VARCHAR field 't' max_length 70000 must be between 1-65535"
        );
        assert_eq!(
            message(json!({
                "name": "a", "type": "array", "element_type": "int64", "max_capacity": 10000
            })),
            "Array field 'a' max_capacity 10000 must be between 1-4096"
        );
        assert_eq!(
            message(json!({"name": "v", "type": "float_vector", "dim": "128"})),
            "Field 'v.dim' must be a positive integer, got 128"
        );
        assert_eq!(
            message(json!({"name": "v", "type": "float_vector", "dim": -3})),
            "Field 'v.dim' must be a positive integer, got -3"
        );
        assert_eq!(
            message(json!({"name": "s", "type": "sparse_float_vector", "dim": "wide"})),
            "Field 's.dim' must be a positive integer, got wide"
        );
    }

    #[test]
    fn test_boolean_flags() {
        assert_eq!(
            message(json!({"name": "id", "type": "int64", "nullable": "yes"})),
            "Field 'id': 'nullable' must be a boolean value"
        );
        assert_eq!(
            message(json!({"name": "id", "type": "int64", "is_primary": 1})),
            "Field 'id': 'is_primary' must be a boolean value"
        );
        assert_eq!(
            message(json!({"name": "t", "type": "varchar", "max_length": 8, "enable_analyzer": "on"})),
            "Field 't': 'enable_analyzer' must be a boolean value"
        );
    }
}
