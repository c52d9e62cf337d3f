use std::collections::HashSet;

use serde_json::Value;

use crate::document::{display_value, python_list, value_kind, FieldTypes, Mapping};
use crate::error::{Result, SchemaError};
use crate::registry::{required_index_params, TypeRegistry};
use crate::result::ValidationMessage;

const IVF_INDEXES: &[&str] = &["IVF_FLAT", "IVF_SQ8", "IVF_PQ"];
const HNSW_MAX_M: i64 = 100;
const IVF_MAX_NLIST: i64 = 65536;

/// Index type of a definition, uppercased. `None` when absent, null or empty.
pub fn declared_index_type(index_def: &Value) -> Option<String> {
    index_def
        .get("type")
        .and_then(Value::as_str)
        .filter(|index_type| !index_type.is_empty())
        .map(str::to_uppercase)
}

/// Checks one index definition against the fields that passed validation.
pub struct IndexValidator<'a> {
    registry: &'a TypeRegistry,
    field_types: &'a FieldTypes,
}

impl<'a> IndexValidator<'a> {
    pub fn new(registry: &'a TypeRegistry, field_types: &'a FieldTypes) -> Self {
        IndexValidator {
            registry,
            field_types,
        }
    }

    pub fn validate(&self, index_def: &Value) -> Result<()> {
        let index = index_def.as_object().ok_or_else(|| {
            SchemaError::conversion(format!(
                "Index definition must be a mapping, got {}",
                value_kind(index_def)
            ))
        })?;

        let field_name = index
            .get("field")
            .ok_or_else(|| SchemaError::conversion("Index definition missing required 'field'"))?;
        let field_type = field_name
            .as_str()
            .and_then(|name| self.field_types.get(name))
            .ok_or_else(|| {
                SchemaError::conversion(format!(
                    "Index refers to unknown field '{}'",
                    display_value(field_name)
                ))
            })?;
        let field_name = display_value(field_name);

        let index_type = match index.get("type") {
            None | Some(Value::Null) => None,
            Some(Value::String(raw)) if raw.is_empty() => None,
            Some(Value::String(raw)) => {
                let index_type = raw.to_uppercase();
                self.validate_index_type(raw, &index_type, field_type, &field_name)?;
                Some(index_type)
            }
            Some(other) => {
                return Err(SchemaError::conversion(format!(
                    "Index type for field '{}' must be a string, got {}",
                    field_name,
                    value_kind(other)
                )))
            }
        };

        if let Some(metric) = index.get("metric") {
            self.validate_metric(metric, field_type, &field_name, index_type.as_deref())?;
        }

        let empty = Mapping::new();
        let params = match index.get("params") {
            None | Some(Value::Null) => &empty,
            Some(Value::Object(params)) => params,
            Some(other) => {
                return Err(SchemaError::conversion(format!(
                    "Index params for field '{}' must be a dictionary, got {}",
                    field_name,
                    value_kind(other)
                )))
            }
        };
        self.validate_index_params(params, index_type.as_deref().unwrap_or(""), &field_name)
    }

    fn validate_index_type(
        &self,
        raw: &str,
        index_type: &str,
        field_type: &str,
        field_name: &str,
    ) -> Result<()> {
        // An unavailable field type outranks anything wrong with the index.
        if let Some(requirement) = self.registry.missing_type_requirement(field_type) {
            return Err(SchemaError::conversion(format!(
                "Field type '{}' requires additional support ({}).",
                field_type, requirement
            )));
        }

        if let Some(requirement) = self.registry.missing_index_requirement(index_type) {
            return Err(SchemaError::conversion(format!(
                "Index type '{}' requires additional support ({}). Current pymilvus version: {}.",
                raw,
                requirement,
                self.registry.compat().raw_version()
            )));
        }

        let valid_types = self.registry.valid_index_types(field_type);
        if !valid_types.contains(index_type) {
            let suggestion = self
                .registry
                .recommended_index_type(field_type)
                .map(|recommended| format!(" Recommended: {}", recommended))
                .unwrap_or_default();
            return Err(SchemaError::conversion(format!(
                "Index type '{}' is not valid for {} field '{}'. Valid types: {}{}. \
                 Fix: Use one of the valid index types listed above.",
                raw,
                field_type,
                field_name,
                python_list(valid_types),
                suggestion
            )));
        }
        Ok(())
    }

    fn validate_metric(
        &self,
        metric: &Value,
        field_type: &str,
        field_name: &str,
        index_type: Option<&str>,
    ) -> Result<()> {
        let raw = metric.as_str().ok_or_else(|| {
            SchemaError::conversion(format!(
                "Metric for field '{}' must be a string, got {}",
                field_name,
                value_kind(metric)
            ))
        })?;
        let metric = raw.to_uppercase();

        if let Some(index_type) = index_type {
            if self.registry.is_gpu_index(index_type) && metric == "COSINE" {
                return Err(SchemaError::conversion(format!(
                    "Metric 'COSINE' is not supported for GPU index '{}' on field '{}'. \
                     Use L2 or IP after normalizing vectors.",
                    index_type, field_name
                )));
            }
        }

        if let Some(allowed) = self.registry.metrics_for(field_type) {
            if !allowed.contains(&metric.as_str()) {
                return Err(SchemaError::conversion(format!(
                    "Invalid metric '{}' for {} field '{}'. Allowed: {}",
                    raw,
                    field_type,
                    field_name,
                    python_list(allowed.iter())
                )));
            }
        }
        Ok(())
    }

    fn validate_index_params(
        &self,
        params: &Mapping,
        index_type: &str,
        field_name: &str,
    ) -> Result<()> {
        let missing: Vec<_> = required_index_params(index_type)
            .iter()
            .filter(|param| !params.contains_key(**param))
            .collect();
        if !missing.is_empty() {
            return Err(SchemaError::conversion(format!(
                "Index '{}' for field '{}' missing required parameters: {}",
                index_type,
                field_name,
                python_list(missing)
            )));
        }

        for (param_name, param_value) in params {
            validate_index_param(param_name, param_value, index_type, field_name)?;
        }
        Ok(())
    }

    /// Advisory messages: unindexed vector fields get a warning, and indexes that
    /// differ from the recommended type for their field get an info.
    pub fn get_index_warnings<'f>(
        &self,
        field_names: impl IntoIterator<Item = &'f str>,
        indexes: &[Value],
    ) -> Vec<ValidationMessage> {
        let mut messages = Vec::new();
        let indexed: HashSet<&str> = indexes
            .iter()
            .filter_map(|index| index.get("field").and_then(Value::as_str))
            .collect();

        for field_name in field_names {
            let Some(field_type) = self.field_types.get(field_name) else {
                continue;
            };
            if self.registry.is_vector_type(field_type) && !indexed.contains(field_name) {
                messages.push(ValidationMessage::warning(format!(
                    "Vector field '{}' of type {} has no index defined. This will result in \
                     slow queries. Consider adding an index.",
                    field_name, field_type
                )));
            }
        }

        for index in indexes {
            let Some(field_name) = index.get("field").and_then(Value::as_str) else {
                continue;
            };
            let (Some(field_type), Some(index_type)) =
                (self.field_types.get(field_name), declared_index_type(index))
            else {
                continue;
            };
            if let Some(recommended) = self.registry.recommended_index_type(field_type) {
                if index_type != recommended {
                    messages.push(ValidationMessage::info(format!(
                        "Field '{}' uses '{}' index. Consider '{}' for better performance on \
                         {} fields.",
                        field_name, index_type, recommended, field_type
                    )));
                }
            }
        }
        messages
    }
}

fn validate_index_param(
    param_name: &str,
    param_value: &Value,
    index_type: &str,
    field_name: &str,
) -> Result<()> {
    let positive = param_value.as_i64().filter(|n| *n > 0);
    if index_type == "HNSW" && (param_name == "M" || param_name == "efConstruction") {
        let value = positive.ok_or_else(|| {
            SchemaError::conversion(format!(
                "HNSW parameter '{}' for field '{}' must be a positive integer, got {}",
                param_name,
                field_name,
                display_value(param_value)
            ))
        })?;
        if param_name == "M" && value > HNSW_MAX_M {
            return Err(SchemaError::conversion(format!(
                "HNSW parameter 'M' for field '{}' is too large ({}). Recommended: 4-100",
                field_name, value
            )));
        }
    } else if IVF_INDEXES.contains(&index_type) && param_name == "nlist" {
        let value = positive.ok_or_else(|| {
            SchemaError::conversion(format!(
                "IVF parameter 'nlist' for field '{}' must be a positive integer, got {}",
                field_name,
                display_value(param_value)
            ))
        })?;
        if value > IVF_MAX_NLIST {
            return Err(SchemaError::conversion(format!(
                "IVF parameter 'nlist' for field '{}' is too large ({}). Recommended: 100-10000",
                field_name, value
            )));
        }
    }

    if index_type == "IVF_PQ" && param_name == "m" && positive.is_none() {
        return Err(SchemaError::conversion(format!(
            "PQ parameter 'm' for field '{}' must be a positive integer, got {}",
            field_name,
            display_value(param_value)
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compat::EngineCompat;
    use crate::result::Severity;
    use serde_json::json;

    fn field_types() -> FieldTypes {
        let mut field_types = FieldTypes::default();
        field_types.insert("id", "int64");
        field_types.insert("v", "float_vector");
        field_types.insert("bits", "binary_vector");
        field_types.insert("sparse", "sparse_float_vector");
        field_types.insert("title", "varchar");
        field_types.insert("half", "float16_vector");
        field_types
    }

    fn check_with(version: &str, index: Value) -> Result<()> {
        let registry = TypeRegistry::new(EngineCompat::new(version).unwrap());
        let field_types = field_types();
        IndexValidator::new(&registry, &field_types).validate(&index)
    }

    fn message(index: Value) -> String {
        check_with("2.6.0", index).unwrap_err().to_string()
    }

    #[test]
    fn test_valid_indexes() {
        check_with(
            "2.6.0",
            json!({"field": "v", "type": "hnsw", "metric": "cosine",
                   "params": {"M": 16, "efConstruction": 200}}),
        )
        .unwrap();
        check_with("2.6.0", json!({"field": "title", "type": "INVERTED"})).unwrap();
        check_with("2.6.0", json!({"field": "sparse", "metric": "BM25"})).unwrap();
        check_with("2.6.0", json!({"field": "v"})).unwrap();
    }

    #[test]
    fn test_field_reference() {
        assert_eq!(
            message(json!({"type": "HNSW"})),
            "Index definition missing required 'field'"
        );
        assert_eq!(
            message(json!({"field": "x", "type": "HNSW"})),
            "Index refers to unknown field 'x'"
        );
    }

    #[test]
    fn test_required_params_listed_together() {
        assert_eq!(
            message(json!({"field": "v", "type": "IVF_FLAT", "metric": "L2"})),
            "Index 'IVF_FLAT' for field 'v' missing required parameters: ['nlist']"
        );
        assert_eq!(
            message(json!({"field": "v", "type": "HNSW", "params": {}})),
            "Index 'HNSW' for field 'v' missing required parameters: ['M', 'efConstruction']"
        );
    }

    #[test]
    fn test_param_ranges() {
        assert!(message(json!({"field": "v", "type": "HNSW",
                               "params": {"M": 200, "efConstruction": 64}}))
        .contains("Recommended: 4-100"));
        assert!(message(json!({"field": "v", "type": "IVF_SQ8",
                               "params": {"nlist": 100000}}))
        .contains("Recommended: 100-10000"));
        assert_eq!(
            message(json!({"field": "v", "type": "IVF_PQ", "params": {"nlist": 128, "m": 0}})),
            "PQ parameter 'm' for field 'v' must be a positive integer, got 0"
        );
        assert_eq!(
            message(json!({"field": "v", "type": "HNSW",
                           "params": {"M": 8, "efConstruction": 1.5}})),
            "HNSW parameter 'efConstruction' for field 'v' must be a positive integer, got 1.5"
        );
    }

    #[test]
    fn test_index_type_compatibility() {
        let msg = message(json!({"field": "title", "type": "HNSW"}));
        assert!(msg.starts_with(
            "Index type 'HNSW' is not valid for varchar field 'title'. \
             Valid types: ['BITMAP', 'INVERTED', 'TRIE'] Recommended: INVERTED."
        ));
        let msg = message(json!({"field": "v", "type": "STL_SORT"}));
        assert!(msg.contains("Valid types: ['AUTOINDEX', 'DISKANN', 'FLAT'"));
        assert!(!msg.contains("Recommended"));
    }

    #[test]
    fn test_metrics() {
        assert_eq!(
            message(json!({"field": "bits", "type": "BIN_FLAT", "metric": "L2"})),
            "Invalid metric 'L2' for binary_vector field 'bits'. \
             Allowed: ['HAMMING', 'JACCARD', 'TANIMOTO']"
        );
        assert_eq!(
            message(json!({"field": "sparse", "metric": "COSINE"})),
            "Invalid metric 'COSINE' for sparse_float_vector field 'sparse'. Allowed: ['BM25', 'IP']"
        );
        assert!(message(json!({"field": "v", "type": "GPU_IVF_FLAT", "metric": "cosine"}))
            .starts_with("Metric 'COSINE' is not supported for GPU index 'GPU_IVF_FLAT'"));
    }

    #[test]
    fn test_version_gating() {
        let err = check_with("2.5.4", json!({"field": "v", "type": "GPU_CAGRA"}))
            .unwrap_err()
            .to_string();
        assert_eq!(
            err,
            "Index type 'GPU_CAGRA' requires additional support (Requires pymilvus>=2.6.0). \
             Current pymilvus version: 2.5.4."
        );
        check_with("2.6.0", json!({"field": "v", "type": "GPU_CAGRA"})).unwrap();

        let err = check_with("2.5.4", json!({"field": "half", "type": "GPU_CAGRA"}))
            .unwrap_err()
            .to_string();
        assert_eq!(
            err,
            "Field type 'float16_vector' requires additional support (Requires pymilvus>=2.6.0)."
        );
    }

    #[test]
    fn test_warnings_in_field_order() {
        let registry = TypeRegistry::default();
        let field_types = field_types();
        let validator = IndexValidator::new(&registry, &field_types);
        let indexes = vec![
            json!({"field": "v", "type": "HNSW", "params": {"M": 8, "efConstruction": 64}}),
            json!({"field": "title", "type": "trie"}),
        ];
        let messages = validator.get_index_warnings(field_types.names(), &indexes);
        let texts: Vec<_> = messages.iter().map(|m| m.as_prefixed()).collect();
        assert_eq!(texts.len(), 4);
        assert!(texts[0].starts_with("WARNING: Vector field 'bits' of type binary_vector"));
        assert!(texts[1].contains("'sparse'"));
        assert!(texts[2].contains("'half'"));
        assert_eq!(
            texts[3],
            "INFO: Field 'title' uses 'TRIE' index. Consider 'INVERTED' for better \
             performance on varchar fields."
        );
        assert_eq!(messages[3].severity, Severity::Info);
    }
}
