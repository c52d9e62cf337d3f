use serde_json::Value;
use tracing::{debug, instrument};

use crate::compat::{
    version_at_least, version_at_most, version_eq, EngineCompat, Version, ENGINE_SDK_NAME,
};
use crate::document::{display_value, value_kind, FieldTypes, SchemaDocument};
use crate::error::{Result, SchemaError};
use crate::registry::TypeRegistry;
use crate::result::ValidationResult;
use crate::validators::field::FieldValidator;
use crate::validators::function::{is_bm25_function_output_field, FunctionValidator};
use crate::validators::index::{declared_index_type, IndexValidator};

pub const AUTOINDEX_KEYS: &[&str] = &["autoindex", "enable_autoindex", "use_autoindex"];

const REQUIREMENT_KEYS: &[&str] = &[
    "min_version",
    "max_version",
    "version",
    "require",
    "exact_version",
];
const EXACT_VERSION_KEYS: &[&str] = &["version", "require", "exact_version"];

/// What a validation pass learned about the document, handed to the builder so
/// it does not have to derive it again.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchemaValidationContext {
    pub field_types: FieldTypes,
    /// Field definitions that passed validation, in document order.
    pub fields: Vec<Value>,
}

/// Resolves the autoindex switch.
///
/// The three key spellings may appear at the top level or under `settings`,
/// but only one of the six locations may be set. Null counts as unset.
pub fn resolve_autoindex_flag(document: &SchemaDocument) -> Result<bool> {
    let top_level = AUTOINDEX_KEYS
        .iter()
        .map(|key| (key.to_string(), document.get(key)));
    let nested = AUTOINDEX_KEYS
        .iter()
        .map(|key| (format!("settings.{}", key), document.setting(key)));

    let found: Vec<(String, &Value)> = top_level
        .chain(nested)
        .filter_map(|(key, value)| match value {
            None | Some(Value::Null) => None,
            Some(value) => Some((key, value)),
        })
        .collect();

    match found.as_slice() {
        [] => Ok(false),
        [(_, Value::Bool(enabled))] => Ok(*enabled),
        [(key, value)] => Err(SchemaError::conversion(format!(
            "Invalid autoindex value '{}' (type: {}) for key '{}'. Expected boolean value \
             (true or false)",
            display_value(value),
            value_kind(value),
            key
        ))),
        _ => Err(SchemaError::conversion(format!(
            "Multiple autoindex settings found: {}. Please specify only one autoindex setting.",
            found.iter().map(|(key, _)| key.as_str()).collect::<Vec<_>>().join(", ")
        ))),
    }
}

/// Checks the document's engine SDK requirement section against the
/// installed version.
pub fn ensure_runtime_requirements(document: &SchemaDocument, compat: &EngineCompat) -> Result<()> {
    let requirements = match document.get(ENGINE_SDK_NAME) {
        None | Some(Value::Null) => return Ok(()),
        Some(Value::Object(requirements)) => requirements,
        Some(_) => {
            return Err(SchemaError::conversion(format!(
                "Schema '{}' section must be a mapping with version bounds.",
                ENGINE_SDK_NAME
            )))
        }
    };

    let mut unknown: Vec<&str> = requirements
        .keys()
        .map(String::as_str)
        .filter(|key| !REQUIREMENT_KEYS.contains(key))
        .collect();
    if !unknown.is_empty() {
        unknown.sort_unstable();
        return Err(SchemaError::conversion(format!(
            "Schema '{}' section contains unsupported keys: {}",
            ENGINE_SDK_NAME,
            unknown.join(", ")
        )));
    }

    let parse = |key: &str| -> Result<Option<Version>> {
        match requirements.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(raw)) => Version::parse(raw).map(Some).map_err(|_| {
                SchemaError::conversion(format!(
                    "Invalid version string for '{}.{}': {}",
                    ENGINE_SDK_NAME, key, raw
                ))
            }),
            Some(_) => Err(SchemaError::conversion(format!(
                "Schema '{}.{}' must be a version string",
                ENGINE_SDK_NAME, key
            ))),
        }
    };

    let min_version = parse("min_version")?;
    let max_version = parse("max_version")?;
    let mut exact_version = None;
    for key in EXACT_VERSION_KEYS {
        if let Some(version) = parse(key)? {
            exact_version = Some(version);
            break;
        }
    }

    if exact_version.is_some() && (min_version.is_some() || max_version.is_some()) {
        return Err(SchemaError::conversion(format!(
            "Schema '{}' section cannot combine 'version' with min/max bounds.",
            ENGINE_SDK_NAME
        )));
    }
    if let (Some(min), Some(max)) = (&min_version, &max_version) {
        if min > max {
            return Err(SchemaError::conversion(format!(
                "Schema '{}' min_version must be less than or equal to max_version",
                ENGINE_SDK_NAME
            )));
        }
    }

    let current = compat.version();
    let unmet = |operator: &str, requested: &Version| {
        SchemaError::conversion(format!(
            "Schema requires {}{}{}, but current version is {}.",
            ENGINE_SDK_NAME,
            operator,
            requested,
            compat.raw_version()
        ))
    };
    if let Some(exact) = &exact_version {
        if !version_eq(current, exact) {
            return Err(unmet("==", exact));
        }
    }
    if let Some(min) = &min_version {
        if !version_at_least(current, min) {
            return Err(unmet(">=", min));
        }
    }
    if let Some(max) = &max_version {
        if !version_at_most(current, max) {
            return Err(unmet("<=", max));
        }
    }
    Ok(())
}

/// Copies `indexes`, filling in types the builder would infer: BM25 outputs
/// become `SPARSE_INVERTED_INDEX` with a `BM25` metric, anything else becomes
/// `AUTOINDEX` when autoindex is on. The input is never modified.
pub fn resolve_index_types(indexes: &[Value], functions: &[Value], autoindex: bool) -> Vec<Value> {
    indexes
        .iter()
        .map(|index| {
            let mut resolved = index.clone();
            let field_name = index.get("field").and_then(Value::as_str);
            if let (Some(field_name), None, Some(entry)) = (
                field_name,
                declared_index_type(index),
                resolved.as_object_mut(),
            ) {
                if is_bm25_function_output_field(functions, field_name) {
                    entry.insert("type".into(), Value::from("SPARSE_INVERTED_INDEX"));
                    entry
                        .entry("metric")
                        .or_insert_with(|| Value::from("BM25"));
                } else if autoindex {
                    entry.insert("type".into(), Value::from("AUTOINDEX"));
                }
            }
            resolved
        })
        .collect()
}

/// Runs every per-entity validator over a document and accumulates the
/// results instead of stopping at the first failure.
pub struct SchemaValidator<'a> {
    document: &'a SchemaDocument,
    registry: TypeRegistry,
}

impl<'a> SchemaValidator<'a> {
    pub fn new(document: &'a SchemaDocument, compat: EngineCompat) -> Self {
        SchemaValidator {
            document,
            registry: TypeRegistry::new(compat),
        }
    }

    #[instrument(skip(self), fields(engine_version = %self.registry.compat().raw_version()))]
    pub fn validate(&self) -> (ValidationResult, SchemaValidationContext) {
        let mut result = ValidationResult::new();

        if let Err(e) = ensure_runtime_requirements(self.document, self.registry.compat()) {
            result.add_error(e.to_string());
        }
        let autoindex = match resolve_autoindex_flag(self.document) {
            Ok(autoindex) => autoindex,
            Err(e) => {
                result.add_error(e.to_string());
                false
            }
        };

        let field_validator = FieldValidator::new(&self.registry);
        let raw_fields = self.document.field_list();
        let mut context = SchemaValidationContext::default();
        for field_def in raw_fields {
            if let Err(e) = field_validator.validate(field_def) {
                result.add_error(e.to_string());
                continue;
            }
            if let (Some(name), Some(field_type)) = (
                field_def.get("name").and_then(Value::as_str),
                field_def.get("type").and_then(Value::as_str),
            ) {
                context.field_types.insert(name, field_type);
            }
            context.fields.push(field_def.clone());
        }
        debug!(
            declared = raw_fields.len(),
            valid = context.fields.len(),
            "Validated fields"
        );

        let indexes = self.document.index_list();
        let index_validator = IndexValidator::new(&self.registry, &context.field_types);
        for index_def in indexes {
            if let Err(e) = index_validator.validate(index_def) {
                result.add_error(e.to_string());
            }
        }
        result.extend(index_validator.get_index_warnings(context.field_types.names(), indexes));

        let functions = self.document.function_list();
        let function_validator = FunctionValidator::new(&context.field_types, raw_fields);
        for func_def in functions {
            if let Err(e) = function_validator.validate(func_def) {
                result.add_error(e.to_string());
            }
        }
        let resolved_indexes = resolve_index_types(indexes, functions, autoindex);
        result.extend(
            function_validator.validate_function_index_relationships(functions, &resolved_indexes),
        );

        debug!(
            errors = result.errors().len(),
            warnings = result.warnings().len(),
            infos = result.infos().len(),
            "Schema validation finished"
        );
        (result, context)
    }
}
