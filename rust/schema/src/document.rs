use std::collections::HashMap;
use std::fmt::Display;
use std::sync::LazyLock;

use itertools::Itertools;
use regex::Regex;
use serde_json::{Map, Value};

use crate::error::{Result, SchemaError};

pub type Mapping = Map<String, Value>;

static NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z][a-zA-Z0-9_]*$").expect("The collection name regex should be valid")
});

/// Keys that may name a function's input fields, in priority order. The first
/// key present wins and is rewritten to the canonical key.
pub const INPUT_FIELD_KEYS: &[(&str, &str)] = &[
    ("input_field_names", "input_field_names"),
    ("input_fields", "input_field_names"),
    ("fields", "input_field_names"),
    ("input_field", "input_field_names"),
    ("field", "input_field_names"),
];

pub const OUTPUT_FIELD_KEYS: &[(&str, &str)] = &[
    ("output_field_names", "output_field_names"),
    ("output_field", "output_field_names"),
];

pub const FUNCTION_TYPE_KEYS: &[(&str, &str)] =
    &[("function_type", "function_type"), ("type", "function_type")];

/// Output spellings consulted when deciding whether a field is fed by BM25.
pub const BM25_OUTPUT_KEYS: &[&str] = &["output_field", "output_field_names", "output_fields"];

/// Short kind name used in error messages.
pub fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "int",
        Value::String(_) => "str",
        Value::Array(_) => "list",
        Value::Object(_) => "dict",
    }
}

/// Renders a value for a message. Strings are shown without quotes.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Formats items as `['a', 'b']`.
pub fn python_list<T: Display>(items: impl IntoIterator<Item = T>) -> String {
    format!("[{}]", items.into_iter().map(|item| format!("'{}'", item)).join(", "))
}

/// A value that is present and not YAML `null`, `false`, `0`, or empty.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

/// Positive integers only. Floats and booleans never qualify.
pub fn as_positive_int(value: &Value) -> Option<i64> {
    value.as_i64().filter(|n| *n > 0)
}

/// The first key of `table` present in `mapping`, with its value.
pub fn first_alias<'a>(
    mapping: &'a Mapping,
    table: &[(&'static str, &'static str)],
) -> Option<(&'static str, &'a Value)> {
    table
        .iter()
        .find_map(|(key, _)| mapping.get(*key).map(|value| (*key, value)))
}

/// A single name or a list of names. Non-string list entries are rendered for
/// messages rather than dropped.
pub fn name_list(value: &Value) -> Option<Vec<String>> {
    match value {
        Value::String(name) => Some(vec![name.clone()]),
        Value::Array(items) => Some(items.iter().map(display_value).collect()),
        _ => None,
    }
}

/// Collection and alias names: a letter followed by letters, digits or underscores.
pub fn is_valid_collection_name(name: &str) -> bool {
    !name.is_empty() && !name.starts_with('_') && NAME_RE.is_match(name)
}

/// Field name to schema type name, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldTypes {
    order: Vec<String>,
    types: HashMap<String, String>,
}

impl FieldTypes {
    /// Collects every field whose `name` and `type` are both strings.
    pub fn from_definitions(fields: &[Value]) -> Self {
        let mut field_types = FieldTypes::default();
        for field in fields {
            if let (Some(name), Some(field_type)) = (
                field.get("name").and_then(Value::as_str),
                field.get("type").and_then(Value::as_str),
            ) {
                field_types.insert(name, field_type);
            }
        }
        field_types
    }

    pub fn insert(&mut self, name: impl Into<String>, field_type: impl Into<String>) {
        let name = name.into();
        if !self.types.contains_key(&name) {
            self.order.push(name.clone());
        }
        self.types.insert(name, field_type.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.types.get(name).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.order
            .iter()
            .filter_map(|name| self.types.get(name).map(|t| (name.as_str(), t.as_str())))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }
}

/// Root mapping of a collection definition.
///
/// The strict accessors (`name`, `fields`, ...) enforce document shape and
/// return parse errors. The `*_list` accessors are lenient and hand back an
/// empty slice for anything that is absent or of the wrong kind, which is what
/// the validators want: shape problems are reported once, by the loader.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaDocument {
    root: Mapping,
}

impl TryFrom<Value> for SchemaDocument {
    type Error = SchemaError;

    fn try_from(value: Value) -> Result<Self> {
        match value {
            Value::Object(root) => Ok(SchemaDocument { root }),
            Value::Null => Err(SchemaError::parse("Empty schema file")),
            other => Err(SchemaError::parse(format!(
                "Schema must be a dictionary, got {}",
                value_kind(&other)
            ))),
        }
    }
}

impl From<Mapping> for SchemaDocument {
    fn from(root: Mapping) -> Self {
        SchemaDocument { root }
    }
}

impl SchemaDocument {
    /// Decodes YAML text into a document without touching the filesystem.
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        let value: Value = serde_yml::from_str(text)
            .map_err(|e| SchemaError::parse(format!("YAML parsing failed: {}", e)))?;
        SchemaDocument::try_from(value)
    }

    pub fn as_mapping(&self) -> &Mapping {
        &self.root
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.root.clone())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.root.get(key)
    }

    pub fn name(&self) -> Result<&str> {
        let name = self
            .root
            .get("name")
            .ok_or_else(|| SchemaError::parse("Schema missing required 'name' field"))?;
        let name = name.as_str().ok_or_else(|| {
            SchemaError::parse(format!(
                "Collection name must be a string, got {}",
                value_kind(name)
            ))
        })?;
        if name.is_empty() {
            return Err(SchemaError::parse("Collection name cannot be empty"));
        }
        if name.starts_with('_') {
            return Err(SchemaError::parse(format!(
                "Collection name '{}' cannot start with an underscore",
                name
            )));
        }
        if !is_valid_collection_name(name) {
            return Err(SchemaError::parse(format!(
                "Collection name '{}' is invalid. Collection name must start with a letter \
                 and contain only letters, digits, and underscores",
                name
            )));
        }
        Ok(name)
    }

    pub fn description(&self) -> Result<&str> {
        match self.root.get("description") {
            None | Some(Value::Null) => Ok(""),
            Some(Value::String(description)) => Ok(description),
            Some(other) => Err(SchemaError::parse(format!(
                "Description must be a string, got {}",
                value_kind(other)
            ))),
        }
    }

    pub fn alias(&self) -> Result<Option<&str>> {
        let alias = match self.root.get("alias") {
            None | Some(Value::Null) => return Ok(None),
            Some(alias) => alias,
        };
        let alias = alias.as_str().ok_or_else(|| {
            SchemaError::parse(format!(
                "Collection alias must be a string, got {}",
                value_kind(alias)
            ))
        })?;
        if alias.is_empty() {
            return Err(SchemaError::parse("Collection alias cannot be empty"));
        }
        if !is_valid_collection_name(alias) {
            return Err(SchemaError::parse(format!(
                "Collection alias '{}' is invalid. Collection alias must start with a letter \
                 and contain only letters, digits, and underscores",
                alias
            )));
        }
        Ok(Some(alias))
    }

    pub fn fields(&self) -> Result<&[Value]> {
        let fields = self
            .root
            .get("fields")
            .ok_or_else(|| SchemaError::parse("Schema missing required 'fields' field"))?;
        let fields = fields.as_array().ok_or_else(|| {
            SchemaError::parse(format!("Fields must be a list, got {}", value_kind(fields)))
        })?;
        if fields.is_empty() {
            return Err(SchemaError::parse("Schema must have at least one field"));
        }
        Ok(fields)
    }

    fn optional_list(&self, key: &str, label: &str) -> Result<&[Value]> {
        match self.root.get(key) {
            None | Some(Value::Null) => Ok(&[]),
            Some(Value::Array(items)) => Ok(items),
            Some(other) => Err(SchemaError::parse(format!(
                "{} must be a list, got {}",
                label,
                value_kind(other)
            ))),
        }
    }

    pub fn indexes(&self) -> Result<&[Value]> {
        self.optional_list("indexes", "Indexes")
    }

    pub fn functions(&self) -> Result<&[Value]> {
        self.optional_list("functions", "Functions")
    }

    pub fn settings(&self) -> Result<Option<&Mapping>> {
        match self.root.get("settings") {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Object(settings)) => Ok(Some(settings)),
            Some(other) => Err(SchemaError::parse(format!(
                "Settings must be a dictionary, got {}",
                value_kind(other)
            ))),
        }
    }

    /// Runs every strict accessor, returning the first shape problem.
    pub fn check_shape(&self) -> Result<()> {
        self.name()?;
        self.description()?;
        self.alias()?;
        self.fields()?;
        self.indexes()?;
        self.functions()?;
        self.settings()?;
        Ok(())
    }

    fn lenient_list(&self, key: &str) -> &[Value] {
        self.root
            .get(key)
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn field_list(&self) -> &[Value] {
        self.lenient_list("fields")
    }

    pub fn index_list(&self) -> &[Value] {
        self.lenient_list("indexes")
    }

    pub fn function_list(&self) -> &[Value] {
        self.lenient_list("functions")
    }

    pub fn settings_map(&self) -> Option<&Mapping> {
        self.root.get("settings").and_then(Value::as_object)
    }

    /// A value from `settings`, if that section is a mapping.
    pub fn setting(&self, key: &str) -> Option<&Value> {
        self.settings_map().and_then(|settings| settings.get(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_document_requires_mapping_root() {
        let err = SchemaDocument::try_from(json!(["a"])).unwrap_err();
        assert_eq!(err.to_string(), "Schema must be a dictionary, got list");
        let err = SchemaDocument::try_from(Value::Null).unwrap_err();
        assert_eq!(err.to_string(), "Empty schema file");
    }

    #[test]
    fn test_name_rules() {
        let doc = SchemaDocument::try_from(json!({"name": "_hidden"})).unwrap();
        assert!(doc.name().unwrap_err().to_string().contains("underscore"));
        let doc = SchemaDocument::try_from(json!({"name": "9lives"})).unwrap();
        assert!(doc.name().unwrap_err().to_string().contains("must start with a letter"));
        let doc = SchemaDocument::try_from(json!({"fields": []})).unwrap();
        assert_eq!(
            doc.name().unwrap_err().to_string(),
            "Schema missing required 'name' field"
        );
        let doc = SchemaDocument::try_from(json!({"name": "products_v2"})).unwrap();
        assert_eq!(doc.name().unwrap(), "products_v2");
    }

    #[test]
    fn test_alias_rules() {
        let doc = SchemaDocument::try_from(json!({"alias": 5})).unwrap();
        assert_eq!(
            doc.alias().unwrap_err().to_string(),
            "Collection alias must be a string, got int"
        );
        let doc = SchemaDocument::try_from(json!({"alias": ""})).unwrap();
        assert_eq!(
            doc.alias().unwrap_err().to_string(),
            "Collection alias cannot be empty"
        );
        let doc = SchemaDocument::try_from(json!({"alias": "bad-alias"})).unwrap();
        assert!(doc.alias().is_err());
        let doc = SchemaDocument::try_from(json!({})).unwrap();
        assert_eq!(doc.alias().unwrap(), None);
    }

    #[test]
    fn test_strict_and_lenient_lists() {
        let doc = SchemaDocument::try_from(json!({
            "name": "c",
            "fields": {"id": "int64"},
            "indexes": "nope",
        }))
        .unwrap();
        assert_eq!(
            doc.fields().unwrap_err().to_string(),
            "Fields must be a list, got dict"
        );
        assert_eq!(
            doc.indexes().unwrap_err().to_string(),
            "Indexes must be a list, got str"
        );
        assert!(doc.field_list().is_empty());
        assert!(doc.index_list().is_empty());
        assert!(doc.functions().unwrap().is_empty());

        let empty = SchemaDocument::try_from(json!({"name": "c", "fields": []})).unwrap();
        assert_eq!(
            empty.check_shape().unwrap_err().to_string(),
            "Schema must have at least one field"
        );
    }

    #[test]
    fn test_helpers() {
        assert_eq!(python_list(["nlist"]), "['nlist']");
        assert_eq!(python_list(Vec::<String>::new()), "[]");
        assert_eq!(value_kind(&json!(1.5)), "float");
        assert_eq!(value_kind(&json!(true)), "bool");
        assert_eq!(display_value(&json!("yes")), "yes");
        assert_eq!(as_positive_int(&json!(true)), None);
        assert_eq!(as_positive_int(&json!(8.0)), None);
        assert_eq!(as_positive_int(&json!(0)), None);
        assert_eq!(as_positive_int(&json!(8)), Some(8));
        assert!(!is_truthy(&json!("")));
        assert!(is_truthy(&json!(["x"])));
    }

    #[test]
    fn test_first_alias_priority() {
        let def = json!({"field": "a", "input_fields": ["b"]});
        let (key, value) = first_alias(def.as_object().unwrap(), INPUT_FIELD_KEYS).unwrap();
        assert_eq!(key, "input_fields");
        assert_eq!(name_list(value).unwrap(), vec!["b".to_string()]);
    }

    #[test]
    fn test_field_types_keep_declaration_order() {
        let fields = vec![
            json!({"name": "z", "type": "int64"}),
            json!({"name": "a", "type": "varchar"}),
            json!({"name": "broken"}),
        ];
        let field_types = FieldTypes::from_definitions(&fields);
        assert_eq!(field_types.names().collect::<Vec<_>>(), vec!["z", "a"]);
        assert_eq!(field_types.get("a"), Some("varchar"));
        assert!(!field_types.contains("broken"));
    }
}
