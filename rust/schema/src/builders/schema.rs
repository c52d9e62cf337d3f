use serde_json::Value;
use tracing::{debug, instrument};

use crate::builders::{FieldBuilder, FunctionBuilder, IndexBuilder};
use crate::compat::EngineCompat;
use crate::descriptor::{CollectionSchema, FieldSchema, Function, IndexParam, IndexParams};
use crate::document::{value_kind, FieldTypes, SchemaDocument};
use crate::error::{Result, SchemaError};
use crate::registry::TypeRegistry;
use crate::validators::{
    ensure_runtime_requirements, is_bm25_function_output_field, resolve_autoindex_flag,
    SchemaValidationContext,
};

/// Everything the entity builders need to know about the document being built.
#[derive(Debug, Clone)]
pub struct BuildContext {
    document: SchemaDocument,
    registry: TypeRegistry,
    field_types: FieldTypes,
    autoindex: bool,
}

impl BuildContext {
    pub fn new(
        document: SchemaDocument,
        registry: TypeRegistry,
        field_types: FieldTypes,
        autoindex: bool,
    ) -> Self {
        BuildContext {
            document,
            registry,
            field_types,
            autoindex,
        }
    }

    pub fn document(&self) -> &SchemaDocument {
        &self.document
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    pub fn field_types(&self) -> &FieldTypes {
        &self.field_types
    }

    pub fn autoindex(&self) -> bool {
        self.autoindex
    }

    pub fn is_bm25_function_output_field(&self, field_name: &str) -> bool {
        is_bm25_function_output_field(self.document.function_list(), field_name)
    }
}

/// Builds a [`CollectionSchema`] and its index and function descriptors from
/// a document, failing on the first problem found.
#[derive(Debug, Clone)]
pub struct SchemaBuilder {
    context: BuildContext,
    fields: FieldBuilder,
    indexes: IndexBuilder,
    functions: FunctionBuilder,
}

impl SchemaBuilder {
    /// Checks the engine-version requirements and resolves the autoindex
    /// switch up front. A validation context, when given, supplies the field
    /// types so they are not derived twice.
    #[instrument(skip_all, fields(engine_version = %compat.raw_version()))]
    pub fn try_new(
        document: SchemaDocument,
        compat: EngineCompat,
        validation: Option<SchemaValidationContext>,
    ) -> Result<Self> {
        let field_types = match validation {
            Some(validation) => validation.field_types,
            None => FieldTypes::from_definitions(document.field_list()),
        };
        ensure_runtime_requirements(&document, &compat)?;
        let autoindex = resolve_autoindex_flag(&document)?;
        debug!(fields = field_types.len(), autoindex, "Schema builder ready");

        Ok(SchemaBuilder {
            context: BuildContext::new(document, TypeRegistry::new(compat), field_types, autoindex),
            fields: FieldBuilder,
            indexes: IndexBuilder,
            functions: FunctionBuilder,
        })
    }

    pub fn from_document(document: SchemaDocument) -> Result<Self> {
        Self::try_new(document, EngineCompat::default(), None)
    }

    pub fn context(&self) -> &BuildContext {
        &self.context
    }

    #[instrument(skip(self))]
    pub fn build(&self) -> Result<CollectionSchema> {
        let fields = self.build_fields()?;
        let primaries = fields.iter().filter(|field| field.is_primary).count();
        match primaries {
            1 => {}
            0 => {
                return Err(SchemaError::conversion(
                    "Schema must have exactly one primary field",
                ))
            }
            count => {
                return Err(SchemaError::conversion(format!(
                    "Schema has {} primary fields, must have exactly one",
                    count
                )))
            }
        }

        let description = self
            .context
            .document()
            .description()
            .map_err(|e| SchemaError::conversion(format!("Failed to build CollectionSchema: {}", e)))?;
        let enable_dynamic_field = match self.context.document().setting("enable_dynamic_field") {
            None | Some(Value::Null) => false,
            Some(Value::Bool(enabled)) => *enabled,
            Some(other) => {
                return Err(SchemaError::conversion(format!(
                    "Failed to build CollectionSchema: 'enable_dynamic_field' must be a boolean, \
                     got {}",
                    value_kind(other)
                )))
            }
        };

        let schema = CollectionSchema::new(fields, description, enable_dynamic_field);
        schema
            .verify()
            .map_err(|e| SchemaError::conversion(format!("Schema validation failed: {}", e)))?;

        for index_def in self.context.document().index_list() {
            self.indexes.validate_index_params(&self.context, index_def)?;
        }
        debug!(
            fields = schema.fields.len(),
            indexes = self.context.document().index_list().len(),
            "Built collection schema"
        );
        Ok(schema)
    }

    fn build_fields(&self) -> Result<Vec<FieldSchema>> {
        let field_defs = self
            .context
            .document()
            .fields()
            .map_err(|e| SchemaError::conversion(format!("Failed to build CollectionSchema: {}", e)))?;
        field_defs
            .iter()
            .map(|field_def| self.fields.build_field(&self.context, field_def))
            .collect()
    }

    pub fn validate_field_params(&self, field_def: &Value) -> Result<()> {
        self.fields.validate_field_params(&self.context, field_def)
    }

    pub fn validate_index_params(&self, index_def: &Value) -> Result<()> {
        self.indexes.validate_index_params(&self.context, index_def)
    }

    pub fn get_index_params(&self, index_def: &Value) -> Result<IndexParam> {
        self.indexes.get_index_params(&self.context, index_def)
    }

    pub fn get_create_index_calls(&self) -> Result<Vec<(String, IndexParam)>> {
        self.indexes.get_create_index_calls(&self.context)
    }

    pub fn get_milvus_index_params(&self) -> Result<IndexParams> {
        self.indexes.get_milvus_index_params(&self.context)
    }

    pub fn get_index_warnings(&self) -> Vec<String> {
        self.indexes.get_index_warnings(&self.context)
    }

    pub fn validate_function(&self, func_def: &Value) -> Result<()> {
        self.functions.validate_function(&self.context, func_def)
    }

    pub fn get_milvus_function_objects(&self) -> Result<Vec<Function>> {
        self.functions.get_milvus_function_objects(&self.context)
    }

    pub fn get_function_index_warnings(&self) -> Vec<String> {
        self.functions.get_function_index_warnings(&self.context)
    }

    pub fn is_bm25_function_output_field(&self, field_name: &str) -> bool {
        self.context.is_bm25_function_output_field(field_name)
    }

    pub fn name(&self) -> Option<&str> {
        self.context.document().get("name").and_then(Value::as_str)
    }

    pub fn alias(&self) -> Option<&str> {
        self.context.document().get("alias").and_then(Value::as_str)
    }

    pub fn description(&self) -> &str {
        self.context
            .document()
            .get("description")
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    pub fn consistency_level(&self) -> Option<&str> {
        self.context
            .document()
            .setting("consistency_level")
            .and_then(Value::as_str)
    }

    pub fn autoindex_enabled(&self) -> bool {
        self.context.autoindex()
    }

    pub fn indexes(&self) -> &[Value] {
        self.context.document().index_list()
    }

    pub fn functions(&self) -> &[Value] {
        self.context.document().function_list()
    }

    pub fn field_types(&self) -> &FieldTypes {
        self.context.field_types()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{DataType, FunctionType};
    use serde_json::json;

    fn builder(value: Value) -> SchemaBuilder {
        SchemaBuilder::from_document(SchemaDocument::try_from(value).unwrap()).unwrap()
    }

    fn basic() -> Value {
        json!({
            "name": "docs",
            "description": "Documents",
            "fields": [
                {"name": "id", "type": "int64", "is_primary": true},
                {"name": "v", "type": "float_vector", "dim": 128},
            ],
            "indexes": [
                {"field": "v", "type": "hnsw", "metric": "cosine", "params": {"M": 16, "efConstruction": 200}},
            ],
        })
    }

    fn bm25() -> Value {
        json!({
            "name": "search",
            "fields": [
                {"name": "id", "type": "int64", "is_primary": true, "auto_id": true},
                {"name": "text", "type": "varchar", "max_length": 1000, "enable_analyzer": true},
                {"name": "sparse", "type": "sparse_float_vector"},
            ],
            "functions": [
                {"name": "bm25_fn", "type": "bm25", "input_field_names": ["text"], "output_field_names": ["sparse"]},
            ],
            "indexes": [{"field": "sparse"}],
        })
    }

    #[test]
    fn test_build_basic_schema() {
        let builder = builder(basic());
        let schema = builder.build().unwrap();
        assert_eq!(schema.description, "Documents");
        assert!(!schema.enable_dynamic_field);
        assert_eq!(schema.fields.len(), 2);

        let id = schema.primary_field().unwrap();
        assert_eq!(id.name, "id");
        assert_eq!(id.dtype, DataType::Int64);
        assert!(!id.auto_id);

        let vector = schema.field("v").unwrap();
        assert_eq!(vector.dtype, DataType::FloatVector);
        assert_eq!(vector.dim, Some(128));

        let params = builder.get_index_params(&basic()["indexes"][0]).unwrap();
        assert_eq!(params.field_name, "v");
        assert_eq!(params.index_type, "HNSW");
        assert_eq!(params.metric_type.as_deref(), Some("COSINE"));
        assert_eq!(
            Value::Object(params.params.unwrap()),
            json!({"M": 16, "efConstruction": 200})
        );
    }

    #[test]
    fn test_primary_field_count() {
        let mut doc = basic();
        doc["fields"][0]["is_primary"] = json!(false);
        let err = builder(doc).build().unwrap_err();
        assert_eq!(err.to_string(), "Schema must have exactly one primary field");

        let mut doc = basic();
        doc["fields"]
            .as_array_mut()
            .unwrap()
            .push(json!({"name": "other", "type": "varchar", "max_length": 10, "is_primary": true}));
        let err = builder(doc).build().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Schema has 2 primary fields, must have exactly one"
        );
    }

    #[test]
    fn test_build_field_attributes() {
        let builder = builder(json!({
            "name": "c",
            "settings": {"enable_dynamic_field": true, "consistency_level": "Strong"},
            "fields": [
                {"name": "pk", "type": "varchar", "max_length": 64, "is_primary": true},
                {"name": "tags", "type": "array", "element_type": "varchar", "max_capacity": 16, "max_length": 32, "nullable": true},
                {"name": "body", "type": "varchar", "max_length": 512, "enable_analyzer": true, "enable_match": true},
                {"name": "b", "type": "binary_vector", "dim": 64},
                {"name": "n", "type": "int32", "auto_id": true},
                {"name": "s", "type": "sparse_float_vector", "dim": 1000},
            ],
        }));
        let schema = builder.build().unwrap();
        assert!(schema.enable_dynamic_field);
        assert_eq!(builder.consistency_level(), Some("Strong"));

        let tags = schema.field("tags").unwrap();
        assert_eq!(tags.element_type, Some(DataType::VarChar));
        assert_eq!(tags.max_capacity, Some(16));
        assert_eq!(tags.max_length, Some(32));
        assert_eq!(tags.nullable, Some(true));

        let body = schema.field("body").unwrap();
        assert_eq!(body.analyzer_params, Some(json!({"type": "english"})));
        assert_eq!(body.enable_match, Some(true));

        // auto_id only applies to the primary field
        assert!(!schema.field("n").unwrap().auto_id);
        assert_eq!(schema.field("b").unwrap().dim, Some(64));
        // sparse vectors keep a declared dim as well
        assert_eq!(schema.field("s").unwrap().dim, Some(1000));
    }

    #[test]
    fn test_structural_verification_is_wrapped() {
        let builder = builder(json!({
            "name": "c",
            "fields": [
                {"name": "pk", "type": "varchar", "max_length": 64, "is_primary": true, "auto_id": true},
                {"name": "v", "type": "float_vector", "dim": 4},
            ],
        }));
        let err = builder.build().unwrap_err();
        assert!(err
            .to_string()
            .starts_with("Schema validation failed: Field 'pk' enables auto_id"));
    }

    #[test]
    fn test_build_rejects_bad_settings() {
        let mut doc = basic();
        doc["settings"] = json!({"enable_dynamic_field": "yes"});
        let err = builder(doc).build().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Failed to build CollectionSchema: 'enable_dynamic_field' must be a boolean, got str"
        );
    }

    #[test]
    fn test_build_validates_indexes() {
        let mut doc = basic();
        doc["indexes"] = json!([{"field": "v", "type": "HNSW", "metric": "L2"}]);
        let err = builder(doc).build().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Index 'HNSW' for field 'v' missing required parameters: ['M', 'efConstruction']"
        );
    }

    #[test]
    fn test_bm25_output_index_inference() {
        let builder = builder(bm25());
        assert!(builder.is_bm25_function_output_field("sparse"));
        assert!(!builder.is_bm25_function_output_field("text"));
        builder.build().unwrap();

        let index_def = json!({"field": "sparse"});
        let params = builder.get_index_params(&index_def).unwrap();
        assert_eq!(params.index_type, "SPARSE_INVERTED_INDEX");
        assert_eq!(params.metric_type.as_deref(), Some("BM25"));
        assert_eq!(
            Value::Object(params.params.unwrap()),
            json!({"inverted_index_algo": "DAAT_MAXSCORE", "bm25_k1": 1.2, "bm25_b": 0.75})
        );
        // the definition is left untouched
        assert_eq!(index_def, json!({"field": "sparse"}));

        let params = builder
            .get_index_params(&json!({"field": "sparse", "params": {"bm25_k1": 1.5}}))
            .unwrap();
        assert_eq!(
            Value::Object(params.params.unwrap()),
            json!({"inverted_index_algo": "DAAT_MAXSCORE", "bm25_k1": 1.5, "bm25_b": 0.75})
        );

        assert!(builder.get_function_index_warnings().is_empty());
    }

    #[test]
    fn test_missing_index_type() {
        let doc = json!({
            "name": "c",
            "fields": [
                {"name": "id", "type": "int64", "is_primary": true},
                {"name": "v", "type": "float_vector", "dim": 8},
            ],
            "indexes": [{"field": "v", "metric": "L2"}],
        });
        let err = builder(doc.clone())
            .get_index_params(&doc["indexes"][0])
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Index for field 'v' missing required 'type'. Either specify an index type or \
             enable autoindex in your schema."
        );

        let mut doc = doc;
        doc["autoindex"] = json!(true);
        let builder = builder(doc.clone());
        assert!(builder.autoindex_enabled());
        let params = builder.get_index_params(&doc["indexes"][0]).unwrap();
        assert_eq!(params.index_type, "AUTOINDEX");
        assert_eq!(params.metric_type.as_deref(), Some("L2"));
        assert_eq!(params.params, None);
    }

    #[test]
    fn test_index_registration_parity() {
        for doc in [basic(), bm25()] {
            let builder = builder(doc);
            let registered = builder.get_milvus_index_params().unwrap();
            let calls = builder.get_create_index_calls().unwrap();
            assert_eq!(registered.len(), builder.indexes().len());
            for ((index_def, registered), (field_name, call)) in
                builder.indexes().iter().zip(&registered).zip(&calls)
            {
                let standalone = builder.get_index_params(index_def).unwrap();
                assert_eq!(registered, &standalone);
                assert_eq!(call, &standalone);
                assert_eq!(field_name, &standalone.field_name);
            }
        }
    }

    #[test]
    fn test_function_objects_normalize_aliases() {
        let builder = builder(json!({
            "name": "c",
            "fields": [
                {"name": "id", "type": "int64", "is_primary": true},
                {"name": "text", "type": "varchar", "max_length": 100, "enable_analyzer": true},
                {"name": "sparse", "type": "sparse_float_vector"},
            ],
            "functions": [
                {"name": "f", "function_type": "Bm-25", "input_fields": ["text"], "output_field": "sparse", "params": {"k1": 1.1}},
            ],
        }));
        let functions = builder.get_milvus_function_objects().unwrap();
        assert_eq!(functions.len(), 1);
        let function = &functions[0];
        assert_eq!(function.name, "f");
        assert_eq!(function.function_type, FunctionType::Bm25);
        assert_eq!(function.input_field_names, vec!["text".to_string()]);
        assert_eq!(function.output_field_names, vec!["sparse".to_string()]);
        assert_eq!(function.params.get("k1"), Some(&json!(1.1)));
    }

    #[test]
    fn test_function_objects_require_name() {
        let mut doc = bm25();
        doc["functions"][0]
            .as_object_mut()
            .unwrap()
            .remove("name");
        let err = builder(doc).get_milvus_function_objects().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Failed to create Function: Function name cannot be empty"
        );
    }

    #[test]
    fn test_function_index_warnings_without_autoindex() {
        let mut doc = bm25();
        doc["indexes"] = json!([{"field": "sparse", "type": "SPARSE_WAND", "metric": "IP"}]);
        let warnings = builder(doc).get_function_index_warnings();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].starts_with("ERROR: "), "{}", warnings[0]);
    }

    #[test]
    fn test_construction_checks_document_settings() {
        let document = SchemaDocument::try_from(json!({
            "name": "c",
            "autoindex": true,
            "settings": {"use_autoindex": true},
            "fields": [{"name": "id", "type": "int64", "is_primary": true}],
        }))
        .unwrap();
        let err = SchemaBuilder::from_document(document).unwrap_err();
        assert!(err.to_string().starts_with("Multiple autoindex settings found"));

        let document = SchemaDocument::try_from(json!({
            "name": "c",
            "pymilvus": {"min_version": "9.0.0"},
            "fields": [{"name": "id", "type": "int64", "is_primary": true}],
        }))
        .unwrap();
        assert!(SchemaBuilder::from_document(document).is_err());
    }

    #[test]
    fn test_validation_context_supplies_field_types() {
        let document = SchemaDocument::try_from(basic()).unwrap();
        let mut context = SchemaValidationContext::default();
        context.field_types.insert("v", "float_vector");
        let builder =
            SchemaBuilder::try_new(document, EngineCompat::default(), Some(context)).unwrap();
        assert_eq!(builder.field_types().len(), 1);
        assert_eq!(builder.field_types().get("v"), Some("float_vector"));
        assert_eq!(builder.name(), Some("docs"));
        assert_eq!(builder.description(), "Documents");
        assert_eq!(builder.alias(), None);
    }
}
