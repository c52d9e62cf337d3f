use serde_json::Value;
use tracing::warn;

use crate::builders::schema::BuildContext;
use crate::descriptor::{IndexParam, IndexParams};
use crate::document::{is_truthy, Mapping};
use crate::error::{Result, SchemaError};
use crate::validators::{declared_index_type, IndexValidator};

const SPARSE_INVERTED_INDEX: &str = "SPARSE_INVERTED_INDEX";
const DEFAULT_INVERTED_INDEX_ALGO: &str = "DAAT_MAXSCORE";
const DEFAULT_BM25_K1: f64 = 1.2;
const DEFAULT_BM25_B: f64 = 0.75;

/// Turns index definitions into registration parameters.
#[derive(Debug, Default, Clone, Copy)]
pub struct IndexBuilder;

impl IndexBuilder {
    pub fn validate_index_params(&self, context: &BuildContext, index_def: &Value) -> Result<()> {
        IndexValidator::new(context.registry(), context.field_types()).validate(index_def)
    }

    /// Registration parameters for one index definition.
    ///
    /// A missing type is inferred: BM25 output fields get
    /// `SPARSE_INVERTED_INDEX` with the `BM25` metric, other fields get
    /// `AUTOINDEX` when autoindex is enabled. Defaults are merged under any
    /// params the user supplied. The definition itself is never modified.
    pub fn get_index_params(&self, context: &BuildContext, index_def: &Value) -> Result<IndexParam> {
        self.validate_index_params(context, index_def)?;

        let field_name = index_def
            .get("field")
            .and_then(Value::as_str)
            .ok_or_else(|| SchemaError::conversion("Index definition missing required 'field'"))?;
        let bm25_output = context.is_bm25_function_output_field(field_name);

        let index_type = match declared_index_type(index_def) {
            Some(index_type) => index_type,
            None if bm25_output => {
                warn!(field = field_name, "Inferred SPARSE_INVERTED_INDEX for BM25 output field");
                SPARSE_INVERTED_INDEX.to_string()
            }
            None if context.autoindex() => {
                warn!(field = field_name, "Inferred AUTOINDEX for index without a type");
                "AUTOINDEX".to_string()
            }
            None => {
                return Err(SchemaError::conversion(format!(
                    "Index for field '{}' missing required 'type'. Either specify an index type \
                     or enable autoindex in your schema.",
                    field_name
                )))
            }
        };

        let metric_type = match index_def.get("metric").filter(|metric| is_truthy(metric)) {
            Some(metric) => metric.as_str().map(str::to_uppercase),
            None if bm25_output && index_type == SPARSE_INVERTED_INDEX => Some("BM25".to_string()),
            None => None,
        };

        let mut params: Mapping = index_def
            .get("params")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();
        if index_type == SPARSE_INVERTED_INDEX {
            params
                .entry("inverted_index_algo")
                .or_insert_with(|| Value::from(DEFAULT_INVERTED_INDEX_ALGO));
            if bm25_output {
                params
                    .entry("bm25_k1")
                    .or_insert_with(|| Value::from(DEFAULT_BM25_K1));
                params
                    .entry("bm25_b")
                    .or_insert_with(|| Value::from(DEFAULT_BM25_B));
            }
        }

        Ok(IndexParam {
            field_name: field_name.to_string(),
            index_type,
            metric_type,
            params: (!params.is_empty()).then_some(params),
        })
    }

    pub fn get_create_index_calls(&self, context: &BuildContext) -> Result<Vec<(String, IndexParam)>> {
        context
            .document()
            .index_list()
            .iter()
            .map(|index_def| {
                let index = self.get_index_params(context, index_def)?;
                Ok((index.field_name.clone(), index))
            })
            .collect()
    }

    /// Every declared index, in order, as a client would register them.
    pub fn get_milvus_index_params(&self, context: &BuildContext) -> Result<IndexParams> {
        let mut index_params = IndexParams::new();
        for index_def in context.document().index_list() {
            index_params.add_index(self.get_index_params(context, index_def)?);
        }
        Ok(index_params)
    }

    pub fn get_index_warnings(&self, context: &BuildContext) -> Vec<String> {
        IndexValidator::new(context.registry(), context.field_types())
            .get_index_warnings(context.field_types().names(), context.document().index_list())
            .iter()
            .map(|message| message.as_prefixed())
            .collect()
    }
}
