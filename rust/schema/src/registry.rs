use std::collections::BTreeSet;
use std::fmt;

use serde::{Serialize, Serializer};
use strum::IntoEnumIterator;
use strum_macros::EnumIter;

use crate::compat::EngineCompat;

/// Engine-native data type of a collection field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter)]
pub enum DataType {
    Bool,
    Int8,
    Int16,
    Int32,
    Int64,
    Float,
    Double,
    VarChar,
    Array,
    Json,
    BinaryVector,
    FloatVector,
    Float16Vector,
    BFloat16Vector,
    SparseFloatVector,
    Int8Vector,
}

impl DataType {
    /// The spelling used for `type` and `element_type` in schema documents.
    pub fn yaml_name(&self) -> &'static str {
        match self {
            DataType::Bool => "bool",
            DataType::Int8 => "int8",
            DataType::Int16 => "int16",
            DataType::Int32 => "int32",
            DataType::Int64 => "int64",
            DataType::Float => "float",
            DataType::Double => "double",
            DataType::VarChar => "varchar",
            DataType::Array => "array",
            DataType::Json => "json",
            DataType::BinaryVector => "binary_vector",
            DataType::FloatVector => "float_vector",
            DataType::Float16Vector => "float16_vector",
            DataType::BFloat16Vector => "bfloat16_vector",
            DataType::SparseFloatVector => "sparse_float_vector",
            DataType::Int8Vector => "int8_vector",
        }
    }

    pub fn from_yaml_name(name: &str) -> Option<Self> {
        DataType::iter().find(|data_type| data_type.yaml_name() == name)
    }

    /// The engine's own name for the type.
    pub fn name(&self) -> &'static str {
        match self {
            DataType::Bool => "BOOL",
            DataType::Int8 => "INT8",
            DataType::Int16 => "INT16",
            DataType::Int32 => "INT32",
            DataType::Int64 => "INT64",
            DataType::Float => "FLOAT",
            DataType::Double => "DOUBLE",
            DataType::VarChar => "VARCHAR",
            DataType::Array => "ARRAY",
            DataType::Json => "JSON",
            DataType::BinaryVector => "BINARY_VECTOR",
            DataType::FloatVector => "FLOAT_VECTOR",
            DataType::Float16Vector => "FLOAT16_VECTOR",
            DataType::BFloat16Vector => "BFLOAT16_VECTOR",
            DataType::SparseFloatVector => "SPARSE_FLOAT_VECTOR",
            DataType::Int8Vector => "INT8_VECTOR",
        }
    }

    /// Wire value of the type in the engine protocol.
    pub fn code(&self) -> i32 {
        match self {
            DataType::Bool => 1,
            DataType::Int8 => 2,
            DataType::Int16 => 3,
            DataType::Int32 => 4,
            DataType::Int64 => 5,
            DataType::Float => 10,
            DataType::Double => 11,
            DataType::VarChar => 21,
            DataType::Array => 22,
            DataType::Json => 23,
            DataType::BinaryVector => 100,
            DataType::FloatVector => 101,
            DataType::Float16Vector => 102,
            DataType::BFloat16Vector => 103,
            DataType::SparseFloatVector => 104,
            DataType::Int8Vector => 105,
        }
    }

    pub fn is_vector(&self) -> bool {
        self.code() >= 100
    }

    /// Vector types that carry a fixed dimension.
    pub fn is_dense_vector(&self) -> bool {
        self.is_vector() && *self != DataType::SparseFloatVector
    }

    /// Inclusive bounds for `dim`. Binary vectors count bits.
    pub fn dim_range(&self) -> Option<(i64, i64)> {
        match self {
            DataType::FloatVector
            | DataType::Float16Vector
            | DataType::BFloat16Vector
            | DataType::Int8Vector => Some((1, 32768)),
            DataType::BinaryVector => Some((1, 32768 * 8)),
            _ => None,
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Serialize for DataType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.name())
    }
}

/// Kind of derived-field function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter)]
pub enum FunctionType {
    Bm25,
    TextEmbedding,
    Rerank,
}

// Tokens are compared after stripping non-alphanumerics and uppercasing.
const FUNCTION_TYPE_ALIASES: &[(&str, FunctionType)] = &[
    ("BM25", FunctionType::Bm25),
    ("TEXTEMBEDDING", FunctionType::TextEmbedding),
    ("TEXTEMBED", FunctionType::TextEmbedding),
    ("TEXTEMBEDDINGS", FunctionType::TextEmbedding),
    ("RERANK", FunctionType::Rerank),
    ("RANKER", FunctionType::Rerank),
];

impl FunctionType {
    pub fn name(&self) -> &'static str {
        match self {
            FunctionType::Bm25 => "BM25",
            FunctionType::TextEmbedding => "TEXT_EMBEDDING",
            FunctionType::Rerank => "RERANK",
        }
    }

    pub fn code(&self) -> i32 {
        match self {
            FunctionType::Bm25 => 1,
            FunctionType::TextEmbedding => 2,
            FunctionType::Rerank => 3,
        }
    }

    /// Resolves user spellings such as `text-embedding` or `Ranker`.
    pub fn normalize(raw: &str) -> Option<Self> {
        let token: String = raw
            .chars()
            .filter(|c| c.is_alphanumeric())
            .flat_map(char::to_uppercase)
            .collect();
        FUNCTION_TYPE_ALIASES
            .iter()
            .find(|(alias, _)| *alias == token)
            .map(|(_, function_type)| *function_type)
    }

    /// Canonical names, sorted.
    pub fn supported_names() -> Vec<&'static str> {
        let mut names: Vec<_> = FunctionType::iter().map(|t| t.name()).collect();
        names.sort_unstable();
        names
    }
}

impl fmt::Display for FunctionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Serialize for FunctionType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.name())
    }
}

pub const FLOAT_METRICS: &[&str] = &["COSINE", "IP", "L2"];
pub const BINARY_METRICS: &[&str] = &["HAMMING", "JACCARD", "TANIMOTO"];
pub const SPARSE_METRICS: &[&str] = &["BM25", "IP"];

const BASE_VECTOR_INDEXES: &[&str] = &[
    "FLAT",
    "IVF_FLAT",
    "IVF_SQ8",
    "IVF_PQ",
    "IVF_RABITQ",
    "HNSW",
    "DISKANN",
    "AUTOINDEX",
    "GPU_IVF_FLAT",
    "GPU_IVF_PQ",
];

const BASE_GPU_INDEXES: &[&str] = &["GPU_IVF_FLAT", "GPU_IVF_PQ"];

const STATIC_INDEX_TYPES: &[(&str, &[&str])] = &[
    ("binary_vector", &["BIN_FLAT", "BIN_IVF_FLAT", "MINHASH_LSH"]),
    ("sparse_float_vector", &["SPARSE_INVERTED_INDEX"]),
    ("varchar", &["INVERTED", "BITMAP", "TRIE"]),
    ("int8", &["INVERTED", "STL_SORT"]),
    ("int16", &["INVERTED", "STL_SORT"]),
    ("int32", &["INVERTED", "STL_SORT"]),
    ("int64", &["INVERTED", "STL_SORT"]),
    ("float", &["INVERTED"]),
    ("double", &["INVERTED"]),
    ("bool", &["BITMAP", "INVERTED"]),
    ("array", &["BITMAP", "INVERTED"]),
    ("json", &["INVERTED"]),
];

const RECOMMENDED_INDEX_TYPES: &[(&str, &str)] = &[
    ("varchar", "INVERTED"),
    ("bool", "BITMAP"),
    ("int8", "INVERTED"),
    ("int16", "INVERTED"),
    ("int32", "INVERTED"),
    ("int64", "INVERTED"),
    ("float", "INVERTED"),
    ("double", "INVERTED"),
    ("array", "BITMAP"),
    ("json", "INVERTED"),
];

const REQUIRED_INDEX_PARAMS: &[(&str, &[&str])] = &[
    ("IVF_FLAT", &["nlist"]),
    ("IVF_SQ8", &["nlist"]),
    ("IVF_PQ", &["nlist"]),
    ("HNSW", &["M", "efConstruction"]),
];

/// Parameters that must be present for an index type, sorted.
pub fn required_index_params(index_type: &str) -> &'static [&'static str] {
    REQUIRED_INDEX_PARAMS
        .iter()
        .find(|(name, _)| *name == index_type)
        .map(|(_, params)| *params)
        .unwrap_or(&[])
}

/// Maps schema type names to engine types and answers index compatibility
/// questions for one installed engine version.
///
/// Gated types and indexes disappear from every table when the version is too
/// old, so callers never need to consult [`EngineCompat`] directly for
/// membership checks. They do need it for requirement messages.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeRegistry {
    compat: EngineCompat,
}

impl TypeRegistry {
    pub fn new(compat: EngineCompat) -> Self {
        TypeRegistry { compat }
    }

    pub fn compat(&self) -> &EngineCompat {
        &self.compat
    }

    /// Engine type for `name`, or `None` when the name is unknown or gated
    /// behind a newer SDK.
    pub fn type_for(&self, name: &str) -> Option<DataType> {
        DataType::from_yaml_name(name).filter(|_| self.compat.supports_type(name))
    }

    /// Requirement string for a gated type that the installed version lacks.
    pub fn missing_type_requirement(&self, name: &str) -> Option<String> {
        if self.compat.supports_type(name) {
            None
        } else {
            self.compat.type_requirement(name)
        }
    }

    pub fn missing_index_requirement(&self, index_type: &str) -> Option<String> {
        if self.compat.supports_index(index_type) {
            None
        } else {
            self.compat.index_requirement(index_type)
        }
    }

    /// Available type names, sorted.
    pub fn supported_type_names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = DataType::iter()
            .map(|data_type| data_type.yaml_name())
            .filter(|name| self.compat.supports_type(name))
            .collect();
        names.sort_unstable();
        names
    }

    fn float_vector_indexes(&self) -> BTreeSet<&'static str> {
        BASE_VECTOR_INDEXES
            .iter()
            .copied()
            .chain(self.compat.supported_optional_indexes())
            .collect()
    }

    /// Index types accepted on a field of `field_type`, sorted. Empty for
    /// unknown or unavailable field types.
    pub fn valid_index_types(&self, field_type: &str) -> BTreeSet<&'static str> {
        match field_type {
            "float_vector" => self.float_vector_indexes(),
            "float16_vector" | "bfloat16_vector" if self.compat.supports_type(field_type) => {
                self.float_vector_indexes()
            }
            "int8_vector" if self.compat.supports_type(field_type) => ["HNSW"].into(),
            _ => STATIC_INDEX_TYPES
                .iter()
                .find(|(name, _)| *name == field_type)
                .map(|(_, types)| types.iter().copied().collect())
                .unwrap_or_default(),
        }
    }

    pub fn recommended_index_type(&self, field_type: &str) -> Option<&'static str> {
        if field_type == "int8_vector" {
            return self.compat.supports_type(field_type).then_some("HNSW");
        }
        RECOMMENDED_INDEX_TYPES
            .iter()
            .find(|(name, _)| *name == field_type)
            .map(|(_, index_type)| *index_type)
    }

    pub fn gpu_index_types(&self) -> BTreeSet<&'static str> {
        BASE_GPU_INDEXES
            .iter()
            .copied()
            .chain(self.compat.supported_optional_indexes())
            .collect()
    }

    pub fn is_gpu_index(&self, index_type: &str) -> bool {
        self.gpu_index_types().contains(index_type)
    }

    /// Allowed metrics for a field type, or `None` when the type places no
    /// restriction on metrics.
    pub fn metrics_for(&self, field_type: &str) -> Option<&'static [&'static str]> {
        match field_type {
            "float_vector" | "float16_vector" | "bfloat16_vector" | "int8_vector" => {
                Some(FLOAT_METRICS)
            }
            "binary_vector" => Some(BINARY_METRICS),
            "sparse_float_vector" => Some(SPARSE_METRICS),
            _ => None,
        }
    }

    pub fn is_vector_type(&self, field_type: &str) -> bool {
        DataType::from_yaml_name(field_type).is_some_and(|data_type| data_type.is_vector())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry(version: &str) -> TypeRegistry {
        TypeRegistry::new(EngineCompat::new(version).unwrap())
    }

    #[test]
    fn test_type_for_respects_gating() {
        let old = registry("2.5.4");
        assert_eq!(old.type_for("float_vector"), Some(DataType::FloatVector));
        assert_eq!(old.type_for("float16_vector"), None);
        assert_eq!(old.type_for("text"), None);
        assert_eq!(
            old.missing_type_requirement("float16_vector").as_deref(),
            Some("Requires pymilvus>=2.6.0")
        );
        assert!(!old.supported_type_names().contains(&"int8_vector"));

        let new = registry("2.6.1");
        assert_eq!(new.type_for("int8_vector"), Some(DataType::Int8Vector));
        assert_eq!(new.missing_type_requirement("int8_vector"), None);
        assert_eq!(new.supported_type_names().len(), DataType::iter().count());
    }

    #[test]
    fn test_codes_and_names() {
        assert_eq!(DataType::VarChar.code(), 21);
        assert_eq!(DataType::Int8Vector.code(), 105);
        assert_eq!(DataType::BFloat16Vector.name(), "BFLOAT16_VECTOR");
        assert!(DataType::SparseFloatVector.is_vector());
        assert!(!DataType::SparseFloatVector.is_dense_vector());
        assert_eq!(DataType::BinaryVector.dim_range(), Some((1, 262144)));
        assert_eq!(
            serde_json::to_value(DataType::FloatVector).unwrap(),
            serde_json::json!("FLOAT_VECTOR")
        );
    }

    #[test]
    fn test_function_type_aliases() {
        assert_eq!(FunctionType::normalize("bm25"), Some(FunctionType::Bm25));
        assert_eq!(
            FunctionType::normalize("text-embedding"),
            Some(FunctionType::TextEmbedding)
        );
        assert_eq!(
            FunctionType::normalize("Text_Embeddings"),
            Some(FunctionType::TextEmbedding)
        );
        assert_eq!(FunctionType::normalize("ranker"), Some(FunctionType::Rerank));
        assert_eq!(FunctionType::normalize("tfidf"), None);
        assert_eq!(
            FunctionType::supported_names(),
            vec!["BM25", "RERANK", "TEXT_EMBEDDING"]
        );
    }

    #[test]
    fn test_valid_index_types_by_version() {
        let old = registry("2.5.0");
        assert!(!old.valid_index_types("float_vector").contains("GPU_CAGRA"));
        assert!(old.valid_index_types("float16_vector").is_empty());
        assert!(old.valid_index_types("int8_vector").is_empty());
        assert_eq!(old.recommended_index_type("int8_vector"), None);

        let new = registry("2.6.0");
        let float_indexes = new.valid_index_types("float_vector");
        assert!(float_indexes.contains("GPU_CAGRA"));
        assert!(float_indexes.contains("HNSW"));
        assert_eq!(new.valid_index_types("bfloat16_vector"), float_indexes);
        assert_eq!(
            new.valid_index_types("int8_vector").into_iter().collect::<Vec<_>>(),
            vec!["HNSW"]
        );
        assert_eq!(new.recommended_index_type("int8_vector"), Some("HNSW"));
        assert!(new.is_gpu_index("GPU_BRUTE_FORCE"));
        assert!(!old.is_gpu_index("GPU_BRUTE_FORCE"));
    }

    #[test]
    fn test_scalar_tables() {
        let registry = TypeRegistry::default();
        assert_eq!(registry.recommended_index_type("bool"), Some("BITMAP"));
        assert_eq!(registry.recommended_index_type("float_vector"), None);
        assert!(registry.valid_index_types("varchar").contains("TRIE"));
        assert!(registry.valid_index_types("unknown").is_empty());
        assert_eq!(required_index_params("HNSW"), &["M", "efConstruction"]);
        assert!(required_index_params("FLAT").is_empty());
        assert_eq!(registry.metrics_for("sparse_float_vector"), Some(SPARSE_METRICS));
        assert_eq!(registry.metrics_for("varchar"), None);
    }
}
