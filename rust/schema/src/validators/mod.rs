//! Per-entity validators and the orchestrator that runs them over a document.
//!
//! The field, index and function validators stop at the first problem in the
//! entity they are given. [`SchemaValidator`] runs all of them and collects
//! every failure into one [`crate::ValidationResult`].

mod field;
mod function;
mod index;
mod schema;

pub use field::{validate_field_name, FieldValidator, ARRAY_CAPACITY_RANGE, VARCHAR_LENGTH_RANGE};
pub use function::{function_type_of, is_bm25_function_output_field, FunctionValidator};
pub use index::{declared_index_type, IndexValidator};
pub use schema::{
    ensure_runtime_requirements, resolve_autoindex_flag, resolve_index_types,
    SchemaValidationContext, SchemaValidator, AUTOINDEX_KEYS,
};
