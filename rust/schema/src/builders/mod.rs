//! Turns a document into descriptors.
//!
//! [`SchemaBuilder`] is the last gate before a schema reaches the engine: it
//! re-validates every entity and fails on the first problem. The per-entity
//! builders it holds are usable on their own with a [`BuildContext`].

mod field;
mod function;
mod index;
mod schema;

pub use field::FieldBuilder;
pub use function::FunctionBuilder;
pub use index::IndexBuilder;
pub use schema::{BuildContext, SchemaBuilder};
