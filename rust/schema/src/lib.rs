//! Declarative collection schemas for vector databases.
//!
//! A schema document (usually a YAML file) declares a collection's fields,
//! indexes and functions. [`SchemaValidator`] reports every problem in a
//! document at once; [`SchemaBuilder`] turns a document into descriptors and
//! fails on the first problem. The [`api`] module wraps both for file input.

pub mod api;
mod builders;
mod compat;
mod descriptor;
mod document;
mod error;
mod loader;
mod registry;
mod result;
mod validators;

pub use builders::*;
pub use compat::*;
pub use descriptor::*;
pub use document::*;
pub use error::*;
pub use loader::*;
pub use registry::*;
pub use result::*;
pub use validators::*;
