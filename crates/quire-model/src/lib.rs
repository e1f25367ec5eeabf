//! quire-model: the schema-governed document tree behind the quire editor.
//!
//! This crate provides:
//! - `Schema` - node and mark types compiled from descriptors, with content
//!   expressions validated up front
//! - `Node` / `Fragment` - an immutable, cheaply cloned document tree
//! - `ResolvedPos` / `NodeRange` - positions resolved against a tree
//! - `Step` / `Transaction` / `Mapping` - invertible mutations and position mapping

pub mod attrs;
pub mod content;
pub mod error;
pub mod json;
pub mod mapping;
pub mod mark;
pub mod node;
pub mod resolve;
pub mod schema;
pub mod step;
pub mod transaction;

pub use attrs::{AttrCoerce, AttrKind, AttrSpec, AttrValue, Attrs, attrs};
pub use content::ContentExpr;
pub use error::{GrammarViolation, JsonError, SchemaError};
pub use mapping::{MapResult, Mapping, StepMap};
pub use mark::{Mark, same_set};
pub use node::{Fragment, Node};
pub use resolve::{NodeRange, ResolvedPos};
pub use schema::{
    DomSpec, MarkAllowance, MarkSpec, MarkType, NodeSpec, NodeType, Schema, TEXT_NODE, TOP_NODE,
};
pub use smol_str::SmolStr;
pub use step::{NodeShell, Step};
pub use transaction::{Selection, Transaction};

#[cfg(test)]
pub(crate) mod test_schema;
