//! The data model of §3: hit positions, field masks, docs, hits, posting
//! words and the query AST.

pub mod doc;
pub mod hit;
pub mod hitpos;
pub mod qword;
pub mod query_ast;

pub use doc::{Doc, INVALID_ROWID};
pub use hit::Hit;
pub use hitpos::{FieldMask, HitPos, FIELD_BITS, MAX_FIELDS};
pub use query_ast::{KeywordPayload, LimitSpec, QueryNode, RestrictedNode};
