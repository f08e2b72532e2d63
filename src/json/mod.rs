//! JSON query compiler (§4.6): turns a declarative search request into
//! the internal query AST plus select/filter/sort/highlight/aggregation
//! specs.

mod aggs;
mod error;
mod highlight;
mod query;
mod request;
mod sort;
mod source;

pub use aggs::{compile_aggs, AggBucket};
pub use highlight::{compile_highlight, HighlightSpec, HIGHLIGHT_ALIAS};
pub use query::compile_query;
pub use request::{compile_request, Request};
pub use sort::{alias_for, compile_sort, SortKey, SortMode, SortOrder};
pub use source::{compile_source, SourceSpec};
