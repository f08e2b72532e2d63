//! Query execution core for a full-text search engine: the stream
//! iterator tree, the zone cache, the ranker runtime and its eight
//! ranking modes, the expression formula compiler, the query-result
//! cache, wildcard matching and unit parsing, and the JSON request
//! compiler.

pub mod error;
pub mod expr;
pub mod iter;
pub mod json;
pub mod model;
pub mod query_cache;
pub mod ranker;
pub mod time_budget;
pub mod units;
pub mod wildcard;
pub mod zone;

pub use error::{Error, Result};
