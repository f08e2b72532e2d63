//! Top-level request compilation (§4.6). `Request` is the fully compiled
//! form of a JSON search body: an index name, a query AST, and the
//! select/filter/sort/highlight/aggregation specs derived from it.

use serde_json::Value;

use super::aggs::{compile_aggs, AggBucket};
use super::error::{parse_err, require_object, require_str};
use super::highlight::{compile_highlight, HighlightSpec};
use super::source::{compile_source, SourceSpec};
use super::sort::{compile_sort, SortKey};
use super::query::compile_query;
use crate::error::Result;
use crate::model::query_ast::QueryNode;

const DEFAULT_LIMIT: u32 = 20;
const DEFAULT_OFFSET: u32 = 0;
const DEFAULT_MAX_MATCHES: u32 = 1000;

#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub index: String,
    pub query: QueryNode,
    pub limit: u32,
    pub offset: u32,
    pub max_matches: u32,
    pub profile: bool,
    pub sort: Vec<SortKey>,
    pub source: SourceSpec,
    pub highlight: Option<HighlightSpec>,
    pub aggs: Vec<AggBucket>,
    pub track_scores: bool,
}

fn compile_index(value: &Value) -> Result<String> {
    let s = require_str("index", value)?;
    let lower = s.to_lowercase();
    if lower == "_all" {
        Ok("*".to_string())
    } else {
        Ok(lower)
    }
}

fn u32_opt(obj: &serde_json::Map<String, Value>, keys: &[&str], default: u32) -> Result<u32> {
    for key in keys {
        if let Some(v) = obj.get(*key) {
            return v.as_u64().map(|n| n as u32).ok_or_else(|| parse_err("request", format!("`{key}` must be an integer")));
        }
    }
    Ok(default)
}

fn reject_unsupported(obj: &serde_json::Map<String, Value>) -> Result<()> {
    const UNSUPPORTED: &[&str] = &["_script", "unmapped_type", "missing", "nested_path", "nested_filter"];
    for key in UNSUPPORTED {
        if obj.contains_key(*key) {
            return Err(parse_err("request", format!("`{key}` is not supported")));
        }
    }
    Ok(())
}

fn reject_unsupported_script_fields(value: &Value) -> Result<()> {
    let Some(obj) = value.as_object() else {
        return Err(parse_err("request", "`script_fields` must be an object"));
    };
    for (name, spec) in obj {
        let Some(script) = spec.get("script") else {
            return Err(parse_err("request", format!("script field `{name}` missing `script`")));
        };
        let Some(script_obj) = script.as_object() else {
            return Err(parse_err("request", format!("script field `{name}` has a malformed `script`")));
        };
        for key in ["lang", "params", "stored", "file"] {
            if script_obj.contains_key(key) {
                return Err(parse_err("request", format!("script field `{name}`: `{key}` is not supported")));
            }
        }
    }
    Ok(())
}

/// Compiles a full JSON search request (§4.6).
pub fn compile_request(value: &Value) -> Result<Request> {
    let obj = require_object("request", value)?;
    reject_unsupported(obj)?;

    let index = obj.get("index").ok_or_else(|| parse_err("request", "missing `index`"))?;
    let index = compile_index(index)?;

    if obj.contains_key("id") && obj.contains_key("query") {
        return Err(parse_err("request", "`id` and `query` are mutually exclusive"));
    }

    let query_value = obj.get("query").ok_or_else(|| parse_err("request", "missing `query`"))?;
    let query = compile_query(query_value)?;

    if let Some(sf) = obj.get("script_fields") {
        reject_unsupported_script_fields(sf)?;
    }

    let limit = u32_opt(obj, &["limit", "size"], DEFAULT_LIMIT)?;
    let offset = u32_opt(obj, &["offset", "from"], DEFAULT_OFFSET)?;
    let max_matches = u32_opt(obj, &["max_matches"], DEFAULT_MAX_MATCHES)?;
    let profile = obj.get("profile").and_then(Value::as_bool).unwrap_or(false);
    let track_scores = obj.get("track_scores").and_then(Value::as_bool).unwrap_or(false);

    let sort = match obj.get("sort") {
        Some(v) => compile_sort(v)?,
        None => Vec::new(),
    };
    let source = match obj.get("_source") {
        Some(v) => compile_source(v)?,
        None => SourceSpec::All,
    };
    let highlight = obj.get("highlight").map(compile_highlight).transpose()?;
    let aggs = match obj.get("aggs").or_else(|| obj.get("aggregations")) {
        Some(v) => compile_aggs(v)?,
        None => Vec::new(),
    };

    Ok(Request { index, query, limit, offset, max_matches, profile, sort, source, highlight, aggs, track_scores })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn base() -> Value {
        json!({"index": "products", "query": {"match": {"body": "quick brown"}}})
    }

    #[test]
    fn defaults_are_applied() {
        let req = compile_request(&base()).unwrap();
        assert_eq!(req.index, "products");
        assert_eq!(req.limit, DEFAULT_LIMIT);
        assert_eq!(req.offset, DEFAULT_OFFSET);
        assert_eq!(req.max_matches, DEFAULT_MAX_MATCHES);
        assert!(!req.profile);
    }

    #[test]
    fn all_index_is_rewritten_to_star() {
        let mut v = base();
        v["index"] = json!("_all");
        let req = compile_request(&v).unwrap();
        assert_eq!(req.index, "*");
    }

    #[test]
    fn missing_index_is_an_error() {
        let mut v = base();
        v.as_object_mut().unwrap().remove("index");
        assert!(compile_request(&v).is_err());
    }

    #[test]
    fn empty_query_is_an_error() {
        let mut v = base();
        v["query"] = json!({});
        assert!(compile_request(&v).is_err());
    }

    #[test]
    fn mixed_id_and_query_is_an_error() {
        let mut v = base();
        v["id"] = json!(42);
        assert!(compile_request(&v).is_err());
    }

    #[test]
    fn size_and_from_are_aliases_for_limit_and_offset() {
        let mut v = base();
        v["size"] = json!(5);
        v["from"] = json!(10);
        let req = compile_request(&v).unwrap();
        assert_eq!(req.limit, 5);
        assert_eq!(req.offset, 10);
    }

    #[test]
    fn unsupported_script_field_options_are_rejected() {
        let mut v = base();
        v["script_fields"] = json!({"f": {"script": {"lang": "painless"}}});
        assert!(compile_request(&v).is_err());
    }

    #[test]
    fn nested_path_at_top_level_is_rejected() {
        let mut v = base();
        v["nested_path"] = json!("x");
        assert!(compile_request(&v).is_err());
    }
}
