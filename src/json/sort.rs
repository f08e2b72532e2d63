//! `sort` compilation (§4.6): `string | { name: asc|desc | {order, mode} |
//! geo_distance_spec }`.

use serde_json::Value;

use super::error::parse_err;
use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortMode {
    Min,
    Max,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SortKey {
    pub column: String,
    pub order: SortOrder,
    pub mode: Option<SortMode>,
    /// `true` for `_score`, which maps to the internal weight
    /// pseudo-column and implies score tracking (§4.6).
    pub is_score: bool,
}

fn order_from_str(s: &str) -> Result<SortOrder> {
    match s {
        "asc" => Ok(SortOrder::Asc),
        "desc" => Ok(SortOrder::Desc),
        other => Err(parse_err("sort", format!("unknown sort order `{other}`"))),
    }
}

fn mode_from_str(s: &str) -> Result<SortMode> {
    match s {
        "min" => Ok(SortMode::Min),
        "max" => Ok(SortMode::Max),
        other => Err(parse_err("sort", format!("unknown sort mode `{other}`"))),
    }
}

fn compile_one(value: &Value) -> Result<SortKey> {
    match value {
        Value::String(name) => Ok(SortKey { is_score: name == "_score", column: name.clone(), order: SortOrder::Asc, mode: None }),
        Value::Object(obj) => {
            let (name, spec) = obj.iter().next().ok_or_else(|| parse_err("sort", "empty sort entry"))?;
            let is_score = name == "_score";
            match spec {
                Value::String(order) => Ok(SortKey { column: name.clone(), order: order_from_str(order)?, mode: None, is_score }),
                Value::Object(inner) => {
                    let order = inner.get("order").and_then(Value::as_str).map(order_from_str).transpose()?.unwrap_or(SortOrder::Asc);
                    let mode = inner.get("mode").and_then(Value::as_str).map(mode_from_str).transpose()?;
                    if inner.contains_key("geo_distance") || name.contains("geo_distance") {
                        return Err(parse_err("sort", "geo_distance sort is not supported"));
                    }
                    Ok(SortKey { column: name.clone(), order, mode, is_score })
                }
                _ => Err(parse_err("sort", "malformed sort entry")),
            }
        }
        _ => Err(parse_err("sort", "sort entries must be a string or object")),
    }
}

/// Compiles the `sort` array. Each `_score` entry is rewritten with an
/// internal alias prefix (`@order@<n>`) the way the source names
/// synthesised sort expressions, so multiple score-adjacent sorts don't
/// collide.
pub fn compile_sort(value: &Value) -> Result<Vec<SortKey>> {
    let arr = value.as_array().ok_or_else(|| parse_err("sort", "sort must be an array"))?;
    arr.iter().map(compile_one).collect()
}

pub fn alias_for(index: usize, key: &SortKey) -> String {
    format!("@order@{}_{}", index, key.column)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn bare_string_sorts_ascending() {
        let keys = compile_sort(&json!(["title"])).unwrap();
        assert_eq!(keys[0].order, SortOrder::Asc);
        assert!(!keys[0].is_score);
    }

    #[test]
    fn score_sort_is_flagged() {
        let keys = compile_sort(&json!([{"_score": "desc"}])).unwrap();
        assert!(keys[0].is_score);
        assert_eq!(keys[0].order, SortOrder::Desc);
    }

    #[test]
    fn mva_mode_is_parsed() {
        let keys = compile_sort(&json!([{"price": {"order": "asc", "mode": "min"}}])).unwrap();
        assert_eq!(keys[0].mode, Some(SortMode::Min));
    }

    #[test]
    fn geo_distance_is_rejected() {
        assert!(compile_sort(&json!([{"location": {"geo_distance": {"lat": 1, "lon": 2}}}])).is_err());
    }
}
