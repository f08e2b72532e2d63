//! `aggs` compilation (§4.6): `{ bucket_name: { terms_like: { field, size } } }`.
//! Each bucket becomes a secondary grouping query over the named field.

use serde_json::Value;

use super::error::{parse_err, require_object};
use crate::error::Result;

#[derive(Debug, Clone, PartialEq)]
pub struct AggBucket {
    pub name: String,
    pub field: String,
    pub size: u32,
}

const DEFAULT_BUCKET_SIZE: u32 = 10;

fn compile_bucket(name: &str, spec: &Value) -> Result<AggBucket> {
    let obj = require_object("aggs", spec)?;
    let (kind, inner) = obj.iter().next().ok_or_else(|| parse_err("aggs", format!("bucket `{name}` has no aggregation type")))?;
    if kind != "terms" {
        return Err(parse_err("aggs", format!("unsupported aggregation type `{kind}` in bucket `{name}`")));
    }
    let inner_obj = require_object("aggs", inner)?;
    let field = inner_obj
        .get("field")
        .and_then(Value::as_str)
        .ok_or_else(|| parse_err("aggs", format!("bucket `{name}` missing `field`")))?
        .to_string();
    let size = inner_obj.get("size").and_then(Value::as_u64).map(|n| n as u32).unwrap_or(DEFAULT_BUCKET_SIZE);
    Ok(AggBucket { name: name.to_string(), field, size })
}

pub fn compile_aggs(value: &Value) -> Result<Vec<AggBucket>> {
    let obj = require_object("aggs", value)?;
    obj.iter().map(|(name, spec)| compile_bucket(name, spec)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn terms_bucket_compiles() {
        let buckets = compile_aggs(&json!({"by_category": {"terms": {"field": "category", "size": 5}}})).unwrap();
        assert_eq!(buckets, vec![AggBucket { name: "by_category".into(), field: "category".into(), size: 5 }]);
    }

    #[test]
    fn missing_size_defaults() {
        let buckets = compile_aggs(&json!({"by_category": {"terms": {"field": "category"}}})).unwrap();
        assert_eq!(buckets[0].size, DEFAULT_BUCKET_SIZE);
    }

    #[test]
    fn unsupported_agg_type_is_an_error() {
        assert!(compile_aggs(&json!({"by_location": {"geo_distance": {"field": "loc"}}})).is_err());
    }

    #[test]
    fn missing_field_is_an_error() {
        assert!(compile_aggs(&json!({"by_category": {"terms": {"size": 5}}})).is_err());
    }
}
