//! `_source` compilation (§4.6): string/array include list, or an object
//! with `includes`/`excludes`; `*` is a significant wildcard.

use serde_json::Value;

use super::error::parse_err;
use crate::error::Result;

#[derive(Debug, Clone, PartialEq)]
pub enum SourceSpec {
    All,
    None,
    Filtered { includes: Vec<String>, excludes: Vec<String> },
}

fn string_list(v: &Value) -> Result<Vec<String>> {
    match v {
        Value::String(s) => Ok(vec![s.clone()]),
        Value::Array(a) => a.iter().map(|e| e.as_str().map(str::to_string).ok_or_else(|| parse_err("_source", "expected an array of strings"))).collect(),
        _ => Err(parse_err("_source", "expected a string or array of strings")),
    }
}

pub fn compile_source(value: &Value) -> Result<SourceSpec> {
    match value {
        Value::Bool(true) => Ok(SourceSpec::All),
        Value::Bool(false) => Ok(SourceSpec::None),
        Value::String(s) if s == "*" => Ok(SourceSpec::All),
        Value::String(_) | Value::Array(_) => {
            let includes = string_list(value)?;
            if includes.iter().any(|s| s == "*") {
                Ok(SourceSpec::All)
            } else {
                Ok(SourceSpec::Filtered { includes, excludes: Vec::new() })
            }
        }
        Value::Object(obj) => {
            let includes = obj.get("includes").map(string_list).transpose()?.unwrap_or_default();
            let excludes = obj.get("excludes").map(string_list).transpose()?.unwrap_or_default();
            if includes.iter().any(|s| s == "*") && excludes.is_empty() {
                Ok(SourceSpec::All)
            } else {
                Ok(SourceSpec::Filtered { includes, excludes })
            }
        }
        _ => Err(parse_err("_source", "malformed _source")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn bool_true_means_all() {
        assert_eq!(compile_source(&json!(true)).unwrap(), SourceSpec::All);
    }

    #[test]
    fn wildcard_string_means_all() {
        assert_eq!(compile_source(&json!("*")).unwrap(), SourceSpec::All);
    }

    #[test]
    fn array_becomes_includes() {
        let spec = compile_source(&json!(["title", "body"])).unwrap();
        assert_eq!(spec, SourceSpec::Filtered { includes: vec!["title".into(), "body".into()], excludes: vec![] });
    }

    #[test]
    fn object_with_includes_excludes() {
        let spec = compile_source(&json!({"includes": ["title"], "excludes": ["body"]})).unwrap();
        assert_eq!(spec, SourceSpec::Filtered { includes: vec!["title".into()], excludes: vec!["body".into()] });
    }
}
