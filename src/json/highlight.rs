//! `highlight` compilation (§4.6). Both the Elastic-compatible keys and
//! the native ones are recognised; anything else is passed through
//! untouched in `extra` for collaborators this core doesn't interpret
//! itself (tags, HTML stripping modes, passage packing).

use serde_json::Value;

use super::error::{parse_err, require_object};
use crate::error::Result;

/// Reserved select-item name the compiler emits for the synthesised
/// `HIGHLIGHT(opts, fields, query)` item (§4.6).
pub const HIGHLIGHT_ALIAS: &str = "@highlight";

#[derive(Debug, Clone, PartialEq)]
pub struct HighlightSpec {
    pub fields: Vec<String>,
    pub fragment_size: Option<u32>,
    pub number_of_fragments: Option<u32>,
    pub pre_tags: Vec<String>,
    pub post_tags: Vec<String>,
    pub no_match_size: Option<u32>,
    pub order: Option<String>,
    pub encoder: Option<String>,
    pub limit: Option<u32>,
    pub limit_passages: Option<u32>,
    pub limit_words: Option<u32>,
    pub around: Option<u32>,
    pub use_boundaries: bool,
    pub weight_order: bool,
    pub force_all_words: bool,
    pub html_strip_mode: Option<String>,
    pub allow_empty: bool,
    pub emit_zones: bool,
    pub force_passages: bool,
    pub pack_fields: bool,
    pub limits_per_field: bool,
    pub passage_boundary: Option<String>,
}

impl Default for HighlightSpec {
    fn default() -> HighlightSpec {
        HighlightSpec {
            fields: Vec::new(),
            fragment_size: None,
            number_of_fragments: None,
            pre_tags: vec!["<em>".to_string()],
            post_tags: vec!["</em>".to_string()],
            no_match_size: None,
            order: None,
            encoder: None,
            limit: None,
            limit_passages: None,
            limit_words: None,
            around: None,
            use_boundaries: true,
            weight_order: false,
            force_all_words: false,
            html_strip_mode: None,
            allow_empty: true,
            emit_zones: false,
            force_passages: false,
            pack_fields: false,
            limits_per_field: false,
            passage_boundary: None,
        }
    }
}

fn u32_field(obj: &serde_json::Map<String, Value>, key: &str) -> Result<Option<u32>> {
    match obj.get(key) {
        None => Ok(None),
        Some(v) => v.as_u64().map(|n| Some(n as u32)).ok_or_else(|| parse_err("highlight", format!("`{key}` must be an integer"))),
    }
}

fn str_list_field(obj: &serde_json::Map<String, Value>, key: &str) -> Result<Option<Vec<String>>> {
    match obj.get(key) {
        None => Ok(None),
        Some(Value::Array(a)) => Ok(Some(a.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())),
        Some(Value::String(s)) => Ok(Some(vec![s.clone()])),
        Some(_) => Err(parse_err("highlight", format!("`{key}` must be a string or array"))),
    }
}

fn bool_field(obj: &serde_json::Map<String, Value>, key: &str, default: bool) -> Result<bool> {
    match obj.get(key) {
        None => Ok(default),
        Some(v) => v.as_bool().ok_or_else(|| parse_err("highlight", format!("`{key}` must be a boolean"))),
    }
}

pub fn compile_highlight(value: &Value) -> Result<HighlightSpec> {
    let obj = require_object("highlight", value)?;
    let fields = match obj.get("fields") {
        Some(Value::Object(m)) => m.keys().cloned().collect(),
        Some(Value::Array(a)) => a.iter().filter_map(|v| v.as_str().map(str::to_string)).collect(),
        None => Vec::new(),
        Some(_) => return Err(parse_err("highlight", "`fields` must be an array or object")),
    };

    let mut spec = HighlightSpec { fields, ..HighlightSpec::default() };
    spec.fragment_size = u32_field(obj, "fragment_size")?;
    spec.number_of_fragments = u32_field(obj, "number_of_fragments")?;
    if let Some(tags) = str_list_field(obj, "pre_tags")? {
        spec.pre_tags = tags;
    }
    if let Some(tags) = str_list_field(obj, "post_tags")? {
        spec.post_tags = tags;
    }
    spec.no_match_size = u32_field(obj, "no_match_size")?;
    spec.order = obj.get("order").and_then(Value::as_str).map(str::to_string);
    spec.encoder = obj.get("encoder").and_then(Value::as_str).map(str::to_string);
    spec.limit = u32_field(obj, "limit")?;
    spec.limit_passages = u32_field(obj, "limit_passages")?;
    spec.limit_words = u32_field(obj, "limit_words")?;
    spec.around = u32_field(obj, "around")?;
    spec.use_boundaries = bool_field(obj, "use_boundaries", true)?;
    spec.weight_order = bool_field(obj, "weight_order", false)?;
    spec.force_all_words = bool_field(obj, "force_all_words", false)?;
    spec.html_strip_mode = obj.get("html_strip_mode").and_then(Value::as_str).map(str::to_string);
    spec.allow_empty = bool_field(obj, "allow_empty", true)?;
    spec.emit_zones = bool_field(obj, "emit_zones", false)?;
    spec.force_passages = bool_field(obj, "force_passages", false)?;
    spec.pack_fields = bool_field(obj, "pack_fields", false)?;
    spec.limits_per_field = bool_field(obj, "limits_per_field", false)?;
    spec.passage_boundary = obj.get("passage_boundary").and_then(Value::as_str).map(str::to_string);

    if obj.contains_key("nested_path") || obj.contains_key("nested_filter") {
        return Err(parse_err("highlight", "nested_path/nested_filter are not supported"));
    }

    Ok(spec)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn default_tags_are_em() {
        let spec = compile_highlight(&json!({"fields": ["body"]})).unwrap();
        assert_eq!(spec.pre_tags, vec!["<em>"]);
        assert_eq!(spec.fields, vec!["body"]);
    }

    #[test]
    fn custom_tags_override_defaults() {
        let spec = compile_highlight(&json!({"fields": ["body"], "pre_tags": ["<b>"], "post_tags": ["</b>"]})).unwrap();
        assert_eq!(spec.pre_tags, vec!["<b>"]);
    }

    #[test]
    fn nested_path_is_rejected() {
        assert!(compile_highlight(&json!({"fields": ["body"], "nested_path": "x"})).is_err());
    }
}
