//! `query` subtree compilation (§4.6): `match`, `match_phrase`,
//! `match_all`, `bool`, `query_string`.

use serde_json::Value;

use super::error::{parse_err, require_object, require_str};
use crate::error::Result;
use crate::model::query_ast::{KeywordPayload, QueryNode};

/// Splits a query string into whitespace-delimited words; the real
/// tokenizer lives outside the core (§1 "OUT OF SCOPE"), so request
/// compilation only needs to know how many atoms a field clause produces.
fn split_words(s: &str) -> Vec<&str> {
    s.split_whitespace().collect()
}

fn keyword_node(word: &str, query_pos: u32) -> QueryNode {
    QueryNode::Keyword(KeywordPayload {
        word: word.to_string(),
        query_pos,
        excluded: false,
        expanded: false,
        field_start: false,
        field_end: false,
        morphed: false,
        boost: 1.0,
    })
}

fn words_to_node(words: &[&str], start_pos: u32, op_and: bool) -> QueryNode {
    let children: Vec<QueryNode> = words.iter().enumerate().map(|(i, w)| keyword_node(w, start_pos + i as u32)).collect();
    if children.len() == 1 {
        return children.into_iter().next().unwrap();
    }
    if op_and {
        QueryNode::And(children)
    } else {
        QueryNode::Or(children)
    }
}

fn compile_match_value(context: &'static str, value: &Value, force_phrase: bool, pos: u32) -> Result<QueryNode> {
    match value {
        Value::String(s) => {
            let words = split_words(s);
            if words.is_empty() {
                return Err(parse_err(context, "empty match query"));
            }
            if force_phrase {
                Ok(QueryNode::Phrase(words.iter().enumerate().map(|(i, w)| keyword_node(w, pos + i as u32)).collect()))
            } else {
                Ok(words_to_node(&words, pos, true))
            }
        }
        Value::Object(obj) => {
            let query = obj.get("query").and_then(Value::as_str).ok_or_else(|| parse_err(context, "match object missing `query`"))?;
            let operator = obj.get("operator").and_then(Value::as_str).unwrap_or("or");
            let words = split_words(query);
            if words.is_empty() {
                return Err(parse_err(context, "empty match query"));
            }
            if force_phrase {
                Ok(QueryNode::Phrase(words.iter().enumerate().map(|(i, w)| keyword_node(w, pos + i as u32)).collect()))
            } else {
                Ok(words_to_node(&words, pos, operator.eq_ignore_ascii_case("and")))
            }
        }
        _ => Err(parse_err(context, "expected a string or object")),
    }
}

fn compile_match(obj: &serde_json::Map<String, Value>, force_phrase: bool) -> Result<QueryNode> {
    let mut pos = 0u32;
    let mut nodes = Vec::new();
    for (_field, value) in obj {
        let node = compile_match_value("match", value, force_phrase, pos)?;
        pos += node.max_query_pos() + 1;
        nodes.push(node);
    }
    Ok(QueryNode::And(nodes).elide_singletons())
}

fn compile_bool(obj: &serde_json::Map<String, Value>) -> Result<QueryNode> {
    let mut pos = 0u32;
    let mut compile_clauses = |key: &str| -> Result<Vec<QueryNode>> {
        let Some(v) = obj.get(key) else { return Ok(Vec::new()) };
        let arr = match v {
            Value::Array(a) => a.clone(),
            other => vec![other.clone()],
        };
        let mut out = Vec::new();
        for clause in &arr {
            let node = compile_query_value(clause, &mut pos)?;
            out.push(node);
        }
        Ok(out)
    };

    let must = compile_clauses("must")?;
    let must_not = compile_clauses("must_not")?;
    let should = compile_clauses("should")?;

    let positive = if must.is_empty() {
        QueryNode::Null
    } else {
        QueryNode::And(must).elide_singletons()
    };

    let with_negatives = if must_not.is_empty() {
        positive
    } else {
        let negated = QueryNode::Or(must_not).elide_singletons();
        QueryNode::AndNot(Box::new(positive), Box::new(negated))
    };

    let final_node = if should.is_empty() {
        with_negatives
    } else {
        let should_node = QueryNode::Or(should).elide_singletons();
        QueryNode::MaybeAnd(Box::new(with_negatives), Box::new(should_node))
    };

    Ok(final_node)
}

fn compile_query_value(value: &Value, pos: &mut u32) -> Result<QueryNode> {
    let obj = require_object("query", value)?;
    let node = compile_query_object(obj, *pos)?;
    *pos += node.max_query_pos() + 1;
    Ok(node)
}

fn compile_query_object(obj: &serde_json::Map<String, Value>, start_pos: u32) -> Result<QueryNode> {
    if let Some(v) = obj.get("match") {
        return compile_match(require_object("match", v)?, false);
    }
    if let Some(v) = obj.get("match_phrase") {
        return compile_match(require_object("match_phrase", v)?, true);
    }
    if obj.contains_key("match_all") {
        return Ok(QueryNode::Null);
    }
    if let Some(v) = obj.get("bool") {
        return compile_bool(require_object("bool", v)?);
    }
    if let Some(v) = obj.get("query_string") {
        let s = require_str("query_string", v.get("query").ok_or_else(|| parse_err("query_string", "missing `query`"))?)?;
        let words = split_words(s);
        return Ok(words_to_node(&words, start_pos, true));
    }
    Err(parse_err("query", "unrecognised query clause"))
}

/// Compiles the top-level `query` subtree (§4.6).
pub fn compile_query(value: &Value) -> Result<QueryNode> {
    if value.is_null() {
        return Err(parse_err("query", "empty query"));
    }
    let obj = require_object("query", value)?;
    if obj.is_empty() {
        return Err(parse_err("query", "empty query"));
    }
    compile_query_object(obj, 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn s2_bool_must_should_must_not_compiles_to_maybe_and_not() {
        let query = json!({
            "bool": {
                "must": [{"match": {"body": "brown"}}],
                "must_not": [{"match": {"body": "fox"}}],
                "should": [{"match": {"body": "quick"}}]
            }
        });
        let node = compile_query(&query).unwrap();
        match node {
            QueryNode::MaybeAnd(left, right) => {
                match *left {
                    QueryNode::AndNot(positive, negative) => {
                        assert!(matches!(*positive, QueryNode::Keyword(ref k) if k.word == "brown"));
                        assert!(matches!(*negative, QueryNode::Keyword(ref k) if k.word == "fox"));
                    }
                    other => panic!("expected AndNot, got {other:?}"),
                }
                assert!(matches!(*right, QueryNode::Keyword(ref k) if k.word == "quick"));
            }
            other => panic!("expected MaybeAnd, got {other:?}"),
        }
    }

    #[test]
    fn match_phrase_forces_phrase_node() {
        let query = json!({"match_phrase": {"body": "quick brown fox"}});
        let node = compile_query(&query).unwrap();
        assert!(matches!(node, QueryNode::Phrase(ref words) if words.len() == 3));
    }

    #[test]
    fn match_all_compiles_to_null() {
        let query = json!({"match_all": {}});
        assert!(matches!(compile_query(&query).unwrap(), QueryNode::Null));
    }

    #[test]
    fn empty_query_is_an_error() {
        assert!(compile_query(&json!({})).is_err());
    }
}
