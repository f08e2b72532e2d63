//! Request-compilation error helpers (§7 "ParseError ... reported with
//! location and narrowest context").

use crate::error::{ParseError, Result, UserError};

pub(crate) fn parse_err(context: &'static str, message: impl Into<String>) -> crate::error::Error {
    UserError::Parse(ParseError::new(context, message)).into()
}

pub(crate) fn require_object<'a>(context: &'static str, v: &'a serde_json::Value) -> Result<&'a serde_json::Map<String, serde_json::Value>> {
    v.as_object().ok_or_else(|| parse_err(context, "expected a JSON object"))
}

pub(crate) fn require_str<'a>(context: &'static str, v: &'a serde_json::Value) -> Result<&'a str> {
    v.as_str().ok_or_else(|| parse_err(context, "expected a JSON string"))
}
