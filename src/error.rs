//! Error taxonomy (§7): an outer enum dispatching to `InternalError`
//! (invariants violated, collaborator failures) and `UserError` (bad
//! request, caller's fault).

use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("internal: {0}")]
    Internal(#[from] InternalError),
    #[error(transparent)]
    User(#[from] UserError),
}

#[derive(Error, Debug)]
pub enum InternalError {
    #[error("hits out of order for document {row_id}: {prev:?} then {next:?}")]
    HitsOutOfOrder { row_id: u32, prev: u32, next: u32 },
    #[error("docs out of order: {prev} then {next}")]
    DocsOutOfOrder { prev: u32, next: u32 },
    #[error("zone cache invariant violated for zone {zone:?}: {reason}")]
    ZoneCacheInvariant { zone: String, reason: &'static str },
    #[error("ranker state {0} invoked out of lifecycle order")]
    RankerLifecycle(&'static str),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum UserError {
    #[error("{0}")]
    Parse(#[from] ParseError),
    #[error("unknown field: {0}")]
    UnknownField(String),
    #[error("unknown zone: {0}")]
    UnknownZone(String),
    #[error("unknown ranking expression function: {0}")]
    UnknownFunction(String),
    #[error("no ranker plugin registered under `{0}`")]
    UnknownPlugin(String),
    #[error("wrong argument type for `{function}`: {reason}")]
    TypeError { function: &'static str, reason: String },
    #[error("dictionary error: {0}")]
    Dictionary(String),
    #[error("tokenizer error: {0}")]
    Tokenizer(String),
}

/// A parse failure with location and narrowest context, per §7's
/// "reported with location and narrowest context" requirement.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{context}: {message}{}", path.as_ref().map(|p| format!(" (at {p})")).unwrap_or_default())]
pub struct ParseError {
    pub context: &'static str,
    pub message: String,
    pub path: Option<String>,
}

impl ParseError {
    pub fn new(context: &'static str, message: impl Into<String>) -> ParseError {
        ParseError { context, message: message.into(), path: None }
    }

    pub fn at(mut self, path: impl Into<String>) -> ParseError {
        self.path = Some(path.into());
        self
    }
}

/// The structured JSON shape described by §7 ("User-visible failure").
#[derive(Debug, Clone, serde::Serialize)]
pub struct ErrorResponse {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub reason: String,
}

impl From<&Error> for ErrorResponse {
    fn from(e: &Error) -> ErrorResponse {
        let kind = match e {
            Error::Internal(_) => "internal",
            Error::User(UserError::Parse(_)) => "parse",
            Error::User(UserError::UnknownField(_)) | Error::User(UserError::UnknownZone(_))
            | Error::User(UserError::UnknownFunction(_)) | Error::User(UserError::UnknownPlugin(_)) => "lookup",
            Error::User(UserError::TypeError { .. }) => "type",
            Error::User(UserError::Dictionary(_)) => "dictionary",
            Error::User(UserError::Tokenizer(_)) => "tokenizer",
        };
        ErrorResponse { kind, reason: e.to_string() }
    }
}
