//! Stream iterator tree (C1, §4.1). Every operator node composes the same
//! two-method contract: pull a chunk of docs, then pull the hits that back
//! exactly those docs.

pub mod bool_ops;
pub mod build;
pub mod leaf;
pub mod limit;
pub mod position_ops;

pub use build::{build_iterator, WordSource, ZoneRegistry};

use crate::model::{Doc, Hit, INVALID_ROWID};

/// Conventional chunk size; must stay a power of two (§4.1).
pub const BLOCK_SIZE: usize = 1024;

/// The stream iterator contract of §4.1.
///
/// - `get_docs` returns the next chunk, terminated by [`INVALID_ROWID`],
///   strictly increasing by row id; it is re-callable until exhausted.
/// - `get_hits` returns the hits covering exactly the docs just returned by
///   `get_docs`, ordered first by row id then by `pos_with_field`.
/// - `advance_to` skips forward to the first doc with `row_id >= target`.
/// - `reset` reopens the iterator against a fresh segment (a no-op for the
///   in-memory fixtures this crate ships, but part of the trait contract
///   every operator must forward to its children).
pub trait StreamIterator {
    fn get_docs(&mut self) -> &[Doc];
    fn get_hits(&mut self, docs: &[Doc]) -> &[Hit];
    fn advance_to(&mut self, row_id: u32) -> Option<Doc>;
    fn reset(&mut self);
}

impl StreamIterator for Box<dyn StreamIterator> {
    fn get_docs(&mut self) -> &[Doc] {
        (**self).get_docs()
    }

    fn get_hits(&mut self, docs: &[Doc]) -> &[Hit] {
        (**self).get_hits(docs)
    }

    fn advance_to(&mut self, row_id: u32) -> Option<Doc> {
        (**self).advance_to(row_id)
    }

    fn reset(&mut self) {
        (**self).reset()
    }
}

/// Appends the [`INVALID_ROWID`] sentinel to a doc buffer, as every
/// `get_docs` implementation must before returning.
pub(crate) fn terminate(buf: &mut Vec<Doc>) {
    buf.push(Doc::INVALID);
}

/// Strips a trailing sentinel, used by operators that re-derive docs from a
/// child's already-terminated buffer.
pub(crate) fn strip_sentinel(docs: &[Doc]) -> &[Doc] {
    match docs.last() {
        Some(d) if !d.is_valid() => &docs[..docs.len() - 1],
        _ => docs,
    }
}

#[cfg(test)]
pub(crate) fn debug_assert_docs_ordered(docs: &[Doc]) {
    let mut prev = None;
    for d in strip_sentinel(docs) {
        if let Some(p) = prev {
            debug_assert!(d.row_id > p, "docs not strictly increasing: {p} then {}", d.row_id);
        }
        prev = Some(d.row_id);
    }
}

#[cfg(test)]
pub(crate) fn debug_assert_hits_ordered(hits: &[Hit]) {
    let mut prev: Option<(u32, u32)> = None;
    for h in hits {
        let key = (h.row_id, h.hitpos.pos_with_field());
        if let Some(p) = prev {
            debug_assert!(
                key.0 > p.0 || (key.0 == p.0 && key.1 > p.1),
                "hits not strictly increasing: {p:?} then {key:?}"
            );
        }
        prev = Some(key);
    }
}
