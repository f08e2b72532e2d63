//! Leaf iterator over a single keyword's posting list.

use super::{terminate, StreamIterator, BLOCK_SIZE};
use crate::model::qword::{Postings, Qword};
use crate::model::{Doc, Hit, INVALID_ROWID};

/// A leaf node created by the index layer from `(word_id, field_restriction)`
/// per §6; here it wraps a caller-supplied [`Qword`].
pub struct KeywordIterator<P> {
    qword: Qword<P>,
    doc_buf: Vec<Doc>,
    hit_buf: Vec<Hit>,
}

impl<P: Postings> KeywordIterator<P> {
    pub fn new(qword: Qword<P>) -> KeywordIterator<P> {
        KeywordIterator { qword, doc_buf: Vec::with_capacity(BLOCK_SIZE + 1), hit_buf: Vec::new() }
    }
}

impl<P: Postings> StreamIterator for KeywordIterator<P> {
    fn get_docs(&mut self) -> &[Doc] {
        self.doc_buf.clear();
        while self.doc_buf.len() < BLOCK_SIZE {
            match self.qword.next_doc() {
                Some(d) => self.doc_buf.push(d),
                None => break,
            }
        }
        terminate(&mut self.doc_buf);
        &self.doc_buf
    }

    fn get_hits(&mut self, docs: &[Doc]) -> &[Hit] {
        self.hit_buf.clear();
        let wanted: Vec<u32> = docs.iter().take_while(|d| d.is_valid()).map(|d| d.row_id).collect();
        if wanted.is_empty() {
            return &self.hit_buf;
        }
        let lo = *wanted.first().unwrap();
        let hi = *wanted.last().unwrap();
        let mut idx = 0usize;
        while let Some(h) = self.qword.next_hit() {
            if h.row_id < lo {
                continue;
            }
            if h.row_id > hi {
                break;
            }
            while idx < wanted.len() && wanted[idx] < h.row_id {
                idx += 1;
            }
            if idx < wanted.len() && wanted[idx] == h.row_id {
                self.hit_buf.push(h);
            }
        }
        &self.hit_buf
    }

    fn advance_to(&mut self, row_id: u32) -> Option<Doc> {
        if row_id == INVALID_ROWID {
            return None;
        }
        self.qword.advance_to(row_id)
    }

    fn reset(&mut self) {
        self.qword.reset_cursors();
        self.doc_buf.clear();
        self.hit_buf.clear();
    }
}
