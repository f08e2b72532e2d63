//! Posting-word state (§3 "Posting word (`Qword`)").
//!
//! A `Qword` owns the cursor over one keyword's posting list. Leaf stream
//! iterators (`crate::iter::leaf::KeywordIterator`) are built around a
//! `Qword`; higher-level operators never see it directly.

use super::doc::Doc;
use super::hit::Hit;
use super::hitpos::FieldMask;

/// Read-only access to a single keyword's posting list, supplied by the
/// (out of scope) index layer. This is the seam described in §6 as
/// "Leaf iterators are created by the index layer from `(word_id,
/// field_restriction)`".
pub trait Postings {
    fn docs(&self) -> &[Doc];
    fn hits(&self) -> &[Hit];
}

/// Cursor state over one keyword's posting list.
#[derive(Debug, Clone)]
pub struct Qword<P> {
    postings: P,
    doc_cursor: usize,
    hit_cursor: usize,
    pub doc_count: u64,
    pub hit_count: u64,
    pub doc_fields: FieldMask,
    /// The keyword's position in the parsed query.
    pub atom_pos: u32,
}

impl<P: Postings> Qword<P> {
    pub fn new(postings: P, atom_pos: u32) -> Qword<P> {
        let doc_count = postings.docs().len() as u64;
        let hit_count = postings.hits().len() as u64;
        let mut doc_fields = FieldMask::new();
        for d in postings.docs() {
            doc_fields = doc_fields.union(d.fields);
        }
        Qword { postings, doc_cursor: 0, hit_cursor: 0, doc_count, hit_count, doc_fields, atom_pos }
    }

    pub fn next_doc(&mut self) -> Option<Doc> {
        let docs = self.postings.docs();
        if self.doc_cursor >= docs.len() {
            return None;
        }
        let d = docs[self.doc_cursor];
        self.doc_cursor += 1;
        Some(d)
    }

    pub fn next_hit(&mut self) -> Option<Hit> {
        let hits = self.postings.hits();
        if self.hit_cursor >= hits.len() {
            return None;
        }
        let h = hits[self.hit_cursor];
        self.hit_cursor += 1;
        Some(h)
    }

    /// Repositions the hit cursor to an absolute offset into the posting's
    /// hit list, used to resynchronise after `advance_to`.
    pub fn seek_hitlist(&mut self, offset: usize) {
        self.hit_cursor = offset.min(self.postings.hits().len());
    }

    /// Advances the doc cursor to the first doc with `row_id >= target`.
    pub fn advance_to(&mut self, target: u32) -> Option<Doc> {
        let docs = self.postings.docs();
        while self.doc_cursor < docs.len() && docs[self.doc_cursor].row_id < target {
            self.doc_cursor += 1;
        }
        docs.get(self.doc_cursor).copied().inspect(|_| self.doc_cursor += 1)
    }

    /// Collects the field mask of all hits belonging to `row_id` without
    /// consuming the cursor, used by early-filters that only need
    /// "which fields did this keyword hit".
    pub fn collect_hit_mask(&self, row_id: u32) -> FieldMask {
        let mut mask = FieldMask::new();
        for h in self.postings.hits() {
            if h.row_id == row_id {
                mask.set(h.hitpos.field());
            }
        }
        mask
    }

    pub fn reset_cursors(&mut self) {
        self.doc_cursor = 0;
        self.hit_cursor = 0;
    }
}

/// A simple in-memory posting list, used by leaf iterators over
/// caller-supplied fixtures and by the crate's own tests.
#[derive(Debug, Clone, Default)]
pub struct VecPostings {
    pub docs: Vec<Doc>,
    pub hits: Vec<Hit>,
}

impl Postings for VecPostings {
    fn docs(&self) -> &[Doc] {
        &self.docs
    }
    fn hits(&self) -> &[Hit] {
        &self.hits
    }
}

/// Lets a leaf `Qword<Box<dyn Postings>>` hold whatever posting source the
/// index layer hands the query compiler, without making `KeywordIterator`
/// itself trait-object-shaped.
impl Postings for Box<dyn Postings> {
    fn docs(&self) -> &[Doc] {
        (**self).docs()
    }
    fn hits(&self) -> &[Hit] {
        (**self).hits()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::hitpos::HitPos;

    fn postings() -> VecPostings {
        VecPostings {
            docs: vec![
                Doc { row_id: 1, fields: FieldMask::new(), prefactor: 1.0 },
                Doc { row_id: 3, fields: FieldMask::new(), prefactor: 1.0 },
                Doc { row_id: 5, fields: FieldMask::new(), prefactor: 1.0 },
            ],
            hits: vec![Hit::new(1, HitPos::new(0, 0, false), 0)],
        }
    }

    #[test]
    fn advance_to_finds_first_ge() {
        let mut q = Qword::new(postings(), 0);
        let d = q.advance_to(4).unwrap();
        assert_eq!(d.row_id, 5);
    }

    #[test]
    fn advance_to_past_end_returns_none() {
        let mut q = Qword::new(postings(), 0);
        assert!(q.advance_to(100).is_none());
    }

    #[test]
    fn next_doc_is_sequential() {
        let mut q = Qword::new(postings(), 0);
        assert_eq!(q.next_doc().unwrap().row_id, 1);
        assert_eq!(q.next_doc().unwrap().row_id, 3);
        assert_eq!(q.next_doc().unwrap().row_id, 5);
        assert!(q.next_doc().is_none());
    }
}
