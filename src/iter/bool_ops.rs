//! Boolean combinators: AND intersects, OR merges, AND-NOT subtracts,
//! MAYBE (MaybeAnd) unions but never requires the optional side (§4.1, used
//! by the JSON compiler's `bool` clause compilation, §4.6).

use super::{terminate, StreamIterator, BLOCK_SIZE};
use crate::model::{Doc, Hit};

type Child = Box<dyn StreamIterator>;

fn merge_children_docs(children: &mut [Child]) -> Vec<Vec<Doc>> {
    children.iter_mut().map(|c| c.get_docs().to_vec()).collect()
}

/// Intersects N children by row id, stopping each chunk at `BLOCK_SIZE`
/// output docs (re-pulling child chunks as they're exhausted).
pub struct And {
    children: Vec<Child>,
    doc_buf: Vec<Doc>,
    hit_buf: Vec<Hit>,
    child_docs: Vec<Vec<Doc>>,
    child_pos: Vec<usize>,
}

impl And {
    pub fn new(children: Vec<Child>) -> And {
        let n = children.len();
        And {
            children,
            doc_buf: Vec::with_capacity(BLOCK_SIZE + 1),
            hit_buf: Vec::new(),
            child_docs: vec![Vec::new(); n],
            child_pos: vec![0; n],
        }
    }

    fn refill(&mut self, i: usize) -> bool {
        self.child_docs[i] = self.children[i].get_docs().to_vec();
        self.child_pos[i] = 0;
        self.child_docs[i].first().is_some_and(Doc::is_valid)
    }

    fn peek(&mut self, i: usize) -> Option<Doc> {
        loop {
            if self.child_pos[i] >= self.child_docs[i].len()
                || !self.child_docs[i][self.child_pos[i]].is_valid()
            {
                if !self.refill(i) {
                    return None;
                }
                continue;
            }
            return Some(self.child_docs[i][self.child_pos[i]]);
        }
    }

    fn advance(&mut self, i: usize) {
        self.child_pos[i] += 1;
    }
}

impl StreamIterator for And {
    fn get_docs(&mut self) -> &[Doc] {
        self.doc_buf.clear();
        if self.children.is_empty() {
            terminate(&mut self.doc_buf);
            return &self.doc_buf;
        }
        'outer: while self.doc_buf.len() < BLOCK_SIZE {
            let mut max_row = match self.peek(0) {
                Some(d) => d.row_id,
                None => break,
            };
            loop {
                let mut advanced = false;
                for i in 0..self.children.len() {
                    let d = match self.peek(i) {
                        Some(d) => d,
                        None => break 'outer,
                    };
                    if d.row_id < max_row {
                        self.advance(i);
                        advanced = true;
                    } else if d.row_id > max_row {
                        max_row = d.row_id;
                        advanced = true;
                    }
                }
                if !advanced {
                    break;
                }
            }
            let mut prefactor = 0.0f32;
            let mut fields = crate::model::FieldMask::new();
            for i in 0..self.children.len() {
                if let Some(d) = self.peek(i) {
                    prefactor += d.prefactor;
                    fields = fields.union(d.fields);
                    self.advance(i);
                }
            }
            self.doc_buf.push(Doc { row_id: max_row, fields, prefactor });
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
        let per_child: Vec<&[Hit]> = self.children.iter_mut().map(|c| c.get_hits(docs)).collect();
        let mut all: Vec<Hit> = per_child.into_iter().flatten().copied().collect();
        all.sort_by_key(|h| (h.row_id, h.hitpos.pos_with_field()));
        self.hit_buf = all;
        &self.hit_buf
    }

    fn advance_to(&mut self, row_id: u32) -> Option<Doc> {
        for c in &mut self.children {
            c.advance_to(row_id);
        }
        self.child_pos.iter_mut().for_each(|p| *p = usize::MAX);
        None
    }

    fn reset(&mut self) {
        for c in &mut self.children {
            c.reset();
        }
        self.child_docs.iter_mut().for_each(Vec::clear);
        self.child_pos.iter_mut().for_each(|p| *p = 0);
    }
}

/// Merges N children by row id (union), summing prefactors and or-ing
/// field masks on collision.
pub struct Or {
    children: Vec<Child>,
    doc_buf: Vec<Doc>,
    hit_buf: Vec<Hit>,
}

impl Or {
    pub fn new(children: Vec<Child>) -> Or {
        Or { children, doc_buf: Vec::with_capacity(BLOCK_SIZE + 1), hit_buf: Vec::new() }
    }
}

impl StreamIterator for Or {
    fn get_docs(&mut self) -> &[Doc] {
        let all = merge_children_docs(&mut self.children);
        let mut merged: Vec<Doc> = all.into_iter().flatten().filter(Doc::is_valid).collect();
        merged.sort_by_key(|d| d.row_id);
        self.doc_buf.clear();
        let mut i = 0;
        while i < merged.len() && self.doc_buf.len() < BLOCK_SIZE {
            let mut d = merged[i];
            let mut j = i + 1;
            while j < merged.len() && merged[j].row_id == d.row_id {
                d.prefactor += merged[j].prefactor;
                d.fields = d.fields.union(merged[j].fields);
                j += 1;
            }
            self.doc_buf.push(d);
            i = j;
        }
        terminate(&mut self.doc_buf);
        &self.doc_buf
    }

    fn get_hits(&mut self, docs: &[Doc]) -> &[Hit] {
        self.hit_buf.clear();
        let per_child: Vec<&[Hit]> = self.children.iter_mut().map(|c| c.get_hits(docs)).collect();
        let mut all: Vec<Hit> = per_child.into_iter().flatten().copied().collect();
        all.sort_by_key(|h| (h.row_id, h.hitpos.pos_with_field()));
        self.hit_buf = all;
        &self.hit_buf
    }

    fn advance_to(&mut self, row_id: u32) -> Option<Doc> {
        for c in &mut self.children {
            c.advance_to(row_id);
        }
        None
    }

    fn reset(&mut self) {
        for c in &mut self.children {
            c.reset();
        }
    }
}

/// Subtracts the right child's docs from the left's.
pub struct AndNot {
    left: Child,
    right: Child,
    doc_buf: Vec<Doc>,
    hit_buf: Vec<Hit>,
}

impl AndNot {
    pub fn new(left: Child, right: Child) -> AndNot {
        AndNot { left, right, doc_buf: Vec::with_capacity(BLOCK_SIZE + 1), hit_buf: Vec::new() }
    }
}

impl StreamIterator for AndNot {
    fn get_docs(&mut self) -> &[Doc] {
        let left = self.left.get_docs().to_vec();
        let excluded: std::collections::HashSet<u32> = self
            .right
            .get_docs()
            .iter()
            .filter(|d| d.is_valid())
            .map(|d| d.row_id)
            .collect();
        self.doc_buf.clear();
        for d in left.into_iter().filter(Doc::is_valid) {
            if !excluded.contains(&d.row_id) {
                self.doc_buf.push(d);
                if self.doc_buf.len() >= BLOCK_SIZE {
                    break;
                }
            }
        }
        terminate(&mut self.doc_buf);
        &self.doc_buf
    }

    fn get_hits(&mut self, docs: &[Doc]) -> &[Hit] {
        self.hit_buf.clear();
        self.hit_buf.extend_from_slice(self.left.get_hits(docs));
        &self.hit_buf
    }

    fn advance_to(&mut self, row_id: u32) -> Option<Doc> {
        self.left.advance_to(row_id);
        self.right.advance_to(row_id);
        None
    }

    fn reset(&mut self) {
        self.left.reset();
        self.right.reset();
    }
}

/// `MAYBE(required, optional)`: behaves like `required` for doc
/// membership, but merges in the optional side's hits/weight where
/// present. Used to compile a `bool` clause's `should` list (§4.6).
pub struct MaybeAnd {
    required: Child,
    optional: Child,
    doc_buf: Vec<Doc>,
    hit_buf: Vec<Hit>,
}

impl MaybeAnd {
    pub fn new(required: Child, optional: Child) -> MaybeAnd {
        MaybeAnd { required, optional, doc_buf: Vec::with_capacity(BLOCK_SIZE + 1), hit_buf: Vec::new() }
    }
}

impl StreamIterator for MaybeAnd {
    fn get_docs(&mut self) -> &[Doc] {
        let required = self.required.get_docs().to_vec();
        let optional: std::collections::HashMap<u32, Doc> = self
            .optional
            .get_docs()
            .iter()
            .filter(|d| d.is_valid())
            .map(|d| (d.row_id, *d))
            .collect();
        self.doc_buf.clear();
        for mut d in required.into_iter().filter(Doc::is_valid) {
            if let Some(opt) = optional.get(&d.row_id) {
                d.prefactor += opt.prefactor;
                d.fields = d.fields.union(opt.fields);
            }
            self.doc_buf.push(d);
            if self.doc_buf.len() >= BLOCK_SIZE {
                break;
            }
        }
        terminate(&mut self.doc_buf);
        &self.doc_buf
    }

    fn get_hits(&mut self, docs: &[Doc]) -> &[Hit] {
        self.hit_buf.clear();
        self.hit_buf.extend_from_slice(self.required.get_hits(docs));
        self.hit_buf.extend_from_slice(self.optional.get_hits(docs));
        self.hit_buf.sort_by_key(|h| (h.row_id, h.hitpos.pos_with_field()));
        &self.hit_buf
    }

    fn advance_to(&mut self, row_id: u32) -> Option<Doc> {
        self.required.advance_to(row_id);
        self.optional.advance_to(row_id);
        None
    }

    fn reset(&mut self) {
        self.required.reset();
        self.optional.reset();
    }
}
