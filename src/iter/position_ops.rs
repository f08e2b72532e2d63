//! Position-predicate operators: PHRASE, PROXIMITY, QUORUM, NEAR, NOT-NEAR,
//! BEFORE, SENTENCE, PARAGRAPH (§4.1).
//!
//! All of these gate on document membership first (an AND for the
//! "all children must hit" operators, a threshold count for QUORUM) and
//! then apply a position predicate over the children's per-document hit
//! lists. A surviving document emits one synthesized hit per match,
//! positioned at the match's leftmost child hit, which is sufficient to
//! satisfy the "hits strictly increasing per document" contract (§4.1)
//! while keeping the per-document scan linear.

use std::collections::HashMap;

use super::{terminate, StreamIterator, BLOCK_SIZE};
use crate::model::{Doc, FieldMask, Hit, HitPos};
use crate::zone::ZoneCache;

type Child = Box<dyn StreamIterator>;

#[derive(Debug, Clone, Copy)]
pub enum Predicate {
    Phrase,
    Proximity(u32),
    Near(u32),
    Before,
    /// Requires all children's hits to land in the same instance of the
    /// named zone (`"sentence"` / `"paragraph"`).
    ZoneBounded,
}

/// `AND`-gated position operator: PHRASE, PROXIMITY, NEAR, BEFORE,
/// SENTENCE, PARAGRAPH all reduce to this with a different [`Predicate`].
pub struct PositionAnd {
    children: Vec<Child>,
    predicate: Predicate,
    zone: Option<(String, ZoneCache)>,
    doc_buf: Vec<Doc>,
    hit_buf: Vec<Hit>,
}

impl PositionAnd {
    pub fn new(children: Vec<Child>, predicate: Predicate) -> PositionAnd {
        PositionAnd { children, predicate, zone: None, doc_buf: Vec::new(), hit_buf: Vec::new() }
    }

    pub fn with_zone(children: Vec<Child>, zone_name: impl Into<String>, cache: ZoneCache) -> PositionAnd {
        PositionAnd {
            children,
            predicate: Predicate::ZoneBounded,
            zone: Some((zone_name.into(), cache)),
            doc_buf: Vec::new(),
            hit_buf: Vec::new(),
        }
    }

    fn candidate_docs(&mut self) -> Vec<Doc> {
        if self.children.is_empty() {
            return Vec::new();
        }
        let per_child: Vec<Vec<u32>> = self
            .children
            .iter_mut()
            .map(|c| c.get_docs().iter().filter(|d| d.is_valid()).map(|d| d.row_id).collect())
            .collect();
        let mut counts: HashMap<u32, (u32, f32, FieldMask)> = HashMap::new();
        for child_docs in &per_child {
            for &row_id in child_docs {
                counts.entry(row_id).or_insert((0, 0.0, FieldMask::new())).0 += 1;
            }
        }
        let n = self.children.len() as u32;
        let mut rows: Vec<u32> =
            counts.iter().filter(|(_, (c, _, _))| *c == n).map(|(r, _)| *r).collect();
        rows.sort_unstable();
        rows.truncate(BLOCK_SIZE);
        rows.into_iter().map(|row_id| Doc { row_id, fields: FieldMask::new(), prefactor: 1.0 }).collect()
    }

    fn matches(&mut self, row_id: u32, child_hits: &[Vec<Hit>]) -> Option<Hit> {
        match self.predicate {
            Predicate::Phrase => phrase_match(child_hits),
            Predicate::Proximity(dist) => proximity_match(child_hits, dist),
            Predicate::Near(dist) => near_match(child_hits, dist),
            Predicate::Before => before_match(child_hits),
            Predicate::ZoneBounded => {
                let (name, cache) = self.zone.as_mut()?;
                zone_bounded_match(name, cache, row_id, child_hits)
            }
        }
    }
}

impl StreamIterator for PositionAnd {
    fn get_docs(&mut self) -> &[Doc] {
        let candidates = self.candidate_docs();
        self.doc_buf.clear();
        if !candidates.is_empty() {
            let child_hits_by_child: Vec<Vec<Hit>> =
                self.children.iter_mut().map(|c| c.get_hits(&candidates).to_vec()).collect();
            for doc in &candidates {
                let per_doc: Vec<Vec<Hit>> = child_hits_by_child
                    .iter()
                    .map(|hits| hits.iter().filter(|h| h.row_id == doc.row_id).copied().collect())
                    .collect();
                if self.matches(doc.row_id, &per_doc).is_some() {
                    self.doc_buf.push(*doc);
                }
            }
        }
        terminate(&mut self.doc_buf);
        &self.doc_buf
    }

    fn get_hits(&mut self, docs: &[Doc]) -> &[Hit] {
        self.hit_buf.clear();
        let wanted: Vec<Doc> = docs.iter().filter(|d| d.is_valid()).copied().collect();
        if wanted.is_empty() {
            return &self.hit_buf;
        }
        let child_hits_by_child: Vec<Vec<Hit>> =
            self.children.iter_mut().map(|c| c.get_hits(&wanted).to_vec()).collect();
        for doc in &wanted {
            let per_doc: Vec<Vec<Hit>> = child_hits_by_child
                .iter()
                .map(|hits| hits.iter().filter(|h| h.row_id == doc.row_id).copied().collect())
                .collect();
            if let Some(h) = self.matches(doc.row_id, &per_doc) {
                self.hit_buf.push(h);
            }
        }
        self.hit_buf.sort_by_key(|h| (h.row_id, h.hitpos.pos_with_field()));
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

fn phrase_match(child_hits: &[Vec<Hit>]) -> Option<Hit> {
    let first = child_hits.first()?;
    'cand: for h0 in first {
        for (i, hits) in child_hits.iter().enumerate().skip(1) {
            let want = hits.iter().any(|h| {
                h.hitpos.field() == h0.hitpos.field() && h.hitpos.pos() == h0.hitpos.pos() + i as u32
            });
            if !want {
                continue 'cand;
            }
        }
        let mut hit = *h0;
        hit.match_len = child_hits.len() as u32;
        return Some(hit);
    }
    None
}

fn window_positions(child_hits: &[Vec<Hit>]) -> Vec<(u32, u32, usize, HitPos)> {
    // (field, pos, child_index, hitpos)
    let mut out = Vec::new();
    for (i, hits) in child_hits.iter().enumerate() {
        for h in hits {
            out.push((h.hitpos.field(), h.hitpos.pos(), i, h.hitpos));
        }
    }
    out.sort_by_key(|(f, p, _, _)| (*f, *p));
    out
}

fn proximity_match(child_hits: &[Vec<Hit>], dist: u32) -> Option<Hit> {
    if child_hits.iter().any(Vec::is_empty) {
        return None;
    }
    let n = child_hits.len();
    let positions = window_positions(child_hits);
    let mut lo = 0usize;
    let mut counts: HashMap<usize, u32> = HashMap::new();
    for hi in 0..positions.len() {
        let (field, pos, child, _) = positions[hi];
        *counts.entry(child).or_insert(0) += 1;
        while lo < hi
            && (positions[lo].0 != field || pos.saturating_sub(positions[lo].1) > dist)
        {
            let (_, _, c, _) = positions[lo];
            if let Some(cnt) = counts.get_mut(&c) {
                *cnt -= 1;
                if *cnt == 0 {
                    counts.remove(&c);
                }
            }
            lo += 1;
        }
        if counts.len() == n {
            let mut hit = Hit::new(0, positions[lo].3, 0);
            hit.match_len = n as u32;
            return Some(hit);
        }
    }
    None
}

fn near_match(child_hits: &[Vec<Hit>], dist: u32) -> Option<Hit> {
    // Sequential near: child i's hit must precede child i+1's hit within `dist`.
    if child_hits.iter().any(Vec::is_empty) {
        return None;
    }
    for h0 in &child_hits[0] {
        let mut cursor = h0.hitpos;
        let mut ok = true;
        for hits in child_hits.iter().skip(1) {
            let next = hits.iter().find(|h| {
                h.hitpos.field() == cursor.field()
                    && h.hitpos.pos() > cursor.pos()
                    && h.hitpos.pos() - cursor.pos() <= dist
            });
            match next {
                Some(h) => cursor = h.hitpos,
                None => {
                    ok = false;
                    break;
                }
            }
        }
        if ok {
            let mut hit = *h0;
            hit.match_len = child_hits.len() as u32;
            return Some(hit);
        }
    }
    None
}

fn before_match(child_hits: &[Vec<Hit>]) -> Option<Hit> {
    let (a, b) = (child_hits.first()?, child_hits.get(1)?);
    for ha in a {
        if b.iter().any(|hb| hb.hitpos.field() == ha.hitpos.field() && hb.hitpos.pos() > ha.hitpos.pos()) {
            return Some(*ha);
        }
    }
    None
}

fn zone_bounded_match(
    zone_name: &str,
    cache: &mut ZoneCache,
    row_id: u32,
    child_hits: &[Vec<Hit>],
) -> Option<Hit> {
    if child_hits.iter().any(Vec::is_empty) {
        return None;
    }
    let first = &child_hits[0];
    'cand: for h0 in first {
        let span0 = match cache.is_in_zone(zone_name, row_id, h0.hitpos) {
            crate::zone::ZoneLookup::Found(idx) => idx,
            _ => continue,
        };
        for hits in child_hits.iter().skip(1) {
            let found = hits.iter().any(|h| {
                matches!(
                    cache.is_in_zone(zone_name, row_id, h.hitpos),
                    crate::zone::ZoneLookup::Found(idx) if idx == span0
                )
            });
            if !found {
                continue 'cand;
            }
        }
        return Some(*h0);
    }
    None
}

/// NOT-NEAR: `left` matches at a hit where `right` does not appear within
/// `dist` positions of it.
pub struct NotNear {
    left: Child,
    right: Child,
    dist: u32,
    doc_buf: Vec<Doc>,
    hit_buf: Vec<Hit>,
}

impl NotNear {
    pub fn new(left: Child, right: Child, dist: u32) -> NotNear {
        NotNear { left, right, dist, doc_buf: Vec::new(), hit_buf: Vec::new() }
    }
}

impl StreamIterator for NotNear {
    fn get_docs(&mut self) -> &[Doc] {
        let left = self.left.get_docs().to_vec();
        self.doc_buf.clear();
        let right_hits: Vec<Hit> = self.right.get_hits(&left).to_vec();
        for d in left.into_iter().filter(Doc::is_valid) {
            let lh = self.left.get_hits(&[d, Doc::INVALID]);
            let survives = lh.iter().any(|h| {
                !right_hits.iter().any(|r| {
                    r.row_id == d.row_id
                        && r.hitpos.field() == h.hitpos.field()
                        && r.hitpos.pos().abs_diff(h.hitpos.pos()) <= self.dist
                })
            });
            if survives {
                self.doc_buf.push(d);
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

/// QUORUM(k): at least `k` of the children must have a hit in the document.
pub struct Quorum {
    children: Vec<Child>,
    k: u32,
    doc_buf: Vec<Doc>,
    hit_buf: Vec<Hit>,
}

impl Quorum {
    pub fn new(children: Vec<Child>, k: u32) -> Quorum {
        Quorum { children, k, doc_buf: Vec::new(), hit_buf: Vec::new() }
    }
}

impl StreamIterator for Quorum {
    fn get_docs(&mut self) -> &[Doc] {
        let mut counts: HashMap<u32, (u32, f32, FieldMask)> = HashMap::new();
        for c in &mut self.children {
            for d in c.get_docs().iter().filter(|d| d.is_valid()) {
                let e = counts.entry(d.row_id).or_insert((0, 0.0, FieldMask::new()));
                e.0 += 1;
                e.1 += d.prefactor;
                e.2 = e.2.union(d.fields);
            }
        }
        let mut rows: Vec<(u32, (u32, f32, FieldMask))> =
            counts.into_iter().filter(|(_, (c, _, _))| *c >= self.k).collect();
        rows.sort_by_key(|(r, _)| *r);
        rows.truncate(BLOCK_SIZE);
        self.doc_buf.clear();
        for (row_id, (_, prefactor, fields)) in rows {
            self.doc_buf.push(Doc { row_id, fields, prefactor });
        }
        terminate(&mut self.doc_buf);
        &self.doc_buf
    }

    fn get_hits(&mut self, docs: &[Doc]) -> &[Hit] {
        self.hit_buf.clear();
        for c in &mut self.children {
            self.hit_buf.extend_from_slice(c.get_hits(docs));
        }
        self.hit_buf.sort_by_key(|h| (h.row_id, h.hitpos.pos_with_field()));
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
