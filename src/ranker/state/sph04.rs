//! SPH04: proximity + exact-hit boost (§4.4.3).

use crate::error::Result;
use crate::model::{Doc, Hit};
use crate::ranker::ctx::RankerCtx;
use crate::ranker::match_::Match;
use crate::ranker::state::proximity::LcsTracker;
use crate::ranker::state::{RankState, BM25_SCALE};

#[derive(Debug, Clone)]
pub struct Sph04State {
    lcs: LcsTracker,
    head_hit: Vec<bool>,
    exact_hit: Vec<bool>,
    max_query_pos: u32,
    weights: Vec<i32>,
    prefactor: f32,
}

impl Sph04State {
    pub fn new(num_fields: usize, max_query_pos: u32) -> Sph04State {
        Sph04State {
            lcs: LcsTracker::new(num_fields, false),
            head_hit: vec![false; num_fields],
            exact_hit: vec![false; num_fields],
            max_query_pos,
            weights: vec![1; num_fields],
            prefactor: 0.0,
        }
    }
}

impl Sph04State {
    /// The per-field exact-hit bit tracked by the current document (§4.4.3).
    pub fn exact_hit(&self, field: usize) -> bool {
        self.exact_hit.get(field).copied().unwrap_or(false)
    }
}

impl RankState for Sph04State {
    fn init(&mut self, ctx: &RankerCtx) -> Result<()> {
        self.lcs = LcsTracker::new(ctx.num_fields, false);
        self.head_hit = vec![false; ctx.num_fields];
        self.exact_hit = vec![false; ctx.num_fields];
        self.weights = ctx.field_weights.clone();
        Ok(())
    }

    fn update(&mut self, hit: &Hit) {
        self.lcs.update(hit);
        let field = hit.hitpos.field() as usize;
        if field >= self.head_hit.len() {
            return;
        }
        if hit.hitpos.pos() == 1 {
            self.head_hit[field] = true;
            if hit.hitpos.is_end() && hit.query_pos == self.max_query_pos {
                self.exact_hit[field] = true;
            }
        }
    }

    fn finalize(&mut self, _m: &Match) -> i32 {
        let seed = (self.prefactor * BM25_SCALE) as i32;
        let mut total = 0i32;
        for f in 0..self.weights.len() {
            let lcs = self.lcs.max_lcs[f] as i32;
            let head = self.head_hit[f] as i32;
            let exact = self.exact_hit[f] as i32;
            total += (4 * lcs + 2 * head + exact) * self.weights[f];
        }
        seed + total
    }

    fn reset_doc(&mut self, doc: &Doc) {
        self.lcs.reset();
        for h in &mut self.head_hit {
            *h = false;
        }
        for h in &mut self.exact_hit {
            *h = false;
        }
        self.prefactor = doc.prefactor;
    }
}
