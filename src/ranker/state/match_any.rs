//! Match-any ranker state (§4.4.4).

use crate::error::Result;
use crate::model::{Doc, Hit};
use crate::ranker::ctx::RankerCtx;
use crate::ranker::match_::Match;
use crate::ranker::state::proximity::LcsTracker;
use crate::ranker::state::{RankState, BM25_SCALE};

#[derive(Debug, Clone)]
pub struct MatchAnyState {
    lcs: LcsTracker,
    coverage: Vec<u32>,
    weights: Vec<i32>,
    words_per_field: Vec<u32>,
    prefactor: f32,
}

impl MatchAnyState {
    pub fn new(num_fields: usize, words_per_field: Vec<u32>) -> MatchAnyState {
        MatchAnyState {
            lcs: LcsTracker::new(num_fields, false),
            coverage: vec![0; num_fields],
            weights: vec![1; num_fields],
            words_per_field,
            prefactor: 0.0,
        }
    }

    fn k(&self) -> i32 {
        self.weights.iter().zip(&self.words_per_field).map(|(w, n)| w * *n as i32).sum()
    }
}

impl RankState for MatchAnyState {
    fn init(&mut self, ctx: &RankerCtx) -> Result<()> {
        self.lcs = LcsTracker::new(ctx.num_fields, false);
        self.coverage = vec![0; ctx.num_fields];
        self.weights = ctx.field_weights.clone();
        if self.words_per_field.len() != ctx.num_fields {
            self.words_per_field = vec![1; ctx.num_fields];
        }
        Ok(())
    }

    fn update(&mut self, hit: &Hit) {
        self.lcs.update(hit);
        let field = hit.hitpos.field() as usize;
        if field < self.coverage.len() {
            self.coverage[field] |= 1u32 << (hit.query_pos % 32);
        }
    }

    fn finalize(&mut self, _m: &Match) -> i32 {
        let k = self.k();
        let seed = (self.prefactor * BM25_SCALE) as i32;
        let mut total = 0i32;
        for f in 0..self.weights.len() {
            let lcs = self.lcs.max_lcs[f] as i32;
            let cov = self.coverage[f].count_ones() as i32;
            total += (cov + (lcs - 1).max(0) * k) * self.weights[f];
        }
        seed + total
    }

    fn reset_doc(&mut self, doc: &Doc) {
        self.lcs.reset();
        for c in &mut self.coverage {
            *c = 0;
        }
        self.prefactor = doc.prefactor;
    }
}
