//! Weight-sum ranker state (§4.4.1).

use crate::error::Result;
use crate::model::{Doc, FieldMask, Hit};
use crate::ranker::ctx::RankerCtx;
use crate::ranker::match_::Match;
use crate::ranker::state::{RankState, BM25_SCALE};

#[derive(Debug, Clone, Default)]
pub struct WeightSumState {
    weights: Vec<i32>,
    doc_fields: FieldMask,
    prefactor: f32,
    /// `RankingMode::Bm25`: skip the field-weight sum entirely and score
    /// purely off the iterator's accumulated prefactor (§6 "Ranking modes").
    bm25_only: bool,
}

impl WeightSumState {
    pub fn new(num_fields: usize) -> WeightSumState {
        WeightSumState { weights: vec![1; num_fields], doc_fields: FieldMask::new(), prefactor: 0.0, bm25_only: false }
    }

    pub fn bm25_only(mut self) -> WeightSumState {
        self.bm25_only = true;
        self
    }
}

impl RankState for WeightSumState {
    fn init(&mut self, ctx: &RankerCtx) -> Result<()> {
        self.weights = ctx.field_weights.clone();
        Ok(())
    }

    fn update(&mut self, _hit: &Hit) {
        // weight-sum scores purely off the doc's field-occurrence mask,
        // captured up front in `reset_doc`
    }

    fn finalize(&mut self, _m: &Match) -> i32 {
        let seed = (self.prefactor * BM25_SCALE) as i32;
        if self.bm25_only {
            return seed;
        }
        let field_sum: i32 = (0..self.weights.len())
            .filter(|&f| self.doc_fields.test(f as u32))
            .map(|f| self.weights[f])
            .sum();
        field_sum + seed
    }

    fn reset_doc(&mut self, doc: &Doc) {
        self.doc_fields = doc.fields;
        self.prefactor = doc.prefactor;
    }
}
