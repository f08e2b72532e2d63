//! Wordcount ranker state (§4.4.5).

use crate::error::Result;
use crate::model::{Doc, Hit};
use crate::ranker::ctx::RankerCtx;
use crate::ranker::match_::Match;
use crate::ranker::state::RankState;

#[derive(Debug, Clone, Default)]
pub struct WordcountState {
    weights: Vec<i32>,
    total: i32,
}

impl WordcountState {
    pub fn new(num_fields: usize) -> WordcountState {
        WordcountState { weights: vec![1; num_fields], total: 0 }
    }
}

impl RankState for WordcountState {
    fn init(&mut self, ctx: &RankerCtx) -> Result<()> {
        self.weights = ctx.field_weights.clone();
        Ok(())
    }

    fn update(&mut self, hit: &Hit) {
        let field = hit.hitpos.field() as usize;
        if let Some(w) = self.weights.get(field) {
            self.total += w;
        }
    }

    fn finalize(&mut self, _m: &Match) -> i32 {
        self.total
    }

    fn reset_doc(&mut self, _doc: &Doc) {
        self.total = 0;
    }
}
