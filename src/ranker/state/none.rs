//! `RankingMode::None` (§4.4.7): no ranking at all, every match gets the
//! same fixed weight. The fastest mode, used when relevance doesn't matter
//! and the caller only wants doc membership.

use crate::error::Result;
use crate::model::{Doc, Hit};
use crate::ranker::ctx::RankerCtx;
use crate::ranker::match_::Match;
use crate::ranker::state::RankState;

#[derive(Debug, Clone, Copy, Default)]
pub struct NoneState;

impl NoneState {
    pub fn new() -> NoneState {
        NoneState
    }
}

impl RankState for NoneState {
    fn init(&mut self, _ctx: &RankerCtx) -> Result<()> {
        Ok(())
    }

    fn update(&mut self, _hit: &Hit) {}

    fn finalize(&mut self, _m: &Match) -> i32 {
        1
    }

    fn reset_doc(&mut self, _doc: &Doc) {}
}
