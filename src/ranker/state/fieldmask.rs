//! Fieldmask ranker state (§4.4.6).

use crate::error::Result;
use crate::model::{Doc, Hit};
use crate::ranker::ctx::RankerCtx;
use crate::ranker::match_::Match;
use crate::ranker::state::RankState;

#[derive(Debug, Clone, Default)]
pub struct FieldmaskState {
    mask: u32,
}

impl FieldmaskState {
    pub fn new() -> FieldmaskState {
        FieldmaskState { mask: 0 }
    }
}

impl RankState for FieldmaskState {
    fn init(&mut self, _ctx: &RankerCtx) -> Result<()> {
        Ok(())
    }

    fn update(&mut self, hit: &Hit) {
        self.mask |= 1u32 << hit.hitpos.field();
    }

    fn finalize(&mut self, _m: &Match) -> i32 {
        self.mask as i32
    }

    fn reset_doc(&mut self, _doc: &Doc) {
        self.mask = 0;
    }
}
