//! Proximity+LCS ranker state (§4.4.2), and the `LcsTracker` shared with
//! SPH04 and match-any (§4.4.3, §4.4.4).

use crate::error::Result;
use crate::model::{Doc, Hit};
use crate::ranker::ctx::RankerCtx;
use crate::ranker::match_::Match;
use crate::ranker::state::{RankState, BM25_SCALE};

/// Longest-contiguous-run tracking shared by every mode that scores on
/// query-position proximity.
#[derive(Debug, Clone)]
pub(crate) struct LcsTracker {
    pub max_lcs: Vec<f32>,
    cur_lcs: f32,
    last_pos_with_field: Option<u32>,
    last_query_pos: u32,
    tail_qpos_mask: u32,
    handle_dupes: bool,
}

impl LcsTracker {
    pub fn new(num_fields: usize, handle_dupes: bool) -> LcsTracker {
        LcsTracker {
            max_lcs: vec![0.0; num_fields],
            cur_lcs: 0.0,
            last_pos_with_field: None,
            last_query_pos: 0,
            tail_qpos_mask: 0,
            handle_dupes,
        }
    }

    pub fn reset(&mut self) {
        for m in &mut self.max_lcs {
            *m = 0.0;
        }
        self.cur_lcs = 0.0;
        self.last_pos_with_field = None;
        self.tail_qpos_mask = 0;
    }

    pub fn update(&mut self, hit: &Hit) {
        let field = hit.hitpos.field() as usize;
        let pwf = hit.hitpos.pos_with_field();
        let advanced = self.last_pos_with_field.map_or(true, |lp| pwf > lp);
        let exp_delta = self.last_pos_with_field.map(|lp| lp as i64 - self.last_query_pos as i64);
        let delta = hit.hitpos.pos() as i64 - hit.query_pos as i64;
        let contiguous = advanced && exp_delta == Some(delta);

        let dupe_extends = !contiguous
            && advanced
            && self.handle_dupes
            && {
                let gap = pwf.saturating_sub(self.last_pos_with_field.unwrap_or(0));
                gap < 32 && (self.tail_qpos_mask >> gap) & hit.qpos_mask != 0
            };

        if contiguous || dupe_extends {
            self.cur_lcs += hit.weight;
        } else {
            self.cur_lcs = hit.weight;
        }
        if field < self.max_lcs.len() && self.cur_lcs > self.max_lcs[field] {
            self.max_lcs[field] = self.cur_lcs;
        }
        self.last_pos_with_field = Some(pwf);
        self.last_query_pos = hit.query_pos;
        self.tail_qpos_mask = hit.qpos_mask | (1u32 << (hit.query_pos % 32));
    }

    pub fn weighted_sum(&self, weights: &[i32]) -> i32 {
        self.max_lcs.iter().zip(weights).map(|(lcs, w)| (*lcs as i32) * w).sum()
    }
}

#[derive(Debug, Clone)]
pub struct ProximityState {
    lcs: LcsTracker,
    weights: Vec<i32>,
    prefactor: f32,
    /// Whether to seed the score with `prefactor * BM25_SCALE`, the
    /// difference between `RankingMode::ProximityBm25` and the plain
    /// `RankingMode::Proximity` (§6 "Ranking modes").
    seed_bm25: bool,
}

impl ProximityState {
    pub fn new(num_fields: usize, handle_dupes: bool) -> ProximityState {
        ProximityState { lcs: LcsTracker::new(num_fields, handle_dupes), weights: vec![1; num_fields], prefactor: 0.0, seed_bm25: true }
    }

    pub fn without_bm25_seed(mut self) -> ProximityState {
        self.seed_bm25 = false;
        self
    }
}

impl RankState for ProximityState {
    fn init(&mut self, ctx: &RankerCtx) -> Result<()> {
        self.lcs = LcsTracker::new(ctx.num_fields, self.lcs.handle_dupes);
        self.weights = ctx.field_weights.clone();
        Ok(())
    }

    fn update(&mut self, hit: &Hit) {
        self.lcs.update(hit);
    }

    fn finalize(&mut self, _m: &Match) -> i32 {
        let seed = if self.seed_bm25 { (self.prefactor * BM25_SCALE) as i32 } else { 0 };
        seed + self.lcs.weighted_sum(&self.weights)
    }

    fn reset_doc(&mut self, doc: &Doc) {
        self.lcs.reset();
        self.prefactor = doc.prefactor;
    }
}
