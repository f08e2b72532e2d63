//! Ranker frame (C3, §4.3): the state machine that pulls doc chunks off an
//! iterator tree, early-rejects, drives a ranker state, and yields scored
//! matches in bounded blocks.

pub mod build;
pub mod ctx;
pub mod match_;
pub mod state;

use crate::error::Result;
use crate::iter::{strip_sentinel, StreamIterator, BLOCK_SIZE};
use crate::model::Doc;
use crate::time_budget::{Cancel, TimeBudget};
use crate::zone::{ZoneCache, ZoneLookup};

pub use build::{build_state, PluginRegistry, StateBuildCtx};
pub use ctx::{RankerCtx, RankingMode};
pub use match_::{Filter, Match, NoFilter};
pub use state::{RankState, State};

/// Drives one ranker instance end to end (§4.3's INIT/PULL-DOCS/PULL-HITS/
/// DRIVE-STATE/FLUSH/END lifecycle).
pub struct Frame<I, F = NoFilter> {
    iter: I,
    filter: F,
    state: State,
    cancel: Cancel,
    budget: TimeBudget,
    /// Owned for its lifetime management (`advise_no_rows_below`, per
    /// §4.2's cleanup contract); zone-name resolution for span tagging
    /// happens one layer up, where the query's zone list is known.
    zone_cache: Option<ZoneCache>,
    zone_name: String,
    collect_zone_spans: bool,
    zone_spans: Vec<i32>,
    docs_inspected: u64,
    docs_emitted: u64,
    finished: bool,
}

impl<I: StreamIterator, F: Filter> Frame<I, F> {
    pub fn new(iter: I, filter: F, mut state: State, ctx: &RankerCtx) -> Result<Frame<I, F>> {
        state.init(ctx)?;
        Ok(Frame {
            iter,
            filter,
            state,
            cancel: Cancel::new(),
            budget: TimeBudget::default(),
            zone_cache: None,
            zone_name: String::new(),
            collect_zone_spans: false,
            zone_spans: Vec::new(),
            docs_inspected: 0,
            docs_emitted: 0,
            finished: false,
        })
    }

    pub fn with_cancel(mut self, cancel: Cancel) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_budget(mut self, budget: TimeBudget) -> Self {
        self.budget = budget;
        self
    }

    pub fn with_zone_cache(mut self, cache: ZoneCache, zone: impl Into<String>, collect_spans: bool) -> Self {
        self.zone_cache = Some(cache);
        self.zone_name = zone.into();
        self.collect_zone_spans = collect_spans;
        self
    }

    pub fn zone_spans(&self) -> &[i32] {
        &self.zone_spans
    }

    pub fn stats(&self) -> (u64, u64) {
        (self.docs_inspected, self.docs_emitted)
    }

    /// PULL-DOCS / PULL-HITS / DRIVE-STATE / FLUSH: fills `out` with up to
    /// one block of matches and returns the count written. Returns `0` only
    /// at true end-of-stream, on cancellation, or when the time budget is
    /// exhausted (§5 "neither mechanism corrupts state").
    pub fn get_matches(&mut self, out: &mut Vec<Match>) -> Result<usize> {
        out.clear();
        if self.finished {
            return Ok(0);
        }

        loop {
            if self.cancel.needs_stop() || self.budget.exceeded() {
                self.finished = true;
                return Ok(out.len());
            }

            let docs_chunk = self.iter.get_docs();
            let live = strip_sentinel(docs_chunk);
            if live.is_empty() {
                self.finished = true;
                return Ok(out.len());
            }

            let mut survivors: Vec<Doc> = Vec::with_capacity(live.len());
            for d in live {
                self.docs_inspected += 1;
                let probe = Match::new(d.row_id);
                if !self.filter.early_reject(&probe) {
                    survivors.push(*d);
                }
            }

            if survivors.is_empty() {
                // every doc in this chunk was rejected; pull the next one
                continue;
            }

            let hits = self.iter.get_hits(&survivors);
            let mut hit_idx = 0;

            for doc in &survivors {
                if self.cancel.needs_stop() {
                    self.finished = true;
                    return Ok(out.len());
                }

                self.state.reset_doc(doc);
                let mut first_hit_pos = None;
                while hit_idx < hits.len() && hits[hit_idx].row_id == doc.row_id {
                    let hit = hits[hit_idx];
                    if first_hit_pos.is_none() {
                        first_hit_pos = Some(hit.hitpos);
                    }
                    self.state.update(&hit);
                    hit_idx += 1;
                }

                let mut m = Match::new(doc.row_id);
                m.weight = self.state.finalize(&m);
                if self.collect_zone_spans {
                    let lookup = match (&mut self.zone_cache, first_hit_pos) {
                        (Some(cache), Some(pos)) => cache.is_in_zone(&self.zone_name, doc.row_id, pos),
                        (Some(_), None) | (None, _) => ZoneLookup::NoDocument,
                    };
                    let tag = match lookup {
                        ZoneLookup::Found(idx) => idx as i32,
                        ZoneLookup::NoSpan => -1,
                        ZoneLookup::NoDocument => -2,
                    };
                    self.zone_spans.push(tag);
                    m.zone_tag = Some(self.zone_spans.len() as i32 - 1);
                }
                out.push(m);
                self.docs_emitted += 1;

                if out.len() >= BLOCK_SIZE {
                    return Ok(out.len());
                }
            }

            if !out.is_empty() {
                return Ok(out.len());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::iter::leaf::KeywordIterator;
    use crate::model::qword::{Qword, VecPostings};
    use crate::model::{Doc, FieldMask, Hit, HitPos};
    use crate::zone::VecZoneSource;

    fn one_keyword_iter(row_ids: &[u32]) -> KeywordIterator<VecPostings> {
        let docs: Vec<Doc> = row_ids.iter().map(|&r| Doc { row_id: r, fields: FieldMask::from_bits(1), prefactor: 0.1 }).collect();
        let hits: Vec<Hit> = row_ids.iter().map(|&r| Hit::new(r, HitPos::new(0, 1, false), 0)).collect();
        KeywordIterator::new(Qword::new(VecPostings { docs, hits }, 0))
    }

    #[test]
    fn emits_matches_in_row_id_order_for_a_simple_query() {
        let iter = one_keyword_iter(&[1, 2, 3]);
        let ctx = RankerCtx::new(1);
        let frame_state = State::Wordcount(state::WordcountState::new(1));
        let mut frame = Frame::new(iter, NoFilter, frame_state, &ctx).unwrap();
        let mut out = Vec::new();
        frame.get_matches(&mut out).unwrap();
        let row_ids: Vec<u32> = out.iter().map(|m| m.row_id).collect();
        assert_eq!(row_ids, vec![1, 2, 3]);
    }

    #[test]
    fn empty_iterator_yields_no_matches() {
        let iter = one_keyword_iter(&[]);
        let ctx = RankerCtx::new(1);
        let frame_state = State::Wordcount(state::WordcountState::new(1));
        let mut frame = Frame::new(iter, NoFilter, frame_state, &ctx).unwrap();
        let mut out = Vec::new();
        let n = frame.get_matches(&mut out).unwrap();
        assert_eq!(n, 0);
        assert!(out.is_empty());
    }

    #[test]
    fn zone_span_collection_tags_matches_with_real_lookups() {
        // doc 1's hit at pos 1 falls inside the zone's (1, 5) span; doc 2's
        // hit at pos 9 falls outside it.
        let iter = one_keyword_iter(&[1, 2]);
        let ctx = RankerCtx::new(1);
        let frame_state = State::Wordcount(state::WordcountState::new(1));
        let mut cache = crate::zone::ZoneCache::new();
        cache.register("h1", Box::new(VecZoneSource::new(vec![(1, 1), (2, 9)], vec![(1, 5), (2, 9)])));
        let mut frame = Frame::new(iter, NoFilter, frame_state, &ctx)
            .unwrap()
            .with_zone_cache(cache, "h1", true);
        let mut out = Vec::new();
        frame.get_matches(&mut out).unwrap();

        assert_eq!(out.len(), 2);
        let spans = frame.zone_spans();
        assert_eq!(out[0].zone_tag.map(|t| spans[t as usize]), Some(0));
        assert_eq!(out[1].zone_tag.map(|t| spans[t as usize]), Some(-1));
    }
}
