//! Expression ranker state (§4.5), the hardest of the ranker modes: it
//! maintains the full per-field factor set while hits stream through, then
//! evaluates a compiled user formula over the finished factors.

use std::collections::HashMap;

use rustc_hash::FxHashMap;

use crate::error::Result;
use crate::expr::atc::AtcTracker;
use crate::expr::factors::Factors;
use crate::expr::hook::CompiledExpr;
use crate::expr::lccs::LccsTracker;
use crate::expr::min_gaps::MinGapsTracker;
use crate::model::{Doc, Hit};
use crate::ranker::ctx::RankerCtx;
use crate::ranker::match_::Match;
use crate::ranker::state::proximity::LcsTracker;
use crate::ranker::state::RankState;

#[derive(Debug, Clone, Copy, Default)]
struct WindowTracker {
    window: u32,
    recent: [u32; 32],
    len: usize,
    max_seen: u32,
}

impl WindowTracker {
    fn push(&mut self, pos: u32) {
        if self.len < self.recent.len() {
            self.recent[self.len] = pos;
            self.len += 1;
        } else {
            self.recent.copy_within(1.., 0);
            self.recent[self.len - 1] = pos;
        }
        let count = self.recent[..self.len].iter().filter(|&&p| pos.saturating_sub(p) <= self.window).count() as u32;
        self.max_seen = self.max_seen.max(count);
    }
}

/// Per-document state for the expression ranker. `export` is true for the
/// `Export` mode, which runs the same bookkeeping but returns the BM25
/// seed as the score while making the full factor set available to the
/// caller for diagnostics instead of evaluating a formula.
pub struct ExpressionState {
    formula: CompiledExpr,
    export: bool,
    factors: Factors,
    lcs: LcsTracker,
    lccs: Vec<LccsTracker>,
    atc: Vec<AtcTracker>,
    min_gaps: Vec<MinGapsTracker>,
    windows: Vec<WindowTracker>,
    term_idf: FxHashMap<u32, f32>,
    term_dupes: FxHashMap<u32, u32>,
    terms_hit: FxHashMap<(usize, u32), ()>,
    prefactor: f32,
    doc_field_lengths: Vec<f32>,
    /// Distinct query-word count per field, used both as the min-gaps
    /// coverage target and the default ATC/window sizing seed.
    words_per_field: Vec<usize>,
    /// `next_query_pos[q]` names the canonical query position that must
    /// follow `q` for an LCCS run to keep extending (§4.5 "LCS / LCCS"),
    /// derived from the query tree's word order at construction.
    next_query_pos: HashMap<u32, u32>,
    bm25_k1: f32,
    bm25_b: f32,
    avg_field_len: Vec<f32>,
    field_weights: Vec<i32>,
    field_names: Vec<String>,
}

impl std::fmt::Debug for ExpressionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExpressionState").field("export", &self.export).finish_non_exhaustive()
    }
}

impl ExpressionState {
    pub fn new(
        formula: CompiledExpr,
        export: bool,
        num_fields: usize,
        words_per_field: Vec<usize>,
        term_idf: FxHashMap<u32, f32>,
        term_dupes: FxHashMap<u32, u32>,
        next_query_pos: HashMap<u32, u32>,
    ) -> ExpressionState {
        let params = formula.static_params();
        let window = params.max_window_hits.unwrap_or(8);
        ExpressionState {
            formula,
            export,
            factors: Factors::new(num_fields),
            lcs: LcsTracker::new(num_fields, true),
            lccs: (0..num_fields).map(|_| LccsTracker::new(next_query_pos.clone())).collect(),
            atc: (0..num_fields).map(|_| AtcTracker::new(10, 30)).collect(),
            min_gaps: (0..num_fields).map(|f| MinGapsTracker::new(words_per_field.get(f).copied().unwrap_or(0))).collect(),
            windows: vec![WindowTracker { window, ..Default::default() }; num_fields],
            term_idf,
            term_dupes,
            terms_hit: FxHashMap::default(),
            prefactor: 0.0,
            doc_field_lengths: vec![0.0; num_fields],
            words_per_field,
            next_query_pos,
            bm25_k1: 1.2,
            bm25_b: 0.75,
            avg_field_len: vec![0.0; num_fields],
            field_weights: vec![1; num_fields],
            field_names: (0..num_fields).map(|i| i.to_string()).collect(),
        }
    }

    fn canonical(&self, qpos: u32) -> u32 {
        self.term_dupes.get(&qpos).copied().unwrap_or(qpos)
    }

    fn idf(&self, qpos: u32) -> f32 {
        self.term_idf.get(&self.canonical(qpos)).copied().unwrap_or(0.0)
    }

    /// Computes `bm25a` for this document, using static k1/b from the
    /// formula if present (§4.5's "constant arguments" rule).
    fn compute_bm25a(&mut self) {
        let (k1, b) = self.formula.static_params().bm25a.map(|(k1, b)| (k1 as f32, b as f32)).unwrap_or((self.bm25_k1, self.bm25_b));
        let avg_dl: f32 = if self.avg_field_len.is_empty() { 1.0 } else { self.avg_field_len.iter().sum::<f32>() / self.avg_field_len.len() as f32 };
        let dl: f32 = self.doc_field_lengths.iter().sum();
        let tf: f32 = self.factors.fields.iter().map(|f| f.hit_count as f32).sum();
        let mut sum = 0.0f32;
        if tf > 0.0 {
            for term_idf in self.term_idf.values() {
                let denom = tf + k1 * (1.0 - b + b * dl / avg_dl.max(1.0));
                if denom > 0.0 {
                    sum += (tf / denom) * term_idf;
                }
            }
        }
        self.factors.bm25a = sum;
    }

    /// Resolves the weight for field `f_idx` from the formula's mandatory
    /// `{field: weight}` map, falling back to `field_weights` for fields
    /// the map doesn't name.
    fn bm25f_field_weight(&self, f_idx: usize, weights: &[(String, f64)]) -> f32 {
        let name = self.field_names.get(f_idx).map(String::as_str).unwrap_or_default();
        weights
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, w)| *w as f32)
            .unwrap_or_else(|| self.field_weights.get(f_idx).copied().unwrap_or(1) as f32)
    }

    fn compute_bm25f(&mut self) {
        let params = self.formula.static_params().bm25f;
        let (k1, b, weights) = match params {
            Some((k1, b, weights)) => (k1 as f32, b as f32, weights),
            None => (self.bm25_k1, self.bm25_b, Vec::new()),
        };
        let mut sum = 0.0f32;
        for f_idx in 0..self.factors.fields.len() {
            let field = &self.factors.fields[f_idx];
            let avg_dl = self.avg_field_len.get(f_idx).copied().unwrap_or(1.0).max(1.0);
            let dl = self.doc_field_lengths.get(f_idx).copied().unwrap_or(0.0);
            let w = self.bm25f_field_weight(f_idx, &weights);
            let tf = field.hit_count as f32;
            if tf == 0.0 {
                continue;
            }
            let denom = tf + k1 * (1.0 - b + b * dl / avg_dl);
            if denom > 0.0 {
                sum += w * (tf / denom) * field.sum_idf;
            }
        }
        self.factors.bm25f = sum;
    }
}

impl RankState for ExpressionState {
    fn init(&mut self, ctx: &RankerCtx) -> Result<()> {
        self.factors = Factors::new(ctx.num_fields);
        self.lcs = LcsTracker::new(ctx.num_fields, true);
        self.words_per_field.resize(ctx.num_fields, 0);
        self.min_gaps = (0..ctx.num_fields).map(|f| MinGapsTracker::new(self.words_per_field[f])).collect();
        self.lccs = (0..ctx.num_fields).map(|_| LccsTracker::new(self.next_query_pos.clone())).collect();
        self.windows = vec![WindowTracker { window: ctx.atc_window as u32, ..Default::default() }; ctx.num_fields];
        self.atc = (0..ctx.num_fields).map(|_| AtcTracker::new(ctx.atc_window, ctx.atc_buffer)).collect();
        self.doc_field_lengths = vec![0.0; ctx.num_fields];
        self.bm25_k1 = ctx.bm25_k1;
        self.bm25_b = ctx.bm25_b;
        self.avg_field_len = ctx.avg_field_len.clone();
        self.field_weights = ctx.field_weights.clone();
        self.field_names = ctx.field_names.clone();
        Ok(())
    }

    fn update(&mut self, hit: &Hit) {
        let field = hit.hitpos.field() as usize;
        if field >= self.factors.fields.len() {
            return;
        }
        let canonical_qpos = self.canonical(hit.query_pos);
        let dedup_key = (field, canonical_qpos);
        let first_time_for_span = self.terms_hit.insert(dedup_key, ()).is_none();

        self.lcs.update(hit);
        let idf = self.idf(hit.query_pos);
        let pwf = hit.hitpos.pos_with_field();

        {
            let ff = &mut self.factors.fields[field];
            ff.hit_count += 1;
            ff.word_count_mask |= 1u64 << (canonical_qpos % 64);
            ff.tf_idf += idf;
            ff.min_idf = ff.min_idf.min(idf);
            ff.max_idf = ff.max_idf.max(idf);
            ff.sum_idf += idf;
            ff.min_hit_pos = ff.min_hit_pos.min(hit.hitpos.pos());
            ff.lcs = self.lcs.max_lcs[field];
            if self.lcs.max_lcs[field] >= 1.0 {
                ff.min_best_span_pos = ff.min_best_span_pos.min(hit.hitpos.pos());
            }
        }
        self.factors.matched_fields |= 1u64 << field;
        if hit.hitpos.pos() == 1 {
            self.factors.exact_hit |= 1u64 << field;
        }
        let full_span = self.words_per_field.get(field).copied().unwrap_or(0);
        if full_span > 0 && self.lcs.max_lcs[field] as usize >= full_span {
            self.factors.exact_order |= 1u64 << field;
        }

        if first_time_for_span {
            self.windows[field].push(hit.hitpos.pos());
        }
        self.factors.fields[field].max_window_hits = self.windows[field].max_seen;

        self.min_gaps[field].push(pwf, canonical_qpos);
        self.factors.fields[field].min_gaps = self.min_gaps[field].finalize();

        self.lccs[field].push(canonical_qpos, pwf, idf);
        self.factors.fields[field].lccs = self.lccs[field].lccs();
        self.factors.fields[field].wlccs = self.lccs[field].wlccs();

        self.atc[field].push(hit.hitpos.pos(), canonical_qpos, idf);

        self.doc_field_lengths[field] += 1.0;
        self.factors.doc_word_count += 1;
    }

    fn finalize(&mut self, _m: &Match) -> i32 {
        for (f, tracker) in self.atc.iter_mut().enumerate() {
            self.factors.fields[f].atc = tracker.flush_field();
        }
        self.factors.bm25 = self.prefactor * crate::ranker::state::BM25_SCALE;
        self.compute_bm25a();
        self.compute_bm25f();
        if self.export {
            return (self.prefactor * crate::ranker::state::BM25_SCALE) as i32;
        }
        self.formula.eval(&self.factors).round() as i32
    }

    fn reset_doc(&mut self, doc: &Doc) {
        self.factors.reset();
        self.lcs.reset();
        for t in &mut self.windows {
            *t = WindowTracker { window: t.window, ..Default::default() };
        }
        self.min_gaps = self.words_per_field.iter().map(|&target| MinGapsTracker::new(target)).collect();
        self.lccs = self.words_per_field.iter().map(|_| LccsTracker::new(self.next_query_pos.clone())).collect();
        self.terms_hit.clear();
        for l in self.doc_field_lengths.iter_mut() {
            *l = 0.0;
        }
        self.prefactor = doc.prefactor;
    }
}
