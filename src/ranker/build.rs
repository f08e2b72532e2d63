//! `RankingMode -> State` factory (§6 "Ranking modes"): turns the mode a
//! caller asked for into the concrete accumulator the frame drives.
//!
//! The expression and match-any/SPH04 modes need per-query derived data
//! (term IDF, duplicate-term canonicalisation, query-position order) that
//! lives outside [`RankerCtx`], since it comes from the compiled query
//! rather than the index's static shape; [`StateBuildCtx`] carries it.

use std::collections::HashMap;

use rustc_hash::FxHashMap;

use crate::error::{Result, UserError};
use crate::ranker::ctx::{RankerCtx, RankingMode};
use crate::ranker::state::{
    ExpressionState, FieldmaskState, MatchAnyState, NoneState, PluginRanker, PluginState, ProximityState, Sph04State, State,
    WeightSumState, WordcountState,
};

/// Resolves a name registered under `RankingMode::Plugin` to a concrete
/// ranker implementation (§4.4.8's "externally registered" seam).
pub trait PluginRegistry {
    fn resolve(&self, name: &str) -> Result<Box<dyn PluginRanker + Send>>;
}

/// Per-query data the expression/match-any/SPH04 modes need beyond
/// [`RankerCtx`]'s static, per-index shape.
#[derive(Debug, Clone, Default)]
pub struct StateBuildCtx {
    /// Distinct query-word count per field (match-any's `k` factor, the
    /// expression ranker's min-gaps coverage target).
    pub words_per_field: Vec<usize>,
    pub term_idf: FxHashMap<u32, f32>,
    pub term_dupes: FxHashMap<u32, u32>,
    pub next_query_pos: HashMap<u32, u32>,
    /// SPH04's `querypos == max_qpos` exactness test, from
    /// `QueryNode::max_query_pos`.
    pub max_query_pos: u32,
}

/// Instantiates and primes the ranker state for `mode` (the caller still
/// owns calling `RankState::init` through `Frame::new`).
pub fn build_state(mode: &RankingMode, ctx: &RankerCtx, build: &StateBuildCtx, plugins: Option<&dyn PluginRegistry>) -> Result<State> {
    Ok(match mode {
        RankingMode::ProximityBm25 => State::Proximity(ProximityState::new(ctx.num_fields, true)),
        RankingMode::Proximity => State::Proximity(ProximityState::new(ctx.num_fields, true).without_bm25_seed()),
        RankingMode::Bm25 => State::WeightSum(WeightSumState::new(ctx.num_fields).bm25_only()),
        RankingMode::None => State::None(NoneState::new()),
        RankingMode::Wordcount => State::Wordcount(WordcountState::new(ctx.num_fields)),
        RankingMode::MatchAny => {
            let words_per_field = build.words_per_field.iter().map(|&n| n as u32).collect();
            State::MatchAny(MatchAnyState::new(ctx.num_fields, words_per_field))
        }
        RankingMode::Fieldmask => State::Fieldmask(FieldmaskState::new()),
        RankingMode::Sph04 => State::Sph04(Sph04State::new(ctx.num_fields, build.max_query_pos)),
        RankingMode::Expr(_name, formula) => State::Expression(ExpressionState::new(
            (**formula).clone(),
            false,
            ctx.num_fields,
            build.words_per_field.clone(),
            build.term_idf.clone(),
            build.term_dupes.clone(),
            build.next_query_pos.clone(),
        )),
        RankingMode::Export(_name, formula) => State::Expression(ExpressionState::new(
            (**formula).clone(),
            true,
            ctx.num_fields,
            build.words_per_field.clone(),
            build.term_idf.clone(),
            build.term_dupes.clone(),
            build.next_query_pos.clone(),
        )),
        RankingMode::Plugin(name, opts) => {
            let registry = plugins.ok_or_else(|| UserError::UnknownPlugin(name.clone()))?;
            let plugin = registry.resolve(name)?;
            State::Plugin(PluginState::new(name.clone(), opts.clone(), plugin))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bm25_mode_skips_field_weight_sum() {
        let ctx = RankerCtx::new(2).with_weights(vec![5, 5]);
        let mut state = build_state(&RankingMode::Bm25, &ctx, &StateBuildCtx::default(), None).unwrap();
        crate::ranker::state::RankState::init(&mut state, &ctx).unwrap();
        let doc = crate::model::Doc { row_id: 1, fields: crate::model::FieldMask::from_bits(0b11), prefactor: 0.1 };
        crate::ranker::state::RankState::reset_doc(&mut state, &doc);
        let weight = crate::ranker::state::RankState::finalize(&mut state, &crate::ranker::match_::Match::new(1));
        assert_eq!(weight, (0.1 * crate::ranker::state::BM25_SCALE) as i32);
    }

    #[test]
    fn none_mode_always_scores_one() {
        let ctx = RankerCtx::new(1);
        let mut state = build_state(&RankingMode::None, &ctx, &StateBuildCtx::default(), None).unwrap();
        crate::ranker::state::RankState::init(&mut state, &ctx).unwrap();
        let weight = crate::ranker::state::RankState::finalize(&mut state, &crate::ranker::match_::Match::new(1));
        assert_eq!(weight, 1);
    }

    #[test]
    fn plugin_mode_without_a_registry_is_a_user_error() {
        let ctx = RankerCtx::new(1);
        let mode = RankingMode::Plugin("custom".to_string(), serde_json::Value::Null);
        assert!(build_state(&mode, &ctx, &StateBuildCtx::default(), None).is_err());
    }
}
