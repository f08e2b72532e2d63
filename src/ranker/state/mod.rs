//! Per-ranking-mode accumulators (§4.4). All states share one trait so the
//! frame (`ranker::Frame`) can drive them uniformly; dispatch between modes
//! is a tagged enum rather than a trait object, keeping the per-hit hot
//! path free of virtual calls (§9 "Dynamic dispatch over ranker modes").

mod expression;
mod fieldmask;
mod match_any;
mod none;
mod plugin;
pub(crate) mod proximity;
mod sph04;
mod weight_sum;
mod wordcount;

pub use expression::ExpressionState;
pub use fieldmask::FieldmaskState;
pub use match_any::MatchAnyState;
pub use none::NoneState;
pub use plugin::{PluginRanker, PluginState};
pub use proximity::ProximityState;
pub use sph04::Sph04State;
pub use weight_sum::WeightSumState;
pub use wordcount::WordcountState;

use crate::error::Result;
use crate::model::{Doc, Hit};
use crate::ranker::ctx::RankerCtx;
use crate::ranker::match_::Match;

/// The operations every ranking mode implements (§4.4).
pub trait RankState {
    fn init(&mut self, ctx: &RankerCtx) -> Result<()>;
    fn update(&mut self, hit: &Hit);
    fn finalize(&mut self, m: &Match) -> i32;
    /// Called when a new document begins, before any `update` call for it.
    fn reset_doc(&mut self, doc: &Doc);
}

/// Tagged dispatch over concrete states (§9).
pub enum State {
    WeightSum(WeightSumState),
    Proximity(ProximityState),
    Sph04(Sph04State),
    MatchAny(MatchAnyState),
    Wordcount(WordcountState),
    Fieldmask(FieldmaskState),
    Expression(ExpressionState),
    Plugin(PluginState),
    None(NoneState),
}

impl RankState for State {
    fn init(&mut self, ctx: &RankerCtx) -> Result<()> {
        match self {
            State::WeightSum(s) => s.init(ctx),
            State::Proximity(s) => s.init(ctx),
            State::Sph04(s) => s.init(ctx),
            State::MatchAny(s) => s.init(ctx),
            State::Wordcount(s) => s.init(ctx),
            State::Fieldmask(s) => s.init(ctx),
            State::Expression(s) => s.init(ctx),
            State::Plugin(s) => s.init(ctx),
            State::None(s) => s.init(ctx),
        }
    }

    fn update(&mut self, hit: &Hit) {
        match self {
            State::WeightSum(s) => s.update(hit),
            State::Proximity(s) => s.update(hit),
            State::Sph04(s) => s.update(hit),
            State::MatchAny(s) => s.update(hit),
            State::Wordcount(s) => s.update(hit),
            State::Fieldmask(s) => s.update(hit),
            State::Expression(s) => s.update(hit),
            State::Plugin(s) => s.update(hit),
            State::None(s) => s.update(hit),
        }
    }

    fn finalize(&mut self, m: &Match) -> i32 {
        match self {
            State::WeightSum(s) => s.finalize(m),
            State::Proximity(s) => s.finalize(m),
            State::Sph04(s) => s.finalize(m),
            State::MatchAny(s) => s.finalize(m),
            State::Wordcount(s) => s.finalize(m),
            State::Fieldmask(s) => s.finalize(m),
            State::Expression(s) => s.finalize(m),
            State::Plugin(s) => s.finalize(m),
            State::None(s) => s.finalize(m),
        }
    }

    fn reset_doc(&mut self, doc: &Doc) {
        match self {
            State::WeightSum(s) => s.reset_doc(doc),
            State::Proximity(s) => s.reset_doc(doc),
            State::Sph04(s) => s.reset_doc(doc),
            State::MatchAny(s) => s.reset_doc(doc),
            State::Wordcount(s) => s.reset_doc(doc),
            State::Fieldmask(s) => s.reset_doc(doc),
            State::Expression(s) => s.reset_doc(doc),
            State::Plugin(s) => s.reset_doc(doc),
            State::None(s) => s.reset_doc(doc),
        }
    }
}

/// BM25 prefactor scale applied when a mode seeds its weight from the
/// iterator's accumulated prefactor (§8 S6: "bm25 scale 1000").
pub const BM25_SCALE: f32 = 1000.0;
