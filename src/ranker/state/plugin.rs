//! Plugin ranker state (§4.4.8): dispatches to an externally registered
//! ranker implementation. Unlike the other modes this one is necessarily
//! behind a trait object — the whole point is that the core doesn't know
//! the concrete type at compile time.

use crate::error::Result;
use crate::model::{Doc, Hit};
use crate::ranker::ctx::RankerCtx;
use crate::ranker::match_::Match;
use crate::ranker::state::RankState;

/// Implemented by an external ranker registered under a name (§6 "Ranking
/// modes", `Plugin(name, opts)`).
pub trait PluginRanker: std::fmt::Debug {
    fn plugin_init(&mut self, opts: &serde_json::Value, ctx: &RankerCtx) -> Result<()>;
    fn plugin_reset_doc(&mut self, doc: &Doc);
    fn plugin_update(&mut self, hit: &Hit);
    fn plugin_finalize(&mut self, m: &Match) -> i32;
    fn plugin_deinit(&mut self) {}
}

#[derive(Debug)]
pub struct PluginState {
    name: String,
    opts: serde_json::Value,
    plugin: Box<dyn PluginRanker + Send>,
}

impl PluginState {
    pub fn new(name: String, opts: serde_json::Value, plugin: Box<dyn PluginRanker + Send>) -> PluginState {
        PluginState { name, opts, plugin }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl RankState for PluginState {
    fn init(&mut self, ctx: &RankerCtx) -> Result<()> {
        self.plugin.plugin_init(&self.opts, ctx)
    }

    fn update(&mut self, hit: &Hit) {
        self.plugin.plugin_update(hit);
    }

    fn finalize(&mut self, m: &Match) -> i32 {
        self.plugin.plugin_finalize(m)
    }

    fn reset_doc(&mut self, doc: &Doc) {
        self.plugin.plugin_reset_doc(doc);
    }
}

impl Drop for PluginState {
    fn drop(&mut self) {
        self.plugin.plugin_deinit();
    }
}
