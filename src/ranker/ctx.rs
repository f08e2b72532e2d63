//! Shared, read-mostly context threaded into every ranker state's `init`
//! (§9 "Thread-local singletons" redesign note: an explicit context value
//! instead of thread-local task info).

use crate::expr::hook::CompiledExpr;

#[derive(Debug, Clone)]
pub struct RankerCtx {
    pub num_fields: usize,
    pub field_weights: Vec<i32>,
    pub bm25_k1: f32,
    pub bm25_b: f32,
    /// Average field length per field, for BM25A/BM25F; `None` fields
    /// disable length normalization for that field.
    pub avg_field_len: Vec<f32>,
    pub total_docs: u64,
    pub atc_window: usize,
    pub atc_buffer: usize,
    pub min_gaps_window: Option<()>,
    /// Field names in column order, so `bm25f`'s `{field: weight}` map
    /// (§4.5) can resolve a name to a field index.
    pub field_names: Vec<String>,
}

impl RankerCtx {
    pub fn new(num_fields: usize) -> RankerCtx {
        RankerCtx {
            num_fields,
            field_weights: vec![1; num_fields],
            bm25_k1: 1.2,
            bm25_b: 0.75,
            avg_field_len: vec![0.0; num_fields],
            total_docs: 0,
            atc_window: 10,
            atc_buffer: 30,
            min_gaps_window: None,
            field_names: (0..num_fields).map(|i| i.to_string()).collect(),
        }
    }

    pub fn with_weights(mut self, weights: Vec<i32>) -> RankerCtx {
        self.field_weights = weights;
        self
    }

    pub fn with_field_names(mut self, names: Vec<String>) -> RankerCtx {
        self.field_names = names;
        self
    }
}

/// The enum describing which ranking mode to instantiate (§6 "Ranking modes").
#[derive(Debug, Clone)]
pub enum RankingMode {
    ProximityBm25,
    Bm25,
    None,
    Wordcount,
    Proximity,
    MatchAny,
    Fieldmask,
    Sph04,
    Expr(String, Box<CompiledExpr>),
    Export(String, Box<CompiledExpr>),
    Plugin(String, serde_json::Value),
}
