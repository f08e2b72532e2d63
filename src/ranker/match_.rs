//! The record a ranker emits per document (§3 "Ranker state", §6 "Ranker
//! output").

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Match {
    pub row_id: u32,
    pub weight: i32,
    /// Index into the frame's zone-span side vector, when zone-span
    /// collection is enabled (§4.3).
    pub zone_tag: Option<i32>,
}

impl Match {
    pub fn new(row_id: u32) -> Match {
        Match { row_id, weight: 0, zone_tag: None }
    }
}

/// Opaque early-reject hook (§6 "Filter"): `true` drops the doc before hit
/// fetching.
pub trait Filter {
    fn early_reject(&mut self, m: &Match) -> bool;
}

/// A filter that never rejects, the default when the query has no filter
/// tree.
pub struct NoFilter;

impl Filter for NoFilter {
    fn early_reject(&mut self, _m: &Match) -> bool {
        false
    }
}
