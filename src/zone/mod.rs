//! Zone cache (C2, §4.2): per-document start/end interval sets, populated
//! lazily from two companion hit streams per zone name.

use std::collections::BTreeMap;

/// Source of ordered `(row_id, pos)` marker pairs for one zone name. The
/// index layer supplies two of these per zone: one for opening markers, one
/// for closing markers.
pub trait ZoneSource {
    fn next_start(&mut self) -> Option<(u32, u32)>;
    fn next_end(&mut self) -> Option<(u32, u32)>;
}

/// An in-memory marker source, used by tests and by callers that have
/// already materialised their zone markers.
#[derive(Debug, Clone, Default)]
pub struct VecZoneSource {
    starts: Vec<(u32, u32)>,
    ends: Vec<(u32, u32)>,
    si: usize,
    ei: usize,
}

impl VecZoneSource {
    pub fn new(starts: Vec<(u32, u32)>, ends: Vec<(u32, u32)>) -> VecZoneSource {
        VecZoneSource { starts, ends, si: 0, ei: 0 }
    }
}

impl ZoneSource for VecZoneSource {
    fn next_start(&mut self) -> Option<(u32, u32)> {
        let v = self.starts.get(self.si).copied();
        if v.is_some() {
            self.si += 1;
        }
        v
    }
    fn next_end(&mut self) -> Option<(u32, u32)> {
        let v = self.ends.get(self.ei).copied();
        if v.is_some() {
            self.ei += 1;
        }
        v
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoneLookup {
    Found(usize),
    NoSpan,
    NoDocument,
}

struct ZoneState {
    source: Box<dyn ZoneSource>,
    /// First row id strictly greater than all cached docs.
    cached_max: u32,
    /// Smallest row id currently cached.
    cached_min: u32,
    /// row id -> ordered, left-minimal `(start, end)` intervals.
    intervals: BTreeMap<u32, Vec<(u32, u32)>>,
    /// Markers already pulled from the source but not yet assigned to a
    /// cached document (the source runs ahead of lookups).
    pending_starts: Vec<(u32, u32)>,
    pending_ends: Vec<(u32, u32)>,
    exhausted: bool,
}

impl ZoneState {
    fn new(source: Box<dyn ZoneSource>) -> ZoneState {
        ZoneState {
            source,
            cached_max: 0,
            cached_min: u32::MAX,
            intervals: BTreeMap::new(),
            pending_starts: Vec::new(),
            pending_ends: Vec::new(),
            exhausted: false,
        }
    }

    /// Ensures `row_id` is resolved into `self.intervals` (possibly with an
    /// empty interval list, meaning "document has no span in this zone").
    fn ensure_cached(&mut self, row_id: u32) {
        while row_id >= self.cached_max && !self.exhausted {
            self.pull_one_document();
        }
    }

    /// Ensures at least one marker is buffered on the given side (if the
    /// source still has any), without losing anything already pulled.
    fn top_up(&mut self, starts: bool) {
        if starts {
            if self.pending_starts.is_empty() {
                if let Some(m) = self.source.next_start() {
                    self.pending_starts.push(m);
                }
            }
        } else if self.pending_ends.is_empty() {
            if let Some(m) = self.source.next_end() {
                self.pending_ends.push(m);
            }
        }
    }

    /// Advances both marker streams to the next shared document and runs
    /// the left-minimal collapsing FSM over it (§4.2 step 3).
    fn pull_one_document(&mut self) {
        loop {
            self.top_up(true);
            self.top_up(false);
            let next_start = self.pending_starts.first().copied();
            let next_end = self.pending_ends.first().copied();
            let (start_doc, end_doc) = match (next_start, next_end) {
                (None, None) => {
                    self.exhausted = true;
                    self.cached_max = u32::MAX;
                    return;
                }
                (Some(s), None) => (s.0, s.0),
                (None, Some(e)) => (e.0, e.0),
                (Some(s), Some(e)) => (s.0, e.0),
            };
            if start_doc != end_doc {
                // Markers don't share a row id: advance the lesser side and
                // retry, per §4.2 step 2 ("tolerated by advancing the lesser
                // side").
                if start_doc < end_doc {
                    self.drain_matching(&mut Vec::new(), start_doc, true);
                } else {
                    self.drain_matching(&mut Vec::new(), end_doc, false);
                }
                continue;
            }
            let row_id = start_doc;
            let mut starts = Vec::new();
            let mut ends = Vec::new();
            self.drain_matching(&mut starts, row_id, true);
            self.drain_matching(&mut ends, row_id, false);
            let collapsed = collapse_left_minimal(&starts, &ends);
            self.intervals.insert(row_id, collapsed);
            self.cached_min = self.cached_min.min(row_id);
            self.cached_max = row_id + 1;
            return;
        }
    }

    /// Pulls all pending markers for `row_id` off the given side into `out`.
    fn drain_matching(&mut self, out: &mut Vec<(u32, u32)>, row_id: u32, starts: bool) {
        loop {
            self.top_up(starts);
            let pending = if starts { &mut self.pending_starts } else { &mut self.pending_ends };
            match pending.first().copied() {
                Some(m) if m.0 == row_id => {
                    out.push(m);
                    pending.remove(0);
                }
                _ => return,
            }
        }
    }

    fn lookup(&mut self, row_id: u32, pos_with_field: u32) -> ZoneLookup {
        self.ensure_cached(row_id);
        match self.intervals.get(&row_id) {
            None => ZoneLookup::NoDocument,
            Some(spans) => {
                match spans.binary_search_by(|(s, e)| {
                    if pos_with_field < *s {
                        std::cmp::Ordering::Greater
                    } else if pos_with_field > *e {
                        std::cmp::Ordering::Less
                    } else {
                        std::cmp::Ordering::Equal
                    }
                }) {
                    Ok(idx) => ZoneLookup::Found(idx),
                    Err(_) => ZoneLookup::NoSpan,
                }
            }
        }
    }

    fn evict_below(&mut self, row_id: u32) {
        self.intervals.retain(|&r, _| r >= row_id);
        if let Some(min) = self.intervals.keys().next() {
            self.cached_min = *min;
        }
    }
}

/// 3-state FSM collapsing nested/overlapping opens into left-minimal
/// intervals (§4.2 step 3, §3 zone-hits invariants).
///
/// - A new opening while `in_span` does *not* move the candidate start
///   (left-minimal: the outermost opening wins).
/// - A closing while `in_span` finalises `(open, close)` and moves to
///   `out_span`.
/// - A new opening in `out_span` starts a fresh candidate.
/// - Closings in `begin`/`out_span` (before any matching open) are ignored.
/// - An open still pending at end-of-document is dropped (§3: "unclosed
///   opening at end-of-doc is dropped").
fn collapse_left_minimal(starts: &[(u32, u32)], ends: &[(u32, u32)]) -> Vec<(u32, u32)> {
    #[derive(PartialEq)]
    enum State {
        Begin,
        InSpan,
        OutSpan,
    }
    let mut events: Vec<(u32, bool)> =
        starts.iter().map(|s| (s.1, true)).chain(ends.iter().map(|e| (e.1, false))).collect();
    events.sort_by_key(|(pos, is_start)| (*pos, !*is_start));

    let mut state = State::Begin;
    let mut candidate_start = 0u32;
    let mut out = Vec::new();
    for (pos, is_start) in events {
        match (&state, is_start) {
            (State::Begin, true) | (State::OutSpan, true) => {
                candidate_start = pos;
                state = State::InSpan;
            }
            (State::InSpan, true) => {
                // nested opening: left-minimal, candidate start unchanged
            }
            (State::InSpan, false) => {
                out.push((candidate_start, pos));
                state = State::OutSpan;
            }
            (State::Begin, false) | (State::OutSpan, false) => {
                // closing marker before any matching open: ignored
            }
        }
    }
    out
}

/// Per-ranker, lazily-populated cache over one or more named zones.
#[derive(Default)]
pub struct ZoneCache {
    zones: BTreeMap<String, ZoneState>,
}

impl ZoneCache {
    pub fn new() -> ZoneCache {
        ZoneCache::default()
    }

    pub fn register(&mut self, zone: impl Into<String>, source: Box<dyn ZoneSource>) {
        self.zones.insert(zone.into(), ZoneState::new(source));
    }

    /// §4.2: `is_in_zone(z, hit) -> {Found(span_idx), NoSpan, NoDocument}`.
    pub fn is_in_zone(&mut self, zone: &str, row_id: u32, hit: crate::model::HitPos) -> ZoneLookup {
        match self.zones.get_mut(zone) {
            None => ZoneLookup::NoDocument,
            Some(state) => state.lookup(row_id, hit.pos_with_field()),
        }
    }

    /// Drops cached entries below `row_id` once the caller advises no
    /// earlier row will be queried again.
    pub fn advise_no_rows_below(&mut self, row_id: u32) {
        for state in self.zones.values_mut() {
            state.evict_below(row_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::HitPos;

    fn pos(field: u32, p: u32) -> HitPos {
        HitPos::new(field, p, false)
    }

    #[test]
    fn s3_zone_fsm_collapses_nested_and_overlapping_opens() {
        // starts [1,3,5], ends [2,7] on one document -> [(1,2),(3,7)]
        let mut cache = ZoneCache::new();
        let src = VecZoneSource::new(
            vec![(1, 1), (1, 3), (1, 5)],
            vec![(1, 2), (1, 7)],
        );
        cache.register("h1", Box::new(src));
        assert_eq!(cache.is_in_zone("h1", 1, pos(0, 4)), ZoneLookup::Found(1));
        assert_eq!(cache.is_in_zone("h1", 1, pos(0, 8)), ZoneLookup::NoSpan);
    }

    #[test]
    fn no_markers_is_no_document() {
        let mut cache = ZoneCache::new();
        cache.register("h1", Box::new(VecZoneSource::new(vec![], vec![])));
        assert_eq!(cache.is_in_zone("h1", 42, pos(0, 0)), ZoneLookup::NoDocument);
    }

    #[test]
    fn unclosed_opening_at_end_of_doc_is_dropped() {
        let mut cache = ZoneCache::new();
        let src = VecZoneSource::new(vec![(1, 1), (1, 5)], vec![(1, 2)]);
        cache.register("h1", Box::new(src));
        assert_eq!(cache.is_in_zone("h1", 1, pos(0, 1)), ZoneLookup::Found(0));
        assert_eq!(cache.is_in_zone("h1", 1, pos(0, 5)), ZoneLookup::NoSpan);
    }

    #[test]
    fn closing_before_any_opening_is_ignored() {
        let mut cache = ZoneCache::new();
        let src = VecZoneSource::new(vec![(1, 4)], vec![(1, 1), (1, 6)]);
        cache.register("h1", Box::new(src));
        assert_eq!(cache.is_in_zone("h1", 1, pos(0, 5)), ZoneLookup::Found(0));
    }

    #[test]
    fn mismatched_row_ids_advance_lesser_side() {
        let mut cache = ZoneCache::new();
        // doc 1 has a start but no end; doc 2 has both.
        let src = VecZoneSource::new(vec![(1, 1), (2, 1)], vec![(2, 3)]);
        cache.register("h1", Box::new(src));
        assert_eq!(cache.is_in_zone("h1", 2, pos(0, 2)), ZoneLookup::Found(0));
        assert_eq!(cache.is_in_zone("h1", 1, pos(0, 1)), ZoneLookup::NoDocument);
    }
}
