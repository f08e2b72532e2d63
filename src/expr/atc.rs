//! Aggregate term closeness (§4.5 "ATC"). Disabled unless the compiled
//! expression references `atc` or factor export was requested — enabling
//! it is the caller's job (`AtcTracker` itself is just the algorithm; a
//! disabled ranker simply never constructs one, so the ring buffer is
//! never allocated, per §8's "disabled path must not allocate" property).

use std::collections::{HashMap, VecDeque};

#[derive(Debug, Clone, Copy)]
struct RingEntry {
    pos: u32,
    qpos: u32,
}

#[derive(Debug, Clone)]
pub struct AtcTracker {
    window: usize,
    buffer_cap: usize,
    ring: VecDeque<RingEntry>,
    idf: HashMap<u32, f32>,
    terms: HashMap<u32, f32>,
}

impl AtcTracker {
    pub fn new(window: usize, buffer_cap: usize) -> AtcTracker {
        AtcTracker {
            window,
            buffer_cap,
            ring: VecDeque::with_capacity(buffer_cap),
            idf: HashMap::new(),
            terms: HashMap::new(),
        }
    }

    /// Registers a hit at `pos` for query position `qpos` with the given
    /// term IDF, accumulating closeness contributions against every
    /// already-buffered hit within the active window.
    pub fn push(&mut self, pos: u32, qpos: u32, term_idf: f32) {
        self.idf.insert(qpos, term_idf);
        let window_start = self.ring.len().saturating_sub(self.window);
        for entry in self.ring.iter().skip(window_start) {
            let delta = pos.abs_diff(entry.pos).max(1) as f32;
            let mut contrib_to_new = self.idf.get(&entry.qpos).copied().unwrap_or(term_idf) / delta.powf(1.75);
            let mut contrib_to_old = term_idf / delta.powf(1.75);
            if entry.qpos == qpos {
                contrib_to_new *= 0.5;
                contrib_to_old *= 0.5;
            }
            *self.terms.entry(qpos).or_insert(0.0) += contrib_to_new;
            *self.terms.entry(entry.qpos).or_insert(0.0) += contrib_to_old;
        }
        self.ring.push_back(RingEntry { pos, qpos });
        if self.ring.len() > self.buffer_cap {
            self.ring.pop_front();
        }
    }

    /// `atc[f] = log(1 + sum_q IDF(q) * atc_terms[q])`, then resets for the
    /// next field.
    pub fn flush_field(&mut self) -> f32 {
        let sum: f32 = self.terms.iter().map(|(q, tc)| tc * self.idf.get(q).copied().unwrap_or(0.0)).sum();
        self.ring.clear();
        self.terms.clear();
        (1.0 + sum).ln()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adjacent_equal_idf_terms_yield_positive_closeness() {
        let mut t = AtcTracker::new(10, 30);
        t.push(1, 0, 1.0);
        t.push(2, 1, 1.0);
        let atc = t.flush_field();
        assert!(atc > 0.0);
    }

    #[test]
    fn no_hits_gives_zero_closeness() {
        let mut t = AtcTracker::new(10, 30);
        assert_eq!(t.flush_field(), 0.0);
    }

    #[test]
    fn far_apart_terms_contribute_less_than_close_ones() {
        let mut near = AtcTracker::new(10, 30);
        near.push(1, 0, 1.0);
        near.push(2, 1, 1.0);
        let near_atc = near.flush_field();

        let mut far = AtcTracker::new(10, 30);
        far.push(1, 0, 1.0);
        far.push(50, 1, 1.0);
        let far_atc = far.flush_field();

        assert!(near_atc > far_atc);
    }
}
