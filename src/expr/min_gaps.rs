//! Min-gaps tracking (§4.5 "Min-gaps MW").
//!
//! Some engines specialise this for 2- and 3-unique-word fields with
//! subtly different formulae; this crate implements only the generic
//! path, treated as canonical regardless of field width.
//!
//! The generic path is a minimum-window-covering-all-distinct-words scan:
//! push hits into a window, and once every distinct query word for the
//! field has appeared, repeatedly record the window's gap width and shrink
//! from the left while the window still covers every word. `min_gaps` is
//! the smallest gap width ever recorded.

use std::collections::{HashMap, VecDeque};

#[derive(Debug, Clone)]
pub struct MinGapsTracker {
    target: usize,
    counts: HashMap<u32, u32>,
    window: VecDeque<(u32, u32)>,
    distinct_covered: usize,
    min_gaps: Option<u32>,
}

impl MinGapsTracker {
    pub fn new(target_unique_words: usize) -> MinGapsTracker {
        MinGapsTracker {
            target: target_unique_words,
            counts: HashMap::new(),
            window: VecDeque::new(),
            distinct_covered: 0,
            min_gaps: None,
        }
    }

    pub fn push(&mut self, pos: u32, qpos: u32) {
        if self.target == 0 {
            return;
        }
        let c = self.counts.entry(qpos).or_insert(0);
        *c += 1;
        if *c == 1 {
            self.distinct_covered += 1;
        }
        self.window.push_back((pos, qpos));
        if self.distinct_covered == self.target {
            self.record_and_shrink();
        }
    }

    fn record_and_shrink(&mut self) {
        loop {
            let (left_pos, _) = *self.window.front().expect("window non-empty while covering");
            let (right_pos, _) = *self.window.back().expect("window non-empty while covering");
            let candidate = right_pos.saturating_sub(left_pos).saturating_sub(self.target as u32 - 1);
            self.min_gaps = Some(self.min_gaps.map_or(candidate, |m| m.min(candidate)));

            let (_, leftmost_qpos) = *self.window.front().unwrap();
            let count = self.counts[&leftmost_qpos];
            if count > 1 {
                self.window.pop_front();
                *self.counts.get_mut(&leftmost_qpos).unwrap() -= 1;
            } else {
                break;
            }
        }
    }

    pub fn finalize(&self) -> u32 {
        self.min_gaps.unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn s4_three_unique_words() {
        let mut t = MinGapsTracker::new(3);
        t.push(1, 0); // A@1
        t.push(3, 1); // B@3
        t.push(4, 0); // A@4
        t.push(8, 2); // C@8
        assert_eq!(t.finalize(), 3);
    }

    #[test]
    fn single_unique_word_reports_zero() {
        let mut t = MinGapsTracker::new(1);
        t.push(1, 0);
        t.push(50, 0);
        assert_eq!(t.finalize(), 0);
    }

    #[test]
    fn never_fully_covered_reports_zero() {
        let mut t = MinGapsTracker::new(2);
        t.push(1, 0);
        t.push(2, 0);
        assert_eq!(t.finalize(), 0);
    }
}
