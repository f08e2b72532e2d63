//! Cancellation and time-budget accounting (§5): a deadline checked
//! cooperatively between ranking passes rather than enforced by a timer.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug)]
pub struct TimeBudget {
    started_at: Instant,
    budget: Duration,
    #[cfg(test)]
    stop_after: Option<(Arc<AtomicU64>, u64)>,
}

impl Default for TimeBudget {
    fn default() -> Self {
        Self::new(Duration::from_millis(1500))
    }
}

impl TimeBudget {
    pub fn new(budget: Duration) -> TimeBudget {
        TimeBudget {
            started_at: Instant::now(),
            budget,
            #[cfg(test)]
            stop_after: None,
        }
    }

    /// A budget that never expires (`Duration::MAX`).
    pub fn unlimited() -> TimeBudget {
        TimeBudget::new(Duration::MAX)
    }

    #[cfg(test)]
    pub fn stop_after_calls(count: u64) -> (TimeBudget, Arc<AtomicU64>) {
        let counter = Arc::new(AtomicU64::new(0));
        let budget = TimeBudget {
            started_at: Instant::now(),
            budget: Duration::MAX,
            stop_after: Some((counter.clone(), count)),
        };
        (budget, counter)
    }

    pub fn exceeded(&self) -> bool {
        #[cfg(test)]
        if let Some((counter, max)) = &self.stop_after {
            return counter.fetch_add(1, Ordering::Relaxed) >= *max;
        }
        self.started_at.elapsed() > self.budget
    }
}

/// Cooperative cancellation handle shared across a query's ranker
/// instances, polled at block boundaries (§5).
#[derive(Debug, Clone, Default)]
pub struct Cancel(Arc<AtomicBool>);

impl Cancel {
    pub fn new() -> Cancel {
        Cancel(Arc::new(AtomicBool::new(false)))
    }

    pub fn stop(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn needs_stop(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}
