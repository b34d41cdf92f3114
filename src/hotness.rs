//! Hotness Counter.
//!
//! Tracks how frequently each `(order, primary)` is touched by reads, so
//! compaction can prioritize rewriting hot primaries (where paying the
//! rewrite cost once saves the most future scan cost) over cold ones.
//! Counters decay exponentially on each maintenance tick rather than
//! growing without bound, so a primary that was hot last week but is
//! untouched now fades back toward zero. Persisted as `hotness.json`.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::sixindex::Order;

#[derive(Debug, Error)]
pub enum HotnessError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("invalid hotness.json: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct Wire {
    // (order name, primary) -> counter
    counters: Vec<(String, u32, f64)>,
}

/// Per-`(order, primary)` access counters with exponential decay.
#[derive(Clone)]
pub struct HotnessTracker {
    path: Option<PathBuf>,
    decay: f64,
    counters: HashMap<(Order, u32), f64>,
}

fn order_name(order: Order) -> &'static str {
    order.name()
}

fn order_from_name(name: &str) -> Option<Order> {
    Order::ALL.into_iter().find(|o| o.name() == name)
}

impl HotnessTracker {
    pub fn new(decay: f64) -> Self {
        HotnessTracker {
            path: None,
            decay,
            counters: HashMap::new(),
        }
    }

    pub fn open(path: impl AsRef<Path>, decay: f64) -> Result<Self, HotnessError> {
        let path = path.as_ref().to_path_buf();
        let wire: Wire = if path.exists() {
            serde_json::from_slice(&fs::read(&path)?)?
        } else {
            Wire::default()
        };
        let mut counters = HashMap::with_capacity(wire.counters.len());
        for (name, primary, count) in wire.counters {
            if let Some(order) = order_from_name(&name) {
                counters.insert((order, primary), count);
            }
        }
        Ok(HotnessTracker {
            path: Some(path),
            decay,
            counters,
        })
    }

    /// Record one access to `(order, primary)`.
    pub fn touch(&mut self, order: Order, primary: u32) {
        *self.counters.entry((order, primary)).or_insert(0.0) += 1.0;
    }

    pub fn score(&self, order: Order, primary: u32) -> f64 {
        self.counters.get(&(order, primary)).copied().unwrap_or(0.0)
    }

    /// Apply one decay tick to every tracked counter, dropping entries
    /// that decay below a negligible threshold.
    pub fn decay_tick(&mut self) {
        self.counters.retain(|_, score| {
            *score *= self.decay;
            *score > 1e-6
        });
    }

    /// The primaries in `order` ranked hottest-first.
    pub fn hottest(&self, order: Order, limit: usize) -> Vec<(u32, f64)> {
        let mut entries: Vec<(u32, f64)> = self
            .counters
            .iter()
            .filter_map(|(&(o, primary), &score)| (o == order).then_some((primary, score)))
            .collect();
        entries.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        entries.truncate(limit);
        entries
    }

    pub fn persist(&self) -> Result<(), HotnessError> {
        let Some(path) = &self.path else { return Ok(()) };
        let wire = Wire {
            counters: self
                .counters
                .iter()
                .map(|(&(order, primary), &count)| (order_name(order).to_string(), primary, count))
                .collect(),
        };
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec(&wire)?)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn touch_increments_score() {
        let mut tracker = HotnessTracker::new(0.9);
        tracker.touch(Order::Spo, 1);
        tracker.touch(Order::Spo, 1);
        assert_eq!(tracker.score(Order::Spo, 1), 2.0);
    }

    #[test]
    fn decay_reduces_score_and_prunes_negligible() {
        let mut tracker = HotnessTracker::new(0.5);
        tracker.touch(Order::Spo, 1);
        tracker.decay_tick();
        assert!((tracker.score(Order::Spo, 1) - 0.5).abs() < 1e-9);
        for _ in 0..40 {
            tracker.decay_tick();
        }
        assert_eq!(tracker.score(Order::Spo, 1), 0.0);
    }

    #[test]
    fn hottest_ranks_descending() {
        let mut tracker = HotnessTracker::new(0.9);
        tracker.touch(Order::Spo, 1);
        tracker.touch(Order::Spo, 2);
        tracker.touch(Order::Spo, 2);
        let ranked = tracker.hottest(Order::Spo, 10);
        assert_eq!(ranked[0].0, 2);
        assert_eq!(ranked[1].0, 1);
    }

    #[test]
    fn persists_across_reopen() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("hotness.json");
        {
            let mut tracker = HotnessTracker::open(&path, 0.9).unwrap();
            tracker.touch(Order::Pos, 7);
            tracker.persist().unwrap();
        }
        let tracker = HotnessTracker::open(&path, 0.9).unwrap();
        assert_eq!(tracker.score(Order::Pos, 7), 1.0);
    }
}
