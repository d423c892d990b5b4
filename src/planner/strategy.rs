//! Execution strategy selection

use tracing::info;

use crate::domain::model::{ExecutionStrategy, KeepPlan};

/// Keep-range count above which the single-pass filter graph is abandoned
pub const DEFAULT_MAX_SEGMENTS: usize = 100;

/// Chooses between the single-pass filter graph and the per-segment fallback.
///
/// Plans with more than `max_segments` keep ranges are cut piecewise.
#[derive(Debug, Clone, Copy)]
pub struct StrategySelector {
    max_segments: usize,
}

impl Default for StrategySelector {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_SEGMENTS)
    }
}

impl StrategySelector {
    pub fn new(max_segments: usize) -> Self {
        Self { max_segments }
    }

    pub fn max_segments(&self) -> usize {
        self.max_segments
    }

    /// Pure function of `plan.len()`
    pub fn select(&self, plan: &KeepPlan) -> ExecutionStrategy {
        self.select_for_count(plan.len())
    }

    pub fn select_for_count(&self, segments: usize) -> ExecutionStrategy {
        if segments > self.max_segments {
            info!(
                segments,
                max_segments = self.max_segments,
                "Too many segments for a single filter graph, using fallback"
            );
            ExecutionStrategy::Fallback
        } else {
            ExecutionStrategy::SinglePass
        }
    }
}
