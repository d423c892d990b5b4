//! Cut planning: delete request -> keep plan -> execution strategy

use serde::Serialize;
use tracing::info;

pub mod strategy;

use crate::domain::model::{ExecutionStrategy, KeepPlan, TimeRange};
use crate::domain::rules::IntervalMerger;
use crate::error::{CutXError, CutXResult};
use strategy::StrategySelector;

/// Everything the engine needs to know about how to realize a request
#[derive(Debug, Clone, Serialize)]
pub struct CutPlan {
    /// Duration of the source in seconds
    pub source_duration: f64,
    /// Ranges of the source that survive
    pub keep: KeepPlan,
    /// Selected execution strategy
    pub strategy: ExecutionStrategy,
}

impl CutPlan {
    /// Duration the output should have
    pub fn output_duration(&self) -> f64 {
        self.keep.total_duration()
    }
}

/// Combines the interval merger with the strategy selector
#[derive(Debug, Clone, Copy, Default)]
pub struct CutPlanner {
    merger: IntervalMerger,
    selector: StrategySelector,
}

impl CutPlanner {
    pub fn new(merger: IntervalMerger, selector: StrategySelector) -> Self {
        Self { merger, selector }
    }

    /// Plan a cut. An empty keep plan is a validation error: the request
    /// would delete the whole source.
    pub fn plan(&self, deletes: &[TimeRange], source_duration: f64) -> CutXResult<CutPlan> {
        if !source_duration.is_finite() || source_duration <= 0.0 {
            return Err(CutXError::validation(format!(
                "source duration must be positive (got {})",
                source_duration
            )));
        }

        let keep = self.merger.keep_plan(deletes, source_duration);
        if keep.is_empty() {
            return Err(CutXError::validation(
                "delete ranges cover the entire media; nothing would remain",
            ));
        }

        let strategy = self.selector.select(&keep);
        info!(
            deletes = deletes.len(),
            keep = keep.len(),
            kept_secs = keep.total_duration(),
            %strategy,
            "Planned cut"
        );

        Ok(CutPlan {
            source_duration,
            keep,
            strategy,
        })
    }
}
