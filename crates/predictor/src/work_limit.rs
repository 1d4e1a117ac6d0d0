//! Per-worker work accounting

use crate::scheduler::WorkUnitScheduler;
use std::sync::Arc;

/// Work-unit clock owned by one worker thread
///
/// In deterministic mode every recorded batch of work advances the clock and,
/// once the clock crosses a sync horizon, blocks until all other registered
/// workers reach the same horizon. Dropping a registered context deregisters
/// it so the remaining workers are not left waiting.
#[derive(Debug)]
pub struct WorkLimitContext {
    pub name: String,
    pub deterministic: bool,
    /// Work units recorded so far (or the horizon an idle worker jumped to)
    pub global_work_units_elapsed: f64,
    /// Seconds spent blocked at sync points
    pub total_sync_time: f64,
    pub(crate) scheduler: Option<Arc<WorkUnitScheduler>>,
}

impl WorkLimitContext {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            deterministic: false,
            global_work_units_elapsed: 0.0,
            total_sync_time: 0.0,
            scheduler: None,
        }
    }

    pub fn deterministic(name: impl Into<String>) -> Self {
        let mut ctx = Self::new(name);
        ctx.deterministic = true;
        ctx
    }

    /// Add `work` units and wait at any sync horizon crossed
    ///
    /// A no-op when the context is not deterministic.
    pub fn record_work_sync_on_horizon(&mut self, work: f64) {
        if !self.deterministic {
            return;
        }
        self.global_work_units_elapsed += work;
        if let Some(scheduler) = self.scheduler.clone() {
            let total = self.global_work_units_elapsed;
            scheduler.on_work_recorded(self, total);
        }
    }

    pub fn is_registered(&self) -> bool {
        self.scheduler.is_some()
    }
}

impl Drop for WorkLimitContext {
    fn drop(&mut self) {
        if let Some(scheduler) = self.scheduler.take() {
            scheduler.remove_participant(&self.name);
        }
    }
}
