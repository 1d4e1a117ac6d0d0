//! Deterministic work-unit synchronisation
//!
//! Workers advance on a shared work-unit timeline split into fixed
//! intervals. Whenever a worker's clock reaches the next horizon it blocks
//! until every registered worker has arrived; the last arriver runs the sync
//! callback once and opens the next generation.

use crate::work_limit::WorkLimitContext;
use parking_lot::{Condvar, Mutex};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// Runs once per sync point with the horizon that was reached
///
/// Called with the scheduler's internal lock held: it must not call back
/// into the scheduler.
pub type SyncCallback = Box<dyn FnMut(f64) + Send>;

struct BarrierState {
    sync_interval: f64,
    participants: usize,
    arrived: usize,
    generation: u64,
    pending_target: f64,
    last_sync_target: f64,
    callback: Option<SyncCallback>,
}

impl BarrierState {
    fn next_target(&self) -> f64 {
        if self.sync_interval <= 0.0 {
            return f64::INFINITY;
        }
        (self.generation + 1) as f64 * self.sync_interval
    }
}

pub struct WorkUnitScheduler {
    state: Mutex<BarrierState>,
    released: Condvar,
    shutdown: AtomicBool,
}

impl WorkUnitScheduler {
    pub const DEFAULT_SYNC_INTERVAL: f64 = 5.0;

    pub fn new(sync_interval: f64) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(BarrierState {
                sync_interval,
                participants: 0,
                arrived: 0,
                generation: 0,
                pending_target: 0.0,
                last_sync_target: 0.0,
                callback: None,
            }),
            released: Condvar::new(),
            shutdown: AtomicBool::new(false),
        })
    }

    pub fn set_sync_interval(&self, interval: f64) {
        self.state.lock().sync_interval = interval;
    }

    pub fn sync_interval(&self) -> f64 {
        self.state.lock().sync_interval
    }

    pub fn set_sync_callback<F>(&self, callback: F)
    where
        F: FnMut(f64) + Send + 'static,
    {
        self.state.lock().callback = Some(Box::new(callback));
    }

    /// Attach `ctx` to this scheduler; it becomes a barrier participant
    pub fn register_context(self: &Arc<Self>, ctx: &mut WorkLimitContext) {
        if let Some(previous) = ctx.scheduler.take() {
            previous.remove_participant(&ctx.name);
        }
        self.state.lock().participants += 1;
        ctx.scheduler = Some(Arc::clone(self));
        debug!("[{}] Registered with work-unit scheduler", ctx.name);
    }

    /// Detach `ctx`; a no-op if it is registered elsewhere or not at all
    pub fn deregister_context(&self, ctx: &mut WorkLimitContext) {
        let owned_here = ctx
            .scheduler
            .as_ref()
            .is_some_and(|s| std::ptr::eq(Arc::as_ptr(s), self));
        if owned_here {
            ctx.scheduler = None;
            self.remove_participant(&ctx.name);
        }
    }

    pub(crate) fn remove_participant(&self, name: &str) {
        let mut state = self.state.lock();
        state.participants = state.participants.saturating_sub(1);
        debug!("[{name}] Deregistered from work-unit scheduler");
        // Everyone still registered may already be waiting on the leaver.
        if !self.is_shutdown() && state.arrived > 0 && state.arrived >= state.participants {
            let target = state.pending_target;
            self.complete_sync_point(&mut state, target);
        }
    }

    pub fn participants(&self) -> usize {
        self.state.lock().participants
    }

    pub fn generation(&self) -> u64 {
        self.state.lock().generation
    }

    /// Next horizon; infinite when the interval is not positive
    pub fn current_sync_target(&self) -> f64 {
        self.state.lock().next_target()
    }

    /// Horizon of the most recently completed sync point
    pub fn last_sync_target(&self) -> f64 {
        self.state.lock().last_sync_target
    }

    /// Block at every horizon `total_work` has reached
    pub fn on_work_recorded(&self, ctx: &mut WorkLimitContext, total_work: f64) {
        if self.is_shutdown() {
            return;
        }
        debug!(
            "[{}] Work recorded: {:.3}, sync_target: {:.3}",
            ctx.name,
            total_work,
            self.current_sync_target()
        );

        // Large increments can cross several horizons.
        while self.wait_at_sync_point(ctx, Some(total_work)) {}
    }

    /// Park an idle worker at the next horizon
    pub fn wait_for_next_sync(&self, ctx: &mut WorkLimitContext) {
        self.wait_at_sync_point(ctx, None);
    }

    /// Arrive at the current horizon and wait for the rest of the generation
    ///
    /// The horizon is read under the barrier lock, so a generation completed
    /// by another thread in the meantime is never joined with a stale target.
    /// `total_work` of `None` marks an idle worker, whose clock jumps to the
    /// horizon. Returns whether the context actually arrived.
    fn wait_at_sync_point(&self, ctx: &mut WorkLimitContext, total_work: Option<f64>) -> bool {
        let wait_start = Instant::now();
        let sync_target;
        {
            let mut state = self.state.lock();
            if self.is_shutdown() {
                return false;
            }
            sync_target = state.next_target();
            match total_work {
                Some(total) if total < sync_target => return false,
                Some(_) => {}
                None if !sync_target.is_finite() => return false,
                None => ctx.global_work_units_elapsed = sync_target,
            }
            debug!(
                "[{}] Waiting at sync point {:.2} (gen {})",
                ctx.name, sync_target, state.generation
            );

            state.arrived += 1;
            state.pending_target = sync_target;
            if state.arrived >= state.participants {
                self.complete_sync_point(&mut state, sync_target);
            } else {
                let generation = state.generation;
                while state.generation == generation && !self.is_shutdown() {
                    self.released.wait(&mut state);
                }
            }
        }

        let waited = wait_start.elapsed().as_secs_f64();
        ctx.total_sync_time += waited;
        debug!(
            "[{}] Sync complete at {:.2}, waited {:.2} ms",
            ctx.name,
            sync_target,
            waited * 1000.0
        );
        true
    }

    fn complete_sync_point(&self, state: &mut BarrierState, sync_target: f64) {
        state.arrived = 0;
        state.generation += 1;
        state.last_sync_target = sync_target;
        debug!(
            "All contexts arrived at sync point {:.2}, new generation {}",
            sync_target, state.generation
        );
        if let Some(callback) = state.callback.as_mut() {
            callback(sync_target);
        }
        self.released.notify_all();
    }

    /// Release every waiter and turn later waits into no-ops
    pub fn signal_shutdown(&self) {
        self.shutdown.store(true, Ordering::Release);
        let _state = self.state.lock();
        self.released.notify_all();
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }
}

impl fmt::Debug for WorkUnitScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("WorkUnitScheduler")
            .field("sync_interval", &state.sync_interval)
            .field("participants", &state.participants)
            .field("arrived", &state.arrived)
            .field("generation", &state.generation)
            .field("shutdown", &self.is_shutdown())
            .finish_non_exhaustive()
    }
}
