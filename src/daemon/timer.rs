//! Timer engine for the Pomodoro cycle.
//!
//! This module provides the countdown driver around [`TimerState`]:
//! - Commands serialized behind a single mutex
//! - A cancelable one-second ticker task (tokio::time::interval)
//! - Snapshot publication to subscribers after every change
//!
//! Every ticker carries the generation it was scheduled under. Pausing or
//! resetting bumps the generation and aborts the task before returning, and
//! a tick only applies if its generation is current and the timer is still
//! running. A tick that loses the race against `pause()` is discarded whole.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use tokio::sync::broadcast;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Duration, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::types::{TimerConfig, TimerState};

// ============================================================================
// Constants
// ============================================================================

/// Period of the countdown tick
pub const TICK_PERIOD: Duration = Duration::from_secs(1);

/// Snapshots buffered per subscriber before it starts lagging
const SNAPSHOT_CHANNEL_CAPACITY: usize = 64;

// ============================================================================
// TimerEngine
// ============================================================================

/// Mutable engine internals, only touched under the lock.
#[derive(Debug)]
struct EngineCore {
    state: TimerState,
    /// Bumped whenever a ticker is scheduled or cancelled
    generation: u64,
    ticker: Option<JoinHandle<()>>,
}

#[derive(Debug)]
struct Shared {
    core: Mutex<EngineCore>,
    snapshot_tx: broadcast::Sender<TimerState>,
    tick_period: Duration,
}

/// Handle to a Pomodoro countdown.
///
/// Cloning is cheap and every clone drives the same timer. Commands never
/// fail: durations are clamped, and commands that change nothing publish
/// nothing.
#[derive(Debug, Clone)]
pub struct TimerEngine {
    shared: Arc<Shared>,
}

impl Default for TimerEngine {
    fn default() -> Self {
        Self::new(TimerConfig::default())
    }
}

impl TimerEngine {
    /// Creates an idle engine with the given durations.
    pub fn new(config: TimerConfig) -> Self {
        Self::with_tick_period(config, TICK_PERIOD)
    }

    /// Creates an idle engine whose ticker fires at a custom period.
    ///
    /// Each tick still counts as one second of the countdown.
    pub fn with_tick_period(config: TimerConfig, tick_period: Duration) -> Self {
        let (snapshot_tx, _) = broadcast::channel(SNAPSHOT_CHANNEL_CAPACITY);

        Self {
            shared: Arc::new(Shared {
                core: Mutex::new(EngineCore {
                    state: TimerState::new(config),
                    generation: 0,
                    ticker: None,
                }),
                snapshot_tx,
                tick_period,
            }),
        }
    }

    /// Starts or resumes the countdown.
    ///
    /// No-op while already running. The ticker is a task on the current
    /// Tokio runtime; called outside of one, the command is refused with a
    /// warning and the returned state is unchanged.
    pub fn start(&self) -> TimerState {
        self.update("start", TimerState::start)
    }

    /// Pauses the countdown. The ticker is cancelled before this returns.
    pub fn pause(&self) -> TimerState {
        self.update("pause", TimerState::pause)
    }

    /// Pauses a running countdown, starts a stopped one.
    ///
    /// Starting needs a Tokio runtime, as for [`TimerEngine::start`].
    pub fn toggle(&self) -> TimerState {
        self.update("toggle", |state| {
            if state.is_running {
                state.pause();
            } else {
                state.start();
            }
        })
    }

    /// Returns to idle with a full work duration.
    pub fn reset(&self) -> TimerState {
        self.update("reset", TimerState::reset)
    }

    /// Sets the work duration in minutes, clamped to 1-180.
    pub fn set_work_minutes(&self, minutes: i64) -> TimerState {
        self.update("set_work_minutes", |state| state.set_work_minutes(minutes))
    }

    /// Sets the break duration in minutes, clamped to 1-60.
    pub fn set_break_minutes(&self, minutes: i64) -> TimerState {
        self.update("set_break_minutes", |state| state.set_break_minutes(minutes))
    }

    /// Returns a copy of the current state.
    pub fn snapshot(&self) -> TimerState {
        self.shared.lock_core().state.clone()
    }

    /// Subscribes to snapshots published after each change and each tick.
    ///
    /// The receiver only sees snapshots published after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<TimerState> {
        self.shared.snapshot_tx.subscribe()
    }

    /// Applies a command and keeps the ticker in step with `is_running`.
    fn update<F>(&self, action: &str, updater: F) -> TimerState
    where
        F: FnOnce(&mut TimerState),
    {
        let mut core = self.shared.lock_core();
        let before = core.state.clone();

        updater(&mut core.state);

        match (before.is_running, core.state.is_running) {
            (false, true) => {
                if !self.schedule_ticker(&mut core) {
                    warn!(action, "No Tokio runtime to drive the ticker, timer left stopped");
                    core.state = before.clone();
                }
            }
            (true, false) => cancel_ticker(&mut core),
            _ => {}
        }

        if core.state == before {
            debug!(action, "Command left timer unchanged");
        } else {
            info!(
                action,
                mode = %core.state.mode,
                running = core.state.is_running,
                remaining = core.state.remaining_seconds,
                "Timer updated"
            );
            self.shared.publish(&core.state);
        }

        core.state.clone()
    }

    /// Spawns a ticker for a new generation.
    ///
    /// Returns false if there is no runtime to spawn on.
    fn schedule_ticker(&self, core: &mut EngineCore) -> bool {
        let Ok(runtime) = Handle::try_current() else {
            return false;
        };

        cancel_ticker(core);
        core.generation += 1;

        let generation = core.generation;
        let period = self.shared.tick_period;
        let first_tick = Instant::now() + period;
        let shared = Arc::downgrade(&self.shared);

        core.ticker = Some(runtime.spawn(run_ticker(shared, generation, first_tick, period)));
        debug!(generation, "Ticker scheduled");
        true
    }

    /// Returns the current schedule generation (for testing).
    #[cfg(test)]
    fn generation(&self) -> u64 {
        self.shared.lock_core().generation
    }
}

fn cancel_ticker(core: &mut EngineCore) {
    core.generation += 1;
    if let Some(handle) = core.ticker.take() {
        handle.abort();
        debug!(generation = core.generation, "Ticker cancelled");
    }
}

/// Ticker loop. Ends once its generation is stale or the engine is gone.
async fn run_ticker(shared: Weak<Shared>, generation: u64, first_tick: Instant, period: Duration) {
    let mut ticker = interval_at(first_tick, period);
    // Missed ticks fire back to back so the countdown keeps up with wall time.
    ticker.set_missed_tick_behavior(MissedTickBehavior::Burst);

    loop {
        ticker.tick().await;

        let Some(shared) = shared.upgrade() else {
            break;
        };

        if !shared.apply_tick(generation) {
            break;
        }
    }
}

impl Shared {
    fn lock_core(&self) -> MutexGuard<'_, EngineCore> {
        // The state is plain data; a panic elsewhere cannot leave it half-written.
        self.core.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Applies one tick unless it belongs to a cancelled schedule.
    ///
    /// Returns false if the tick was discarded.
    fn apply_tick(&self, generation: u64) -> bool {
        let mut core = self.lock_core();

        if core.generation != generation || !core.state.is_running {
            debug!(generation, current = core.generation, "Discarding stale tick");
            return false;
        }

        if core.state.tick() {
            info!(
                mode = %core.state.mode,
                remaining = core.state.remaining_seconds,
                "Phase complete, switching"
            );
        }

        self.publish(&core.state);
        true
    }

    fn publish(&self, state: &TimerState) {
        // Sending only fails when nobody is subscribed.
        let _ = self.snapshot_tx.send(state.clone());
    }
}

impl Drop for Shared {
    fn drop(&mut self) {
        let core = self.core.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(handle) = core.ticker.take() {
            handle.abort();
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
