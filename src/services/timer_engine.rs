//! Per-user Pomodoro timer engine
//!
//! Every operation takes the user's lock from [`UserLocks`] for its whole
//! read-modify-write, so request handlers and driver loops never lose each
//! other's updates. Starting a timer spawns one driver loop
//! ([`timer_driver_task`]); stopping only flips `is_running` in storage and
//! the loop notices on its next tick.

use std::{sync::Arc, time::Duration};

use chrono::Utc;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::guard::{DriverRegistry, UserLocks};
use crate::{
    error::{Result, TimerError},
    state::{Phase, TimerSettings, TimerState, TimerStatus, UserId},
    storage::TimerStore,
    tasks::timer_driver_task,
};

/// Phase and countdown reported by start and stop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Countdown {
    pub current_phase: Phase,
    pub remaining_time: u32,
}

impl From<&TimerState> for Countdown {
    fn from(state: &TimerState) -> Self {
        Self {
            current_phase: state.current_phase,
            remaining_time: state.remaining_time,
        }
    }
}

/// What to do with a record flagged running that has no live driver
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OrphanPolicy {
    /// Clear `is_running`, keeping the remaining time
    Stop,
    /// Spawn a new driver and keep counting down
    Resume,
}

/// Outcome of an orphan sweep
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub stopped: Vec<UserId>,
    pub resumed: Vec<UserId>,
}

impl ReconcileReport {
    pub fn is_empty(&self) -> bool {
        self.stopped.is_empty() && self.resumed.is_empty()
    }
}

#[derive(Clone)]
pub struct TimerEngine {
    store: Arc<dyn TimerStore>,
    locks: Arc<UserLocks>,
    drivers: Arc<DriverRegistry>,
    tick_interval: Duration,
}

impl TimerEngine {
    pub fn new(store: Arc<dyn TimerStore>, tick_interval: Duration) -> Self {
        Self {
            store,
            locks: Arc::new(UserLocks::new()),
            drivers: Arc::new(DriverRegistry::new()),
            tick_interval,
        }
    }

    pub fn tick_interval(&self) -> Duration {
        self.tick_interval
    }

    pub(crate) fn store(&self) -> &dyn TimerStore {
        self.store.as_ref()
    }

    pub(crate) fn locks(&self) -> &UserLocks {
        &self.locks
    }

    pub(crate) fn drivers(&self) -> &DriverRegistry {
        &self.drivers
    }

    /// Number of driver loops currently owning a timer
    pub fn live_drivers(&self) -> usize {
        self.drivers.live_count()
    }

    /// Release locks of idle users and expired cache entries.
    ///
    /// Returns `(locks, cache_entries)` dropped.
    pub fn prune_idle(&self) -> (usize, usize) {
        (self.locks.prune_idle(), self.store.purge_expired())
    }

    fn load_existing(&self, user_id: UserId) -> Result<TimerState> {
        self.store.load(user_id)?.ok_or(TimerError::NotFound(user_id))
    }

    fn persist(&self, state: &mut TimerState) -> Result<()> {
        state.updated_at = Utc::now();
        self.store.save(state)?;
        Ok(())
    }

    fn spawn_driver(&self, user_id: UserId) {
        let epoch = self.drivers.claim(user_id);
        debug!("Spawning timer driver for user {} (epoch {})", user_id, epoch);
        tokio::spawn(timer_driver_task(self.clone(), user_id, epoch));
    }

    /// Settings for `user_id`, created with defaults on first access
    pub async fn get_settings(&self, user_id: UserId) -> Result<TimerState> {
        let _guard = self.locks.lock(user_id).await;

        if let Some(state) = self.store.load(user_id)? {
            return Ok(state);
        }

        info!("Creating default timer settings for user {}", user_id);
        let mut state = TimerState::new(user_id);
        self.persist(&mut state)?;
        Ok(state)
    }

    /// Replace durations and auto-transition, creating the record if needed
    pub async fn update_settings(&self, user_id: UserId, settings: TimerSettings) -> Result<TimerState> {
        settings.validate().map_err(TimerError::InvalidSettings)?;

        let _guard = self.locks.lock(user_id).await;
        let mut state = self
            .store
            .load(user_id)?
            .unwrap_or_else(|| TimerState::new(user_id));

        state.pomodoro_duration = settings.pomodoro_duration;
        state.short_break_duration = settings.short_break_duration;
        state.long_break_duration = settings.long_break_duration;
        state.auto_transition = settings.auto_transition;
        state.clamp_remaining();
        self.persist(&mut state)?;

        info!(
            "Updated timer settings for user {}: {}/{}/{} min, auto={}",
            user_id,
            state.pomodoro_duration,
            state.short_break_duration,
            state.long_break_duration,
            state.auto_transition
        );
        Ok(state)
    }

    /// Start counting down, switching to `requested` first if it differs
    pub async fn start(&self, user_id: UserId, requested: Option<Phase>) -> Result<Countdown> {
        let _guard = self.locks.lock(user_id).await;
        let mut state = self.load_existing(user_id)?;

        if state.is_running {
            return Err(TimerError::AlreadyRunning);
        }

        if let Some(phase) = requested {
            state.switch_phase(phase);
        }
        state.is_running = true;
        self.persist(&mut state)?;
        self.spawn_driver(user_id);

        info!(
            "Timer started for user {}: {} with {}s remaining",
            user_id, state.current_phase, state.remaining_time
        );
        Ok(Countdown::from(&state))
    }

    /// Mark the timer stopped. The driver loop exits on its next tick.
    pub async fn stop(&self, user_id: UserId) -> Result<Countdown> {
        let _guard = self.locks.lock(user_id).await;
        let mut state = self.load_existing(user_id)?;

        if !state.is_running {
            return Err(TimerError::NotRunning);
        }

        state.is_running = false;
        self.persist(&mut state)?;

        info!(
            "Timer stopped for user {}: {} with {}s remaining",
            user_id, state.current_phase, state.remaining_time
        );
        Ok(Countdown::from(&state))
    }

    /// Switch phase with a full countdown; a running timer keeps running
    pub async fn change_phase(&self, user_id: UserId, phase: Phase) -> Result<Phase> {
        let _guard = self.locks.lock(user_id).await;
        let mut state = self.load_existing(user_id)?;

        if state.switch_phase(phase) {
            self.persist(&mut state)?;
            info!("User {} switched to {}", user_id, phase);
        }
        Ok(state.current_phase)
    }

    pub async fn get_status(&self, user_id: UserId) -> Result<TimerStatus> {
        let _guard = self.locks.lock(user_id).await;
        Ok(self.load_existing(user_id)?.status())
    }

    pub async fn set_auto_transition(&self, user_id: UserId, enabled: bool) -> Result<bool> {
        let _guard = self.locks.lock(user_id).await;
        let mut state = self.load_existing(user_id)?;

        state.auto_transition = enabled;
        self.persist(&mut state)?;
        Ok(state.auto_transition)
    }

    /// Restart the long-break cycle; the lifetime total is kept
    pub async fn reset_completed(&self, user_id: UserId) -> Result<TimerStatus> {
        let _guard = self.locks.lock(user_id).await;
        let mut state = self.load_existing(user_id)?;

        state.completed_pomodoros = 0;
        self.persist(&mut state)?;
        Ok(state.status())
    }

    /// Remove the user's timer record and supersede any live driver
    pub async fn delete_user_data(&self, user_id: UserId) -> Result<bool> {
        let _guard = self.locks.lock(user_id).await;
        self.drivers.revoke(user_id);
        self.store.invalidate_cache(user_id);
        let removed = self.store.delete(user_id)?;
        if removed {
            info!("Deleted timer record for user {}", user_id);
        }
        Ok(removed)
    }

    /// Apply `policy` to every running record that no driver owns.
    ///
    /// Such records appear after a restart or after a driver stopped on a
    /// storage failure.
    pub async fn reconcile_orphans(&self, policy: OrphanPolicy) -> Result<ReconcileReport> {
        let mut report = ReconcileReport::default();

        for candidate in self.store.running()? {
            let user_id = candidate.user_id;
            if self.drivers.is_live(user_id) {
                continue;
            }

            let _guard = self.locks.lock(user_id).await;
            // recheck under the lock; a start may have raced the listing
            let Some(mut state) = self.store.load(user_id)? else {
                continue;
            };
            if !state.is_running || self.drivers.is_live(user_id) {
                continue;
            }

            match policy {
                OrphanPolicy::Stop => {
                    state.is_running = false;
                    self.persist(&mut state)?;
                    warn!(
                        "Stopped orphaned timer for user {} ({} with {}s remaining)",
                        user_id, state.current_phase, state.remaining_time
                    );
                    report.stopped.push(user_id);
                }
                OrphanPolicy::Resume => {
                    self.spawn_driver(user_id);
                    warn!(
                        "Resumed orphaned timer for user {} ({} with {}s remaining)",
                        user_id, state.current_phase, state.remaining_time
                    );
                    report.resumed.push(user_id);
                }
            }
        }

        Ok(report)
    }
}
