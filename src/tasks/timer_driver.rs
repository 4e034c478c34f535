//! Per-user countdown loop

use std::time::Duration;

use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info};

use crate::{
    error::Result,
    services::TimerEngine,
    state::{phase, phase::TickOutcome, UserId},
};

/// Why a driver loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Halt {
    /// A newer start (or a deletion) took ownership
    Superseded,
    /// The record no longer exists
    Missing,
    /// `is_running` was cleared by a stop request
    Stopped,
    /// The phase ended with auto-transition disabled
    PhaseEnded,
}

/// Drive one user's timer until it stops, is superseded or fails to persist.
///
/// Ticks once per engine tick interval; each tick re-reads the record under
/// the user's lock so out-of-band stops and phase changes are observed.
pub async fn timer_driver_task(engine: TimerEngine, user_id: UserId, epoch: u64) {
    let period = engine.tick_interval();
    debug!("Timer driver for user {} running every {:?}", user_id, period);

    let mut ticker = interval_at(Instant::now() + period, period.max(Duration::from_millis(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;

        match tick_once(&engine, user_id, epoch).await {
            Ok(None) => {}
            Ok(Some(halt)) => {
                debug!("Timer driver for user {} halted: {:?}", user_id, halt);
                break;
            }
            Err(e) => {
                // fail-stop: the record stays flagged running until swept
                error!("Timer tick failed for user {}, stopping driver: {}", user_id, e);
                break;
            }
        }
    }

    engine.drivers().release(user_id, epoch);
}

/// Perform one tick. Returns `Some` when the loop should end.
pub(crate) async fn tick_once(engine: &TimerEngine, user_id: UserId, epoch: u64) -> Result<Option<Halt>> {
    let _guard = engine.locks().lock(user_id).await;

    if !engine.drivers().is_current(user_id, epoch) {
        return Ok(Some(Halt::Superseded));
    }

    let Some(state) = engine.store().load(user_id)? else {
        return Ok(Some(Halt::Missing));
    };
    if !state.is_running {
        return Ok(Some(Halt::Stopped));
    }

    let (mut next, outcome) = phase::tick(&state);
    next.updated_at = chrono::Utc::now();
    engine.store().save(&next)?;

    if let TickOutcome::Advanced { from, to } = outcome {
        info!(
            "User {} finished {} -> {} ({} completed, {} total)",
            user_id, from, to, next.completed_pomodoros, next.total_completed_pomodoros
        );
    }

    if next.is_running {
        Ok(None)
    } else {
        Ok(Some(Halt::PhaseEnded))
    }
}
