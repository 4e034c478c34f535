//! Periodic recovery of timers left running without a driver

use std::{sync::Arc, time::Duration};

use tokio::time::interval;
use tracing::{debug, info, warn};

use crate::{services::OrphanPolicy, state::AppState};

/// Background task that re-applies the orphan policy every `period`.
///
/// Catches drivers that stopped on a storage failure and left their record
/// flagged as running. Each pass also releases idle per-user locks and
/// expired cache entries.
pub async fn orphan_sweep_task(state: Arc<AppState>, policy: OrphanPolicy, period: Duration) {
    info!("Starting orphan sweep task every {:?} ({:?})", period, policy);

    let mut interval = interval(period);
    // the first tick fires immediately; startup already swept
    interval.tick().await;

    loop {
        interval.tick().await;

        match state.timer.reconcile_orphans(policy).await {
            Ok(report) if !report.is_empty() => {
                info!(
                    "Orphan sweep: stopped {:?}, resumed {:?}",
                    report.stopped, report.resumed
                );
            }
            Ok(_) => {}
            Err(e) => warn!("Orphan sweep failed: {}", e),
        }

        let pruned = state.prune_idle();
        if !pruned.is_empty() {
            debug!(
                "Released {} idle locks and {} expired cache entries",
                pruned.locks, pruned.cache_entries
            );
        }
    }
}
