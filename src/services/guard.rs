//! Per-user serialization and driver ownership

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::state::UserId;

/// Lazily created mutex per user.
///
/// Holding the guard makes a read-modify-write of that user's record atomic
/// with respect to every other holder. Unrelated users never contend.
#[derive(Debug, Default)]
pub struct UserLocks {
    locks: DashMap<UserId, Arc<Mutex<()>>>,
}

impl UserLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lock(&self, user_id: UserId) -> OwnedMutexGuard<()> {
        // the map shard must not stay locked across the await
        let lock = Arc::clone(&self.locks.entry(user_id).or_default());
        lock.lock_owned().await
    }

    /// Forget users whose lock nobody holds or waits on.
    ///
    /// Holders and waiters keep a clone of the `Arc`, so a count of one means
    /// only the map refers to it. `retain` holds the shard while checking, so
    /// no `lock` call can clone the entry in between.
    pub fn prune_idle(&self) -> usize {
        let before = self.locks.len();
        self.locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        before.saturating_sub(self.locks.len())
    }

    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

/// Tracks which driver loop currently owns each user's timer.
///
/// Every start claims a fresh epoch; a loop whose epoch is no longer current
/// has been superseded and must exit without writing.
#[derive(Debug, Default)]
pub struct DriverRegistry {
    epochs: DashMap<UserId, u64>,
    next_epoch: AtomicU64,
}

impl DriverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hand ownership to a new driver, returning its epoch
    pub fn claim(&self, user_id: UserId) -> u64 {
        let epoch = self.next_epoch.fetch_add(1, Ordering::Relaxed) + 1;
        self.epochs.insert(user_id, epoch);
        epoch
    }

    pub fn is_current(&self, user_id: UserId, epoch: u64) -> bool {
        self.epochs
            .get(&user_id)
            .map(|current| *current == epoch)
            .unwrap_or(false)
    }

    /// Whether any driver loop owns this user's timer
    pub fn is_live(&self, user_id: UserId) -> bool {
        self.epochs.contains_key(&user_id)
    }

    /// Called by a driver on exit; leaves a newer owner in place
    pub fn release(&self, user_id: UserId, epoch: u64) {
        self.epochs.remove_if(&user_id, |_, current| *current == epoch);
    }

    /// Drop ownership regardless of epoch, superseding any live loop
    pub fn revoke(&self, user_id: UserId) {
        self.epochs.remove(&user_id);
    }

    pub fn live_count(&self) -> usize {
        self.epochs.len()
    }
}
