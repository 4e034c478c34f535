//! Shared application state handed to every HTTP handler

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use crate::{
    services::{StatsService, TaskService, TimerEngine},
    storage::{StatsStore, TaskStore, TimerStore},
};

/// Counts of in-memory entries released by [`AppState::prune_idle`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PruneReport {
    pub locks: usize,
    pub cache_entries: usize,
}

impl PruneReport {
    pub fn is_empty(&self) -> bool {
        self.locks == 0 && self.cache_entries == 0
    }
}

/// Timer engine, stats and task services, and server metadata
#[derive(Clone)]
pub struct AppState {
    pub timer: TimerEngine,
    pub stats: StatsService,
    pub tasks: TaskService,
    /// Server metadata
    pub start_time: Instant,
    pub port: u16,
    pub host: String,
}

impl AppState {
    pub fn new(
        timer_store: Arc<dyn TimerStore>,
        stats_store: Arc<dyn StatsStore>,
        task_store: Arc<dyn TaskStore>,
        tick_interval: Duration,
        port: u16,
        host: String,
    ) -> Self {
        Self {
            timer: TimerEngine::new(timer_store, tick_interval),
            stats: StatsService::new(stats_store),
            tasks: TaskService::new(task_store),
            start_time: Instant::now(),
            port,
            host,
        }
    }

    /// Drop per-user locks nobody holds and expired cache entries
    pub fn prune_idle(&self) -> PruneReport {
        let (timer_locks, cache_entries) = self.timer.prune_idle();
        PruneReport {
            locks: timer_locks + self.stats.prune_idle() + self.tasks.prune_idle(),
            cache_entries,
        }
    }

    /// Server address as reported by the health check
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Calculate server uptime as a formatted string
    pub fn get_uptime(&self) -> String {
        let secs = self.start_time.elapsed().as_secs();
        let hours = secs / 3600;
        let minutes = (secs % 3600) / 60;
        let seconds = secs % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}s", seconds)
        }
    }
}
