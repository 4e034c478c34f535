//! Configuration and CLI argument handling

use std::time::Duration;

use clap::Parser;

use crate::services::OrphanPolicy;

/// CLI argument parsing structure
#[derive(Parser, Debug)]
#[command(name = "pomodoro-server")]
#[command(about = "An HTTP backend running per-user Pomodoro timers")]
#[command(version)]
pub struct Config {
    /// Port to bind the server to
    #[arg(short, long, default_value = "8080")]
    pub port: u16,

    /// Host address to bind to
    #[arg(long, default_value = "0.0.0.0")]
    pub host: String,

    /// SQLite database file (":memory:" for a throwaway store)
    #[arg(short, long, default_value = "pomodoro.db")]
    pub database: String,

    /// Disable the in-process timer cache
    #[arg(long)]
    pub no_cache: bool,

    /// Lifetime of cached timer records in seconds
    #[arg(long, default_value = "1800")]
    pub cache_ttl_secs: u64,

    /// Driver tick interval in milliseconds
    #[arg(long, default_value = "1000", value_parser = clap::value_parser!(u64).range(1..))]
    pub tick_ms: u64,

    /// What to do with timers left running by a previous process
    #[arg(long, value_enum, default_value = "stop")]
    pub orphan_policy: OrphanPolicy,

    /// Seconds between orphan sweeps (0 disables the periodic sweep)
    #[arg(long, default_value = "30")]
    pub sweep_interval_secs: u64,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Config {
    /// Parse configuration from command line arguments
    pub fn parse() -> Self {
        Parser::parse()
    }

    /// Get the server address as a formatted string
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Get the appropriate log level based on verbose flag
    pub fn log_level(&self) -> &'static str {
        if self.verbose { "debug" } else { "info" }
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }

    pub fn cache_ttl(&self) -> Option<Duration> {
        (!self.no_cache).then(|| Duration::from_secs(self.cache_ttl_secs))
    }

    pub fn sweep_interval(&self) -> Option<Duration> {
        (self.sweep_interval_secs > 0).then(|| Duration::from_secs(self.sweep_interval_secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_a_one_second_cached_server() {
        let config = Config::try_parse_from(["pomodoro-server"]).unwrap();
        assert_eq!(config.address(), "0.0.0.0:8080");
        assert_eq!(config.tick_interval(), Duration::from_secs(1));
        assert_eq!(config.cache_ttl(), Some(Duration::from_secs(1800)));
        assert_eq!(config.orphan_policy, OrphanPolicy::Stop);
        assert_eq!(config.log_level(), "info");
    }

    #[test]
    fn flags_disable_cache_and_sweep() {
        let config = Config::try_parse_from([
            "pomodoro-server",
            "--no-cache",
            "--sweep-interval-secs",
            "0",
            "--orphan-policy",
            "resume",
            "-v",
        ])
        .unwrap();
        assert!(config.cache_ttl().is_none());
        assert!(config.sweep_interval().is_none());
        assert_eq!(config.orphan_policy, OrphanPolicy::Resume);
        assert_eq!(config.log_level(), "debug");
    }

    #[test]
    fn zero_tick_is_rejected() {
        assert!(Config::try_parse_from(["pomodoro-server", "--tick-ms", "0"]).is_err());
    }
}
