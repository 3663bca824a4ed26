//! Binary runner utilities
//!
//! Provides a standardized way to run binaries with proper
//! logging banners and graceful Ctrl-C shutdown.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

/// Configuration for running a binary application
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Name of the binary (for logging)
    pub name: String,
    /// Display refresh interval in milliseconds (if applicable)
    pub refresh_interval_ms: Option<u64>,
}

impl RunConfig {
    /// Create a new run configuration
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            refresh_interval_ms: None,
        }
    }

    /// Set the display refresh interval
    pub fn with_refresh_interval(mut self, ms: u64) -> Self {
        self.refresh_interval_ms = Some(ms);
        self
    }

    /// Print startup banner
    pub fn print_banner(&self) {
        info!("");
        info!("========================================");
        info!("Starting {}", self.name);
        info!("Press Ctrl+C to stop");
        info!("========================================");
        info!("");
    }

    /// Print shutdown banner
    pub fn print_shutdown(&self, stats: Option<&str>) {
        info!("");
        info!("========================================");
        info!("{} stopped gracefully", self.name);
        if let Some(stats) = stats {
            info!("{}", stats);
        }
        info!("========================================");
    }
}

/// Ctrl-C aware run flag shared between the main loop and the client
///
/// The same flag can be handed to `liveline::builder().shutdown_flag(...)`
/// so the connection stops reconnecting the moment the binary is asked to
/// exit.
pub struct ShutdownManager {
    flag: Arc<AtomicBool>,
}

impl ShutdownManager {
    pub fn new() -> Self {
        Self {
            flag: Arc::new(AtomicBool::new(true)),
        }
    }

    /// The shared run flag: true while the binary should keep running
    pub fn flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.flag)
    }

    pub fn is_running(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }

    /// Flip the flag to false on the first Ctrl-C
    pub fn spawn_signal_handler(&self) {
        let flag = Arc::clone(&self.flag);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Ctrl+C received, shutting down");
                flag.store(false, Ordering::Release);
            }
        });
    }
}

impl Default for ShutdownManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_config_builder() {
        let config = RunConfig::new("test-binary").with_refresh_interval(250);

        assert_eq!(config.name, "test-binary");
        assert_eq!(config.refresh_interval_ms, Some(250));
    }

    #[test]
    fn test_default_config() {
        let config = RunConfig::new("default");
        assert_eq!(config.refresh_interval_ms, None);
    }

    #[test]
    fn test_shutdown_manager_starts_running() {
        let shutdown = ShutdownManager::new();
        assert!(shutdown.is_running());

        shutdown.flag().store(false, Ordering::Release);
        assert!(!shutdown.is_running());
    }
}
