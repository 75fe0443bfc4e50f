//! Configuration types and defaults

use peerkit_core::EngineConfig;

/// Global peerkit configuration
#[derive(Debug, Clone, Default)]
pub struct GlobalConfig {
    /// Enable debug logging
    pub debug_logging: bool,
    /// Shared engine runtime configuration
    pub engine: EngineConfig,
}

impl GlobalConfig {
    /// Configuration for hosts without audio hardware
    pub fn headless() -> Self {
        Self {
            debug_logging: false,
            engine: EngineConfig::headless(),
        }
    }

    /// Toggle debug logging
    pub fn with_debug_logging(mut self, enabled: bool) -> Self {
        self.debug_logging = enabled;
        self
    }
}
