//! Engine configuration types and defaults

/// Which audio device implementation the engine builds on the worker thread
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioLayer {
    /// The platform's default capture/playback host
    PlatformDefault,
    /// A device-less module, for headless and server deployments
    Dummy,
}

impl Default for AudioLayer {
    fn default() -> Self {
        Self::PlatformDefault
    }
}

/// Configuration for the shared engine runtime
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Name of the worker execution context thread
    pub worker_thread_name: String,
    /// Name of the signaling execution context thread
    pub signaling_thread_name: String,
    /// Name of the network execution context thread
    pub network_thread_name: String,
    /// Audio device implementation to construct
    pub audio_layer: AudioLayer,
}

impl EngineConfig {
    /// Desktop configuration using the platform audio devices
    pub fn desktop() -> Self {
        Self {
            worker_thread_name: "worker_thread".to_string(),
            signaling_thread_name: "signaling_thread".to_string(),
            network_thread_name: "network_thread".to_string(),
            audio_layer: AudioLayer::PlatformDefault,
        }
    }

    /// Headless configuration with no real audio devices
    pub fn headless() -> Self {
        Self {
            audio_layer: AudioLayer::Dummy,
            ..Self::desktop()
        }
    }

    /// Set the audio layer
    pub fn with_audio_layer(mut self, audio_layer: AudioLayer) -> Self {
        self.audio_layer = audio_layer;
        self
    }

    /// Prefix every thread name, useful when several hubs run in one process
    pub fn with_thread_prefix(mut self, prefix: &str) -> Self {
        self.worker_thread_name = format!("{}{}", prefix, self.worker_thread_name);
        self.signaling_thread_name = format!("{}{}", prefix, self.signaling_thread_name);
        self.network_thread_name = format!("{}{}", prefix, self.network_thread_name);
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::desktop()
    }
}
