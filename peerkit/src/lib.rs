//! # peerkit
//!
//! A process-wide, reference-counted peer connection engine runtime. The
//! first handle starts the worker, signaling and network threads, builds the
//! audio device module and the codec factories, and creates the engine's
//! peer connection factory; the last handle tears all of it down again.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use peerkit::{GlobalConfig, PeerKit, VideoCodecType, VideoFormatSelector};
//!
//! let peerkit = PeerKit::init_with(GlobalConfig::headless())?;
//!
//! for format in peerkit.engine_factory().video_encoder_formats() {
//!     println!("{}", format);
//! }
//!
//! let h264 = peerkit.supported_video_formats(&VideoFormatSelector::new(VideoCodecType::H264));
//! assert_eq!(h264.len(), 4);
//! # Ok::<(), peerkit::PeerKitError>(())
//! ```

#![deny(missing_docs)]
#![warn(clippy::all)]

// Re-export core types for easy access
pub use peerkit_core::{
    AudioDeviceModule, AudioLayer, CodecDirection, CodecFactories, CodecFactory, ContextHandle,
    EngineConfig, EngineContexts, EngineHub, MediaEngine, MediaKind, PeerKitError,
    PeerKitResult, SharedEngine,
};

pub use peerkit_media::{
    BuiltinEngine, FormatCatalog, H264Level, H264Profile, H264ProfileLevelId,
    PeerConnectionFactory, ScalabilityMode, SdpVideoFormat, VideoCodecType, VideoFactoryConfig,
    VideoFormatSelector,
};

// Public API modules
pub mod config;
pub mod logging;

// Re-export main API types
pub use config::GlobalConfig;
pub use logging::init_logging;

use std::sync::Arc;
use tracing::{info, warn};

/// Main entry point for peerkit
///
/// Every clone shares one reference to the process-wide engine; the engine
/// is released when the last clone is dropped.
#[derive(Debug, Clone)]
pub struct PeerKit {
    inner: Arc<PeerKitInner>,
}

#[derive(Debug)]
struct PeerKitInner {
    engine: SharedEngine<BuiltinEngine>,
    config: GlobalConfig,
}

impl PeerKit {
    /// Initialize peerkit with default settings
    ///
    /// # Example
    /// ```rust,no_run
    /// use peerkit::PeerKit;
    ///
    /// let peerkit = PeerKit::init()?;
    /// # Ok::<(), peerkit::PeerKitError>(())
    /// ```
    pub fn init() -> PeerKitResult<Self> {
        Self::init_with(GlobalConfig::default())
    }

    /// Initialize with custom global configuration
    ///
    /// The engine configuration of the first initialization in the process
    /// is kept for the life of the process. A later call asking for a
    /// different engine configuration logs a warning, and its
    /// [`PeerKit::config`] reports the configuration actually running.
    ///
    /// Startup faults inside the engine are fatal, so this currently never
    /// returns `Err`.
    pub fn init_with(mut config: GlobalConfig) -> PeerKitResult<Self> {
        if config.debug_logging {
            init_logging(true);
        }

        let hub = BuiltinEngine::shared_hub(config.engine.clone());
        if hub.config() != &config.engine {
            warn!(
                requested = ?config.engine,
                running = ?hub.config(),
                "Engine already configured; keeping the running configuration"
            );
            config.engine = hub.config().clone();
        }

        let engine = hub.acquire();
        info!(references = hub.references(), "peerkit initialized");

        Ok(Self {
            inner: Arc::new(PeerKitInner { engine, config }),
        })
    }

    /// The shared peer connection factory
    pub fn engine_factory(&self) -> Arc<PeerConnectionFactory> {
        self.inner.engine.engine_factory()
    }

    /// Resolve the formats a video codec factory would advertise for `selector`
    pub fn supported_video_formats(&self, selector: &VideoFormatSelector) -> Vec<SdpVideoFormat> {
        self.inner.engine.factory().supported_video_formats(selector)
    }

    /// Handles to the engine's worker, signaling and network contexts
    pub fn contexts(&self) -> EngineContexts {
        self.inner.engine.contexts()
    }

    /// The configuration this handle runs with
    pub fn config(&self) -> &GlobalConfig {
        &self.inner.config
    }
}
