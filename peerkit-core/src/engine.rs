//! Media engine collaborator interfaces
//!
//! The hub never builds media components itself. It asks a [`MediaEngine`]
//! for an audio device module, codec factories and finally the engine's
//! session factory, handing it the execution contexts it has started.

use crate::config::AudioLayer;
use crate::context::ContextHandle;
use crate::crypto;
use crate::error::PeerKitResult;
use crate::task_queue::TaskQueueFactory;
use std::fmt;
use std::sync::Arc;

/// Media kind a codec factory handles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    /// Audio codecs
    Audio,
    /// Video codecs
    Video,
}

/// Whether a codec factory builds encoders or decoders
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CodecDirection {
    /// Encoder factory
    Encode,
    /// Decoder factory
    Decode,
}

/// Audio capture/playback abstraction
///
/// Implementations are built and dropped on the worker context only.
pub trait AudioDeviceModule: Send + Sync + fmt::Debug {
    /// The layer this module was built for
    fn audio_layer(&self) -> AudioLayer;

    /// Names of the available playout devices
    fn playout_devices(&self) -> Vec<String>;

    /// Names of the available recording devices
    fn recording_devices(&self) -> Vec<String>;
}

/// A source of encoders or decoders for one media kind
pub trait CodecFactory: Send + Sync + fmt::Debug {
    /// Media kind handled
    fn media_kind(&self) -> MediaKind;

    /// Encoders or decoders
    fn direction(&self) -> CodecDirection;

    /// Codec names this factory can build, in preference order
    fn codec_names(&self) -> Vec<String>;
}

/// The codec factories handed to the engine's session factory
#[derive(Debug, Clone)]
pub struct CodecFactories {
    /// Built-in audio encoder factory
    pub audio_encoder: Arc<dyn CodecFactory>,
    /// Built-in audio decoder factory
    pub audio_decoder: Arc<dyn CodecFactory>,
    /// Built-in video encoder factory
    pub video_encoder: Arc<dyn CodecFactory>,
    /// Built-in video decoder factory
    pub video_decoder: Arc<dyn CodecFactory>,
    /// Extension slot for a hardware video encoder factory
    pub hardware_video_encoder: Option<Arc<dyn CodecFactory>>,
    /// Extension slot for a hardware video decoder factory
    pub hardware_video_decoder: Option<Arc<dyn CodecFactory>>,
}

impl CodecFactories {
    /// Built-in factories with both extension slots empty
    pub fn builtin(
        audio_encoder: Arc<dyn CodecFactory>,
        audio_decoder: Arc<dyn CodecFactory>,
        video_encoder: Arc<dyn CodecFactory>,
        video_decoder: Arc<dyn CodecFactory>,
    ) -> Self {
        Self {
            audio_encoder,
            audio_decoder,
            video_encoder,
            video_decoder,
            hardware_video_encoder: None,
            hardware_video_decoder: None,
        }
    }

    /// Fill the hardware extension slots
    pub fn with_hardware(
        mut self,
        encoder: Option<Arc<dyn CodecFactory>>,
        decoder: Option<Arc<dyn CodecFactory>>,
    ) -> Self {
        self.hardware_video_encoder = encoder;
        self.hardware_video_decoder = decoder;
        self
    }
}

/// Everything the engine's session factory is built from
#[derive(Debug, Clone)]
pub struct FactoryDependencies {
    /// Network context (socket serving)
    pub network: ContextHandle,
    /// Worker context
    pub worker: ContextHandle,
    /// Signaling context
    pub signaling: ContextHandle,
    /// Audio device module built on the worker context
    pub audio_device_module: Arc<dyn AudioDeviceModule>,
    /// Codec factories
    pub codecs: CodecFactories,
}

/// The underlying media engine
pub trait MediaEngine: Send + Sync + 'static {
    /// The engine's session factory, shared by every session
    type Factory: Send + Sync + 'static;

    /// Build the audio device module; always invoked on the worker context
    fn create_audio_device_module(
        &self,
        layer: AudioLayer,
        task_queue_factory: &TaskQueueFactory,
    ) -> PeerKitResult<Arc<dyn AudioDeviceModule>>;

    /// The four built-in codec factories
    fn builtin_codec_factories(&self) -> CodecFactories;

    /// Hardware video encoder factory to inject, if any
    fn hardware_video_encoder_factory(&self) -> Option<Arc<dyn CodecFactory>> {
        None
    }

    /// Hardware video decoder factory to inject, if any
    fn hardware_video_decoder_factory(&self) -> Option<Arc<dyn CodecFactory>> {
        None
    }

    /// Build the session factory; `None` is an unrecoverable startup fault
    fn create_factory(&self, dependencies: FactoryDependencies) -> Option<Arc<Self::Factory>>;

    /// Initialize the process crypto subsystem
    fn initialize_crypto(&self) -> PeerKitResult<()> {
        crypto::initialize()
    }

    /// Tear down the process crypto subsystem
    fn cleanup_crypto(&self) {
        crypto::cleanup()
    }
}
