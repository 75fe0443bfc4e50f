//! The built-in media engine
//!
//! [`BuiltinEngine`] plugs the built-in audio modules, codec factories and
//! format catalog into an [`EngineHub`]. Its session factory is the
//! [`PeerConnectionFactory`].

use crate::audio;
use crate::codec_factory::{AudioCodecFactory, VideoCodecFactory};
use crate::format::{
    h264_format, vp9_format, H264Level, H264Profile, SdpVideoFormat, VideoCodecType, Vp9Profile,
    AV1_CODEC_NAME, VP8_CODEC_NAME,
};
use crate::negotiator::{FormatCatalog, VideoFormatSelector};
use crate::scalability::{ScalabilityMode, ALL_SCALABILITY_MODES, TEMPORAL_SCALABILITY_MODES};
use crate::video_factory::VideoFactoryConfig;
use peerkit_core::{
    AudioDeviceModule, AudioLayer, CodecFactories, ContextHandle, EngineConfig, EngineHub,
    FactoryDependencies, MediaEngine, PeerKitResult, TaskQueueFactory,
};
use std::sync::{Arc, OnceLock};
use tracing::{debug, info};

/// Format enumeration of the built-in codec implementations
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinCatalog;

impl FormatCatalog for BuiltinCatalog {
    fn internal_formats(&self, codec: VideoCodecType) -> Vec<SdpVideoFormat> {
        match codec {
            VideoCodecType::Vp8 => vec![SdpVideoFormat::new(VP8_CODEC_NAME)
                .with_scalability_modes(TEMPORAL_SCALABILITY_MODES)],
            VideoCodecType::Vp9 => self.vp9_svc_formats(),
            VideoCodecType::Av1 => vec![SdpVideoFormat::new(AV1_CODEC_NAME)
                .with_scalability_modes(self.av1_scalability_modes())],
            VideoCodecType::H264 => [
                H264Profile::Baseline,
                H264Profile::ConstrainedBaseline,
                H264Profile::Main,
            ]
            .into_iter()
            .flat_map(|profile| {
                ["1", "0"].into_iter().map(move |mode| {
                    h264_format(profile, H264Level::Level3_1, mode)
                        .with_scalability_modes(TEMPORAL_SCALABILITY_MODES)
                })
            })
            .collect(),
            VideoCodecType::Generic | VideoCodecType::H265 => Vec::new(),
        }
    }

    fn vp9_svc_formats(&self) -> Vec<SdpVideoFormat> {
        [Vp9Profile::Profile0, Vp9Profile::Profile2]
            .into_iter()
            .map(|profile| vp9_format(profile).with_scalability_modes(ALL_SCALABILITY_MODES))
            .collect()
    }

    fn av1_scalability_modes(&self) -> Vec<ScalabilityMode> {
        ALL_SCALABILITY_MODES.to_vec()
    }
}

/// The built-in media engine
#[derive(Debug, Clone)]
pub struct BuiltinEngine {
    catalog: BuiltinCatalog,
    video: VideoFactoryConfig,
}

impl Default for BuiltinEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl BuiltinEngine {
    /// Engine advertising VP8, VP9, AV1 and H264 from the default tables
    pub fn new() -> Self {
        Self::with_video_config(VideoFactoryConfig::builtin())
    }

    /// Engine advertising the given video codec selectors
    pub fn with_video_config(video: VideoFactoryConfig) -> Self {
        Self {
            catalog: BuiltinCatalog,
            video,
        }
    }

    /// The video codec selectors
    pub fn video_config(&self) -> &VideoFactoryConfig {
        &self.video
    }

    /// The process-wide hub for the built-in engine
    ///
    /// The first call's configuration is used for the life of the process.
    pub fn shared_hub(config: EngineConfig) -> EngineHub<BuiltinEngine> {
        static SHARED: OnceLock<EngineHub<BuiltinEngine>> = OnceLock::new();
        SHARED
            .get_or_init(|| EngineHub::new(BuiltinEngine::new(), config))
            .clone()
    }
}

impl FormatCatalog for BuiltinEngine {
    fn internal_formats(&self, codec: VideoCodecType) -> Vec<SdpVideoFormat> {
        self.catalog.internal_formats(codec)
    }

    fn vp9_svc_formats(&self) -> Vec<SdpVideoFormat> {
        self.catalog.vp9_svc_formats()
    }

    fn av1_scalability_modes(&self) -> Vec<ScalabilityMode> {
        self.catalog.av1_scalability_modes()
    }
}

impl MediaEngine for BuiltinEngine {
    type Factory = PeerConnectionFactory;

    fn create_audio_device_module(
        &self,
        layer: AudioLayer,
        task_queue_factory: &TaskQueueFactory,
    ) -> PeerKitResult<Arc<dyn AudioDeviceModule>> {
        audio::create_audio_device_module(layer, task_queue_factory)
    }

    fn builtin_codec_factories(&self) -> CodecFactories {
        CodecFactories::builtin(
            Arc::new(AudioCodecFactory::encoder()),
            Arc::new(AudioCodecFactory::decoder()),
            Arc::new(VideoCodecFactory::encoder(&self.video, &self.catalog)),
            Arc::new(VideoCodecFactory::decoder(&self.video, &self.catalog)),
        )
    }

    fn create_factory(&self, dependencies: FactoryDependencies) -> Option<Arc<Self::Factory>> {
        let factory = PeerConnectionFactory {
            catalog: self.catalog,
            video_encoder_formats: self.video.supported_formats(&self.catalog),
            video_decoder_formats: self.video.supported_formats(&self.catalog),
            dependencies,
        };
        info!(
            encoder_formats = factory.video_encoder_formats.len(),
            hardware_encoder = factory.dependencies.codecs.hardware_video_encoder.is_some(),
            "Created peer connection factory"
        );
        Some(Arc::new(factory))
    }
}

/// Session factory of the built-in engine
#[derive(Debug)]
pub struct PeerConnectionFactory {
    catalog: BuiltinCatalog,
    video_encoder_formats: Vec<SdpVideoFormat>,
    video_decoder_formats: Vec<SdpVideoFormat>,
    dependencies: FactoryDependencies,
}

impl PeerConnectionFactory {
    /// Network context
    pub fn network(&self) -> &ContextHandle {
        &self.dependencies.network
    }

    /// Worker context
    pub fn worker(&self) -> &ContextHandle {
        &self.dependencies.worker
    }

    /// Signaling context
    pub fn signaling(&self) -> &ContextHandle {
        &self.dependencies.signaling
    }

    /// The audio device module
    pub fn audio_device_module(&self) -> &Arc<dyn AudioDeviceModule> {
        &self.dependencies.audio_device_module
    }

    /// Codec factories, including any hardware extension slots
    pub fn codecs(&self) -> &CodecFactories {
        &self.dependencies.codecs
    }

    /// Formats the video encoders advertise
    pub fn video_encoder_formats(&self) -> &[SdpVideoFormat] {
        &self.video_encoder_formats
    }

    /// Formats the video decoders accept
    pub fn video_decoder_formats(&self) -> &[SdpVideoFormat] {
        &self.video_decoder_formats
    }

    /// Resolve an ad-hoc selector against the built-in catalog
    pub fn supported_video_formats(&self, selector: &VideoFormatSelector) -> Vec<SdpVideoFormat> {
        let formats = selector.supported_formats(&self.catalog);
        debug!(codec = %selector.codec, count = formats.len(), "Queried video formats");
        formats
    }
}
