//! # peerkit media
//!
//! Video codec format negotiation, the built-in codec factories and audio
//! device modules, and the built-in media engine that plugs them into the
//! shared engine hub from `peerkit-core`.

#![warn(clippy::all)]

pub mod audio;
pub mod builtin;
pub mod codec_factory;
pub mod format;
pub mod negotiator;
pub mod scalability;
pub mod video_factory;

// Re-export main types
pub use audio::{create_audio_device_module, DummyAudioDevice, PlatformAudioDevice};
pub use builtin::{BuiltinCatalog, BuiltinEngine, PeerConnectionFactory};
pub use codec_factory::{AudioCodecFactory, AudioCodecSpec, VideoCodecFactory};
pub use format::{
    h264_format, vp9_format, H264Level, H264Profile, H264ProfileLevelId, SdpVideoFormat,
    VideoCodecType, Vp9Profile,
};
pub use negotiator::{
    default_formats, supported_formats, FormatCatalog, FormatSource, FormatsOverride,
    VideoFormatSelector,
};
pub use scalability::{ScalabilityMode, ALL_SCALABILITY_MODES, TEMPORAL_SCALABILITY_MODES};
pub use video_factory::VideoFactoryConfig;
