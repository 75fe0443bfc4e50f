//! Built-in codec factories
//!
//! Video factories resolve their advertised formats once, when the engine
//! builds its codec set. Audio factories carry a fixed codec table.

use crate::format::SdpVideoFormat;
use crate::negotiator::FormatCatalog;
use crate::video_factory::VideoFactoryConfig;
use peerkit_core::{CodecDirection, CodecFactory, MediaKind};
use serde::{Deserialize, Serialize};

/// A video encoder or decoder factory over a resolved format list
#[derive(Debug, Clone)]
pub struct VideoCodecFactory {
    direction: CodecDirection,
    formats: Vec<SdpVideoFormat>,
}

impl VideoCodecFactory {
    /// Resolve `config` against `catalog`
    pub fn new(
        direction: CodecDirection,
        config: &VideoFactoryConfig,
        catalog: &dyn FormatCatalog,
    ) -> Self {
        Self {
            direction,
            formats: config.supported_formats(catalog),
        }
    }

    /// Encoder factory
    pub fn encoder(config: &VideoFactoryConfig, catalog: &dyn FormatCatalog) -> Self {
        Self::new(CodecDirection::Encode, config, catalog)
    }

    /// Decoder factory
    pub fn decoder(config: &VideoFactoryConfig, catalog: &dyn FormatCatalog) -> Self {
        Self::new(CodecDirection::Decode, config, catalog)
    }

    /// Advertised formats
    pub fn supported_formats(&self) -> &[SdpVideoFormat] {
        &self.formats
    }

    /// Whether `format` is advertised exactly
    pub fn supports(&self, format: &SdpVideoFormat) -> bool {
        self.formats.contains(format)
    }
}

impl CodecFactory for VideoCodecFactory {
    fn media_kind(&self) -> MediaKind {
        MediaKind::Video
    }

    fn direction(&self) -> CodecDirection {
        self.direction
    }

    fn codec_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for format in &self.formats {
            if !names.contains(&format.name) {
                names.push(format.name.clone());
            }
        }
        names
    }
}

/// An audio codec the built-in factories offer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioCodecSpec {
    /// SDP codec name
    pub name: String,
    /// RTP clock rate in Hz
    pub clock_rate: u32,
    /// Channel count
    pub channels: u8,
}

impl AudioCodecSpec {
    fn new(name: &str, clock_rate: u32, channels: u8) -> Self {
        Self {
            name: name.to_string(),
            clock_rate,
            channels,
        }
    }
}

/// An audio encoder or decoder factory
#[derive(Debug, Clone)]
pub struct AudioCodecFactory {
    direction: CodecDirection,
    codecs: Vec<AudioCodecSpec>,
}

impl AudioCodecFactory {
    /// The built-in audio codecs, in preference order
    pub fn builtin_codecs() -> Vec<AudioCodecSpec> {
        vec![
            AudioCodecSpec::new("opus", 48000, 2),
            AudioCodecSpec::new("G722", 8000, 1),
            AudioCodecSpec::new("ILBC", 8000, 1),
            AudioCodecSpec::new("PCMU", 8000, 1),
            AudioCodecSpec::new("PCMA", 8000, 1),
        ]
    }

    /// Built-in encoder factory
    pub fn encoder() -> Self {
        Self {
            direction: CodecDirection::Encode,
            codecs: Self::builtin_codecs(),
        }
    }

    /// Built-in decoder factory
    pub fn decoder() -> Self {
        Self {
            direction: CodecDirection::Decode,
            codecs: Self::builtin_codecs(),
        }
    }

    /// Offered codecs
    pub fn codecs(&self) -> &[AudioCodecSpec] {
        &self.codecs
    }
}

impl CodecFactory for AudioCodecFactory {
    fn media_kind(&self) -> MediaKind {
        MediaKind::Audio
    }

    fn direction(&self) -> CodecDirection {
        self.direction
    }

    fn codec_names(&self) -> Vec<String> {
        self.codecs.iter().map(|c| c.name.clone()).collect()
    }
}
