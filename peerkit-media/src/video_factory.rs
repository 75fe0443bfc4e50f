//! Video codec factory configuration
//!
//! A factory offers one selector per codec; its advertised list is each
//! selector's formats in registration order, exact duplicates dropped.

use crate::format::{SdpVideoFormat, VideoCodecType};
use crate::negotiator::{FormatCatalog, VideoFormatSelector};

/// Ordered per-codec selectors for one video codec factory
#[derive(Debug, Clone, Default)]
pub struct VideoFactoryConfig {
    selectors: Vec<VideoFormatSelector>,
}

impl VideoFactoryConfig {
    /// An empty configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in codec set: VP8, VP9, AV1, H264, all on the default table
    pub fn builtin() -> Self {
        Self::new()
            .with_codec(VideoCodecType::Vp8)
            .with_codec(VideoCodecType::Vp9)
            .with_codec(VideoCodecType::Av1)
            .with_codec(VideoCodecType::H264)
    }

    /// Append a default-table selector for `codec`
    pub fn with_codec(self, codec: VideoCodecType) -> Self {
        self.with_selector(VideoFormatSelector::new(codec))
    }

    /// Append a selector
    pub fn with_selector(mut self, selector: VideoFormatSelector) -> Self {
        self.add(selector);
        self
    }

    /// Append a selector in place
    pub fn add(&mut self, selector: VideoFormatSelector) {
        self.selectors.push(selector);
    }

    /// Selectors in registration order
    pub fn selectors(&self) -> &[VideoFormatSelector] {
        &self.selectors
    }

    /// Codecs in registration order
    pub fn codecs(&self) -> Vec<VideoCodecType> {
        self.selectors.iter().map(|s| s.codec).collect()
    }

    /// Every advertised format, first occurrence wins
    pub fn supported_formats(&self, catalog: &dyn FormatCatalog) -> Vec<SdpVideoFormat> {
        let mut formats: Vec<SdpVideoFormat> = Vec::new();
        for selector in &self.selectors {
            for format in selector.supported_formats(catalog) {
                if !formats.contains(&format) {
                    formats.push(format);
                }
            }
        }
        formats
    }
}
