//! Video format negotiation
//!
//! Decides which formats a video codec factory advertises for one codec.
//! The decision is first-match: an internal hint delegates to the engine's
//! own enumeration, then a caller-supplied override, then the default table.

use crate::format::{
    h264_format, H264Level, H264Profile, SdpVideoFormat, VideoCodecType, AV1_CODEC_NAME,
    VP8_CODEC_NAME,
};
use crate::scalability::ScalabilityMode;
use std::fmt;
use std::sync::Arc;
use tracing::trace;

/// Caller-supplied replacement for the default format table
pub type FormatsOverride = Arc<dyn Fn() -> Vec<SdpVideoFormat> + Send + Sync>;

/// Engine-side format enumeration
pub trait FormatCatalog: Send + Sync {
    /// Every format the engine's built-in codec implementation supports
    fn internal_formats(&self, codec: VideoCodecType) -> Vec<SdpVideoFormat>;

    /// VP9 formats with spatial scalability enabled
    fn vp9_svc_formats(&self) -> Vec<SdpVideoFormat>;

    /// Scalability modes the AV1 encoder supports
    fn av1_scalability_modes(&self) -> Vec<ScalabilityMode>;
}

/// Per-codec configuration a video codec factory negotiates with
#[derive(Clone)]
pub struct VideoFormatSelector {
    /// Codec this selector describes
    pub codec: VideoCodecType,
    /// Delegate to the engine's built-in enumeration
    pub internal: bool,
    /// Replacement for the default table
    pub formats_override: Option<FormatsOverride>,
}

/// Where a selector's formats come from
#[derive(Clone, Copy)]
pub enum FormatSource<'a> {
    /// The engine's built-in enumeration for this codec
    Internal(VideoCodecType),
    /// The caller's override
    Override(&'a FormatsOverride),
    /// The default per-codec table
    DefaultTable(VideoCodecType),
}

impl fmt::Debug for FormatSource<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Internal(codec) => f.debug_tuple("Internal").field(codec).finish(),
            Self::Override(_) => f.write_str("Override"),
            Self::DefaultTable(codec) => f.debug_tuple("DefaultTable").field(codec).finish(),
        }
    }
}

impl VideoFormatSelector {
    /// A selector using the default table
    pub fn new(codec: VideoCodecType) -> Self {
        Self {
            codec,
            internal: false,
            formats_override: None,
        }
    }

    /// A selector delegating to the engine's built-in enumeration
    pub fn internal(codec: VideoCodecType) -> Self {
        Self {
            codec,
            internal: true,
            formats_override: None,
        }
    }

    /// Replace the default table with `formats`
    pub fn with_formats_override<F>(mut self, formats: F) -> Self
    where
        F: Fn() -> Vec<SdpVideoFormat> + Send + Sync + 'static,
    {
        self.formats_override = Some(Arc::new(formats));
        self
    }

    /// Which source the formats are taken from
    pub fn format_source(&self) -> FormatSource<'_> {
        if self.internal {
            return FormatSource::Internal(self.codec);
        }
        match &self.formats_override {
            Some(formats) => FormatSource::Override(formats),
            None => FormatSource::DefaultTable(self.codec),
        }
    }

    /// The formats to advertise for this codec
    pub fn supported_formats(&self, catalog: &dyn FormatCatalog) -> Vec<SdpVideoFormat> {
        supported_formats(self, catalog)
    }
}

impl fmt::Debug for VideoFormatSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VideoFormatSelector")
            .field("codec", &self.codec)
            .field("internal", &self.internal)
            .field("formats_override", &self.formats_override.is_some())
            .finish()
    }
}

/// Resolve a selector into its ordered formats
///
/// Unknown codecs produce an empty list, never an error.
pub fn supported_formats(
    selector: &VideoFormatSelector,
    catalog: &dyn FormatCatalog,
) -> Vec<SdpVideoFormat> {
    let source = selector.format_source();
    let formats = match source {
        FormatSource::Internal(codec) => catalog.internal_formats(codec),
        FormatSource::Override(formats) => formats(),
        FormatSource::DefaultTable(codec) => default_formats(codec, catalog),
    };
    trace!(codec = %selector.codec, ?source, count = formats.len(), "Resolved video formats");
    formats
}

/// The default format table for `codec`
pub fn default_formats(codec: VideoCodecType, catalog: &dyn FormatCatalog) -> Vec<SdpVideoFormat> {
    match codec {
        VideoCodecType::Vp8 => vec![SdpVideoFormat::new(VP8_CODEC_NAME)],
        VideoCodecType::Vp9 => catalog.vp9_svc_formats(),
        VideoCodecType::Av1 => vec![SdpVideoFormat::new(AV1_CODEC_NAME)
            .with_scalability_modes(catalog.av1_scalability_modes())],
        VideoCodecType::H264 => vec![
            h264_format(H264Profile::Baseline, H264Level::Level3_1, "1"),
            h264_format(H264Profile::Baseline, H264Level::Level3_1, "0"),
            h264_format(H264Profile::ConstrainedBaseline, H264Level::Level3_1, "1"),
            h264_format(H264Profile::ConstrainedBaseline, H264Level::Level3_1, "0"),
        ],
        VideoCodecType::Generic | VideoCodecType::H265 => Vec::new(),
    }
}
