//! Video format model
//!
//! [`SdpVideoFormat`] is one advertisable video capability: a codec name,
//! its fmtp parameters and the scalability modes the encoder supports.
//! Parameters live in a sorted map so formats compare and print the same
//! way every time.

use crate::scalability::ScalabilityMode;
use peerkit_core::PeerKitError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// SDP codec name for VP8
pub const VP8_CODEC_NAME: &str = "VP8";
/// SDP codec name for VP9
pub const VP9_CODEC_NAME: &str = "VP9";
/// SDP codec name for AV1
pub const AV1_CODEC_NAME: &str = "AV1";
/// SDP codec name for H.264
pub const H264_CODEC_NAME: &str = "H264";
/// SDP codec name for H.265
pub const H265_CODEC_NAME: &str = "H265";

/// H.264 fmtp key carrying the profile-level-id
pub const H264_FMTP_PROFILE_LEVEL_ID: &str = "profile-level-id";
/// H.264 fmtp key allowing asymmetric levels
pub const H264_FMTP_LEVEL_ASYMMETRY_ALLOWED: &str = "level-asymmetry-allowed";
/// H.264 fmtp key carrying the packetization mode
pub const H264_FMTP_PACKETIZATION_MODE: &str = "packetization-mode";
/// VP9 fmtp key carrying the profile
pub const VP9_FMTP_PROFILE_ID: &str = "profile-id";

/// Video codec selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VideoCodecType {
    /// Codec-agnostic payload, never advertised
    Generic,
    /// VP8
    Vp8,
    /// VP9
    Vp9,
    /// AV1
    Av1,
    /// H.264 / AVC
    H264,
    /// H.265 / HEVC
    H265,
}

impl VideoCodecType {
    /// The SDP codec name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Generic => "Generic",
            Self::Vp8 => VP8_CODEC_NAME,
            Self::Vp9 => VP9_CODEC_NAME,
            Self::Av1 => AV1_CODEC_NAME,
            Self::H264 => H264_CODEC_NAME,
            Self::H265 => H265_CODEC_NAME,
        }
    }
}

impl fmt::Display for VideoCodecType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for VideoCodecType {
    type Err = PeerKitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [
            Self::Generic,
            Self::Vp8,
            Self::Vp9,
            Self::Av1,
            Self::H264,
            Self::H265,
        ]
        .into_iter()
        .find(|codec| codec.name().eq_ignore_ascii_case(s))
        .ok_or_else(|| PeerKitError::InvalidFormat {
            value: s.to_string(),
        })
    }
}

/// An advertisable video format
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SdpVideoFormat {
    /// SDP codec name
    pub name: String,
    /// fmtp parameters
    pub parameters: BTreeMap<String, String>,
    /// Supported scalability modes, in preference order
    pub scalability_modes: Vec<ScalabilityMode>,
}

impl SdpVideoFormat {
    /// A format with no parameters and no scalability modes
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            parameters: BTreeMap::new(),
            scalability_modes: Vec::new(),
        }
    }

    /// Add an fmtp parameter
    pub fn with_parameter(mut self, key: &str, value: &str) -> Self {
        self.parameters.insert(key.to_string(), value.to_string());
        self
    }

    /// Replace the scalability modes
    pub fn with_scalability_modes<I>(mut self, modes: I) -> Self
    where
        I: IntoIterator<Item = ScalabilityMode>,
    {
        self.scalability_modes = modes.into_iter().collect();
        self
    }

    /// Look up an fmtp parameter
    pub fn parameter(&self, key: &str) -> Option<&str> {
        self.parameters.get(key).map(String::as_str)
    }

    /// The codec this format belongs to, if it is a known video codec
    pub fn codec_type(&self) -> Option<VideoCodecType> {
        self.name.parse().ok()
    }
}

impl fmt::Display for SdpVideoFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if !self.parameters.is_empty() {
            let parameters: Vec<String> = self
                .parameters
                .iter()
                .map(|(key, value)| format!("{}={}", key, value))
                .collect();
            write!(f, " {{{}}}", parameters.join(";"))?;
        }
        if !self.scalability_modes.is_empty() {
            let modes: Vec<&str> = self.scalability_modes.iter().map(|m| m.as_str()).collect();
            write!(f, " [{}]", modes.join(","))?;
        }
        Ok(())
    }
}

/// H.264 profiles advertised in `profile-level-id`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum H264Profile {
    /// Constrained Baseline
    ConstrainedBaseline,
    /// Baseline
    Baseline,
    /// Main
    Main,
    /// Constrained High
    ConstrainedHigh,
    /// High
    High,
    /// Predictive High 4:4:4
    PredictiveHigh444,
}

/// H.264 levels; the discriminant is `level_idc`, except for level 1b
#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum H264Level {
    /// Level 1b
    Level1b = 0,
    /// Level 1
    Level1 = 10,
    /// Level 1.1
    Level1_1 = 11,
    /// Level 1.2
    Level1_2 = 12,
    /// Level 1.3
    Level1_3 = 13,
    /// Level 2
    Level2 = 20,
    /// Level 2.1
    Level2_1 = 21,
    /// Level 2.2
    Level2_2 = 22,
    /// Level 3
    Level3 = 30,
    /// Level 3.1
    Level3_1 = 31,
    /// Level 3.2
    Level3_2 = 32,
    /// Level 4
    Level4 = 40,
    /// Level 4.1
    Level4_1 = 41,
    /// Level 4.2
    Level4_2 = 42,
    /// Level 5
    Level5 = 50,
    /// Level 5.1
    Level5_1 = 51,
    /// Level 5.2
    Level5_2 = 52,
}

impl H264Level {
    fn from_level_idc(level_idc: u8) -> Option<Self> {
        let level = match level_idc {
            10 => Self::Level1,
            11 => Self::Level1_1,
            12 => Self::Level1_2,
            13 => Self::Level1_3,
            20 => Self::Level2,
            21 => Self::Level2_1,
            22 => Self::Level2_2,
            30 => Self::Level3,
            31 => Self::Level3_1,
            32 => Self::Level3_2,
            40 => Self::Level4,
            41 => Self::Level4_1,
            42 => Self::Level4_2,
            50 => Self::Level5,
            51 => Self::Level5_1,
            52 => Self::Level5_2,
            _ => return None,
        };
        Some(level)
    }
}

impl fmt::Display for H264Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Self::Level1b {
            return f.write_str("1b");
        }
        let idc = *self as u8;
        match idc % 10 {
            0 => write!(f, "{}", idc / 10),
            minor => write!(f, "{}.{}", idc / 10, minor),
        }
    }
}

// constraint_set3_flag in profile_iop, which marks level 1b on level_idc 11
const CONSTRAINT_SET3_FLAG: u8 = 0x10;

struct ProfilePattern {
    profile_idc: u8,
    mask: u8,
    value: u8,
    profile: H264Profile,
}

const fn pattern(profile_idc: u8, mask: u8, value: u8, profile: H264Profile) -> ProfilePattern {
    ProfilePattern {
        profile_idc,
        mask,
        value,
        profile,
    }
}

const PROFILE_PATTERNS: [ProfilePattern; 9] = [
    pattern(0x42, 0b0100_1111, 0b0100_0000, H264Profile::ConstrainedBaseline),
    pattern(0x4D, 0b1000_1111, 0b1000_0000, H264Profile::ConstrainedBaseline),
    pattern(0x58, 0b1100_1111, 0b1100_0000, H264Profile::ConstrainedBaseline),
    pattern(0x42, 0b0100_1111, 0b0000_0000, H264Profile::Baseline),
    pattern(0x58, 0b1100_1111, 0b1000_0000, H264Profile::Baseline),
    pattern(0x4D, 0b1010_1111, 0b0000_0000, H264Profile::Main),
    pattern(0x64, 0b1111_1111, 0b0000_0000, H264Profile::High),
    pattern(0x64, 0b1111_1111, 0b0000_1100, H264Profile::ConstrainedHigh),
    pattern(0xF4, 0b1111_1111, 0b0000_0000, H264Profile::PredictiveHigh444),
];

/// The H.264 `profile-level-id` fmtp value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct H264ProfileLevelId {
    /// Profile
    pub profile: H264Profile,
    /// Level
    pub level: H264Level,
}

impl H264ProfileLevelId {
    /// Create a profile-level-id
    pub fn new(profile: H264Profile, level: H264Level) -> Self {
        Self { profile, level }
    }

    /// Parse a 6 hex digit `profile-level-id`
    pub fn parse(value: &str) -> Option<Self> {
        if value.len() != 6 {
            return None;
        }
        let numeric = u32::from_str_radix(value, 16).ok()?;
        if numeric == 0 {
            return None;
        }

        let level_idc = (numeric & 0xFF) as u8;
        let profile_iop = ((numeric >> 8) & 0xFF) as u8;
        let profile_idc = ((numeric >> 16) & 0xFF) as u8;

        let level = if level_idc == H264Level::Level1_1 as u8 {
            if profile_iop & CONSTRAINT_SET3_FLAG != 0 {
                H264Level::Level1b
            } else {
                H264Level::Level1_1
            }
        } else {
            H264Level::from_level_idc(level_idc)?
        };

        PROFILE_PATTERNS
            .iter()
            .find(|p| p.profile_idc == profile_idc && profile_iop & p.mask == p.value)
            .map(|p| Self::new(p.profile, level))
    }

    /// Render as 6 lowercase hex digits; `None` for level 1b on profiles that cannot signal it
    pub fn to_hex(&self) -> Option<String> {
        if self.level == H264Level::Level1b {
            return match self.profile {
                H264Profile::ConstrainedBaseline => Some("42f00b".to_string()),
                H264Profile::Baseline => Some("42100b".to_string()),
                H264Profile::Main => Some("4d100b".to_string()),
                _ => None,
            };
        }

        let profile_idc_iop = match self.profile {
            H264Profile::ConstrainedBaseline => "42e0",
            H264Profile::Baseline => "4200",
            H264Profile::Main => "4d00",
            H264Profile::ConstrainedHigh => "640c",
            H264Profile::High => "6400",
            H264Profile::PredictiveHigh444 => "f400",
        };
        Some(format!("{}{:02x}", profile_idc_iop, self.level as u8))
    }
}

/// VP9 profiles advertised in `profile-id`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Vp9Profile {
    /// 8-bit 4:2:0
    Profile0,
    /// 8-bit 4:2:2 / 4:4:4
    Profile1,
    /// 10/12-bit 4:2:0
    Profile2,
    /// 10/12-bit 4:2:2 / 4:4:4
    Profile3,
}

impl Vp9Profile {
    /// The `profile-id` fmtp value
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Profile0 => "0",
            Self::Profile1 => "1",
            Self::Profile2 => "2",
            Self::Profile3 => "3",
        }
    }
}

/// Build an H.264 format with the given profile, level and packetization mode
pub fn h264_format(
    profile: H264Profile,
    level: H264Level,
    packetization_mode: &str,
) -> SdpVideoFormat {
    let mut format = SdpVideoFormat::new(H264_CODEC_NAME)
        .with_parameter(H264_FMTP_LEVEL_ASYMMETRY_ALLOWED, "1")
        .with_parameter(H264_FMTP_PACKETIZATION_MODE, packetization_mode);
    if let Some(profile_level_id) = H264ProfileLevelId::new(profile, level).to_hex() {
        format = format.with_parameter(H264_FMTP_PROFILE_LEVEL_ID, &profile_level_id);
    }
    format
}

/// Build a VP9 format for the given profile
pub fn vp9_format(profile: Vp9Profile) -> SdpVideoFormat {
    SdpVideoFormat::new(VP9_CODEC_NAME).with_parameter(VP9_FMTP_PROFILE_ID, profile.as_str())
}
