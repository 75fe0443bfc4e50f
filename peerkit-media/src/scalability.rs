//! Scalability modes
//!
//! The standard spatial/temporal layering structures an encoder may
//! advertise, in the canonical order used during SDP negotiation.

use peerkit_core::PeerKitError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A spatial/temporal layering structure (`L2T3`, `S3T1h`, `L3T3_KEY`, ...)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ScalabilityMode {
    /// 1 spatial, 1 temporal layer
    L1T1,
    /// 1 spatial, 2 temporal layers
    L1T2,
    /// 1 spatial, 3 temporal layers
    L1T3,
    /// 2 spatial layers, 2:1 resolution ratio
    L2T1,
    /// 2 spatial layers, 1.5:1 resolution ratio
    L2T1h,
    /// 2 spatial layers, inter-layer prediction on key frames only
    #[serde(rename = "L2T1_KEY")]
    L2T1Key,
    /// 2 spatial, 2 temporal layers
    L2T2,
    /// 2 spatial, 2 temporal layers, 1.5:1 ratio
    L2T2h,
    /// 2 spatial, 2 temporal layers, key-frame prediction
    #[serde(rename = "L2T2_KEY")]
    L2T2Key,
    /// 2 spatial, 2 temporal layers, shifted key-frame prediction
    #[serde(rename = "L2T2_KEY_SHIFT")]
    L2T2KeyShift,
    /// 2 spatial, 3 temporal layers
    L2T3,
    /// 2 spatial, 3 temporal layers, 1.5:1 ratio
    L2T3h,
    /// 2 spatial, 3 temporal layers, key-frame prediction
    #[serde(rename = "L2T3_KEY")]
    L2T3Key,
    /// 3 spatial layers
    L3T1,
    /// 3 spatial layers, 1.5:1 ratio
    L3T1h,
    /// 3 spatial layers, key-frame prediction
    #[serde(rename = "L3T1_KEY")]
    L3T1Key,
    /// 3 spatial, 2 temporal layers
    L3T2,
    /// 3 spatial, 2 temporal layers, 1.5:1 ratio
    L3T2h,
    /// 3 spatial, 2 temporal layers, key-frame prediction
    #[serde(rename = "L3T2_KEY")]
    L3T2Key,
    /// 3 spatial, 3 temporal layers
    L3T3,
    /// 3 spatial, 3 temporal layers, 1.5:1 ratio
    L3T3h,
    /// 3 spatial, 3 temporal layers, key-frame prediction
    #[serde(rename = "L3T3_KEY")]
    L3T3Key,
    /// 2 simulcast streams
    S2T1,
    /// 2 simulcast streams, 1.5:1 ratio
    S2T1h,
    /// 2 simulcast streams, 2 temporal layers
    S2T2,
    /// 2 simulcast streams, 2 temporal layers, 1.5:1 ratio
    S2T2h,
    /// 2 simulcast streams, 3 temporal layers
    S2T3,
    /// 2 simulcast streams, 3 temporal layers, 1.5:1 ratio
    S2T3h,
    /// 3 simulcast streams
    S3T1,
    /// 3 simulcast streams, 1.5:1 ratio
    S3T1h,
    /// 3 simulcast streams, 2 temporal layers
    S3T2,
    /// 3 simulcast streams, 2 temporal layers, 1.5:1 ratio
    S3T2h,
    /// 3 simulcast streams, 3 temporal layers
    S3T3,
    /// 3 simulcast streams, 3 temporal layers, 1.5:1 ratio
    S3T3h,
}

/// Every scalability mode, in canonical order
pub const ALL_SCALABILITY_MODES: [ScalabilityMode; 34] = [
    ScalabilityMode::L1T1,
    ScalabilityMode::L1T2,
    ScalabilityMode::L1T3,
    ScalabilityMode::L2T1,
    ScalabilityMode::L2T1h,
    ScalabilityMode::L2T1Key,
    ScalabilityMode::L2T2,
    ScalabilityMode::L2T2h,
    ScalabilityMode::L2T2Key,
    ScalabilityMode::L2T2KeyShift,
    ScalabilityMode::L2T3,
    ScalabilityMode::L2T3h,
    ScalabilityMode::L2T3Key,
    ScalabilityMode::L3T1,
    ScalabilityMode::L3T1h,
    ScalabilityMode::L3T1Key,
    ScalabilityMode::L3T2,
    ScalabilityMode::L3T2h,
    ScalabilityMode::L3T2Key,
    ScalabilityMode::L3T3,
    ScalabilityMode::L3T3h,
    ScalabilityMode::L3T3Key,
    ScalabilityMode::S2T1,
    ScalabilityMode::S2T1h,
    ScalabilityMode::S2T2,
    ScalabilityMode::S2T2h,
    ScalabilityMode::S2T3,
    ScalabilityMode::S2T3h,
    ScalabilityMode::S3T1,
    ScalabilityMode::S3T1h,
    ScalabilityMode::S3T2,
    ScalabilityMode::S3T2h,
    ScalabilityMode::S3T3,
    ScalabilityMode::S3T3h,
];

/// Temporal-only modes supported by single-layer encoders (VP8, H.264)
pub const TEMPORAL_SCALABILITY_MODES: [ScalabilityMode; 3] = [
    ScalabilityMode::L1T1,
    ScalabilityMode::L1T2,
    ScalabilityMode::L1T3,
];

impl ScalabilityMode {
    /// The mode's SDP/RTP header extension string
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::L1T1 => "L1T1",
            Self::L1T2 => "L1T2",
            Self::L1T3 => "L1T3",
            Self::L2T1 => "L2T1",
            Self::L2T1h => "L2T1h",
            Self::L2T1Key => "L2T1_KEY",
            Self::L2T2 => "L2T2",
            Self::L2T2h => "L2T2h",
            Self::L2T2Key => "L2T2_KEY",
            Self::L2T2KeyShift => "L2T2_KEY_SHIFT",
            Self::L2T3 => "L2T3",
            Self::L2T3h => "L2T3h",
            Self::L2T3Key => "L2T3_KEY",
            Self::L3T1 => "L3T1",
            Self::L3T1h => "L3T1h",
            Self::L3T1Key => "L3T1_KEY",
            Self::L3T2 => "L3T2",
            Self::L3T2h => "L3T2h",
            Self::L3T2Key => "L3T2_KEY",
            Self::L3T3 => "L3T3",
            Self::L3T3h => "L3T3h",
            Self::L3T3Key => "L3T3_KEY",
            Self::S2T1 => "S2T1",
            Self::S2T1h => "S2T1h",
            Self::S2T2 => "S2T2",
            Self::S2T2h => "S2T2h",
            Self::S2T3 => "S2T3",
            Self::S2T3h => "S2T3h",
            Self::S3T1 => "S3T1",
            Self::S3T1h => "S3T1h",
            Self::S3T2 => "S3T2",
            Self::S3T2h => "S3T2h",
            Self::S3T3 => "S3T3",
            Self::S3T3h => "S3T3h",
        }
    }

    /// Number of spatial layers (or simulcast streams)
    pub fn num_spatial_layers(&self) -> u8 {
        self.as_str().as_bytes()[1] - b'0'
    }

    /// Number of temporal layers
    pub fn num_temporal_layers(&self) -> u8 {
        self.as_str().as_bytes()[3] - b'0'
    }

    /// Whether the spatial layers are independent simulcast streams
    pub fn is_simulcast(&self) -> bool {
        self.as_str().starts_with('S')
    }
}

impl fmt::Display for ScalabilityMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScalabilityMode {
    type Err = PeerKitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ALL_SCALABILITY_MODES
            .iter()
            .copied()
            .find(|mode| mode.as_str() == s)
            .ok_or_else(|| PeerKitError::InvalidFormat {
                value: s.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_round_trips_every_mode() {
        for mode in ALL_SCALABILITY_MODES {
            assert_eq!(mode.as_str().parse::<ScalabilityMode>().unwrap(), mode);
        }
    }

    #[test]
    fn test_parse_is_case_sensitive() {
        assert!("l1t3".parse::<ScalabilityMode>().is_err());
        assert!("L2T2_key".parse::<ScalabilityMode>().is_err());
        assert!("L4T1".parse::<ScalabilityMode>().is_err());
    }

    #[test]
    fn test_layer_counts() {
        assert_eq!(ScalabilityMode::L1T3.num_spatial_layers(), 1);
        assert_eq!(ScalabilityMode::L1T3.num_temporal_layers(), 3);
        assert_eq!(ScalabilityMode::L2T2KeyShift.num_spatial_layers(), 2);
        assert_eq!(ScalabilityMode::L2T2KeyShift.num_temporal_layers(), 2);
        assert_eq!(ScalabilityMode::S3T1h.num_spatial_layers(), 3);
        assert!(ScalabilityMode::S3T1h.is_simulcast());
        assert!(!ScalabilityMode::L3T1h.is_simulcast());
    }

    #[test]
    fn test_canonical_order_is_sorted() {
        let mut sorted = ALL_SCALABILITY_MODES;
        sorted.sort();
        assert_eq!(sorted, ALL_SCALABILITY_MODES);
    }
}
