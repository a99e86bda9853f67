//! Quality ladder and encoding profiles.
//!
//! The ladder is a fixed table from quality tier to encoding
//! parameters. Tiers outside the table map to a documented fallback
//! bitrate rather than an error, so a partially configured ladder still
//! produces a complete batch.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Video codec handed to the transcoding capability.
pub const DEFAULT_VIDEO_CODEC: &str = "h264";
/// Audio codec handed to the transcoding capability.
pub const DEFAULT_AUDIO_CODEC: &str = "aac";
/// Audio bitrate for every tier.
pub const DEFAULT_AUDIO_BITRATE_KBPS: u32 = 128;
/// Video bitrate for tiers outside the ladder table.
pub const FALLBACK_VIDEO_BITRATE_KBPS: u32 = 1500;
/// Segment length for chunked output.
pub const SEGMENT_DURATION_SECS: u32 = 10;
/// Zero-padding width of segment indices in output file names.
pub const SEGMENT_INDEX_WIDTH: usize = 5;

/// A named output profile ("480p", "720p", "1080p", ...).
///
/// Kept open-ended on purpose: the ladder maps unknown tiers to the
/// fallback bitrate instead of rejecting them.
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(transparent)]
pub struct QualityTier(String);

impl QualityTier {
    pub fn new(tier: impl Into<String>) -> Self {
        Self(tier.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for QualityTier {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for QualityTier {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for QualityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How the output is packaged.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum ContainerMode {
    /// One progressive file per tier
    #[default]
    SingleFile,
    /// Chunked output with fixed-length segments
    Segmented,
}

impl ContainerMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContainerMode::SingleFile => "single_file",
            ContainerMode::Segmented => "segmented",
        }
    }

    pub fn is_segmented(&self) -> bool {
        matches!(self, ContainerMode::Segmented)
    }
}

/// Encoding parameters for one (tier, container) pair, as handed to the
/// transcoding capability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct EncodingProfile {
    /// Output frame size, "WxH"
    pub resolution: String,

    /// Video codec
    pub video_codec: String,

    /// Video bitrate in kbps
    pub video_bitrate_kbps: u32,

    /// Audio codec
    pub audio_codec: String,

    /// Audio bitrate in kbps
    pub audio_bitrate_kbps: u32,

    /// Output packaging
    pub container_mode: ContainerMode,

    /// Segment length; set only for segmented output
    #[serde(skip_serializing_if = "Option::is_none")]
    pub segment_duration_secs: Option<u32>,
}

impl EncodingProfile {
    /// Build the profile for a requested tier.
    ///
    /// Ladder table: 480p at 1000 kbps, 720p at 2500 kbps, 1080p at
    /// 5000 kbps. Any other tier gets the fallback bitrate
    /// ([`FALLBACK_VIDEO_BITRATE_KBPS`]) and a 720p frame — never an
    /// error.
    pub fn for_tier(tier: &QualityTier, container_mode: ContainerMode) -> Self {
        let (resolution, video_bitrate_kbps) = match tier.as_str() {
            "480p" => ("854x480", 1000),
            "720p" => ("1280x720", 2500),
            "1080p" => ("1920x1080", 5000),
            _ => ("1280x720", FALLBACK_VIDEO_BITRATE_KBPS),
        };

        Self {
            resolution: resolution.to_string(),
            video_codec: DEFAULT_VIDEO_CODEC.to_string(),
            video_bitrate_kbps,
            audio_codec: DEFAULT_AUDIO_CODEC.to_string(),
            audio_bitrate_kbps: DEFAULT_AUDIO_BITRATE_KBPS,
            container_mode,
            segment_duration_secs: container_mode
                .is_segmented()
                .then_some(SEGMENT_DURATION_SECS),
        }
    }
}

/// File name of one segment in chunked output.
///
/// Indices are zero-padded to [`SEGMENT_INDEX_WIDTH`] digits so output
/// listings sort lexicographically.
pub fn segment_file_name(stem: &str, index: u32) -> String {
    format!("{stem}_{index:0width$}.ts", width = SEGMENT_INDEX_WIDTH)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ladder_table() {
        let p480 = EncodingProfile::for_tier(&QualityTier::from("480p"), ContainerMode::SingleFile);
        assert_eq!(p480.video_bitrate_kbps, 1000);
        assert_eq!(p480.resolution, "854x480");

        let p720 = EncodingProfile::for_tier(&QualityTier::from("720p"), ContainerMode::SingleFile);
        assert_eq!(p720.video_bitrate_kbps, 2500);
        assert_eq!(p720.resolution, "1280x720");

        let p1080 =
            EncodingProfile::for_tier(&QualityTier::from("1080p"), ContainerMode::SingleFile);
        assert_eq!(p1080.video_bitrate_kbps, 5000);
        assert_eq!(p1080.resolution, "1920x1080");
    }

    #[test]
    fn test_unknown_tier_gets_fallback_bitrate() {
        let odd = EncodingProfile::for_tier(&QualityTier::from("4k"), ContainerMode::SingleFile);
        assert_eq!(odd.video_bitrate_kbps, FALLBACK_VIDEO_BITRATE_KBPS);
        assert_eq!(odd.video_codec, "h264");
        assert_eq!(odd.audio_codec, "aac");
    }

    #[test]
    fn test_segmented_mode_fixes_segment_duration() {
        let seg = EncodingProfile::for_tier(&QualityTier::from("720p"), ContainerMode::Segmented);
        assert_eq!(seg.segment_duration_secs, Some(SEGMENT_DURATION_SECS));

        let single =
            EncodingProfile::for_tier(&QualityTier::from("720p"), ContainerMode::SingleFile);
        assert_eq!(single.segment_duration_secs, None);
    }

    #[test]
    fn test_segment_names_are_zero_padded() {
        assert_eq!(segment_file_name("720p", 0), "720p_00000.ts");
        assert_eq!(segment_file_name("720p", 42), "720p_00042.ts");
        assert_eq!(segment_file_name("1080p", 12345), "1080p_12345.ts");
    }
}
