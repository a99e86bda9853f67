//! Thumbnail scheduling.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Thumbnails captured per asset when the trigger does not say.
pub const DEFAULT_THUMBNAIL_COUNT: u32 = 3;

/// Zero-padding width of thumbnail indices in artifact names.
const THUMBNAIL_INDEX_WIDTH: usize = 3;

/// Capture timestamps for one asset's thumbnail set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ThumbnailPlan {
    /// Requested number of thumbnails
    pub count: u32,

    /// Capture points in seconds from the start of the asset
    pub timestamps_secs: Vec<f64>,
}

impl ThumbnailPlan {
    /// Distribute `count` capture points evenly across the asset.
    ///
    /// `timestamp_i = duration * ((i + 1) * (100 / (count + 1))) / 100`,
    /// which spaces the captures evenly while skipping the 0% and 100%
    /// marks. Downstream consumers depend on this exact formula.
    pub fn evenly_spaced(count: u32, duration_secs: f64) -> Self {
        let step_percent = 100.0 / (count as f64 + 1.0);
        let timestamps_secs = (0..count)
            .map(|i| duration_secs * ((i as f64 + 1.0) * step_percent) / 100.0)
            .collect();

        Self {
            count,
            timestamps_secs,
        }
    }

    /// Artifact locations for each capture, rooted at the worker's
    /// output location. One ref per timestamp, indices zero-padded and
    /// one-based.
    pub fn artifact_refs(&self, output_base: &str) -> Vec<String> {
        (0..self.timestamps_secs.len())
            .map(|i| {
                format!(
                    "{output_base}/thumb_{:0width$}.jpg",
                    i + 1,
                    width = THUMBNAIL_INDEX_WIDTH
                )
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_formula() {
        let plan = ThumbnailPlan::evenly_spaced(3, 100.0);
        assert_eq!(plan.timestamps_secs, vec![25.0, 50.0, 75.0]);

        let plan = ThumbnailPlan::evenly_spaced(1, 90.0);
        assert_eq!(plan.timestamps_secs, vec![45.0]);
    }

    #[test]
    fn test_timestamps_strictly_increasing_within_bounds() {
        for count in 1..=12u32 {
            for duration in [1.0, 37.5, 3600.0] {
                let plan = ThumbnailPlan::evenly_spaced(count, duration);
                assert_eq!(plan.timestamps_secs.len(), count as usize);

                let mut prev = 0.0;
                for &ts in &plan.timestamps_secs {
                    assert!(ts > 0.0 && ts < duration, "{ts} out of (0, {duration})");
                    assert!(ts > prev, "{ts} not strictly after {prev}");
                    prev = ts;
                }
            }
        }
    }

    #[test]
    fn test_artifact_refs_are_ordered_and_padded() {
        let plan = ThumbnailPlan::evenly_spaced(3, 120.0);
        let refs = plan.artifact_refs("s3://thumbs/asset-1");
        assert_eq!(
            refs,
            vec![
                "s3://thumbs/asset-1/thumb_001.jpg",
                "s3://thumbs/asset-1/thumb_002.jpg",
                "s3://thumbs/asset-1/thumb_003.jpg",
            ]
        );
    }
}
