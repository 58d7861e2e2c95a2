use featbench_core::{DetectorFamily, FatalResult, Image, Keypoint};

use crate::capability::DetectionCapability;
use crate::corner_detection::CornerDetector;

/// FAST-9/16 segment-test detector at a single scale
#[derive(Debug, Clone, Copy)]
pub struct FastDetection {
    pub threshold: u8,
    pub nonmax_suppression: bool,
}

impl Default for FastDetection {
    fn default() -> Self {
        Self {
            threshold: 10,
            nonmax_suppression: true,
        }
    }
}

impl FastDetection {
    /// Diameter reported for every FAST keypoint
    pub const KEYPOINT_SIZE: f32 = 7.0;
}

impl DetectionCapability for FastDetection {
    fn family(&self) -> DetectorFamily {
        DetectorFamily::Fast
    }

    fn detect(&self, image: &Image) -> FatalResult<Vec<Keypoint>> {
        let (w, h) = image.dimensions();
        let mut corners = CornerDetector::fast_corners(image, self.threshold, 3);
        if self.nonmax_suppression {
            corners = CornerDetector::nonmax_suppression_3x3(&corners, w, h);
        }

        Ok(corners
            .into_iter()
            .map(|c| Keypoint::new(c.x as f32, c.y as f32, Self::KEYPOINT_SIZE).with_response(c.score))
            .collect())
    }
}
