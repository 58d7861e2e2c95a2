use akaze::Akaze;
use bitarray::BitArray;
use featbench_core::{DetectorFamily, FatalResult, Image, Keypoint};
use image::DynamicImage;

use crate::capability::DetectionCapability;

/// Nonlinear scale-space detector backed by the `akaze` crate
#[derive(Debug, Clone, Copy)]
pub struct AkazeDetection {
    pub threshold: f64,
}

impl Default for AkazeDetection {
    fn default() -> Self {
        Self { threshold: 0.001 }
    }
}

impl AkazeDetection {
    /// Keypoints together with their 486-bit MLDB descriptors, in the same order
    pub fn extract_features(&self, image: &Image) -> (Vec<Keypoint>, Vec<BitArray<64>>) {
        let akaze = Akaze::new(self.threshold);
        let (points, descriptors) = akaze.extract(&DynamicImage::ImageLuma8(image.clone()));
        let keypoints = points.iter().map(to_keypoint).collect();
        (keypoints, descriptors)
    }
}

/// The crate reports a radius and radians; keypoints carry a diameter and degrees
fn to_keypoint(kp: &akaze::KeyPoint) -> Keypoint {
    let angle = kp.angle.to_degrees().rem_euclid(360.0);
    Keypoint::new(kp.point.0, kp.point.1, kp.size * 2.0)
        .with_response(kp.response)
        .with_angle(if angle >= 360.0 { 0.0 } else { angle })
        .with_octave(kp.octave as i32)
}

impl DetectionCapability for AkazeDetection {
    fn family(&self) -> DetectorFamily {
        DetectorFamily::Akaze
    }

    fn detect(&self, image: &Image) -> FatalResult<Vec<Keypoint>> {
        let (keypoints, _) = self.extract_features(image);
        Ok(keypoints)
    }
}
