use featbench_core::{DetectorFamily, FatalResult, FloatImage, Image, Keypoint};
use rayon::prelude::*;

use crate::capability::DetectionCapability;
use crate::corner_detection::CornerDetector;
use crate::pyramid::ImagePyramid;
use crate::suppression::KeypointSuppression;

/// Oriented FAST over a scale pyramid, ranked by the Harris measure
#[derive(Debug, Clone, Copy)]
pub struct OrbDetection {
    pub n_features: usize,
    pub scale_factor: f32,
    pub n_levels: usize,
    pub fast_threshold: u8,
    /// Pixels kept clear of the border on every level
    pub edge_threshold: u32,
    pub patch_size: u32,
    pub harris_k: f32,
}

impl Default for OrbDetection {
    fn default() -> Self {
        Self {
            n_features: 500,
            scale_factor: 1.2,
            n_levels: 8,
            fast_threshold: 20,
            edge_threshold: 31,
            patch_size: 31,
            harris_k: 0.04,
        }
    }
}

impl OrbDetection {
    /// Feature budget of every level, shrinking geometrically with scale
    fn features_per_level(&self, levels: usize) -> Vec<usize> {
        let factor = 1.0 / self.scale_factor;
        let denom = 1.0 - factor.powi(levels as i32);
        let mut desired = self.n_features as f32 * (1.0 - factor) / denom.max(f32::EPSILON);

        let mut budget = Vec::with_capacity(levels);
        let mut assigned = 0usize;
        for _ in 0..levels.saturating_sub(1) {
            let n = desired.round() as usize;
            budget.push(n);
            assigned += n;
            desired *= factor;
        }
        if levels > 0 {
            budget.push(self.n_features.saturating_sub(assigned));
        }
        budget
    }

    fn detect_level(&self, level: &Image, budget: usize) -> Vec<Keypoint> {
        let (w, h) = level.dimensions();
        let corners = CornerDetector::fast_corners(level, self.fast_threshold, self.edge_threshold);
        let corners = CornerDetector::nonmax_suppression_3x3(&corners, w, h);

        let float = FloatImage::from_gray(level, 1.0);
        let half = (self.patch_size / 2) as i32;
        let mut keypoints: Vec<Keypoint> = corners
            .par_iter()
            .map(|c| {
                let response = CornerDetector::harris_score_at(&float, c.x as usize, c.y as usize, self.harris_k);
                Keypoint::new(c.x as f32, c.y as f32, self.patch_size as f32)
                    .with_response(response)
                    .with_angle(intensity_centroid_angle(level, c.x, c.y, half))
            })
            .collect();

        KeypointSuppression::retain_best(&mut keypoints, budget);
        keypoints
    }
}

/// Orientation of the patch's intensity centroid in degrees, `[0, 360)`.
///
/// Moments are accumulated over the disc of radius `half`; pixels outside
/// the image are skipped.
pub fn intensity_centroid_angle(img: &Image, x: u32, y: u32, half: i32) -> f32 {
    let (w, h) = img.dimensions();
    let (cx, cy) = (x as i32, y as i32);
    let radius_sq = half * half;

    let mut m10 = 0i64;
    let mut m01 = 0i64;
    for dy in -half..=half {
        let yy = cy + dy;
        if yy < 0 || yy >= h as i32 {
            continue;
        }
        for dx in -half..=half {
            if dx * dx + dy * dy > radius_sq {
                continue;
            }
            let xx = cx + dx;
            if xx < 0 || xx >= w as i32 {
                continue;
            }
            let val = img.get_pixel(xx as u32, yy as u32).0[0] as i64;
            m10 += dx as i64 * val;
            m01 += dy as i64 * val;
        }
    }

    let angle = (m01 as f32).atan2(m10 as f32).to_degrees().rem_euclid(360.0);
    if angle >= 360.0 {
        0.0
    } else {
        angle
    }
}

impl DetectionCapability for OrbDetection {
    fn family(&self) -> DetectorFamily {
        DetectorFamily::Orb
    }

    fn detect(&self, image: &Image) -> FatalResult<Vec<Keypoint>> {
        let min_size = 2 * self.edge_threshold + 1;
        let pyramid = ImagePyramid::build(image, self.n_levels, self.scale_factor, min_size);
        let budgets = self.features_per_level(pyramid.len());

        let mut keypoints = Vec::new();
        for (level, budget) in pyramid.iter().zip(budgets) {
            let found = self.detect_level(&level.image, budget);
            keypoints.extend(found.into_iter().map(|k| Keypoint {
                x: k.x * level.scale,
                y: k.y * level.scale,
                size: k.size * level.scale,
                octave: level.level as i32,
                ..k
            }));
        }
        Ok(keypoints)
    }
}
