use featbench_core::{DetectorFamily, FatalResult, Image, Keypoint};

use crate::capability::DetectionCapability;
use crate::corner_detection::CornerDetector;
use crate::pyramid::ImagePyramid;
use crate::suppression::KeypointSuppression;

/// Multi-scale segment-test detector over octaves and intra-octaves.
///
/// Every octave halves the image; an intra-octave layer sits between two
/// octaves at 1.5x the octave's scale. Detections of the same corner on
/// neighboring layers are merged, keeping the strongest.
#[derive(Debug, Clone, Copy)]
pub struct BriskDetection {
    pub threshold: u8,
    pub octaves: usize,
}

impl Default for BriskDetection {
    fn default() -> Self {
        Self {
            threshold: 30,
            octaves: 3,
        }
    }
}

impl BriskDetection {
    /// Keypoint diameter on the base layer
    pub const BASIC_SIZE: f32 = 12.0;
    /// Layers overlapping more than this are treated as the same corner
    const CROSS_SCALE_OVERLAP: f32 = 0.5;

    /// Scale of every layer, finest first
    fn layer_scales(&self) -> Vec<f32> {
        let mut scales = Vec::with_capacity(self.octaves * 2 + 1);
        scales.push(1.0);
        for octave in 0..self.octaves {
            let base = 2f32.powi(octave as i32);
            scales.push(base * 1.5);
            scales.push(base * 2.0);
        }
        scales
    }
}

impl DetectionCapability for BriskDetection {
    fn family(&self) -> DetectorFamily {
        DetectorFamily::Brisk
    }

    fn detect(&self, image: &Image) -> FatalResult<Vec<Keypoint>> {
        let (w, h) = image.dimensions();
        let mut candidates = Vec::new();

        for (layer, &scale) in self.layer_scales().iter().enumerate() {
            let lw = (w as f32 / scale).round() as u32;
            let lh = (h as f32 / scale).round() as u32;
            if lw < 16 || lh < 16 {
                break;
            }
            let level = if layer == 0 {
                image.clone()
            } else {
                ImagePyramid::downsample(image, lw, lh)
            };

            let corners = CornerDetector::fast_corners(&level, self.threshold, 3);
            let corners = CornerDetector::nonmax_suppression_3x3(&corners, lw, lh);
            let sx = w as f32 / lw as f32;
            let sy = h as f32 / lh as f32;
            candidates.extend(corners.into_iter().map(|c| {
                Keypoint::new(c.x as f32 * sx, c.y as f32 * sy, Self::BASIC_SIZE * scale)
                    .with_response(c.score)
                    .with_octave(layer as i32)
            }));
        }

        let merged = KeypointSuppression::remove_overlapping(&candidates, Self::CROSS_SCALE_OVERLAP);
        log::trace!("BRISK: {} layer detections merged into {}", candidates.len(), merged.len());
        Ok(merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layer_scales() {
        let scales = BriskDetection::default().layer_scales();
        assert_eq!(scales, vec![1.0, 1.5, 2.0, 3.0, 4.0, 6.0, 8.0]);
    }

    #[test]
    fn test_detects_high_contrast_corners_only() {
        let img = Image::from_fn(96, 96, |x, y| {
            let strong = (20..50).contains(&x) && (20..50).contains(&y);
            let faint = (60..80).contains(&x) && (60..80).contains(&y);
            image::Luma([if strong {
                220
            } else if faint {
                75
            } else {
                60
            }])
        });
        let kps = BriskDetection::default().detect(&img).unwrap();
        assert!(!kps.is_empty());
        assert!(kps.iter().all(|k| k.response >= 30.0));
        assert!(kps.iter().all(|k| !(k.x > 56.0 && k.y > 56.0)));
        for (i, a) in kps.iter().enumerate() {
            for b in &kps[i + 1..] {
                assert!(a.overlap(b) <= 0.5);
            }
        }
    }
}
