use featbench_core::{DescriptorFamily, Descriptors, FatalResult, Image, Keypoint};
use featbench_detect::intensity_centroid_angle;
use rayon::prelude::*;

use crate::extractor::ExtractionCapability;
use crate::sampling::{pack_bits, smoothed, BinaryPattern};

const PATTERN_SEED: u64 = 0x6f_72_62;

/// Steered BRIEF: the test pattern is rotated by the keypoint angle and
/// scaled with its pyramid level
#[derive(Debug, Clone)]
pub struct OrbExtraction {
    pub patch_size: u32,
    /// Pyramid scale step the keypoint octave refers to
    pub scale_factor: f32,
    pub smoothing_sigma: f32,
    pattern: BinaryPattern,
}

impl Default for OrbExtraction {
    fn default() -> Self {
        Self {
            patch_size: 31,
            scale_factor: 1.2,
            smoothing_sigma: 2.0,
            pattern: BinaryPattern::gaussian(256, 31.0, PATTERN_SEED),
        }
    }
}

impl OrbExtraction {
    /// Keypoints without an orientation get the intensity-centroid angle
    fn steering_angle(&self, image: &Image, kp: &Keypoint) -> f32 {
        if kp.angle > 0.0 {
            return kp.angle;
        }
        let (w, h) = image.dimensions();
        let x = kp.x.round().clamp(0.0, w.saturating_sub(1) as f32) as u32;
        let y = kp.y.round().clamp(0.0, h.saturating_sub(1) as f32) as u32;
        intensity_centroid_angle(image, x, y, (self.patch_size / 2) as i32)
    }
}

impl ExtractionCapability for OrbExtraction {
    fn family(&self) -> DescriptorFamily {
        DescriptorFamily::Orb
    }

    fn compute(&self, image: &Image, keypoints: &[Keypoint]) -> FatalResult<Descriptors> {
        if keypoints.is_empty() {
            return Ok(Descriptors::empty_binary(32));
        }
        let surface = smoothed(image, self.smoothing_sigma);

        let rows: Vec<Vec<u8>> = keypoints
            .par_iter()
            .map(|kp| {
                let scale = self.scale_factor.powi(kp.octave.max(0));
                let pairs = self.pattern.transformed(self.steering_angle(image, kp), scale);
                let bits = pairs.iter().map(|[a, b]| {
                    let va = surface.bilinear(kp.x + a.0, kp.y + a.1);
                    let vb = surface.bilinear(kp.x + b.0, kp.y + b.1);
                    va < vb
                });
                pack_bits(bits, 32)
            })
            .collect();

        Ok(Descriptors::Binary {
            bytes_per_row: 32,
            data: rows.concat(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Bright disc with a wedge on a textured background, rotationally
    /// asymmetric and free of flat regions
    fn blob(cx: f32, cy: f32) -> Image {
        Image::from_fn(120, 120, |x, y| {
            let dx = x as f32 - cx;
            let dy = y as f32 - cy;
            let r = (dx * dx + dy * dy).sqrt();
            let wedge = dx > 0.0 && dy.abs() < dx * 0.4 && r < 14.0;
            let texture = (dx as i32 * 7 + dy as i32 * 13).rem_euclid(60) as u8;
            image::Luma([if r < 6.0 || wedge { 220 } else { 30 + texture }])
        })
    }

    #[test]
    fn test_rows_and_width() {
        let kps = vec![Keypoint::new(60.0, 60.0, 31.0), Keypoint::new(2.0, 118.0, 31.0).with_octave(3)];
        let desc = OrbExtraction::default().compute(&blob(60.0, 60.0), &kps).unwrap();
        assert_eq!(desc.rows(), 2);
        assert_eq!(desc.width(), 32);
    }

    #[test]
    fn test_translation_invariance() {
        let extractor = OrbExtraction::default();
        let a = extractor
            .compute(&blob(50.0, 50.0), &[Keypoint::new(50.0, 50.0, 31.0)])
            .unwrap();
        let b = extractor
            .compute(&blob(70.0, 64.0), &[Keypoint::new(70.0, 64.0, 31.0)])
            .unwrap();
        let differing: u32 = a
            .binary_row(0)
            .unwrap()
            .iter()
            .zip(b.binary_row(0).unwrap())
            .map(|(x, y)| (x ^ y).count_ones())
            .sum();
        assert!(differing < 16, "{} bits differ", differing);
    }

    #[test]
    fn test_empty_keypoints() {
        let desc = OrbExtraction::default().compute(&blob(60.0, 60.0), &[]).unwrap();
        assert!(desc.is_empty());
        assert_eq!(desc.width(), 32);
    }
}
