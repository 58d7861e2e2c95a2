use featbench_core::{DescriptorFamily, Descriptors, FatalResult, Image, Keypoint};
use rayon::prelude::*;

use crate::extractor::ExtractionCapability;
use crate::sampling::{pack_bits, IntegralImage};

/// Ring radii and point counts of the sampling pattern
const RINGS: [(f32, usize); 5] = [(0.0, 1), (2.9, 10), (4.9, 14), (7.4, 15), (10.8, 20)];
const SHORT_PAIRS: usize = 512;
/// Pairs longer than this (pattern units) estimate the orientation
const LONG_DISTANCE: f32 = 13.67;
/// Keypoint diameter that maps to a pattern scale of one
const BASIC_SIZE: f32 = 12.0;

#[derive(Debug, Clone, Copy)]
struct PatternPoint {
    x: f32,
    y: f32,
    /// Smoothing radius at this point
    sigma: f32,
}

/// Binary Robust Invariant Scalable Keypoints descriptor, 64 bytes
#[derive(Debug, Clone)]
pub struct BriskExtraction {
    pub pattern_scale: f32,
    points: Vec<PatternPoint>,
    short_pairs: Vec<(usize, usize)>,
    long_pairs: Vec<(usize, usize)>,
}

impl Default for BriskExtraction {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl BriskExtraction {
    pub fn new(pattern_scale: f32) -> Self {
        let mut points = Vec::with_capacity(60);
        for (ring, &(radius, count)) in RINGS.iter().enumerate() {
            let sigma = if ring == 0 {
                0.5
            } else {
                (std::f32::consts::PI * radius / count as f32).max(0.5) * 0.5
            };
            for k in 0..count {
                let theta = 2.0 * std::f32::consts::PI * k as f32 / count as f32;
                points.push(PatternPoint {
                    x: radius * theta.cos() * pattern_scale,
                    y: radius * theta.sin() * pattern_scale,
                    sigma: sigma * pattern_scale,
                });
            }
        }

        let mut all_pairs = Vec::with_capacity(points.len() * (points.len() - 1) / 2);
        for i in 1..points.len() {
            for j in 0..i {
                let (dx, dy) = (points[j].x - points[i].x, points[j].y - points[i].y);
                all_pairs.push(((i, j), (dx * dx + dy * dy).sqrt()));
            }
        }

        let long_limit = LONG_DISTANCE * pattern_scale;
        let long_pairs = all_pairs.iter().filter(|(_, d)| *d > long_limit).map(|(p, _)| *p).collect();
        let mut by_length = all_pairs;
        by_length.sort_by(|a, b| a.1.total_cmp(&b.1));
        let short_pairs = by_length.iter().take(SHORT_PAIRS).map(|(p, _)| *p).collect();

        Self {
            pattern_scale,
            points,
            short_pairs,
            long_pairs,
        }
    }

    fn intensities(&self, integral: &IntegralImage, kp: &Keypoint, scale: f32, angle: f32) -> Vec<f32> {
        let (s, c) = angle.sin_cos();
        self.points
            .iter()
            .map(|p| {
                let x = (c * p.x - s * p.y) * scale;
                let y = (s * p.x + c * p.y) * scale;
                integral.box_mean(kp.x + x, kp.y + y, p.sigma * scale)
            })
            .collect()
    }

    /// Local gradient over the long pairs, in radians
    fn orientation(&self, values: &[f32], scale: f32) -> f32 {
        let (mut gx, mut gy) = (0f32, 0f32);
        for &(i, j) in &self.long_pairs {
            let (pi, pj) = (&self.points[i], &self.points[j]);
            let (dx, dy) = ((pj.x - pi.x) * scale, (pj.y - pi.y) * scale);
            let norm = dx * dx + dy * dy;
            let diff = values[j] - values[i];
            gx += diff * dx / norm;
            gy += diff * dy / norm;
        }
        gy.atan2(gx)
    }
}

impl ExtractionCapability for BriskExtraction {
    fn family(&self) -> DescriptorFamily {
        DescriptorFamily::Brisk
    }

    fn compute(&self, image: &Image, keypoints: &[Keypoint]) -> FatalResult<Descriptors> {
        let integral = IntegralImage::new(image);

        let rows: Vec<Vec<u8>> = keypoints
            .par_iter()
            .map(|kp| {
                let scale = (kp.size / BASIC_SIZE).max(0.5);
                let upright = self.intensities(&integral, kp, scale, 0.0);
                let angle = self.orientation(&upright, scale);
                let rotated = self.intensities(&integral, kp, scale, angle);
                pack_bits(self.short_pairs.iter().map(|&(i, j)| rotated[i] > rotated[j]), 64)
            })
            .collect();

        Ok(Descriptors::Binary {
            bytes_per_row: 64,
            data: rows.concat(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_layout() {
        let brisk = BriskExtraction::default();
        assert_eq!(brisk.points.len(), 60);
        assert_eq!(brisk.short_pairs.len(), SHORT_PAIRS);
        assert!(!brisk.long_pairs.is_empty());
    }

    #[test]
    fn test_rows_and_width() {
        let img = Image::from_fn(80, 80, |x, y| image::Luma([((x * 3) ^ (y * 5)) as u8]));
        let kps = vec![Keypoint::new(40.0, 40.0, 12.0), Keypoint::new(1.0, 78.0, 48.0)];
        let desc = BriskExtraction::default().compute(&img, &kps).unwrap();
        assert_eq!(desc.rows(), 2);
        assert_eq!(desc.width(), 64);
    }

    #[test]
    fn test_flat_patch_has_no_set_bits() {
        let img = Image::from_pixel(60, 60, image::Luma([128]));
        let desc = BriskExtraction::default()
            .compute(&img, &[Keypoint::new(30.0, 30.0, 12.0)])
            .unwrap();
        assert!(desc.binary_row(0).unwrap().iter().all(|&b| b == 0));
    }
}
