use std::f32::consts::PI;

use featbench_core::{DescriptorFamily, Descriptors, FatalResult, Image, Keypoint};
use rayon::prelude::*;

use crate::extractor::ExtractionCapability;
use crate::sampling::{pack_bits, IntegralImage};

const POINTS_PER_RING: usize = 6;
const PAIRS: usize = 512;
/// Keypoint diameter of the smallest pattern scale
const SMALLEST_KP_SIZE: f32 = 7.0;

#[derive(Debug, Clone, Copy)]
struct RetinaPoint {
    x: f32,
    y: f32,
    sigma: f32,
}

/// Fast Retina Keypoint: a 43-point retina-like pattern with receptive
/// fields growing towards the periphery, 64 bytes
#[derive(Debug, Clone)]
pub struct FreakExtraction {
    pub pattern_scale: f32,
    points: Vec<RetinaPoint>,
    pairs: Vec<(usize, usize)>,
    orientation_pairs: Vec<(usize, usize)>,
}

impl Default for FreakExtraction {
    fn default() -> Self {
        Self::new(22.0)
    }
}

impl FreakExtraction {
    pub fn new(pattern_scale: f32) -> Self {
        let big_r = 2.0 / 3.0;
        let small_r = 2.0 / 24.0;
        let unit = (big_r - small_r) / 21.0;
        let radius = [
            big_r,
            big_r - 6.0 * unit,
            big_r - 11.0 * unit,
            big_r - 15.0 * unit,
            big_r - 18.0 * unit,
            big_r - 20.0 * unit,
            small_r,
        ];
        let sigma = radius.map(|r| r / 2.0);

        let mut points = Vec::with_capacity(radius.len() * POINTS_PER_RING + 1);
        for (ring, (&r, &s)) in radius.iter().zip(&sigma).enumerate() {
            // every other ring is shifted by half a step
            let beta = PI / POINTS_PER_RING as f32 * (ring % 2) as f32;
            for k in 0..POINTS_PER_RING {
                let alpha = k as f32 * 2.0 * PI / POINTS_PER_RING as f32 + beta;
                points.push(RetinaPoint {
                    x: alpha.cos() * r * pattern_scale,
                    y: alpha.sin() * r * pattern_scale,
                    sigma: s * pattern_scale,
                });
            }
        }
        points.push(RetinaPoint {
            x: 0.0,
            y: 0.0,
            sigma: sigma[6] * pattern_scale,
        });

        // coarse-to-fine: pairs of large receptive fields first
        let mut candidates = Vec::with_capacity(points.len() * (points.len() - 1) / 2);
        for i in 1..points.len() {
            for j in 0..i {
                candidates.push(((i, j), points[i].sigma + points[j].sigma));
            }
        }
        candidates.sort_by(|a, b| b.1.total_cmp(&a.1));
        let pairs = candidates.iter().take(PAIRS).map(|(p, _)| *p).collect();

        // diametrically opposite points of every ring
        let mut orientation_pairs = Vec::new();
        for ring in 0..radius.len() {
            for k in 0..POINTS_PER_RING / 2 {
                let base = ring * POINTS_PER_RING;
                orientation_pairs.push((base + k, base + k + POINTS_PER_RING / 2));
            }
        }

        Self {
            pattern_scale,
            points,
            pairs,
            orientation_pairs,
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

    fn orientation(&self, values: &[f32]) -> f32 {
        let (mut gx, mut gy) = (0f32, 0f32);
        for &(i, j) in &self.orientation_pairs {
            let (pi, pj) = (&self.points[i], &self.points[j]);
            let (dx, dy) = (pi.x - pj.x, pi.y - pj.y);
            let norm = (dx * dx + dy * dy).sqrt();
            let diff = values[i] - values[j];
            gx += diff * dx / norm;
            gy += diff * dy / norm;
        }
        gy.atan2(gx)
    }
}

impl ExtractionCapability for FreakExtraction {
    fn family(&self) -> DescriptorFamily {
        DescriptorFamily::Freak
    }

    fn compute(&self, image: &Image, keypoints: &[Keypoint]) -> FatalResult<Descriptors> {
        let integral = IntegralImage::new(image);

        let rows: Vec<Vec<u8>> = keypoints
            .par_iter()
            .map(|kp| {
                let scale = (kp.size / SMALLEST_KP_SIZE).max(1.0);
                let upright = self.intensities(&integral, kp, scale, 0.0);
                let angle = self.orientation(&upright);
                let rotated = self.intensities(&integral, kp, scale, angle);
                pack_bits(self.pairs.iter().map(|&(i, j)| rotated[i] > rotated[j]), 64)
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
    fn test_retina_has_43_points_and_512_pairs() {
        let freak = FreakExtraction::default();
        assert_eq!(freak.points.len(), 43);
        assert_eq!(freak.pairs.len(), PAIRS);
        assert_eq!(freak.orientation_pairs.len(), 21);
    }

    #[test]
    fn test_receptive_fields_shrink_towards_center() {
        let freak = FreakExtraction::default();
        assert!(freak.points[0].sigma > freak.points[36].sigma);
        let outer = (freak.points[0].x.powi(2) + freak.points[0].y.powi(2)).sqrt();
        assert!((outer - 22.0 * 2.0 / 3.0).abs() < 1e-3);
    }

    #[test]
    fn test_rows_and_width() {
        let img = Image::from_fn(90, 90, |x, y| image::Luma([((x * 7 + y * 3) % 200) as u8]));
        let kps = vec![Keypoint::new(45.0, 45.0, 7.0), Keypoint::new(0.0, 0.0, 20.0)];
        let desc = FreakExtraction::default().compute(&img, &kps).unwrap();
        assert_eq!(desc.rows(), 2);
        assert_eq!(desc.width(), 64);
    }
}
