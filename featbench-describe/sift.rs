use featbench_core::{DescriptorFamily, Descriptors, FatalError, FatalResult, FloatImage, Image, Keypoint};
use featbench_detect::SiftDetection;
use rayon::prelude::*;

use crate::extractor::ExtractionCapability;

/// Spatial cells per side
const WIDTH: usize = 4;
const BINS: usize = 8;
pub const SIFT_DIMS: usize = WIDTH * WIDTH * BINS;
/// Cell side in units of the keypoint scale
const SCALE_FACTOR: f32 = 3.0;
const MAGNITUDE_CLAMP: f32 = 0.2;
const INT_FACTOR: f32 = 512.0;

/// Gradient-orientation histograms on the Gaussian scale space, 128 floats
#[derive(Debug, Clone, Copy, Default)]
pub struct SiftExtraction {
    pub scale_space: SiftDetection,
}

impl SiftExtraction {
    /// Octave, layer and in-octave scale of a keypoint of diameter `size`
    fn locate(&self, size: f32, octaves: usize) -> (usize, usize, f32) {
        let layers = self.scale_space.octave_layers;
        let sigma = self.scale_space.sigma;
        let scale = (size * 0.5).max(sigma);

        let position = (scale / sigma).log2();
        let octave = (position.floor().max(0.0) as usize).min(octaves.saturating_sub(1));
        let layer = ((position - octave as f32) * layers as f32)
            .round()
            .clamp(0.0, (layers + 2) as f32) as usize;
        (octave, layer, scale / (1u32 << octave) as f32)
    }

    fn describe(gauss: &FloatImage, x: f32, y: f32, scale: f32, angle_deg: f32) -> Vec<f32> {
        let (sin_t, cos_t) = (-angle_deg).to_radians().sin_cos();
        let bins_per_rad = BINS as f32 / 360.0;
        let hist_width = SCALE_FACTOR * scale;
        let diagonal = ((gauss.width * gauss.width + gauss.height * gauss.height) as f32).sqrt();
        let radius = (hist_width * std::f32::consts::SQRT_2 * (WIDTH as f32 + 1.0) * 0.5)
            .min(diagonal)
            .round() as isize;
        let exp_scale = -1.0 / (WIDTH as f32 * WIDTH as f32 * 0.5);

        let (cx, cy) = (x.round() as isize, y.round() as isize);
        let mut hist = [0f32; SIFT_DIMS];

        for dy in -radius..=radius {
            for dx in -radius..=radius {
                // rotate into the keypoint frame, in cell units
                let c_rot = (dx as f32 * cos_t - dy as f32 * sin_t) / hist_width;
                let r_rot = (dx as f32 * sin_t + dy as f32 * cos_t) / hist_width;
                let rbin = r_rot + WIDTH as f32 / 2.0 - 0.5;
                let cbin = c_rot + WIDTH as f32 / 2.0 - 0.5;
                if rbin <= -1.0 || rbin >= WIDTH as f32 || cbin <= -1.0 || cbin >= WIDTH as f32 {
                    continue;
                }

                let (px, py) = (cx + dx, cy + dy);
                if px <= 0 || py <= 0 || px >= gauss.width as isize - 1 || py >= gauss.height as isize - 1 {
                    continue;
                }
                let (gx, gy) = gauss.gradient(px as usize, py as usize);
                let magnitude = (gx * gx + gy * gy).sqrt()
                    * ((c_rot * c_rot + r_rot * r_rot) * exp_scale).exp();
                let orientation = (gy.atan2(gx).to_degrees() - angle_deg).rem_euclid(360.0);
                let obin = orientation * bins_per_rad;

                accumulate(&mut hist, rbin, cbin, obin, magnitude);
            }
        }

        normalize(&mut hist);
        hist.to_vec()
    }
}

/// Distribute `value` over the eight neighbouring (row, col, orientation) bins
fn accumulate(hist: &mut [f32; SIFT_DIMS], rbin: f32, cbin: f32, obin: f32, value: f32) {
    let (r0, c0, o0) = (rbin.floor(), cbin.floor(), obin.floor());
    let (dr, dc, dobin) = (rbin - r0, cbin - c0, obin - o0);

    for (ri, rw) in [(r0 as isize, 1.0 - dr), (r0 as isize + 1, dr)] {
        if ri < 0 || ri >= WIDTH as isize {
            continue;
        }
        for (ci, cw) in [(c0 as isize, 1.0 - dc), (c0 as isize + 1, dc)] {
            if ci < 0 || ci >= WIDTH as isize {
                continue;
            }
            for (oi, ow) in [(o0 as isize, 1.0 - dobin), (o0 as isize + 1, dobin)] {
                let o = oi.rem_euclid(BINS as isize) as usize;
                let idx = (ri as usize * WIDTH + ci as usize) * BINS + o;
                hist[idx] += value * rw * cw * ow;
            }
        }
    }
}

/// Unit-normalize, clamp large components and rescale to the byte range
fn normalize(hist: &mut [f32; SIFT_DIMS]) {
    let norm = hist.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm <= f32::EPSILON {
        return;
    }
    let threshold = norm * MAGNITUDE_CLAMP;
    for v in hist.iter_mut() {
        *v = v.min(threshold);
    }
    let norm = hist.iter().map(|v| v * v).sum::<f32>().sqrt().max(f32::EPSILON);
    for v in hist.iter_mut() {
        *v = (*v * INT_FACTOR / norm).round().clamp(0.0, 255.0);
    }
}

impl ExtractionCapability for SiftExtraction {
    fn family(&self) -> DescriptorFamily {
        DescriptorFamily::Sift
    }

    fn compute(&self, image: &Image, keypoints: &[Keypoint]) -> FatalResult<Descriptors> {
        if keypoints.is_empty() {
            return Ok(Descriptors::Float {
                dims: SIFT_DIMS,
                data: Vec::new(),
            });
        }

        let pyramid = self.scale_space.build_scale_space(image);
        if pyramid.is_empty() {
            return Err(FatalError::InvalidImage(format!(
                "{}x{} is too small for a SIFT scale space",
                image.width(),
                image.height()
            )));
        }

        let rows: Vec<Vec<f32>> = keypoints
            .par_iter()
            .map(|kp| {
                let (octave, layer, scale) = self.locate(kp.size, pyramid.len());
                let factor = (1u32 << octave) as f32;
                let gauss = &pyramid[octave].gaussians[layer];
                Self::describe(gauss, kp.x / factor, kp.y / factor, scale, kp.angle)
            })
            .collect();

        Ok(Descriptors::from_float_rows(SIFT_DIMS, &rows))
    }
}
