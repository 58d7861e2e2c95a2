use featbench_core::{gaussian_blur, DetectorFamily, FatalResult, FloatImage, Image, Keypoint};

use crate::capability::DetectionCapability;

/// Scale-space extrema of the difference-of-Gaussians pyramid
#[derive(Debug, Clone, Copy)]
pub struct SiftDetection {
    /// Layers per octave in which extrema are searched
    pub octave_layers: usize,
    pub contrast_threshold: f32,
    /// Maximum ratio of principal curvatures
    pub edge_threshold: f32,
    pub sigma: f32,
}

impl Default for SiftDetection {
    fn default() -> Self {
        Self {
            octave_layers: 3,
            contrast_threshold: 0.04,
            edge_threshold: 10.0,
            sigma: 1.6,
        }
    }
}

/// Gaussian and DoG stacks of one octave
pub struct Octave {
    pub gaussians: Vec<FloatImage>,
    pub dogs: Vec<FloatImage>,
}

const IMAGE_BORDER: usize = 5;
const MAX_INTERPOLATION_STEPS: usize = 5;
const ORIENTATION_BINS: usize = 36;
const ORIENTATION_PEAK_RATIO: f32 = 0.8;
/// Blur already present in the input image
const INITIAL_BLUR: f32 = 0.5;

impl SiftDetection {
    fn octave_count(&self, width: usize, height: usize) -> usize {
        let min_side = width.min(height) as f32;
        ((min_side.log2() - 3.0).floor().max(1.0)) as usize
    }

    /// Build the Gaussian and DoG pyramids with values in the unit range
    pub fn build_scale_space(&self, image: &Image) -> Vec<Octave> {
        let s = self.octave_layers;
        let base_sigma = (self.sigma * self.sigma - INITIAL_BLUR * INITIAL_BLUR).max(0.01).sqrt();
        let mut base = gaussian_blur(&FloatImage::from_gray(image, 1.0 / 255.0), base_sigma);

        // incremental blur from layer i - 1 to layer i
        let k = 2f32.powf(1.0 / s as f32);
        let mut increments = vec![self.sigma];
        for i in 1..s + 3 {
            let prev = self.sigma * k.powi(i as i32 - 1);
            let total = prev * k;
            increments.push((total * total - prev * prev).sqrt());
        }

        let octaves = self.octave_count(image.width() as usize, image.height() as usize);
        let mut pyramid = Vec::with_capacity(octaves);
        for o in 0..octaves {
            if base.width < 2 * IMAGE_BORDER + 3 || base.height < 2 * IMAGE_BORDER + 3 {
                break;
            }
            let mut gaussians = vec![base.clone()];
            for inc in increments.iter().skip(1) {
                let next = gaussian_blur(&gaussians[gaussians.len() - 1], *inc);
                gaussians.push(next);
            }
            let dogs: Vec<FloatImage> = gaussians.windows(2).map(|pair| pair[1].subtract(&pair[0])).collect();

            base = gaussians[s].half_size();
            log::trace!("SIFT octave {}: {}x{}", o, gaussians[0].width, gaussians[0].height);
            pyramid.push(Octave { gaussians, dogs });
        }
        pyramid
    }

    fn is_extremum(dogs: &[FloatImage], layer: usize, x: usize, y: usize) -> bool {
        let value = dogs[layer].get(x, y);
        let is_max = value > 0.0;
        for dog in &dogs[layer - 1..=layer + 1] {
            for yy in y - 1..=y + 1 {
                for xx in x - 1..=x + 1 {
                    let n = dog.get(xx, yy);
                    if (is_max && n > value) || (!is_max && n < value) {
                        return false;
                    }
                }
            }
        }
        true
    }

    /// Quadratic fit around a discrete extremum; returns the refined
    /// `(x, y, layer, offsets, contrast)` or `None` when rejected
    fn refine(&self, dogs: &[FloatImage], mut layer: usize, mut x: usize, mut y: usize) -> Option<(usize, usize, usize, [f32; 3], f32)> {
        let s = self.octave_layers;
        let (w, h) = (dogs[0].width, dogs[0].height);

        for _ in 0..MAX_INTERPOLATION_STEPS {
            let (d, grad, hess) = derivatives(dogs, layer, x, y);
            let offset = solve3(&hess, &grad).map(|o| [-o[0], -o[1], -o[2]])?;

            if offset.iter().all(|v| v.abs() < 0.5) {
                let contrast = d + 0.5 * (grad[0] * offset[0] + grad[1] * offset[1] + grad[2] * offset[2]);
                if contrast.abs() * (s as f32) < self.contrast_threshold {
                    return None;
                }

                let (dxx, dyy, dxy) = (hess[0][0], hess[1][1], hess[0][1]);
                let trace = dxx + dyy;
                let det = dxx * dyy - dxy * dxy;
                let r = self.edge_threshold;
                if det <= 0.0 || trace * trace * r >= (r + 1.0) * (r + 1.0) * det {
                    return None;
                }
                return Some((x, y, layer, offset, contrast));
            }

            if offset.iter().any(|v| !v.is_finite() || v.abs() > 1e6) {
                return None;
            }
            x = (x as f32 + offset[0].round()) as usize;
            y = (y as f32 + offset[1].round()) as usize;
            let next_layer = layer as f32 + offset[2].round();
            if next_layer < 1.0
                || next_layer > s as f32
                || x < IMAGE_BORDER
                || x >= w - IMAGE_BORDER
                || y < IMAGE_BORDER
                || y >= h - IMAGE_BORDER
            {
                return None;
            }
            layer = next_layer as usize;
        }
        None
    }

    /// Dominant gradient orientations (degrees) around a keypoint; one entry
    /// per histogram peak within 80% of the highest
    fn orientations(gauss: &FloatImage, x: usize, y: usize, scale: f32) -> Vec<f32> {
        let sigma = 1.5 * scale;
        let radius = (3.0 * sigma).round() as isize;
        let weight_scale = -1.0 / (2.0 * sigma * sigma);

        let mut hist = [0f32; ORIENTATION_BINS];
        for dy in -radius..=radius {
            let yy = y as isize + dy;
            if yy <= 0 || yy >= gauss.height as isize - 1 {
                continue;
            }
            for dx in -radius..=radius {
                let xx = x as isize + dx;
                if xx <= 0 || xx >= gauss.width as isize - 1 {
                    continue;
                }
                let (gx, gy) = gauss.gradient(xx as usize, yy as usize);
                let magnitude = (gx * gx + gy * gy).sqrt();
                let angle = gy.atan2(gx).to_degrees().rem_euclid(360.0);
                let weight = ((dx * dx + dy * dy) as f32 * weight_scale).exp();
                let bin = ((angle / 360.0 * ORIENTATION_BINS as f32).round() as usize) % ORIENTATION_BINS;
                hist[bin] += weight * magnitude;
            }
        }

        // circular [1 4 6 4 1] smoothing
        let n = ORIENTATION_BINS;
        let smooth: Vec<f32> = (0..n)
            .map(|i| {
                (hist[(i + n - 2) % n] + hist[(i + 2) % n]) / 16.0
                    + (hist[(i + n - 1) % n] + hist[(i + 1) % n]) * 4.0 / 16.0
                    + hist[i] * 6.0 / 16.0
            })
            .collect();

        let max = smooth.iter().copied().fold(0.0f32, f32::max);
        if max <= 0.0 {
            return vec![0.0];
        }
        let mut angles = Vec::new();
        for i in 0..n {
            let left = smooth[(i + n - 1) % n];
            let right = smooth[(i + 1) % n];
            let v = smooth[i];
            if v > left && v > right && v >= ORIENTATION_PEAK_RATIO * max {
                let shift = 0.5 * (left - right) / (left - 2.0 * v + right);
                let bin = (i as f32 + shift).rem_euclid(n as f32);
                let angle = bin * 360.0 / n as f32;
                angles.push(if angle >= 360.0 { 0.0 } else { angle });
            }
        }
        if angles.is_empty() {
            angles.push(0.0);
        }
        angles
    }
}

/// Value, gradient and Hessian of the DoG stack at `(x, y, layer)`
fn derivatives(dogs: &[FloatImage], layer: usize, x: usize, y: usize) -> (f32, [f32; 3], [[f32; 3]; 3]) {
    let (prev, cur, next) = (&dogs[layer - 1], &dogs[layer], &dogs[layer + 1]);
    let v = cur.get(x, y);

    let dx = (cur.get(x + 1, y) - cur.get(x - 1, y)) * 0.5;
    let dy = (cur.get(x, y + 1) - cur.get(x, y - 1)) * 0.5;
    let ds = (next.get(x, y) - prev.get(x, y)) * 0.5;

    let dxx = cur.get(x + 1, y) + cur.get(x - 1, y) - 2.0 * v;
    let dyy = cur.get(x, y + 1) + cur.get(x, y - 1) - 2.0 * v;
    let dss = next.get(x, y) + prev.get(x, y) - 2.0 * v;
    let dxy = (cur.get(x + 1, y + 1) - cur.get(x - 1, y + 1) - cur.get(x + 1, y - 1) + cur.get(x - 1, y - 1)) * 0.25;
    let dxs = (next.get(x + 1, y) - next.get(x - 1, y) - prev.get(x + 1, y) + prev.get(x - 1, y)) * 0.25;
    let dys = (next.get(x, y + 1) - next.get(x, y - 1) - prev.get(x, y + 1) + prev.get(x, y - 1)) * 0.25;

    (
        v,
        [dx, dy, ds],
        [[dxx, dxy, dxs], [dxy, dyy, dys], [dxs, dys, dss]],
    )
}

/// Solve `m * x = b` by Cramer's rule
fn solve3(m: &[[f32; 3]; 3], b: &[f32; 3]) -> Option<[f32; 3]> {
    let det3 = |a: &[[f32; 3]; 3]| {
        a[0][0] * (a[1][1] * a[2][2] - a[1][2] * a[2][1]) - a[0][1] * (a[1][0] * a[2][2] - a[1][2] * a[2][0])
            + a[0][2] * (a[1][0] * a[2][1] - a[1][1] * a[2][0])
    };
    let det = det3(m);
    if det == 0.0 || !det.is_finite() {
        return None;
    }

    let mut out = [0f32; 3];
    for (col, value) in out.iter_mut().enumerate() {
        let mut replaced = *m;
        for row in 0..3 {
            replaced[row][col] = b[row];
        }
        *value = det3(&replaced) / det;
    }
    Some(out)
}

impl DetectionCapability for SiftDetection {
    fn family(&self) -> DetectorFamily {
        DetectorFamily::Sift
    }

    fn detect(&self, image: &Image) -> FatalResult<Vec<Keypoint>> {
        let s = self.octave_layers;
        let pyramid = self.build_scale_space(image);
        let prelim_threshold = 0.5 * self.contrast_threshold / s as f32;

        let mut keypoints = Vec::new();
        for (o, octave) in pyramid.iter().enumerate() {
            let (w, h) = (octave.dogs[0].width, octave.dogs[0].height);
            let octave_scale = (1u32 << o) as f32;

            for layer in 1..=s {
                for y in IMAGE_BORDER..h - IMAGE_BORDER {
                    for x in IMAGE_BORDER..w - IMAGE_BORDER {
                        let v = octave.dogs[layer].get(x, y);
                        if v.abs() <= prelim_threshold || !Self::is_extremum(&octave.dogs, layer, x, y) {
                            continue;
                        }
                        let Some((rx, ry, rl, offset, contrast)) = self.refine(&octave.dogs, layer, x, y) else {
                            continue;
                        };

                        let layer_scale = self.sigma * 2f32.powf((rl as f32 + offset[2]) / s as f32);
                        let kx = (rx as f32 + offset[0]) * octave_scale;
                        let ky = (ry as f32 + offset[1]) * octave_scale;
                        let size = layer_scale * octave_scale * 2.0;

                        for angle in Self::orientations(&octave.gaussians[rl], rx, ry, layer_scale) {
                            keypoints.push(
                                Keypoint::new(kx, ky, size)
                                    .with_response(contrast.abs())
                                    .with_angle(angle)
                                    .with_octave(o as i32),
                            );
                        }
                    }
                }
            }
        }
        Ok(keypoints)
    }
}
