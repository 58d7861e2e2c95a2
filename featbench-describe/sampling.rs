use featbench_core::{gaussian_blur, FloatImage, Image};
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64;

/// Summed-area table for constant-time box means
#[derive(Debug, Clone)]
pub struct IntegralImage {
    width: usize,
    height: usize,
    /// `(width + 1) * (height + 1)` running sums, first row and column zero
    sums: Vec<f64>,
}

impl IntegralImage {
    pub fn new(img: &Image) -> Self {
        let (w, h) = (img.width() as usize, img.height() as usize);
        let stride = w + 1;
        let mut sums = vec![0f64; stride * (h + 1)];
        let raw = img.as_raw();
        for y in 0..h {
            let mut row = 0f64;
            for x in 0..w {
                row += raw[y * w + x] as f64;
                sums[(y + 1) * stride + x + 1] = sums[y * stride + x + 1] + row;
            }
        }
        Self {
            width: w,
            height: h,
            sums,
        }
    }

    /// Mean intensity of the square of half-width `half` around `(x, y)`,
    /// clipped to the image
    pub fn box_mean(&self, x: f32, y: f32, half: f32) -> f32 {
        if self.width == 0 || self.height == 0 {
            return 0.0;
        }
        let clip = |v: f32, max: usize| v.round().clamp(0.0, max as f32) as usize;
        let x0 = clip(x - half, self.width - 1);
        let y0 = clip(y - half, self.height - 1);
        let x1 = clip(x + half, self.width - 1) + 1;
        let y1 = clip(y + half, self.height - 1) + 1;

        let stride = self.width + 1;
        let sum = self.sums[y1 * stride + x1] - self.sums[y0 * stride + x1] - self.sums[y1 * stride + x0]
            + self.sums[y0 * stride + x0];
        let area = ((x1 - x0) * (y1 - y0)) as f64;
        (sum / area) as f32
    }
}

/// Point-pair comparisons of a binary descriptor, in patch coordinates
#[derive(Debug, Clone)]
pub struct BinaryPattern {
    pub pairs: Vec<[(f32, f32); 2]>,
}

impl BinaryPattern {
    /// Isotropic Gaussian pairs (sigma = patch / 5) clamped to the patch.
    ///
    /// The generator is seeded, so every run and every extractor instance
    /// compares the same pixels.
    pub fn gaussian(bits: usize, patch_size: f32, seed: u64) -> Self {
        let mut rng = Pcg64::seed_from_u64(seed);
        let sigma = patch_size / 5.0;
        let half = patch_size / 2.0;
        let mut sample = move || {
            // Box-Muller
            let u1: f32 = rng.gen_range(f32::EPSILON..1.0);
            let u2: f32 = rng.gen();
            let r = (-2.0 * u1.ln()).sqrt();
            let theta = 2.0 * std::f32::consts::PI * u2;
            (
                (r * theta.cos() * sigma).clamp(-half, half - 1.0).round(),
                (r * theta.sin() * sigma).clamp(-half, half - 1.0).round(),
            )
        };

        let pairs = (0..bits).map(|_| [sample(), sample()]).collect();
        Self { pairs }
    }

    pub fn bits(&self) -> usize {
        self.pairs.len()
    }

    /// Pattern rotated by `angle_deg` and scaled by `scale`
    pub fn transformed(&self, angle_deg: f32, scale: f32) -> Vec<[(f32, f32); 2]> {
        let (s, c) = angle_deg.to_radians().sin_cos();
        let rot = |(x, y): (f32, f32)| ((c * x - s * y) * scale, (s * x + c * y) * scale);
        self.pairs.iter().map(|[a, b]| [rot(*a), rot(*b)]).collect()
    }
}

/// Pack comparison results, bit `i` lands in byte `i / 8` at position `i % 8`
pub fn pack_bits(bits: impl Iterator<Item = bool>, bytes: usize) -> Vec<u8> {
    let mut d = vec![0u8; bytes];
    for (i, bit) in bits.enumerate().take(bytes * 8) {
        d[i / 8] |= (bit as u8) << (i % 8);
    }
    d
}

/// Gaussian-smoothed float copy of `img`, the sampling surface of the
/// steered binary descriptors
pub fn smoothed(img: &Image, sigma: f32) -> FloatImage {
    gaussian_blur(&FloatImage::from_gray(img, 1.0), sigma)
}
