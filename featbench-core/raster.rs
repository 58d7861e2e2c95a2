use crate::types::Image;

/// Mirror an index into `0..n` without repeating the edge pixel (`dcb|abcd|cba`)
#[inline]
pub fn reflect101(i: isize, n: usize) -> usize {
    let n = n as isize;
    if n == 1 {
        return 0;
    }
    let mut i = i;
    while i < 0 || i >= n {
        if i < 0 {
            i = -i;
        }
        if i >= n {
            i = 2 * n - i - 2;
        }
    }
    i as usize
}

/// Single-channel floating point raster, row-major
#[derive(Debug, Clone, PartialEq)]
pub struct FloatImage {
    pub width: usize,
    pub height: usize,
    pub data: Vec<f32>,
}

impl FloatImage {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            data: vec![0.0; width * height],
        }
    }

    /// Intensities scaled by `scale` (1/255 gives the unit range)
    pub fn from_gray(img: &Image, scale: f32) -> Self {
        let (w, h) = img.dimensions();
        Self {
            width: w as usize,
            height: h as usize,
            data: img.as_raw().iter().map(|&v| v as f32 * scale).collect(),
        }
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> f32 {
        self.data[y * self.width + x]
    }

    /// Sample with mirrored borders
    #[inline]
    pub fn get_reflect(&self, x: isize, y: isize) -> f32 {
        let xx = reflect101(x, self.width);
        let yy = reflect101(y, self.height);
        self.data[yy * self.width + xx]
    }

    #[inline]
    pub fn put(&mut self, x: usize, y: usize, value: f32) {
        self.data[y * self.width + x] = value;
    }

    /// Bilinear sample at fractional coordinates, clamped to the image
    pub fn bilinear(&self, x: f32, y: f32) -> f32 {
        let x = x.clamp(0.0, (self.width - 1) as f32);
        let y = y.clamp(0.0, (self.height - 1) as f32);
        let x1 = x.floor() as usize;
        let y1 = y.floor() as usize;
        let x2 = (x1 + 1).min(self.width - 1);
        let y2 = (y1 + 1).min(self.height - 1);
        let fx = x - x1 as f32;
        let fy = y - y1 as f32;

        let top = self.get(x1, y1) * (1.0 - fx) + self.get(x2, y1) * fx;
        let bottom = self.get(x1, y2) * (1.0 - fx) + self.get(x2, y2) * fx;
        top * (1.0 - fy) + bottom * fy
    }

    /// Every second pixel in both directions
    pub fn half_size(&self) -> Self {
        let width = (self.width / 2).max(1);
        let height = (self.height / 2).max(1);
        let mut out = Self::new(width, height);
        for y in 0..height {
            for x in 0..width {
                out.put(x, y, self.get((2 * x).min(self.width - 1), (2 * y).min(self.height - 1)));
            }
        }
        out
    }

    /// Pixel-wise `self - other`
    pub fn subtract(&self, other: &FloatImage) -> Self {
        debug_assert_eq!(self.data.len(), other.data.len());
        Self {
            width: self.width,
            height: self.height,
            data: self.data.iter().zip(&other.data).map(|(a, b)| a - b).collect(),
        }
    }

    /// Central-difference gradients `(dx, dy)` at an interior pixel
    #[inline]
    pub fn gradient(&self, x: usize, y: usize) -> (f32, f32) {
        let (x, y) = (x as isize, y as isize);
        let dx = self.get_reflect(x + 1, y) - self.get_reflect(x - 1, y);
        let dy = self.get_reflect(x, y + 1) - self.get_reflect(x, y - 1);
        (dx, dy)
    }
}

/// Normalized 1-D Gaussian kernel of radius `ceil(3 sigma)`
pub fn gaussian_kernel(sigma: f32) -> Vec<f32> {
    let radius = (3.0 * sigma).ceil().max(1.0) as usize;
    let two_sigma_sq = 2.0 * sigma * sigma;
    let mut kernel: Vec<f32> = (0..=2 * radius)
        .map(|i| {
            let x = i as f32 - radius as f32;
            (-x * x / two_sigma_sq).exp()
        })
        .collect();
    let sum: f32 = kernel.iter().sum();
    for w in &mut kernel {
        *w /= sum;
    }
    kernel
}

/// Separable Gaussian blur with mirrored borders
pub fn gaussian_blur(img: &FloatImage, sigma: f32) -> FloatImage {
    if sigma <= 0.0 {
        return img.clone();
    }
    let kernel = gaussian_kernel(sigma);
    let radius = (kernel.len() / 2) as isize;

    let mut temp = FloatImage::new(img.width, img.height);
    for y in 0..img.height {
        for x in 0..img.width {
            let mut sum = 0.0;
            for (k, w) in kernel.iter().enumerate() {
                sum += img.get_reflect(x as isize + k as isize - radius, y as isize) * w;
            }
            temp.put(x, y, sum);
        }
    }

    let mut out = FloatImage::new(img.width, img.height);
    for y in 0..img.height {
        for x in 0..img.width {
            let mut sum = 0.0;
            for (k, w) in kernel.iter().enumerate() {
                sum += temp.get_reflect(x as isize, y as isize + k as isize - radius) * w;
            }
            out.put(x, y, sum);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reflect101() {
        assert_eq!(reflect101(-1, 5), 1);
        assert_eq!(reflect101(-2, 5), 2);
        assert_eq!(reflect101(5, 5), 3);
        assert_eq!(reflect101(6, 5), 2);
        assert_eq!(reflect101(2, 5), 2);
        assert_eq!(reflect101(-3, 1), 0);
    }

    #[test]
    fn test_kernel_is_normalized_and_symmetric() {
        let k = gaussian_kernel(1.6);
        let sum: f32 = k.iter().sum();
        assert!((sum - 1.0).abs() < 1e-5);
        for i in 0..k.len() / 2 {
            assert!((k[i] - k[k.len() - 1 - i]).abs() < 1e-7);
        }
    }

    #[test]
    fn test_blur_spreads_impulse_and_keeps_mass() {
        let mut img = FloatImage::new(15, 15);
        img.put(7, 7, 1.0);
        let blurred = gaussian_blur(&img, 1.0);
        assert!(blurred.get(7, 7) < 1.0);
        assert!(blurred.get(8, 7) > 0.0);
        let total: f32 = blurred.data.iter().sum();
        assert!((total - 1.0).abs() < 1e-3);
    }

    #[test]
    fn test_bilinear_midpoint() {
        let mut img = FloatImage::new(2, 1);
        img.put(0, 0, 0.0);
        img.put(1, 0, 10.0);
        assert!((img.bilinear(0.5, 0.0) - 5.0).abs() < 1e-6);
    }
}
