use featbench_core::Image;

/// One level of an image pyramid
#[derive(Debug, Clone)]
pub struct PyramidLevel {
    pub level: usize,
    /// Factor mapping level coordinates back to the base image
    pub scale: f32,
    pub image: Image,
}

/// Image pyramid operations for multi-scale feature detection
pub struct ImagePyramid;

impl ImagePyramid {
    /// Build up to `max_levels` levels, each `scale_factor` smaller than the
    /// previous one; stops early once a side drops below `min_size`
    pub fn build(img: &Image, max_levels: usize, scale_factor: f32, min_size: u32) -> Vec<PyramidLevel> {
        let (width, height) = img.dimensions();
        let mut levels = Vec::with_capacity(max_levels);
        let mut scale = 1.0f32;

        for level in 0..max_levels {
            let scaled_width = (width as f32 / scale).round() as u32;
            let scaled_height = (height as f32 / scale).round() as u32;
            if scaled_width < min_size || scaled_height < min_size {
                break;
            }

            let image = if level == 0 {
                img.clone()
            } else {
                Self::downsample(img, scaled_width, scaled_height)
            };
            levels.push(PyramidLevel { level, scale, image });
            scale *= scale_factor;
        }

        log::trace!("built {} pyramid levels for {}x{} image", levels.len(), width, height);
        levels
    }

    /// Downsample image using bilinear interpolation
    pub fn downsample(img: &Image, target_width: u32, target_height: u32) -> Image {
        let (src_width, src_height) = img.dimensions();
        let x_ratio = src_width as f32 / target_width as f32;
        let y_ratio = src_height as f32 / target_height as f32;

        Image::from_fn(target_width, target_height, |x, y| {
            let src_x = (x as f32 + 0.5) * x_ratio - 0.5;
            let src_y = (y as f32 + 0.5) * y_ratio - 0.5;
            image::Luma([Self::bilinear_sample(img, src_x, src_y).round().clamp(0.0, 255.0) as u8])
        })
    }

    /// Sample image at fractional coordinates using bilinear interpolation
    fn bilinear_sample(img: &Image, x: f32, y: f32) -> f32 {
        let (width, height) = img.dimensions();
        let x = x.clamp(0.0, (width - 1) as f32);
        let y = y.clamp(0.0, (height - 1) as f32);
        let x1 = x.floor() as u32;
        let y1 = y.floor() as u32;
        let x2 = (x1 + 1).min(width - 1);
        let y2 = (y1 + 1).min(height - 1);

        let fx = x - x1 as f32;
        let fy = y - y1 as f32;

        let p = |px: u32, py: u32| img.get_pixel(px, py).0[0] as f32;
        let top = p(x1, y1) * (1.0 - fx) + p(x2, y1) * fx;
        let bottom = p(x1, y2) * (1.0 - fx) + p(x2, y2) * fx;
        top * (1.0 - fy) + bottom * fy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levels_shrink_by_factor() {
        let img = Image::from_pixel(200, 100, image::Luma([7]));
        let levels = ImagePyramid::build(&img, 8, 1.2, 32);
        assert!(levels.len() > 1 && levels.len() <= 8);
        assert_eq!(levels[0].image.dimensions(), (200, 100));
        assert_eq!(levels[1].image.dimensions(), (167, 83));
        for pair in levels.windows(2) {
            assert!(pair[1].scale > pair[0].scale);
            assert!(pair[1].image.width() < pair[0].image.width());
        }
        assert!(levels.iter().all(|l| l.image.height() >= 32));
    }

    #[test]
    fn test_downsample_preserves_constant_image() {
        let img = Image::from_pixel(50, 40, image::Luma([123]));
        let small = ImagePyramid::downsample(&img, 25, 20);
        assert!(small.pixels().all(|p| p.0[0] == 123));
    }
}
