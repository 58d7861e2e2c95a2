use featbench_core::{FloatImage, Image};
use rayon::prelude::*;

use crate::utils::has_consecutive_bits;

/// Segment-test corner with its FAST score
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredCorner {
    pub x: u32,
    pub y: u32,
    pub score: f32,
}

/// Corner detection algorithms (FAST segment test and gradient based responses)
pub struct CornerDetector;

impl CornerDetector {
    /// Bresenham circle of radius 3, walked clockwise from the top
    pub const FAST_OFFSETS: [(i32, i32); 16] = [
        (0, -3), (1, -3), (2, -2), (3, -1),
        (3, 0), (3, 1), (2, 2), (1, 3),
        (0, 3), (-1, 3), (-2, 2), (-3, 1),
        (-3, 0), (-3, -1), (-2, -2), (-1, -3),
    ];

    /// Contiguous arc length of the FAST-9/16 test
    pub const ARC_LENGTH: usize = 9;

    #[inline]
    fn circle(img: &Image, x: u32, y: u32) -> [i16; 16] {
        let mut circle = [0i16; 16];
        for (c, &(dx, dy)) in circle.iter_mut().zip(Self::FAST_OFFSETS.iter()) {
            let px = (x as i32 + dx) as u32;
            let py = (y as i32 + dy) as u32;
            *c = img.get_pixel(px, py).0[0] as i16;
        }
        circle
    }

    #[inline]
    fn passes(circle: &[i16; 16], center: i16, threshold: i16) -> bool {
        let mut brighter = 0u16;
        let mut darker = 0u16;
        for (i, &p) in circle.iter().enumerate() {
            if p > center + threshold {
                brighter |= 1 << i;
            } else if p < center - threshold {
                darker |= 1 << i;
            }
        }
        has_consecutive_bits(brighter, Self::ARC_LENGTH) || has_consecutive_bits(darker, Self::ARC_LENGTH)
    }

    /// Segment test at `(x, y)`; the pixel must be at least 3 px from every border
    pub fn is_fast_corner(img: &Image, x: u32, y: u32, threshold: u8) -> bool {
        let center = img.get_pixel(x, y).0[0] as i16;
        Self::passes(&Self::circle(img, x, y), center, threshold as i16)
    }

    /// Largest threshold for which the pixel still passes the segment test
    pub fn fast_score(img: &Image, x: u32, y: u32, threshold: u8) -> u8 {
        let circle = Self::circle(img, x, y);
        let center = img.get_pixel(x, y).0[0] as i16;

        let mut lo = threshold as i16;
        let mut hi = 255i16;
        while hi > lo {
            let mid = (lo + hi + 1) / 2;
            if Self::passes(&circle, center, mid) {
                lo = mid;
            } else {
                hi = mid - 1;
            }
        }
        lo as u8
    }

    /// Scan every pixel at least `border` px inside the image, in parallel rows
    pub fn fast_corners(img: &Image, threshold: u8, border: u32) -> Vec<ScoredCorner> {
        let (width, height) = img.dimensions();
        let border = border.max(3);
        if width <= 2 * border || height <= 2 * border {
            return Vec::new();
        }

        (border..height - border)
            .into_par_iter()
            .flat_map_iter(|y| {
                (border..width - border).filter_map(move |x| {
                    if Self::is_fast_corner(img, x, y, threshold) {
                        Some(ScoredCorner {
                            x,
                            y,
                            score: Self::fast_score(img, x, y, threshold) as f32,
                        })
                    } else {
                        None
                    }
                })
            })
            .collect()
    }

    /// Keep corners whose score is not beaten by any 8-neighbor corner
    pub fn nonmax_suppression_3x3(corners: &[ScoredCorner], width: u32, height: u32) -> Vec<ScoredCorner> {
        let mut scores = vec![0.0f32; (width * height) as usize];
        for c in corners {
            scores[(c.y * width + c.x) as usize] = c.score;
        }

        corners
            .iter()
            .filter(|c| {
                for dy in -1i32..=1 {
                    for dx in -1i32..=1 {
                        if dx == 0 && dy == 0 {
                            continue;
                        }
                        let nx = c.x as i32 + dx;
                        let ny = c.y as i32 + dy;
                        if nx < 0 || ny < 0 || nx >= width as i32 || ny >= height as i32 {
                            continue;
                        }
                        let other = scores[(ny as u32 * width + nx as u32) as usize];
                        // ties go to the neighbor that comes first in raster order
                        let earlier = dy < 0 || (dy == 0 && dx < 0);
                        if other > c.score || (other == c.score && earlier) {
                            return false;
                        }
                    }
                }
                true
            })
            .copied()
            .collect()
    }

    /// 3x3 Sobel derivatives with mirrored borders, scaled by `scale`
    pub fn sobel(img: &FloatImage, scale: f32) -> (FloatImage, FloatImage) {
        let (w, h) = (img.width, img.height);
        let pairs: Vec<(f32, f32)> = (0..h)
            .into_par_iter()
            .flat_map_iter(|y| {
                (0..w).map(move |x| {
                    let (x, y) = (x as isize, y as isize);
                    let p = |dx: isize, dy: isize| img.get_reflect(x + dx, y + dy);

                    let gx = p(1, -1) + 2.0 * p(1, 0) + p(1, 1) - p(-1, -1) - 2.0 * p(-1, 0) - p(-1, 1);
                    let gy = p(-1, 1) + 2.0 * p(0, 1) + p(1, 1) - p(-1, -1) - 2.0 * p(0, -1) - p(1, -1);
                    (gx * scale, gy * scale)
                })
            })
            .collect();

        let mut gx = FloatImage::new(w, h);
        let mut gy = FloatImage::new(w, h);
        for (i, (dx, dy)) in pairs.into_iter().enumerate() {
            gx.data[i] = dx;
            gy.data[i] = dy;
        }
        (gx, gy)
    }

    /// Unnormalized box sum over a `block` x `block` window anchored at its center
    pub fn box_sum(img: &FloatImage, block: usize) -> FloatImage {
        let start = -((block / 2) as isize);
        let end = start + block as isize;
        let (w, h) = (img.width, img.height);

        let mut rows = FloatImage::new(w, h);
        for y in 0..h {
            for x in 0..w {
                let sum: f32 = (start..end).map(|d| img.get_reflect(x as isize + d, y as isize)).sum();
                rows.put(x, y, sum);
            }
        }

        let mut out = FloatImage::new(w, h);
        for y in 0..h {
            for x in 0..w {
                let sum: f32 = (start..end).map(|d| rows.get_reflect(x as isize, y as isize + d)).sum();
                out.put(x, y, sum);
            }
        }
        out
    }

    /// Windowed structure tensor components `(sum Ix^2, sum IxIy, sum Iy^2)`
    pub fn structure_tensor(img: &Image, block_size: usize, aperture: usize) -> (FloatImage, FloatImage, FloatImage) {
        let scale = 1.0 / ((1u32 << (aperture.max(3) - 1)) as f32 * block_size as f32 * 255.0);
        let (gx, gy) = Self::sobel(&FloatImage::from_gray(img, 1.0), scale);

        let mut xx = FloatImage::new(gx.width, gx.height);
        let mut xy = FloatImage::new(gx.width, gx.height);
        let mut yy = FloatImage::new(gx.width, gx.height);
        for i in 0..gx.data.len() {
            let (dx, dy) = (gx.data[i], gy.data[i]);
            xx.data[i] = dx * dx;
            xy.data[i] = dx * dy;
            yy.data[i] = dy * dy;
        }

        (
            Self::box_sum(&xx, block_size),
            Self::box_sum(&xy, block_size),
            Self::box_sum(&yy, block_size),
        )
    }

    /// Dense Harris response `det(M) - k * trace(M)^2`
    pub fn harris_map(img: &Image, block_size: usize, aperture: usize, k: f32) -> FloatImage {
        let (a, b, c) = Self::structure_tensor(img, block_size, aperture);
        let mut out = FloatImage::new(a.width, a.height);
        for i in 0..out.data.len() {
            let det = a.data[i] * c.data[i] - b.data[i] * b.data[i];
            let trace = a.data[i] + c.data[i];
            out.data[i] = det - k * trace * trace;
        }
        out
    }

    /// Dense minimal eigenvalue of the structure tensor
    pub fn min_eigen_map(img: &Image, block_size: usize, aperture: usize) -> FloatImage {
        let (a, b, c) = Self::structure_tensor(img, block_size, aperture);
        let mut out = FloatImage::new(a.width, a.height);
        for i in 0..out.data.len() {
            let half_a = a.data[i] * 0.5;
            let half_c = c.data[i] * 0.5;
            let diff = half_a - half_c;
            out.data[i] = (half_a + half_c) - (diff * diff + b.data[i] * b.data[i]).sqrt();
        }
        out
    }

    /// Harris score of a single pixel from a 7x7 gradient window; used to rank
    /// segment-test corners
    pub fn harris_score_at(img: &FloatImage, x: usize, y: usize, k: f32) -> f32 {
        let (mut a, mut b, mut c) = (0.0f32, 0.0f32, 0.0f32);
        for dy in -3isize..=3 {
            for dx in -3isize..=3 {
                let (px, py) = (x as isize + dx, y as isize + dy);
                let p = |ox: isize, oy: isize| img.get_reflect(px + ox, py + oy);
                let gx = p(1, -1) + 2.0 * p(1, 0) + p(1, 1) - p(-1, -1) - 2.0 * p(-1, 0) - p(-1, 1);
                let gy = p(-1, 1) + 2.0 * p(0, 1) + p(1, 1) - p(-1, -1) - 2.0 * p(0, -1) - p(1, -1);
                a += gx * gx;
                b += gx * gy;
                c += gy * gy;
            }
        }
        a * c - b * b - k * (a + c) * (a + c)
    }
}
