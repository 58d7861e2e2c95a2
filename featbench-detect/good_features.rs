use featbench_core::{FatalResult, FloatImage, Image};

use crate::capability::{Corner, GoodCorners, GoodCornersParams};
use crate::corner_detection::CornerDetector;
use crate::detector::ensure_non_empty;

/// Minimal-eigenvalue corner selection with a minimum-distance constraint
#[derive(Debug, Clone, Copy, Default)]
pub struct MinEigenCorners;

impl MinEigenCorners {
    /// Pixels that survive the quality threshold and are 3x3 local maxima,
    /// strongest first (ties keep row-major order)
    fn candidates(map: &FloatImage, quality_level: f32) -> Vec<Corner> {
        let max_value = map.data.iter().copied().fold(f32::MIN, f32::max);
        if !(max_value > 0.0) {
            return Vec::new();
        }
        let threshold = max_value * quality_level;

        let (w, h) = (map.width, map.height);
        let mut candidates = Vec::new();
        for y in 1..h.saturating_sub(1) {
            for x in 1..w.saturating_sub(1) {
                let v = map.get(x, y);
                if v <= threshold {
                    continue;
                }
                let mut is_max = true;
                'window: for dy in -1isize..=1 {
                    for dx in -1isize..=1 {
                        let n = map.get((x as isize + dx) as usize, (y as isize + dy) as usize);
                        if n > v {
                            is_max = false;
                            break 'window;
                        }
                    }
                }
                if is_max {
                    candidates.push(Corner {
                        x: x as f32,
                        y: y as f32,
                        score: v,
                    });
                }
            }
        }

        candidates.sort_by(|a, b| b.score.total_cmp(&a.score));
        candidates
    }

    /// Greedy acceptance on a grid of `min_distance` cells
    fn enforce_distance(candidates: Vec<Corner>, width: usize, height: usize, params: &GoodCornersParams) -> Vec<Corner> {
        let limit = if params.max_corners == 0 { usize::MAX } else { params.max_corners };
        let min_distance = params.min_distance;
        if min_distance < 1.0 {
            return candidates.into_iter().take(limit).collect();
        }

        let cell = min_distance.round().max(1.0) as usize;
        let grid_w = (width + cell - 1) / cell;
        let grid_h = (height + cell - 1) / cell;
        let mut grid: Vec<Vec<Corner>> = vec![Vec::new(); grid_w * grid_h];
        let min_distance_sq = min_distance * min_distance;

        let mut accepted = Vec::new();
        for corner in candidates {
            let cx = corner.x as usize / cell;
            let cy = corner.y as usize / cell;

            let x1 = cx.saturating_sub(1);
            let y1 = cy.saturating_sub(1);
            let x2 = (cx + 1).min(grid_w - 1);
            let y2 = (cy + 1).min(grid_h - 1);

            let mut good = true;
            'cells: for gy in y1..=y2 {
                for gx in x1..=x2 {
                    for other in &grid[gy * grid_w + gx] {
                        let dx = corner.x - other.x;
                        let dy = corner.y - other.y;
                        if dx * dx + dy * dy < min_distance_sq {
                            good = false;
                            break 'cells;
                        }
                    }
                }
            }

            if good {
                grid[cy * grid_w + cx].push(corner);
                accepted.push(corner);
                if accepted.len() >= limit {
                    break;
                }
            }
        }
        accepted
    }
}

impl GoodCorners for MinEigenCorners {
    fn good_corners(&self, image: &Image, params: &GoodCornersParams) -> FatalResult<Vec<Corner>> {
        ensure_non_empty(image)?;
        let map = if params.use_harris {
            CornerDetector::harris_map(image, params.block_size, 3, params.k)
        } else {
            CornerDetector::min_eigen_map(image, params.block_size, 3)
        };
        let candidates = Self::candidates(&map, params.quality_level);
        log::trace!("{} corner candidates above quality threshold", candidates.len());
        Ok(Self::enforce_distance(candidates, map.width, map.height, params))
    }
}
