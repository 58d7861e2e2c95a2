use std::path::PathBuf;

use featbench_core::{FatalError, FatalResult, Frame, Match};
use image::{DynamicImage, Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_circle_mut, draw_line_segment_mut};
use log::debug;

/// Receives every matched frame pair of a run
pub trait VisualizationSink: Send + Sync {
    fn show(&self, label: &str, index: usize, previous: &Frame, current: &Frame, matches: &[Match]) -> FatalResult<()>;
}

const KEYPOINT_COLOR: Rgb<u8> = Rgb([255, 0, 0]);
const MATCH_COLOR: Rgb<u8> = Rgb([0, 255, 0]);

/// Writes side-by-side match images as PNG files into a directory
#[derive(Debug, Clone)]
pub struct MatchImageWriter {
    dir: PathBuf,
}

impl MatchImageWriter {
    pub fn new<P: Into<PathBuf>>(dir: P) -> FatalResult<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// Previous frame on the left, current frame on the right, keypoints as
    /// circles of their size and matches as lines between them
    pub fn render(previous: &Frame, current: &Frame, matches: &[Match]) -> RgbImage {
        let left = DynamicImage::ImageLuma8(previous.image.clone()).to_rgb8();
        let right = DynamicImage::ImageLuma8(current.image.clone()).to_rgb8();
        let offset = left.width();
        let mut canvas = RgbImage::new(offset + right.width(), left.height().max(right.height()));
        image::imageops::replace(&mut canvas, &left, 0, 0);
        image::imageops::replace(&mut canvas, &right, offset as i64, 0);

        let circle = |canvas: &mut RgbImage, x: f32, y: f32, size: f32| {
            let radius = (size * 0.5).round().max(1.0) as i32;
            draw_hollow_circle_mut(canvas, (x.round() as i32, y.round() as i32), radius, KEYPOINT_COLOR);
        };
        for kp in &previous.keypoints {
            circle(&mut canvas, kp.x, kp.y, kp.size);
        }
        for kp in &current.keypoints {
            circle(&mut canvas, kp.x + offset as f32, kp.y, kp.size);
        }

        for m in matches {
            let (Some(a), Some(b)) = (previous.keypoints.get(m.query_idx), current.keypoints.get(m.train_idx)) else {
                continue;
            };
            draw_line_segment_mut(&mut canvas, (a.x, a.y), (b.x + offset as f32, b.y), MATCH_COLOR);
        }
        canvas
    }
}

impl VisualizationSink for MatchImageWriter {
    fn show(&self, label: &str, index: usize, previous: &Frame, current: &Frame, matches: &[Match]) -> FatalResult<()> {
        let path = self.dir.join(format!("{}_{:04}.png", label, index));
        Self::render(previous, current, matches)
            .save(&path)
            .map_err(|e| FatalError::Report(std::io::Error::new(std::io::ErrorKind::Other, e.to_string())))?;
        debug!("wrote {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use featbench_core::{Image, Keypoint};

    #[test]
    fn test_render_places_frames_side_by_side() {
        let mut previous = Frame::new(Image::from_pixel(20, 10, image::Luma([0])));
        previous.keypoints = vec![Keypoint::new(5.0, 5.0, 4.0)];
        let mut current = Frame::new(Image::from_pixel(20, 12, image::Luma([0])));
        current.keypoints = vec![Keypoint::new(5.0, 5.0, 4.0)];
        let matches = [Match {
            query_idx: 0,
            train_idx: 0,
            distance: 0.0,
        }];

        let canvas = MatchImageWriter::render(&previous, &current, &matches);
        assert_eq!(canvas.dimensions(), (40, 12));
        // the match line crosses the seam between the frames
        assert_eq!(*canvas.get_pixel(15, 5), MATCH_COLOR);
    }
}
