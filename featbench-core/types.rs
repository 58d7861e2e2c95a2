#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Row-major 8-bit grayscale image
pub type Image = image::GrayImage;

/// Point of interest in image coordinates.
///
/// Follows the usual keypoint conventions: `size` is the diameter of the
/// meaningful neighborhood, `angle` is in degrees and stays 0 for detectors
/// that do not estimate an orientation.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Keypoint {
    pub x: f32,
    pub y: f32,
    pub size: f32,
    pub angle: f32,
    /// Detector strength, synthetic for detectors without a native score
    pub response: f32,
    /// Pyramid level the keypoint was found on
    pub octave: i32,
}

impl Keypoint {
    pub fn new(x: f32, y: f32, size: f32) -> Self {
        Self {
            x,
            y,
            size,
            angle: 0.0,
            response: 0.0,
            octave: 0,
        }
    }

    pub fn with_response(mut self, response: f32) -> Self {
        self.response = response;
        self
    }

    pub fn with_angle(mut self, angle: f32) -> Self {
        self.angle = angle;
        self
    }

    pub fn with_octave(mut self, octave: i32) -> Self {
        self.octave = octave;
        self
    }

    /// Euclidean distance between the two keypoint centers
    pub fn distance_to(&self, other: &Keypoint) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// Overlap ratio of the two keypoint circles.
    ///
    /// Intersection over union of the circles of diameter `size`. When one
    /// circle lies completely inside the other the ratio of their areas is
    /// returned, and 0 when they do not touch.
    pub fn overlap(&self, other: &Keypoint) -> f32 {
        let a = self.size * 0.5;
        let b = other.size * 0.5;
        let a_2 = a * a;
        let b_2 = b * b;
        let c = self.distance_to(other);

        if a.min(b) + c <= a.max(b) {
            let larger = a_2.max(b_2);
            if larger == 0.0 {
                return 0.0;
            }
            return a_2.min(b_2) / larger;
        }

        if c >= a + b {
            return 0.0;
        }

        let c_2 = c * c;
        let cos_alpha = ((b_2 + c_2 - a_2) / (other.size * c)).clamp(-1.0, 1.0);
        let cos_beta = ((a_2 + c_2 - b_2) / (self.size * c)).clamp(-1.0, 1.0);
        let alpha = cos_alpha.acos();
        let beta = cos_beta.acos();

        let segment_a = a_2 * beta;
        let segment_b = b_2 * alpha;
        let triangle_a = a_2 * beta.sin() * cos_beta;
        let triangle_b = b_2 * alpha.sin() * cos_alpha;

        let intersection = segment_a + segment_b - triangle_a - triangle_b;
        let union = (a_2 + b_2) * std::f32::consts::PI - intersection;
        intersection / union
    }
}

/// Correspondence between keypoint `query_idx` of the previous frame and
/// keypoint `train_idx` of the current frame
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Match {
    pub query_idx: usize,
    pub train_idx: usize,
    pub distance: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disjoint_circles_do_not_overlap() {
        let a = Keypoint::new(0.0, 0.0, 6.0);
        let b = Keypoint::new(6.0, 0.0, 6.0);
        assert_eq!(a.overlap(&b), 0.0);
        assert_eq!(b.overlap(&a), 0.0);
    }

    #[test]
    fn test_identical_circles_overlap_fully() {
        let a = Keypoint::new(10.0, 10.0, 6.0);
        assert!((a.overlap(&a) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_contained_circle_uses_area_ratio() {
        let outer = Keypoint::new(0.0, 0.0, 8.0);
        let inner = Keypoint::new(0.5, 0.0, 4.0);
        assert!((outer.overlap(&inner) - 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_partial_overlap_is_symmetric_and_bounded() {
        let a = Keypoint::new(0.0, 0.0, 6.0);
        let b = Keypoint::new(3.0, 1.0, 6.0);
        let ab = a.overlap(&b);
        let ba = b.overlap(&a);
        assert!(ab > 0.0 && ab < 1.0);
        assert!((ab - ba).abs() < 1e-5);
    }

    #[test]
    fn test_closer_circles_overlap_more() {
        let a = Keypoint::new(0.0, 0.0, 6.0);
        let near = Keypoint::new(1.0, 0.0, 6.0);
        let far = Keypoint::new(4.0, 0.0, 6.0);
        assert!(a.overlap(&near) > a.overlap(&far));
    }
}
