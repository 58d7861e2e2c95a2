use featbench_core::{DescriptorFamily, Descriptors, FatalResult, Image, Keypoint};
use featbench_detect::AkazeDetection;
use log::debug;

use crate::extractor::ExtractionCapability;

/// MLDB descriptor row width in bytes
pub const AKAZE_BYTES: usize = 64;
/// Largest distance at which an input keypoint is considered the same
/// feature as a re-extracted one
const POSITION_TOLERANCE: f32 = 0.5;
/// Relative size difference still treated as the same scale
const SIZE_TOLERANCE: f32 = 1e-3;

/// AKAZE descriptors for keypoints found by the AKAZE detector.
///
/// MLDB needs the nonlinear scale-space metadata of each keypoint, so the
/// image is re-extracted and every input keypoint is looked up by position,
/// octave and size.
/// Keypoints without a counterpart get no row, which the alignment check in
/// [`crate::extract`] reports as fatal.
#[derive(Debug, Clone, Copy, Default)]
pub struct AkazeExtraction {
    pub detection: AkazeDetection,
}

impl ExtractionCapability for AkazeExtraction {
    fn family(&self) -> DescriptorFamily {
        DescriptorFamily::Akaze
    }

    fn compute(&self, image: &Image, keypoints: &[Keypoint]) -> FatalResult<Descriptors> {
        if keypoints.is_empty() {
            return Ok(Descriptors::empty_binary(AKAZE_BYTES));
        }
        let (found, descriptors) = self.detection.extract_features(image);

        let mut data = Vec::with_capacity(keypoints.len() * AKAZE_BYTES);
        let mut dropped = 0usize;
        for kp in keypoints {
            match counterpart(&found, kp) {
                Some(i) => data.extend_from_slice(&descriptors[i].bytes()[..]),
                None => dropped += 1,
            }
        }
        if dropped > 0 {
            debug!("AKAZE: {} of {} keypoints have no AKAZE metadata", dropped, keypoints.len());
        }

        Ok(Descriptors::Binary {
            bytes_per_row: AKAZE_BYTES,
            data,
        })
    }
}

/// Index of the re-extracted keypoint on the same octave and scale that lies
/// nearest to `kp`; features sharing a position across octaves stay distinct
fn counterpart(found: &[Keypoint], kp: &Keypoint) -> Option<usize> {
    found
        .iter()
        .enumerate()
        .filter(|(_, other)| {
            other.octave == kp.octave && (other.size - kp.size).abs() <= SIZE_TOLERANCE * kp.size.max(1.0)
        })
        .map(|(i, other)| (i, kp.distance_to(other)))
        .filter(|(_, d)| *d <= POSITION_TOLERANCE)
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(i, _)| i)
}
