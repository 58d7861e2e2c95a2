use featbench_core::{DescriptorFamily, Descriptors, FatalResult, Image, Keypoint};
use rayon::prelude::*;

use crate::extractor::ExtractionCapability;
use crate::sampling::{pack_bits, BinaryPattern, IntegralImage};

const PATTERN_SEED: u64 = 0x62_72_69_65_66;

/// Unoriented BRIEF over box-smoothed intensities
#[derive(Debug, Clone)]
pub struct BriefExtraction {
    pub bytes: usize,
    pub patch_size: f32,
    /// Side of the smoothing box around every test point
    pub kernel_size: u32,
    pattern: BinaryPattern,
}

impl Default for BriefExtraction {
    fn default() -> Self {
        Self::new(32, 48.0, 9)
    }
}

impl BriefExtraction {
    pub fn new(bytes: usize, patch_size: f32, kernel_size: u32) -> Self {
        Self {
            bytes,
            patch_size,
            kernel_size,
            pattern: BinaryPattern::gaussian(bytes * 8, patch_size, PATTERN_SEED),
        }
    }
}

impl ExtractionCapability for BriefExtraction {
    fn family(&self) -> DescriptorFamily {
        DescriptorFamily::Brief
    }

    fn compute(&self, image: &Image, keypoints: &[Keypoint]) -> FatalResult<Descriptors> {
        let integral = IntegralImage::new(image);
        let half = (self.kernel_size / 2) as f32;

        let rows: Vec<Vec<u8>> = keypoints
            .par_iter()
            .map(|kp| {
                let bits = self.pattern.pairs.iter().map(|[a, b]| {
                    let va = integral.box_mean(kp.x + a.0, kp.y + a.1, half);
                    let vb = integral.box_mean(kp.x + b.0, kp.y + b.1, half);
                    va < vb
                });
                pack_bits(bits, self.bytes)
            })
            .collect();

        Ok(Descriptors::Binary {
            bytes_per_row: self.bytes,
            data: rows.concat(),
        })
    }
}
