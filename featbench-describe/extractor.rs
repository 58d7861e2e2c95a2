use featbench_core::{time_ms, DescriptorFamily, Descriptors, FatalError, FatalResult, Image, Keypoint};
use log::debug;

use crate::akaze::AkazeExtraction;
use crate::brief::BriefExtraction;
use crate::brisk::BriskExtraction;
use crate::freak::FreakExtraction;
use crate::orb::OrbExtraction;
use crate::sift::SiftExtraction;

/// Computes one descriptor row per keypoint of a single family
pub trait ExtractionCapability: Send + Sync {
    fn family(&self) -> DescriptorFamily;
    fn compute(&self, image: &Image, keypoints: &[Keypoint]) -> FatalResult<Descriptors>;
}

/// Source of extraction capabilities, resolved once per run
pub trait ExtractionProvider: Send + Sync {
    fn extraction(&self, family: DescriptorFamily) -> FatalResult<Box<dyn ExtractionCapability>>;
}

/// Run `capability` and check that every keypoint received exactly one row.
///
/// Only the `compute` call is timed. A capability that silently drops
/// keypoints would break the row/keypoint correspondence the matcher relies
/// on, so a count mismatch is fatal for the run.
pub fn extract(
    capability: &dyn ExtractionCapability,
    image: &Image,
    keypoints: &[Keypoint],
) -> FatalResult<(Descriptors, f64)> {
    let (descriptors, elapsed) = time_ms(|| capability.compute(image, keypoints));
    let descriptors = descriptors?;

    if descriptors.rows() != keypoints.len() {
        return Err(FatalError::DescriptorCountMismatch {
            family: capability.family(),
            keypoints: keypoints.len(),
            rows: descriptors.rows(),
        });
    }

    debug!(
        "{} descriptor extraction: {} rows x {} in {:.3} ms",
        capability.family(),
        descriptors.rows(),
        descriptors.width(),
        elapsed
    );
    Ok((descriptors, elapsed))
}

/// The extractors shipped with this crate
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinExtraction;

impl ExtractionProvider for BuiltinExtraction {
    fn extraction(&self, family: DescriptorFamily) -> FatalResult<Box<dyn ExtractionCapability>> {
        Ok(match family {
            DescriptorFamily::Brisk => Box::new(BriskExtraction::default()),
            DescriptorFamily::Brief => Box::new(BriefExtraction::default()),
            DescriptorFamily::Orb => Box::new(OrbExtraction::default()),
            DescriptorFamily::Freak => Box::new(FreakExtraction::default()),
            DescriptorFamily::Akaze => Box::new(AkazeExtraction::default()),
            DescriptorFamily::Sift => Box::new(SiftExtraction::default()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Returns `rows` rows no matter how many keypoints it is given
    struct FixedRows {
        rows: usize,
        calls: AtomicUsize,
    }

    impl ExtractionCapability for FixedRows {
        fn family(&self) -> DescriptorFamily {
            DescriptorFamily::Brief
        }

        fn compute(&self, _image: &Image, _keypoints: &[Keypoint]) -> FatalResult<Descriptors> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Descriptors::Binary {
                bytes_per_row: 4,
                data: vec![0; 4 * self.rows],
            })
        }
    }

    fn keypoints(n: usize) -> Vec<Keypoint> {
        (0..n).map(|i| Keypoint::new(i as f32, 1.0, 7.0)).collect()
    }

    #[test]
    fn test_aligned_rows_pass() {
        let cap = FixedRows {
            rows: 3,
            calls: AtomicUsize::new(0),
        };
        let (desc, ms) = extract(&cap, &Image::new(8, 8), &keypoints(3)).unwrap();
        assert_eq!(desc.rows(), 3);
        assert!(ms >= 0.0);
        assert_eq!(cap.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_dropped_rows_are_fatal() {
        let cap = FixedRows {
            rows: 2,
            calls: AtomicUsize::new(0),
        };
        let err = extract(&cap, &Image::new(8, 8), &keypoints(3)).unwrap_err();
        match err {
            FatalError::DescriptorCountMismatch { family, keypoints, rows } => {
                assert_eq!(family, DescriptorFamily::Brief);
                assert_eq!(keypoints, 3);
                assert_eq!(rows, 2);
            }
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn test_builtin_provider_covers_every_family() {
        for family in DescriptorFamily::ALL {
            let cap = BuiltinExtraction.extraction(family).unwrap();
            assert_eq!(cap.family(), family);
        }
    }
}
