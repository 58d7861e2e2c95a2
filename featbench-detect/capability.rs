//! Capability interfaces the detector strategies delegate to.
//!
//! A [`DetectionProvider`] hands out one capability per family. The
//! strategies in [`crate::detector`] resolve their capability once at
//! construction, so swapping the provider (for instance with a counting spy
//! in tests) changes every detector built from it.

use featbench_core::{DetectorFamily, FatalResult, FloatImage, Image, Keypoint};

use crate::akaze::AkazeDetection;
use crate::brisk::BriskDetection;
use crate::corner_detection::CornerDetector;
use crate::fast::FastDetection;
use crate::good_features::MinEigenCorners;
use crate::orb::OrbDetection;
use crate::sift::SiftDetection;

/// Corner location returned by a [`GoodCorners`] capability
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Corner {
    pub x: f32,
    pub y: f32,
    /// Quality measure the corner was ranked by
    pub score: f32,
}

/// Parameters of a good-corners query
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GoodCornersParams {
    pub max_corners: usize,
    /// Fraction of the best corner quality a corner must reach
    pub quality_level: f32,
    /// Minimum pairwise distance between returned corners
    pub min_distance: f32,
    pub block_size: usize,
    /// Rank with the Harris measure instead of the minimal eigenvalue
    pub use_harris: bool,
    pub k: f32,
}

/// Returns up to `max_corners` corners ranked by quality, pairwise at least
/// `min_distance` apart
pub trait GoodCorners: Send + Sync {
    fn good_corners(&self, image: &Image, params: &GoodCornersParams) -> FatalResult<Vec<Corner>>;
}

/// Dense corner response map with the same dimensions as the input image
pub trait CornerResponse: Send + Sync {
    fn corner_response(&self, image: &Image, block_size: usize, aperture: usize, k: f32) -> FatalResult<FloatImage>;
}

/// Self-contained keypoint detector of a single family
pub trait DetectionCapability: Send + Sync {
    fn family(&self) -> DetectorFamily;
    fn detect(&self, image: &Image) -> FatalResult<Vec<Keypoint>>;
}

/// Source of every detection capability the strategies need
pub trait DetectionProvider: Send + Sync {
    fn good_corners(&self) -> FatalResult<Box<dyn GoodCorners>>;
    fn corner_response(&self) -> FatalResult<Box<dyn CornerResponse>>;
    /// Capability for a delegated family; corner-grid families are rejected
    fn modern(&self, family: DetectorFamily) -> FatalResult<Box<dyn DetectionCapability>>;
}

/// Harris response computed from Sobel gradients
#[derive(Debug, Clone, Copy, Default)]
pub struct HarrisResponse;

impl CornerResponse for HarrisResponse {
    fn corner_response(&self, image: &Image, block_size: usize, aperture: usize, k: f32) -> FatalResult<FloatImage> {
        crate::detector::ensure_non_empty(image)?;
        Ok(CornerDetector::harris_map(image, block_size, aperture, k))
    }
}

/// The implementations shipped with this crate
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinDetection;

impl DetectionProvider for BuiltinDetection {
    fn good_corners(&self) -> FatalResult<Box<dyn GoodCorners>> {
        Ok(Box::new(MinEigenCorners))
    }

    fn corner_response(&self) -> FatalResult<Box<dyn CornerResponse>> {
        Ok(Box::new(HarrisResponse))
    }

    fn modern(&self, family: DetectorFamily) -> FatalResult<Box<dyn DetectionCapability>> {
        match family {
            DetectorFamily::Fast => Ok(Box::new(FastDetection::default())),
            DetectorFamily::Brisk => Ok(Box::new(BriskDetection::default())),
            DetectorFamily::Orb => Ok(Box::new(OrbDetection::default())),
            DetectorFamily::Akaze => Ok(Box::new(AkazeDetection::default())),
            DetectorFamily::Sift => Ok(Box::new(SiftDetection::default())),
            DetectorFamily::ShiTomasi | DetectorFamily::Harris => Err(featbench_core::FatalError::UnsupportedFamily(
                format!("{} is a corner-grid detector, not a delegated family", family),
            )),
        }
    }
}
