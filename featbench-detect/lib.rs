//! Keypoint detection strategies.
//!
//! Corner-grid detectors ([`ShiTomasiDetector`], [`HarrisDetector`]) carry
//! their own selection glue and delegate the numerics to capabilities;
//! every other family is wrapped by [`ModernDetector`]. All of them are
//! resolved once per run through [`build_detector`].

pub mod akaze;
pub mod brisk;
pub mod capability;
pub mod config;
pub mod corner_detection;
pub mod detector;
pub mod fast;
pub mod good_features;
pub mod orb;
pub mod pyramid;
pub mod sift;
pub mod suppression;
pub mod utils;

pub use akaze::AkazeDetection;
pub use brisk::BriskDetection;
pub use capability::{
    BuiltinDetection, Corner, CornerResponse, DetectionCapability, DetectionProvider, GoodCorners,
    GoodCornersParams, HarrisResponse,
};
pub use config::{HarrisConfig, ShiTomasiConfig};
pub use corner_detection::{CornerDetector, ScoredCorner};
pub use detector::{
    build_detector, detect_timed, normalize_to_u8, Detector, HarrisDetector, ModernDetector, ShiTomasiDetector,
};
pub use fast::FastDetection;
pub use good_features::MinEigenCorners;
pub use orb::{intensity_centroid_angle, OrbDetection};
pub use pyramid::{ImagePyramid, PyramidLevel};
pub use sift::SiftDetection;
pub use suppression::{Insertion, KeypointSuppression};
