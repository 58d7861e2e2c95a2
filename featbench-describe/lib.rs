//! Descriptor extraction for the feature benchmark.
//!
//! Every family implements [`ExtractionCapability`]; [`extract`] wraps a
//! capability call with timing and the row/keypoint alignment check.

pub mod akaze;
pub mod brief;
pub mod brisk;
pub mod extractor;
pub mod freak;
pub mod orb;
pub mod sampling;
pub mod sift;

pub use akaze::AkazeExtraction;
pub use brief::BriefExtraction;
pub use brisk::BriskExtraction;
pub use extractor::{extract, BuiltinExtraction, ExtractionCapability, ExtractionProvider};
pub use freak::FreakExtraction;
pub use orb::OrbExtraction;
pub use sampling::{BinaryPattern, IntegralImage};
pub use sift::SiftExtraction;
