//! Shared building blocks of the feature benchmark: keypoints, descriptor
//! matrices, the bounded frame buffer, the region-of-interest filter and the
//! benchmark configuration.

pub mod config;
pub mod descriptor;
pub mod error;
pub mod family;
pub mod frame;
pub mod raster;
pub mod roi;
pub mod timer;
pub mod types;

pub use config::{BenchConfig, ImageSequenceConfig};
pub use descriptor::Descriptors;
pub use error::{FatalError, FatalResult, PipelineError, PipelineResult};
pub use family::{DescriptorClass, DescriptorFamily, DetectorFamily, MatcherKind, SelectorKind};
pub use frame::{Frame, FrameStore};
pub use raster::{gaussian_blur, FloatImage};
pub use roi::{Rect, RoiFilter};
pub use timer::{time_ms, ScopedTimer};
pub use types::{Image, Keypoint, Match};

/// Initialize Rayon thread pool with the specified number of threads
pub fn init_thread_pool(n_threads: usize) -> Result<(), rayon::ThreadPoolBuildError> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(n_threads)
        .build_global()
}
