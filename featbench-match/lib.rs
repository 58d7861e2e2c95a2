//! Descriptor matching between consecutive frames.
//!
//! [`DescriptorMatcher`] combines a search backend (exhaustive or kd-tree)
//! with a selection rule (nearest neighbour or two nearest plus ratio test).

pub mod matcher;
pub mod metric;
pub mod search;

pub use matcher::{passes_ratio_test, DescriptorMatcher};
pub use metric::{l2, l2_squared};
pub use search::{KdTree, Neighbor, MAX_BINARY_BYTES};
