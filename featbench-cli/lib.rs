//! Benchmark harness: runs every compatible detector/descriptor pair over an
//! image sequence and reports keypoint counts, timings and match counts.

pub mod pipeline;
pub mod registry;
pub mod report;
pub mod source;
pub mod sweep;
pub mod visualize;

pub use featbench_core::{self, BenchConfig, DescriptorFamily, DetectorFamily};
pub use pipeline::Pipeline;
pub use registry::CapabilityRegistry;
pub use report::{CsvReport, MemoryReport, ReportSink, ResultRow};
pub use source::{FileSequence, ImageSource, InMemorySequence};
pub use sweep::{CompatibilityRules, Sweep, SweepSummary};
pub use visualize::{MatchImageWriter, VisualizationSink};
