use thiserror::Error;

use crate::family::{DescriptorClass, DescriptorFamily, DetectorFamily};

/// Errors that abort the current (detector, descriptor) run.
///
/// The sweep isolates these per pair: the failing pair produces no rows and
/// the next combination is started.
#[derive(Debug, Error)]
pub enum FatalError {
    #[error("{family} returned {rows} descriptor rows for {keypoints} keypoints")]
    DescriptorCountMismatch {
        family: DescriptorFamily,
        keypoints: usize,
        rows: usize,
    },
    #[error("failed to load image {index} from {path}: {reason}")]
    ImageLoad {
        index: usize,
        path: String,
        reason: String,
    },
    #[error("unknown detector family '{0}'")]
    UnknownDetector(String),
    #[error("unknown descriptor family '{0}'")]
    UnknownDescriptor(String),
    #[error("no capability available for {0}")]
    UnsupportedFamily(String),
    #[error("{storage} descriptors cannot be compared with the {class} metric")]
    MetricMismatch {
        storage: &'static str,
        class: DescriptorClass,
    },
    #[error("cannot match {previous} descriptors against {current} descriptors")]
    FamilyMismatch {
        previous: DescriptorFamily,
        current: DescriptorFamily,
    },
    #[error("binary rows of {width} bytes exceed the {max}-byte Hamming search")]
    UnsupportedWidth { width: usize, max: usize },
    #[error("descriptor widths differ: {previous} vs {current}")]
    WidthMismatch { previous: usize, current: usize },
    #[error("invalid image: {0}")]
    InvalidImage(String),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("report sink failed: {0}")]
    Report(#[from] std::io::Error),
}

/// Outcome of a pipeline step that is not necessarily fatal
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Detector/descriptor pair is known not to work together; the pair is skipped
    #[error("invalid combination: detector {detector} with descriptor {descriptor}")]
    InvalidCombination {
        detector: DetectorFamily,
        descriptor: DescriptorFamily,
    },
    /// Fewer frames buffered than requested; expected for the first image of a run
    #[error("frame buffer holds {available} frame(s) but {requested} were requested")]
    EmptyBuffer { requested: usize, available: usize },
    #[error(transparent)]
    Fatal(#[from] FatalError),
}

impl PipelineError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, PipelineError::Fatal(_))
    }
}

pub type FatalResult<T> = Result<T, FatalError>;

pub type PipelineResult<T> = Result<T, PipelineError>;
