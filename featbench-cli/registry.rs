use std::sync::Arc;

use featbench_core::{DescriptorFamily, DetectorFamily, FatalResult};
use featbench_describe::{BuiltinExtraction, ExtractionCapability, ExtractionProvider};
use featbench_detect::{build_detector, BuiltinDetection, DetectionProvider, Detector};

/// Where every run resolves its detector and extractor from.
///
/// Cloning is cheap; parallel runs share the same providers.
#[derive(Clone)]
pub struct CapabilityRegistry {
    detection: Arc<dyn DetectionProvider>,
    extraction: Arc<dyn ExtractionProvider>,
}

impl CapabilityRegistry {
    pub fn new(detection: Arc<dyn DetectionProvider>, extraction: Arc<dyn ExtractionProvider>) -> Self {
        Self { detection, extraction }
    }

    /// The implementations shipped with the workspace
    pub fn builtin() -> Self {
        Self::new(Arc::new(BuiltinDetection), Arc::new(BuiltinExtraction))
    }

    pub fn detector(&self, family: DetectorFamily) -> FatalResult<Box<dyn Detector>> {
        build_detector(family, self.detection.as_ref())
    }

    pub fn extractor(&self, family: DescriptorFamily) -> FatalResult<Box<dyn ExtractionCapability>> {
        self.extraction.extraction(family)
    }
}

impl Default for CapabilityRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}
