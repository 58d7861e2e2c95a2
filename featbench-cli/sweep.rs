use featbench_core::{BenchConfig, DescriptorFamily, DetectorFamily, FatalResult, PipelineError, PipelineResult};
use log::{error, info, warn};
use rayon::prelude::*;

use crate::pipeline::Pipeline;
use crate::registry::CapabilityRegistry;
use crate::report::{ReportSink, ResultRow};
use crate::source::ImageSource;
use crate::visualize::VisualizationSink;

/// Detector/descriptor pairs that are known not to work together
pub struct CompatibilityRules;

impl CompatibilityRules {
    /// AKAZE descriptors need AKAZE keypoints, and ORB descriptors cannot
    /// handle the scale range of SIFT keypoints
    pub fn check(detector: DetectorFamily, descriptor: DescriptorFamily) -> PipelineResult<()> {
        let akaze_mismatch = descriptor == DescriptorFamily::Akaze && detector != DetectorFamily::Akaze;
        let sift_orb = detector == DetectorFamily::Sift && descriptor == DescriptorFamily::Orb;
        if akaze_mismatch || sift_orb {
            return Err(PipelineError::InvalidCombination { detector, descriptor });
        }
        Ok(())
    }
}

/// Outcome counts of a sweep
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SweepSummary {
    pub completed: usize,
    pub skipped: usize,
    pub failed: usize,
    pub failures: Vec<(DetectorFamily, DescriptorFamily, String)>,
}

/// Runs the pipeline for every compatible (detector, descriptor) pair
pub struct Sweep<'a> {
    config: BenchConfig,
    registry: CapabilityRegistry,
    source: &'a dyn ImageSource,
    visualizer: Option<&'a dyn VisualizationSink>,
}

impl<'a> Sweep<'a> {
    pub fn new(config: BenchConfig, registry: CapabilityRegistry, source: &'a dyn ImageSource) -> Self {
        Self {
            config,
            registry,
            source,
            visualizer: None,
        }
    }

    pub fn with_visualizer(mut self, visualizer: &'a dyn VisualizationSink) -> Self {
        self.visualizer = Some(visualizer);
        self
    }

    /// Every configured pair in sweep order, detectors outermost
    pub fn pairs(&self) -> Vec<(DetectorFamily, DescriptorFamily)> {
        self.config
            .detectors
            .iter()
            .flat_map(|&det| self.config.descriptors.iter().map(move |&desc| (det, desc)))
            .collect()
    }

    fn run_pair(&self, detector: DetectorFamily, descriptor: DescriptorFamily) -> FatalResult<Vec<ResultRow>> {
        Pipeline::new(&self.config, &self.registry, detector, descriptor)?.run(self.source, self.visualizer)
    }

    /// Run the sweep; rows of a pair reach the sink only if its whole run
    /// succeeded. Only sink errors abort the sweep.
    pub fn run(&self, sink: &mut dyn ReportSink) -> FatalResult<SweepSummary> {
        self.config.validate()?;
        info!("{}", self.config.summary());

        let mut summary = SweepSummary::default();
        let mut accepted = Vec::new();
        for (detector, descriptor) in self.pairs() {
            match CompatibilityRules::check(detector, descriptor) {
                Ok(()) => accepted.push((detector, descriptor)),
                Err(err) => {
                    warn!("{}", err);
                    summary.skipped += 1;
                }
            }
        }

        let outcomes: Vec<FatalResult<Vec<ResultRow>>> = if self.config.parallel {
            accepted
                .par_iter()
                .map(|&(det, desc)| self.run_pair(det, desc))
                .collect()
        } else {
            accepted.iter().map(|&(det, desc)| self.run_pair(det, desc)).collect()
        };

        for ((detector, descriptor), outcome) in accepted.into_iter().zip(outcomes) {
            match outcome {
                Ok(rows) => {
                    for row in &rows {
                        sink.row(row)?;
                    }
                    info!("{} / {}: {} rows", detector, descriptor, rows.len());
                    summary.completed += 1;
                }
                Err(err) => {
                    error!("{} / {} failed: {}", detector, descriptor, err);
                    let reason = err.to_string();
                    if self.config.record_failures {
                        sink.failure(detector, descriptor, &reason)?;
                    }
                    summary.failed += 1;
                    summary.failures.push((detector, descriptor, reason));
                }
            }
        }

        sink.finish()?;
        info!(
            "sweep finished: {} completed, {} skipped, {} failed",
            summary.completed, summary.skipped, summary.failed
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_incompatibility_set() {
        let mut rejected = Vec::new();
        for det in DetectorFamily::ALL {
            for desc in DescriptorFamily::ALL {
                if CompatibilityRules::check(det, desc).is_err() {
                    rejected.push((det, desc));
                }
            }
        }
        // six non-AKAZE detectors with AKAZE, plus SIFT/ORB
        assert_eq!(rejected.len(), 7);
        assert!(rejected.contains(&(DetectorFamily::Sift, DescriptorFamily::Orb)));
        assert!(rejected.contains(&(DetectorFamily::ShiTomasi, DescriptorFamily::Akaze)));
        assert!(!rejected.contains(&(DetectorFamily::Akaze, DescriptorFamily::Akaze)));
        assert!(!rejected.contains(&(DetectorFamily::Sift, DescriptorFamily::Sift)));
    }

    #[test]
    fn test_rejection_is_soft() {
        let err = CompatibilityRules::check(DetectorFamily::Harris, DescriptorFamily::Akaze).unwrap_err();
        assert!(!err.is_fatal());
    }
}
