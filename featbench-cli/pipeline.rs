use featbench_core::{
    BenchConfig, DescriptorFamily, DetectorFamily, FatalError, FatalResult, Frame, FrameStore, Image, Keypoint,
    Match, PipelineError, RoiFilter,
};
use featbench_describe::{extract, ExtractionCapability};
use featbench_detect::{detect_timed, Detector, KeypointSuppression};
use featbench_match::DescriptorMatcher;
use log::{debug, info};

use crate::registry::CapabilityRegistry;
use crate::report::ResultRow;
use crate::source::ImageSource;
use crate::visualize::VisualizationSink;

/// One (detector, descriptor) run over the configured image range.
///
/// Capabilities are resolved once at construction; every run owns a fresh
/// frame buffer, so runs never share state.
pub struct Pipeline<'a> {
    config: &'a BenchConfig,
    detector: Box<dyn Detector>,
    extractor: Box<dyn ExtractionCapability>,
    matcher: DescriptorMatcher,
    roi: RoiFilter,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        config: &'a BenchConfig,
        registry: &CapabilityRegistry,
        detector: DetectorFamily,
        descriptor: DescriptorFamily,
    ) -> FatalResult<Self> {
        Ok(Self {
            config,
            detector: registry.detector(detector)?,
            extractor: registry.extractor(descriptor)?,
            matcher: DescriptorMatcher::new(config.matcher, config.selector, config.ratio),
            roi: RoiFilter::from(config.roi),
        })
    }

    pub fn label(&self) -> String {
        format!("{}_{}", self.detector.name(), self.extractor.family())
    }

    /// Process every image and return one row per matched frame pair
    pub fn run(
        &self,
        source: &dyn ImageSource,
        visualizer: Option<&dyn VisualizationSink>,
    ) -> FatalResult<Vec<ResultRow>> {
        info!(
            "Using detector {} with descriptor {}",
            self.detector.name(),
            self.extractor.family()
        );
        let mut store = FrameStore::new(self.config.buffer_capacity)?;
        let mut rows = Vec::new();

        for index in self.config.images.start..=self.config.images.end {
            let image = source.load(index)?;
            if let Some(row) = self.process(&mut store, image, index, visualizer)? {
                rows.push(row);
            }
        }
        Ok(rows)
    }

    fn process(
        &self,
        store: &mut FrameStore,
        image: Image,
        index: usize,
        visualizer: Option<&dyn VisualizationSink>,
    ) -> FatalResult<Option<ResultRow>> {
        store.push(Frame::new(image));
        debug!("#1 load image {} into buffer, size {}", index, store.len());

        let current = store.latest_mut().map_err(into_fatal)?;
        let (detected, detection_ms) = detect_timed(self.detector.as_ref(), &current.image)?;
        let mut keypoints = self.roi.apply(&detected);
        if self.roi.rect().is_some() {
            debug!("{} of {} keypoints inside the region of interest", keypoints.len(), detected.len());
        }
        if let Some(limit) = self.config.limit_keypoints {
            self.limit(&mut keypoints, limit);
        }
        debug!("#2 detect keypoints: {} in {:.3} ms", keypoints.len(), detection_ms);

        let (descriptors, description_ms) = extract(self.extractor.as_ref(), &current.image, &keypoints)?;
        current.keypoints = keypoints;
        current.descriptors = Some(descriptors);
        current.descriptor_family = Some(self.extractor.family());
        debug!("#3 extract descriptors in {:.3} ms", description_ms);

        let previous = match store.second_latest() {
            Ok(previous) => previous,
            Err(PipelineError::EmptyBuffer { .. }) => return Ok(None),
            Err(other) => return Err(into_fatal(other)),
        };
        let current = store.latest().map_err(into_fatal)?;
        let matches = self.match_frames(previous, current)?;
        debug!("#4 match descriptors: {}", matches.len());

        if let Some(sink) = visualizer {
            sink.show(&self.label(), index, previous, current, &matches)?;
        }

        let row = ResultRow {
            detector: self.detector.name(),
            keypoints: current.keypoints.len(),
            detection_ms,
            descriptor: self.extractor.family(),
            description_ms,
            matches: matches.len(),
        };
        store.latest_mut().map_err(into_fatal)?.matches = matches;
        Ok(Some(row))
    }

    /// Shi-Tomasi corners come sorted by quality, so its first N are kept
    fn limit(&self, keypoints: &mut Vec<Keypoint>, limit: usize) {
        if self.detector.name() == DetectorFamily::ShiTomasi {
            keypoints.truncate(limit);
        }
        KeypointSuppression::retain_best(keypoints, limit);
        debug!("keypoints limited to {}", keypoints.len());
    }

    fn match_frames(&self, previous: &Frame, current: &Frame) -> FatalResult<Vec<Match>> {
        let (Some(prev_family), Some(curr_family)) = (previous.descriptor_family, current.descriptor_family) else {
            return Ok(Vec::new());
        };
        if prev_family != curr_family {
            return Err(FatalError::FamilyMismatch {
                previous: prev_family,
                current: curr_family,
            });
        }
        match (&previous.descriptors, &current.descriptors) {
            (Some(prev), Some(curr)) => self.matcher.match_descriptors(prev, curr, curr_family.class()),
            _ => Ok(Vec::new()),
        }
    }
}

/// Buffer errors past the first frame indicate a broken invariant
fn into_fatal(err: PipelineError) -> FatalError {
    match err {
        PipelineError::Fatal(fatal) => fatal,
        other => FatalError::InvalidConfig(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use featbench_core::Descriptors;

    fn frame_with(family: DescriptorFamily) -> Frame {
        let mut frame = Frame::new(Image::new(8, 8));
        frame.keypoints = vec![Keypoint::new(1.0, 1.0, 7.0)];
        frame.descriptors = Some(Descriptors::from_binary_rows(&[[0u8; 32]]));
        frame.descriptor_family = Some(family);
        frame
    }

    #[test]
    fn test_family_mismatch_fails_fast() {
        let config = BenchConfig::default();
        let pipeline = Pipeline::new(
            &config,
            &CapabilityRegistry::builtin(),
            DetectorFamily::Fast,
            DescriptorFamily::Brief,
        )
        .unwrap();
        let err = pipeline
            .match_frames(&frame_with(DescriptorFamily::Orb), &frame_with(DescriptorFamily::Brief))
            .unwrap_err();
        assert!(matches!(
            err,
            FatalError::FamilyMismatch {
                previous: DescriptorFamily::Orb,
                current: DescriptorFamily::Brief
            }
        ));
    }

    #[test]
    fn test_limit_keeps_strongest() {
        let config = BenchConfig::default().with_limit_keypoints(Some(2));
        let pipeline = Pipeline::new(
            &config,
            &CapabilityRegistry::builtin(),
            DetectorFamily::Fast,
            DescriptorFamily::Brief,
        )
        .unwrap();
        let mut kps: Vec<Keypoint> = [3.0, 9.0, 1.0, 7.0]
            .iter()
            .map(|&r| Keypoint::new(0.0, 0.0, 7.0).with_response(r))
            .collect();
        pipeline.limit(&mut kps, 2);
        let responses: Vec<f32> = kps.iter().map(|k| k.response).collect();
        assert_eq!(responses, vec![9.0, 7.0]);
    }

    #[test]
    fn test_shi_tomasi_limit_keeps_first() {
        let config = BenchConfig::default();
        let pipeline = Pipeline::new(
            &config,
            &CapabilityRegistry::builtin(),
            DetectorFamily::ShiTomasi,
            DescriptorFamily::Brief,
        )
        .unwrap();
        let mut kps: Vec<Keypoint> = [3.0, 9.0, 1.0, 7.0]
            .iter()
            .enumerate()
            .map(|(i, &r)| Keypoint::new(i as f32, 0.0, 4.0).with_response(r))
            .collect();
        pipeline.limit(&mut kps, 2);
        let xs: Vec<f32> = kps.iter().map(|k| k.x).collect();
        assert_eq!(xs.len(), 2);
        assert!(xs.contains(&0.0) && xs.contains(&1.0));
    }
}
