use std::path::PathBuf;

use crate::error::{FatalError, FatalResult};
use crate::family::{DescriptorFamily, DetectorFamily, MatcherKind, SelectorKind};
use crate::roi::Rect;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Where the image sequence lives on disk
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ImageSequenceConfig {
    pub base_path: PathBuf,
    /// File name prefix before the zero-padded index
    pub prefix: String,
    pub extension: String,
    /// First and last index to load, inclusive
    pub start: usize,
    pub end: usize,
    /// Number of digits the index is padded to
    pub fill_width: usize,
}

impl Default for ImageSequenceConfig {
    fn default() -> Self {
        Self {
            base_path: PathBuf::from("../images/"),
            prefix: "KITTI/2011_09_26/image_00/data/000000".to_string(),
            extension: ".png".to_string(),
            start: 0,
            end: 9,
            fill_width: 4,
        }
    }
}

impl ImageSequenceConfig {
    /// Path of the image with the given absolute index
    pub fn path_for(&self, index: usize) -> PathBuf {
        let name = format!(
            "{}{:0width$}{}",
            self.prefix,
            index,
            self.extension,
            width = self.fill_width
        );
        self.base_path.join(name)
    }

    pub fn len(&self) -> usize {
        if self.end < self.start {
            0
        } else {
            self.end - self.start + 1
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Complete benchmark configuration.
///
/// Everything the harness and the pipeline treat as fixed parameters lives
/// here, so a test can vary any of them independently.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct BenchConfig {
    /// Frames held in memory at the same time
    pub buffer_capacity: usize,
    /// Region of interest, `None` keeps every keypoint
    pub roi: Option<Rect>,
    pub matcher: MatcherKind,
    pub selector: SelectorKind,
    /// Lowe ratio for k-nearest-neighbor selection
    pub ratio: f32,
    /// Keep only the strongest N keypoints per frame
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub limit_keypoints: Option<usize>,
    pub detectors: Vec<DetectorFamily>,
    pub descriptors: Vec<DescriptorFamily>,
    pub images: ImageSequenceConfig,
    pub threads: usize,
    /// Run independent pairs on the thread pool
    pub parallel: bool,
    /// Emit a marker row for pairs whose run failed
    pub record_failures: bool,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            buffer_capacity: 2,
            roi: Some(Rect::new(535.0, 180.0, 180.0, 150.0)),
            matcher: MatcherKind::BruteForce,
            selector: SelectorKind::KNearest,
            ratio: 0.8,
            limit_keypoints: None,
            detectors: DetectorFamily::ALL.to_vec(),
            descriptors: DescriptorFamily::ALL.to_vec(),
            images: ImageSequenceConfig::default(),
            threads: num_cpus::get().max(1),
            parallel: false,
            record_failures: false,
        }
    }
}

impl BenchConfig {
    pub fn with_roi(mut self, roi: Option<Rect>) -> Self {
        self.roi = roi;
        self
    }

    pub fn with_buffer_capacity(mut self, capacity: usize) -> Self {
        self.buffer_capacity = capacity;
        self
    }

    pub fn with_matcher(mut self, matcher: MatcherKind, selector: SelectorKind) -> Self {
        self.matcher = matcher;
        self.selector = selector;
        self
    }

    pub fn with_ratio(mut self, ratio: f32) -> Self {
        self.ratio = ratio;
        self
    }

    pub fn with_families(mut self, detectors: Vec<DetectorFamily>, descriptors: Vec<DescriptorFamily>) -> Self {
        self.detectors = detectors;
        self.descriptors = descriptors;
        self
    }

    pub fn with_images(mut self, images: ImageSequenceConfig) -> Self {
        self.images = images;
        self
    }

    pub fn with_limit_keypoints(mut self, limit: Option<usize>) -> Self {
        self.limit_keypoints = limit;
        self
    }

    /// Generate human-readable summary
    pub fn summary(&self) -> String {
        format!(
            "BenchConfig: buffer={}, roi={:?}, matcher={:?}/{:?}, ratio={}, detectors={}, descriptors={}, images={}..={}",
            self.buffer_capacity,
            self.roi,
            self.matcher,
            self.selector,
            self.ratio,
            self.detectors.len(),
            self.descriptors.len(),
            self.images.start,
            self.images.end
        )
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> FatalResult<()> {
        if self.buffer_capacity == 0 {
            return Err(FatalError::InvalidConfig("buffer_capacity must be at least 1".to_string()));
        }
        if !(self.ratio > 0.0 && self.ratio <= 1.0) {
            return Err(FatalError::InvalidConfig(format!(
                "ratio {} outside (0, 1]",
                self.ratio
            )));
        }
        if let Some(roi) = &self.roi {
            if roi.is_empty() {
                return Err(FatalError::InvalidConfig(format!("empty region of interest {:?}", roi)));
            }
        }
        if self.images.end < self.images.start {
            return Err(FatalError::InvalidConfig(format!(
                "image range {}..={} is empty",
                self.images.start, self.images.end
            )));
        }
        if self.limit_keypoints == Some(0) {
            return Err(FatalError::InvalidConfig("limit_keypoints must be positive".to_string()));
        }
        if self.threads == 0 {
            return Err(FatalError::InvalidConfig("threads must be at least 1".to_string()));
        }
        Ok(())
    }

    /// Save configuration to JSON file
    #[cfg(feature = "serde")]
    pub fn save_json<P: AsRef<std::path::Path>>(&self, path: P) -> Result<(), Box<dyn std::error::Error>> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load configuration from JSON file
    #[cfg(feature = "serde")]
    pub fn load_json<P: AsRef<std::path::Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Save configuration to TOML file
    #[cfg(feature = "serde")]
    pub fn save_toml<P: AsRef<std::path::Path>>(&self, path: P) -> Result<(), Box<dyn std::error::Error>> {
        let toml = toml::to_string_pretty(self)?;
        std::fs::write(path, toml)?;
        Ok(())
    }

    /// Load configuration from TOML file
    #[cfg(feature = "serde")]
    pub fn load_toml<P: AsRef<std::path::Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    #[cfg(feature = "serde")]
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    #[cfg(feature = "serde")]
    pub fn from_json(json: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    #[cfg(feature = "serde")]
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    #[cfg(feature = "serde")]
    pub fn from_toml(toml_str: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let config: Self = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_matches_reference_setup() {
        let cfg = BenchConfig::default();
        assert_eq!(cfg.buffer_capacity, 2);
        assert_eq!(cfg.ratio, 0.8);
        assert_eq!(cfg.roi, Some(Rect::new(535.0, 180.0, 180.0, 150.0)));
        assert_eq!(cfg.detectors.len(), 7);
        assert_eq!(cfg.descriptors.len(), 6);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        assert!(BenchConfig::default().with_buffer_capacity(0).validate().is_err());
        assert!(BenchConfig::default().with_ratio(0.0).validate().is_err());
        assert!(BenchConfig::default().with_ratio(1.5).validate().is_err());
        assert!(BenchConfig::default()
            .with_roi(Some(Rect::new(0.0, 0.0, 0.0, 10.0)))
            .validate()
            .is_err());
        let mut images = ImageSequenceConfig::default();
        images.start = 5;
        images.end = 2;
        assert!(BenchConfig::default().with_images(images).validate().is_err());
    }

    #[test]
    fn test_image_path_is_zero_padded() {
        let images = ImageSequenceConfig::default();
        let path = images.path_for(7);
        assert_eq!(
            path,
            PathBuf::from("../images/KITTI/2011_09_26/image_00/data/0000000007.png")
        );
        assert_eq!(images.len(), 10);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_toml_and_json_round_trip() {
        let cfg = BenchConfig::default()
            .with_families(vec![DetectorFamily::Fast], vec![DescriptorFamily::Brief])
            .with_matcher(MatcherKind::Flann, SelectorKind::NearestNeighbor);
        let toml_str = cfg.to_toml().unwrap();
        assert!(toml_str.contains("FAST"));
        assert_eq!(BenchConfig::from_toml(&toml_str).unwrap(), cfg);

        let json = cfg.to_json().unwrap();
        assert_eq!(BenchConfig::from_json(&json).unwrap(), cfg);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_loading_validates() {
        let bad = "buffer_capacity = 0\n";
        assert!(BenchConfig::from_toml(bad).is_err());
    }
}
