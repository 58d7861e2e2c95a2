use featbench_core::{time_ms, DetectorFamily, FatalError, FatalResult, FloatImage, Image, Keypoint};

use crate::capability::{CornerResponse, DetectionCapability, DetectionProvider, GoodCorners, GoodCornersParams};
use crate::config::{HarrisConfig, ShiTomasiConfig};
use crate::suppression::{Insertion, KeypointSuppression};

/// Keypoint detection strategy.
///
/// The sweep only ever sees `dyn Detector`, so corner-grid detectors and
/// delegated families are interchangeable.
pub trait Detector: Send + Sync {
    fn name(&self) -> DetectorFamily;
    fn detect(&self, image: &Image) -> FatalResult<Vec<Keypoint>>;
}

/// Run `detector` and measure the wall-clock time of the call alone
pub fn detect_timed(detector: &dyn Detector, image: &Image) -> FatalResult<(Vec<Keypoint>, f64)> {
    let (keypoints, ms) = time_ms(|| detector.detect(image));
    Ok((keypoints?, ms))
}

pub(crate) fn ensure_non_empty(image: &Image) -> FatalResult<()> {
    let (w, h) = image.dimensions();
    if w == 0 || h == 0 {
        return Err(FatalError::InvalidImage(format!("empty {}x{} image", w, h)));
    }
    Ok(())
}

/// Min-max normalize to [0, 255], then take the rounded absolute value
/// saturated to u8. A constant map normalizes to all zeros.
pub fn normalize_to_u8(map: &FloatImage) -> Vec<u8> {
    let (min, max) = map
        .data
        .iter()
        .fold((f32::MAX, f32::MIN), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    let range = max - min;
    if range <= 0.0 {
        return vec![0; map.data.len()];
    }

    map.data
        .iter()
        .map(|&v| ((v - min) / range * 255.0).abs().round().clamp(0.0, 255.0) as u8)
        .collect()
}

/// Corner-grid detector delegating selection to a good-corners capability
pub struct ShiTomasiDetector {
    config: ShiTomasiConfig,
    corners: Box<dyn GoodCorners>,
}

impl ShiTomasiDetector {
    pub fn new(config: ShiTomasiConfig, corners: Box<dyn GoodCorners>) -> FatalResult<Self> {
        config.validate()?;
        Ok(Self { config, corners })
    }

    pub fn config(&self) -> &ShiTomasiConfig {
        &self.config
    }
}

impl Detector for ShiTomasiDetector {
    fn name(&self) -> DetectorFamily {
        DetectorFamily::ShiTomasi
    }

    fn detect(&self, image: &Image) -> FatalResult<Vec<Keypoint>> {
        ensure_non_empty(image)?;
        let (w, h) = image.dimensions();
        let params = GoodCornersParams {
            max_corners: self.config.max_corners(w, h),
            quality_level: self.config.quality_level,
            min_distance: self.config.min_distance(),
            block_size: self.config.block_size,
            use_harris: false,
            k: self.config.k,
        };

        let corners = self.corners.good_corners(image, &params)?;
        let size = self.config.block_size as f32;
        let keypoints: Vec<Keypoint> = corners
            .into_iter()
            .map(|c| Keypoint::new(c.x, c.y, size).with_response(c.score))
            .collect();

        log::debug!("Shi-Tomasi: {} keypoints (budget {})", keypoints.len(), params.max_corners);
        Ok(keypoints)
    }
}

/// Corner-response detector with first-overlap-wins suppression
pub struct HarrisDetector {
    config: HarrisConfig,
    response: Box<dyn CornerResponse>,
}

impl HarrisDetector {
    pub fn new(config: HarrisConfig, response: Box<dyn CornerResponse>) -> FatalResult<Self> {
        config.validate()?;
        Ok(Self { config, response })
    }

    pub fn config(&self) -> &HarrisConfig {
        &self.config
    }
}

impl Detector for HarrisDetector {
    fn name(&self) -> DetectorFamily {
        DetectorFamily::Harris
    }

    fn detect(&self, image: &Image) -> FatalResult<Vec<Keypoint>> {
        ensure_non_empty(image)?;
        let map = self
            .response
            .corner_response(image, self.config.block_size, self.config.aperture, self.config.k)?;
        let (w, h) = image.dimensions();
        if map.width != w as usize || map.height != h as usize {
            return Err(FatalError::InvalidImage(format!(
                "response map is {}x{} for a {}x{} image",
                map.width, map.height, w, h
            )));
        }

        let normalized = normalize_to_u8(&map);
        let size = self.config.keypoint_size();
        let mut keypoints = Vec::new();
        let mut replaced = 0usize;

        for i in 0..map.height {
            for j in 0..map.width {
                let value = normalized[i * map.width + j];
                if value <= self.config.threshold {
                    continue;
                }
                let candidate = Keypoint::new(j as f32, i as f32, size).with_response(value as f32);
                if let Insertion::Replaced(_) =
                    KeypointSuppression::insert_with_overlap(&mut keypoints, candidate, self.config.max_overlap)
                {
                    replaced += 1;
                }
            }
        }

        log::debug!("Harris: {} keypoints, {} replacements", keypoints.len(), replaced);
        Ok(keypoints)
    }
}

/// Delegates straight to the family's detection capability
pub struct ModernDetector {
    capability: Box<dyn DetectionCapability>,
}

impl ModernDetector {
    pub fn new(capability: Box<dyn DetectionCapability>) -> Self {
        Self { capability }
    }
}

impl Detector for ModernDetector {
    fn name(&self) -> DetectorFamily {
        self.capability.family()
    }

    fn detect(&self, image: &Image) -> FatalResult<Vec<Keypoint>> {
        ensure_non_empty(image)?;
        let keypoints = self.capability.detect(image)?;
        log::debug!("{}: {} keypoints", self.capability.family(), keypoints.len());
        Ok(keypoints)
    }
}

/// Resolve the strategy for `family` once, pulling capabilities from `provider`
pub fn build_detector(family: DetectorFamily, provider: &dyn DetectionProvider) -> FatalResult<Box<dyn Detector>> {
    let detector: Box<dyn Detector> = match family {
        DetectorFamily::ShiTomasi => Box::new(ShiTomasiDetector::new(
            ShiTomasiConfig::default(),
            provider.good_corners()?,
        )?),
        DetectorFamily::Harris => Box::new(HarrisDetector::new(
            HarrisConfig::default(),
            provider.corner_response()?,
        )?),
        other => Box::new(ModernDetector::new(provider.modern(other)?)),
    };
    Ok(detector)
}
