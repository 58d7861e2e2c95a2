use featbench_core::{FatalError, FatalResult};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Parameters of the corner-grid (Shi-Tomasi) detector
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ShiTomasiConfig {
    /// Neighborhood size for the structure tensor, also the keypoint size
    pub block_size: usize,
    /// Tolerated overlap between neighboring corners
    pub max_overlap: f32,
    pub quality_level: f32,
    pub k: f32,
}

impl Default for ShiTomasiConfig {
    fn default() -> Self {
        Self {
            block_size: 4,
            max_overlap: 0.0,
            quality_level: 0.01,
            k: 0.04,
        }
    }
}

impl ShiTomasiConfig {
    /// `(1 - max_overlap) * block_size`
    pub fn min_distance(&self) -> f32 {
        (1.0 - self.max_overlap) * self.block_size as f32
    }

    /// Corner budget derived from the image area
    pub fn max_corners(&self, width: u32, height: u32) -> usize {
        let area = width as f32 * height as f32;
        (area / self.min_distance().max(1.0)) as usize
    }

    pub fn validate(&self) -> FatalResult<()> {
        if self.block_size == 0 {
            return Err(FatalError::InvalidConfig("Shi-Tomasi block_size must be positive".to_string()));
        }
        if !(0.0..1.0).contains(&self.max_overlap) {
            return Err(FatalError::InvalidConfig(format!(
                "Shi-Tomasi max_overlap {} outside [0, 1)",
                self.max_overlap
            )));
        }
        if !(self.quality_level > 0.0 && self.quality_level <= 1.0) {
            return Err(FatalError::InvalidConfig(format!(
                "Shi-Tomasi quality_level {} outside (0, 1]",
                self.quality_level
            )));
        }
        Ok(())
    }
}

/// Parameters of the corner-response (Harris) detector
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct HarrisConfig {
    pub block_size: usize,
    /// Sobel aperture; keypoints get `2 * aperture` as size
    pub aperture: usize,
    pub k: f32,
    /// Minimum normalized response, compared strictly
    pub threshold: u8,
    pub max_overlap: f32,
}

impl Default for HarrisConfig {
    fn default() -> Self {
        Self {
            block_size: 2,
            aperture: 3,
            k: 0.04,
            threshold: 100,
            max_overlap: 0.0,
        }
    }
}

impl HarrisConfig {
    pub fn keypoint_size(&self) -> f32 {
        (2 * self.aperture) as f32
    }

    pub fn validate(&self) -> FatalResult<()> {
        if self.block_size == 0 {
            return Err(FatalError::InvalidConfig("Harris block_size must be positive".to_string()));
        }
        if self.aperture != 3 {
            return Err(FatalError::InvalidConfig(format!(
                "Harris aperture {} unsupported, only 3 is implemented",
                self.aperture
            )));
        }
        if !(0.0..1.0).contains(&self.max_overlap) {
            return Err(FatalError::InvalidConfig(format!(
                "Harris max_overlap {} outside [0, 1)",
                self.max_overlap
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shi_tomasi_derived_values() {
        let cfg = ShiTomasiConfig::default();
        assert_eq!(cfg.min_distance(), 4.0);
        assert_eq!(cfg.max_corners(1242, 375), 1242 * 375 / 4);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_harris_defaults() {
        let cfg = HarrisConfig::default();
        assert_eq!(cfg.keypoint_size(), 6.0);
        assert_eq!(cfg.threshold, 100);
        assert!(cfg.validate().is_ok());
        assert!(HarrisConfig { aperture: 5, ..cfg }.validate().is_err());
    }

    #[test]
    fn test_invalid_overlap_rejected() {
        let cfg = ShiTomasiConfig {
            max_overlap: 1.0,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }
}
