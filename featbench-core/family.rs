use std::fmt;
use std::str::FromStr;

use crate::error::FatalError;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Keypoint detector families the benchmark knows about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "UPPERCASE"))]
pub enum DetectorFamily {
    ShiTomasi,
    Harris,
    Fast,
    Brisk,
    Orb,
    Akaze,
    Sift,
}

impl DetectorFamily {
    /// Reference sweep order
    pub const ALL: [DetectorFamily; 7] = [
        DetectorFamily::ShiTomasi,
        DetectorFamily::Harris,
        DetectorFamily::Fast,
        DetectorFamily::Brisk,
        DetectorFamily::Orb,
        DetectorFamily::Akaze,
        DetectorFamily::Sift,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DetectorFamily::ShiTomasi => "SHITOMASI",
            DetectorFamily::Harris => "HARRIS",
            DetectorFamily::Fast => "FAST",
            DetectorFamily::Brisk => "BRISK",
            DetectorFamily::Orb => "ORB",
            DetectorFamily::Akaze => "AKAZE",
            DetectorFamily::Sift => "SIFT",
        }
    }
}

impl fmt::Display for DetectorFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DetectorFamily {
    type Err = FatalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DetectorFamily::ALL
            .iter()
            .copied()
            .find(|family| family.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| FatalError::UnknownDetector(s.to_string()))
    }
}

/// Metric family a descriptor is compared with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum DescriptorClass {
    /// Bit strings compared with the Hamming distance
    Binary,
    /// Gradient histograms compared with the Euclidean distance
    Histogram,
}

impl fmt::Display for DescriptorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DescriptorClass::Binary => f.write_str("binary"),
            DescriptorClass::Histogram => f.write_str("histogram"),
        }
    }
}

/// Descriptor extractor families the benchmark knows about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "UPPERCASE"))]
pub enum DescriptorFamily {
    Brisk,
    Brief,
    Orb,
    Freak,
    Akaze,
    Sift,
}

impl DescriptorFamily {
    /// Reference sweep order
    pub const ALL: [DescriptorFamily; 6] = [
        DescriptorFamily::Brisk,
        DescriptorFamily::Brief,
        DescriptorFamily::Orb,
        DescriptorFamily::Freak,
        DescriptorFamily::Akaze,
        DescriptorFamily::Sift,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DescriptorFamily::Brisk => "BRISK",
            DescriptorFamily::Brief => "BRIEF",
            DescriptorFamily::Orb => "ORB",
            DescriptorFamily::Freak => "FREAK",
            DescriptorFamily::Akaze => "AKAZE",
            DescriptorFamily::Sift => "SIFT",
        }
    }

    /// SIFT produces gradient histograms, everything else is a bit string
    pub fn class(&self) -> DescriptorClass {
        match self {
            DescriptorFamily::Sift => DescriptorClass::Histogram,
            _ => DescriptorClass::Binary,
        }
    }
}

impl fmt::Display for DescriptorFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DescriptorFamily {
    type Err = FatalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DescriptorFamily::ALL
            .iter()
            .copied()
            .find(|family| family.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| FatalError::UnknownDescriptor(s.to_string()))
    }
}

/// Nearest-neighbor search backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum MatcherKind {
    /// Exhaustive search with the metric of the descriptor class
    #[default]
    BruteForce,
    /// Indexed search over descriptors converted to floating point
    Flann,
}

impl FromStr for MatcherKind {
    type Err = FatalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bf" | "mat_bf" | "brute_force" => Ok(MatcherKind::BruteForce),
            "flann" | "mat_flann" => Ok(MatcherKind::Flann),
            other => Err(FatalError::InvalidConfig(format!("unknown matcher '{}'", other))),
        }
    }
}

/// How candidate matches are selected per source descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum SelectorKind {
    /// Best match only
    NearestNeighbor,
    /// Two best matches filtered by the distance-ratio test
    #[default]
    KNearest,
}

impl FromStr for SelectorKind {
    type Err = FatalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "nn" | "sel_nn" | "nearest_neighbor" => Ok(SelectorKind::NearestNeighbor),
            "knn" | "sel_knn" | "k_nearest" => Ok(SelectorKind::KNearest),
            other => Err(FatalError::InvalidConfig(format!("unknown selector '{}'", other))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detector_names_round_trip() {
        for family in DetectorFamily::ALL {
            assert_eq!(family.as_str().parse::<DetectorFamily>().unwrap(), family);
        }
        assert_eq!("shitomasi".parse::<DetectorFamily>().unwrap(), DetectorFamily::ShiTomasi);
    }

    #[test]
    fn test_unknown_names_are_fatal() {
        assert!(matches!(
            "SURF".parse::<DetectorFamily>(),
            Err(FatalError::UnknownDetector(_))
        ));
        assert!(matches!(
            "HOG".parse::<DescriptorFamily>(),
            Err(FatalError::UnknownDescriptor(_))
        ));
    }

    #[test]
    fn test_only_sift_is_histogram() {
        for family in DescriptorFamily::ALL {
            let expected = if family == DescriptorFamily::Sift {
                DescriptorClass::Histogram
            } else {
                DescriptorClass::Binary
            };
            assert_eq!(family.class(), expected);
        }
    }

    #[test]
    fn test_matcher_and_selector_aliases() {
        assert_eq!("MAT_BF".parse::<MatcherKind>().unwrap(), MatcherKind::BruteForce);
        assert_eq!("flann".parse::<MatcherKind>().unwrap(), MatcherKind::Flann);
        assert_eq!("SEL_KNN".parse::<SelectorKind>().unwrap(), SelectorKind::KNearest);
        assert_eq!("nn".parse::<SelectorKind>().unwrap(), SelectorKind::NearestNeighbor);
        assert!("cosine".parse::<MatcherKind>().is_err());
    }
}
