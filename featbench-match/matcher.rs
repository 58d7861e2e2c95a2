use featbench_core::{DescriptorClass, Descriptors, FatalError, FatalResult, Match, MatcherKind, SelectorKind};
use log::debug;

use crate::search::{brute_force_hamming, brute_force_l2, KdTree, Neighbor};

/// Lowe's ratio test: the best candidate must be clearly better than the
/// runner-up
#[inline]
pub fn passes_ratio_test(best: f32, second: f32, ratio: f32) -> bool {
    best < ratio * second
}

/// Correspondences between the descriptors of two frames.
///
/// Source rows belong to the previous frame and become `query_idx`;
/// reference rows belong to the current frame and become `train_idx`.
#[derive(Debug, Clone, Copy)]
pub struct DescriptorMatcher {
    pub kind: MatcherKind,
    pub selector: SelectorKind,
    pub ratio: f32,
}

impl Default for DescriptorMatcher {
    fn default() -> Self {
        Self::new(MatcherKind::BruteForce, SelectorKind::KNearest, 0.8)
    }
}

impl DescriptorMatcher {
    pub fn new(kind: MatcherKind, selector: SelectorKind, ratio: f32) -> Self {
        Self { kind, selector, ratio }
    }

    pub fn match_descriptors(
        &self,
        previous: &Descriptors,
        current: &Descriptors,
        class: DescriptorClass,
    ) -> FatalResult<Vec<Match>> {
        if self.kind == MatcherKind::BruteForce {
            check_metric(previous, class)?;
            check_metric(current, class)?;
        }
        if previous.is_empty() || current.is_empty() {
            return Ok(Vec::new());
        }
        if previous.width() != current.width() {
            return Err(FatalError::WidthMismatch {
                previous: previous.width(),
                current: current.width(),
            });
        }

        let k = match self.selector {
            SelectorKind::NearestNeighbor => 1,
            SelectorKind::KNearest => 2,
        };
        let neighbors = match self.kind {
            MatcherKind::BruteForce => brute_force(previous, current, k)?,
            MatcherKind::Flann => indexed(previous, current, k),
        };

        let matches = self.select(&neighbors);
        debug!(
            "{:?}/{:?}: {} matches from {} x {} descriptors",
            self.kind,
            self.selector,
            matches.len(),
            previous.rows(),
            current.rows()
        );
        Ok(matches)
    }

    fn select(&self, neighbors: &[Vec<Neighbor>]) -> Vec<Match> {
        neighbors
            .iter()
            .enumerate()
            .filter_map(|(query_idx, found)| {
                let best = match (self.selector, found.as_slice()) {
                    (SelectorKind::NearestNeighbor, [best, ..]) => best,
                    (SelectorKind::KNearest, [best, second, ..])
                        if passes_ratio_test(best.distance, second.distance, self.ratio) =>
                    {
                        best
                    }
                    _ => return None,
                };
                Some(Match {
                    query_idx,
                    train_idx: best.index,
                    distance: best.distance,
                })
            })
            .collect()
    }
}

/// Hamming for bit strings, L2 for histograms; the storage has to agree
fn check_metric(descriptors: &Descriptors, class: DescriptorClass) -> FatalResult<()> {
    let agrees = match class {
        DescriptorClass::Binary => descriptors.is_binary(),
        DescriptorClass::Histogram => !descriptors.is_binary(),
    };
    if agrees {
        Ok(())
    } else {
        Err(FatalError::MetricMismatch {
            storage: descriptors.storage_name(),
            class,
        })
    }
}

fn brute_force(previous: &Descriptors, current: &Descriptors, k: usize) -> FatalResult<Vec<Vec<Neighbor>>> {
    match (previous, current) {
        (
            Descriptors::Binary { bytes_per_row, data: source },
            Descriptors::Binary { data: reference, .. },
        ) => brute_force_hamming(source, reference, *bytes_per_row, k),
        (Descriptors::Float { dims, data: source }, Descriptors::Float { data: reference, .. }) => {
            Ok(brute_force_l2(source, reference, *dims, k))
        }
        // unreachable after check_metric, kept total
        _ => Ok(indexed(previous, current, k)),
    }
}

/// Kd-tree search over both matrices converted to float
fn indexed(previous: &Descriptors, current: &Descriptors, k: usize) -> Vec<Vec<Neighbor>> {
    let (source, reference) = (previous.to_float(), current.to_float());
    match (&source, &reference) {
        (Descriptors::Float { dims, data: source }, Descriptors::Float { data: reference, .. }) => {
            KdTree::build(reference, *dims).nearest_all(source, k)
        }
        _ => Vec::new(),
    }
}
