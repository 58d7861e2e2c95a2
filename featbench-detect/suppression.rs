use featbench_core::Keypoint;

use crate::utils::sort_by_response_desc;

/// What happened to a candidate offered to [`KeypointSuppression::insert_with_overlap`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Insertion {
    /// No accepted keypoint overlapped; the candidate was appended
    Appended,
    /// The candidate replaced the accepted keypoint at this index
    Replaced(usize),
    /// The first overlapping keypoint was at least as strong
    Discarded(usize),
}

/// Duplicate-corner removal strategies
pub struct KeypointSuppression;

impl KeypointSuppression {
    /// Offer `candidate` to an accepted set.
    ///
    /// Accepted keypoints are visited in insertion order. The first one whose
    /// overlap with the candidate exceeds `max_overlap` decides the outcome:
    /// it is replaced in place when the candidate's response is strictly
    /// higher, otherwise the candidate is dropped. Later keypoints are never
    /// consulted, even if they overlap more.
    pub fn insert_with_overlap(accepted: &mut Vec<Keypoint>, candidate: Keypoint, max_overlap: f32) -> Insertion {
        for (idx, existing) in accepted.iter_mut().enumerate() {
            if existing.overlap(&candidate) > max_overlap {
                if candidate.response > existing.response {
                    *existing = candidate;
                    return Insertion::Replaced(idx);
                }
                return Insertion::Discarded(idx);
            }
        }
        accepted.push(candidate);
        Insertion::Appended
    }

    /// Greedy distance-based non-maximum suppression, strongest first
    pub fn non_maximum_suppression(keypoints: &[Keypoint], min_distance: f32) -> Vec<Keypoint> {
        if keypoints.is_empty() {
            return Vec::new();
        }

        let mut sorted = keypoints.to_vec();
        sort_by_response_desc(&mut sorted, |k| k.response);

        let min_distance_sq = min_distance * min_distance;
        let mut kept: Vec<Keypoint> = Vec::new();
        for candidate in sorted {
            let crowded = kept.iter().any(|k| {
                let dx = candidate.x - k.x;
                let dy = candidate.y - k.y;
                dx * dx + dy * dy < min_distance_sq
            });
            if !crowded {
                kept.push(candidate);
            }
        }
        kept
    }

    /// Drop keypoints that overlap a stronger one by more than `max_overlap`;
    /// used to merge detections of the same corner across pyramid levels
    pub fn remove_overlapping(keypoints: &[Keypoint], max_overlap: f32) -> Vec<Keypoint> {
        let mut sorted = keypoints.to_vec();
        sort_by_response_desc(&mut sorted, |k| k.response);

        let mut kept: Vec<Keypoint> = Vec::with_capacity(sorted.len());
        for candidate in sorted {
            if kept.iter().all(|k| k.overlap(&candidate) <= max_overlap) {
                kept.push(candidate);
            }
        }
        kept
    }

    /// Keep the `n` strongest keypoints, strongest first
    pub fn retain_best(keypoints: &mut Vec<Keypoint>, n: usize) {
        if keypoints.len() <= n {
            return;
        }
        sort_by_response_desc(keypoints, |k| k.response);
        keypoints.truncate(n);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn kp(x: f32, y: f32, size: f32, response: f32) -> Keypoint {
        Keypoint::new(x, y, size).with_response(response)
    }

    #[test]
    fn test_non_overlapping_candidate_is_appended() {
        let mut accepted = vec![kp(0.0, 0.0, 6.0, 110.0)];
        let outcome = KeypointSuppression::insert_with_overlap(&mut accepted, kp(20.0, 0.0, 6.0, 50.0), 0.0);
        assert_eq!(outcome, Insertion::Appended);
        assert_eq!(accepted.len(), 2);
    }

    #[test]
    fn test_first_overlap_wins_not_best_overlap() {
        // A and B do not touch each other; C overlaps both but meets A first
        let a = kp(0.0, 0.0, 6.0, 110.0);
        let b = kp(6.0, 0.0, 6.0, 200.0);
        let c = kp(3.5, 0.0, 6.0, 150.0);

        let mut accepted = Vec::new();
        assert_eq!(KeypointSuppression::insert_with_overlap(&mut accepted, a, 0.0), Insertion::Appended);
        assert_eq!(KeypointSuppression::insert_with_overlap(&mut accepted, b, 0.0), Insertion::Appended);
        assert_eq!(KeypointSuppression::insert_with_overlap(&mut accepted, c, 0.0), Insertion::Replaced(0));

        assert_eq!(accepted, vec![c, b]);
    }

    #[test]
    fn test_weaker_candidate_is_discarded_even_if_later_one_is_weaker_still() {
        let strong = kp(0.0, 0.0, 6.0, 200.0);
        let weak = kp(6.0, 0.0, 6.0, 10.0);
        let mut accepted = vec![strong, weak];
        let outcome = KeypointSuppression::insert_with_overlap(&mut accepted, kp(3.0, 0.0, 6.0, 150.0), 0.0);
        assert_eq!(outcome, Insertion::Discarded(0));
        assert_eq!(accepted, vec![strong, weak]);
    }

    #[test]
    fn test_equal_response_keeps_existing() {
        let mut accepted = vec![kp(0.0, 0.0, 6.0, 120.0)];
        let outcome = KeypointSuppression::insert_with_overlap(&mut accepted, kp(1.0, 0.0, 6.0, 120.0), 0.0);
        assert_eq!(outcome, Insertion::Discarded(0));
        assert_eq!(accepted[0].x, 0.0);
    }

    #[test]
    fn test_non_maximum_suppression() {
        let input = vec![
            kp(10.0, 10.0, 7.0, 50.0),
            kp(11.0, 10.0, 7.0, 80.0),
            kp(30.0, 30.0, 7.0, 20.0),
        ];
        let kept = KeypointSuppression::non_maximum_suppression(&input, 3.0);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].response, 80.0);
    }

    #[test]
    fn test_remove_overlapping_prefers_strong() {
        let input = vec![kp(10.0, 10.0, 16.0, 5.0), kp(11.0, 10.0, 24.0, 9.0), kp(60.0, 60.0, 12.0, 1.0)];
        let kept = KeypointSuppression::remove_overlapping(&input, 0.3);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].response, 9.0);
    }

    #[test]
    fn test_retain_best() {
        let mut kps: Vec<Keypoint> = (0..10).map(|i| kp(i as f32, 0.0, 3.0, i as f32)).collect();
        KeypointSuppression::retain_best(&mut kps, 3);
        let responses: Vec<f32> = kps.iter().map(|k| k.response).collect();
        assert_eq!(responses, vec![9.0, 8.0, 7.0]);
    }

    proptest! {
        #[test]
        fn prop_insertion_bookkeeping(points in proptest::collection::vec((0.0f32..60.0, 0.0f32..60.0, 0.0f32..255.0), 0..80)) {
            let candidates: Vec<Keypoint> = points.iter().map(|&(x, y, r)| kp(x, y, 6.0, r)).collect();
            let mut accepted = Vec::new();
            for candidate in &candidates {
                let before = accepted.len();
                match KeypointSuppression::insert_with_overlap(&mut accepted, *candidate, 0.0) {
                    Insertion::Appended => {
                        prop_assert_eq!(accepted.len(), before + 1);
                        prop_assert_eq!(accepted[before], *candidate);
                    }
                    Insertion::Replaced(i) => {
                        prop_assert_eq!(accepted.len(), before);
                        prop_assert_eq!(accepted[i], *candidate);
                    }
                    Insertion::Discarded(i) => {
                        prop_assert_eq!(accepted.len(), before);
                        prop_assert!(accepted[i].response >= candidate.response);
                    }
                }
            }
            prop_assert!(accepted.len() <= candidates.len());
            prop_assert!(accepted.iter().all(|a| candidates.contains(a)));
        }
    }
}
