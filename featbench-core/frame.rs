use std::collections::VecDeque;

use log::trace;

use crate::descriptor::Descriptors;
use crate::error::{FatalError, FatalResult, PipelineError, PipelineResult};
use crate::family::DescriptorFamily;
use crate::types::{Image, Keypoint, Match};

/// Per-image pipeline state
#[derive(Debug, Clone)]
pub struct Frame {
    pub image: Image,
    pub keypoints: Vec<Keypoint>,
    pub descriptors: Option<Descriptors>,
    pub descriptor_family: Option<DescriptorFamily>,
    /// Matches against the previous frame, filled once a predecessor exists
    pub matches: Vec<Match>,
}

impl Frame {
    pub fn new(image: Image) -> Self {
        Self {
            image,
            keypoints: Vec::new(),
            descriptors: None,
            descriptor_family: None,
            matches: Vec::new(),
        }
    }
}

/// Fixed-capacity ring buffer of frames.
///
/// The oldest frame is evicted before a new one is appended, so the buffer
/// never holds more than `capacity` frames, not even transiently.
#[derive(Debug)]
pub struct FrameStore {
    frames: VecDeque<Frame>,
    capacity: usize,
}

impl FrameStore {
    pub fn new(capacity: usize) -> FatalResult<Self> {
        if capacity == 0 {
            return Err(FatalError::InvalidConfig(
                "frame buffer capacity must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            frames: VecDeque::with_capacity(capacity),
            capacity,
        })
    }

    /// Append a frame, returning the evicted one if the buffer was full
    pub fn push(&mut self, frame: Frame) -> Option<Frame> {
        let evicted = if self.frames.len() >= self.capacity {
            trace!("frame buffer full at {}, evicting oldest frame", self.capacity);
            self.frames.pop_front()
        } else {
            None
        };
        self.frames.push_back(frame);
        evicted
    }

    pub fn latest(&self) -> PipelineResult<&Frame> {
        self.frames.back().ok_or(PipelineError::EmptyBuffer {
            requested: 1,
            available: 0,
        })
    }

    pub fn latest_mut(&mut self) -> PipelineResult<&mut Frame> {
        self.frames.back_mut().ok_or(PipelineError::EmptyBuffer {
            requested: 1,
            available: 0,
        })
    }

    pub fn second_latest(&self) -> PipelineResult<&Frame> {
        let available = self.frames.len();
        if available < 2 {
            return Err(PipelineError::EmptyBuffer {
                requested: 2,
                available,
            });
        }
        Ok(&self.frames[available - 2])
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Frames from oldest to newest
    pub fn iter(&self) -> impl Iterator<Item = &Frame> {
        self.frames.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn tagged_frame(tag: u8) -> Frame {
        Frame::new(Image::from_pixel(1, 1, image::Luma([tag])))
    }

    fn tag(frame: &Frame) -> u8 {
        frame.image.get_pixel(0, 0).0[0]
    }

    #[test]
    fn test_zero_capacity_rejected() {
        assert!(matches!(FrameStore::new(0), Err(FatalError::InvalidConfig(_))));
    }

    #[test]
    fn test_empty_buffer_errors() {
        let mut store = FrameStore::new(2).unwrap();
        assert!(matches!(
            store.latest(),
            Err(PipelineError::EmptyBuffer { requested: 1, available: 0 })
        ));
        store.push(tagged_frame(1));
        assert!(store.latest().is_ok());
        assert!(matches!(
            store.second_latest(),
            Err(PipelineError::EmptyBuffer { requested: 2, available: 1 })
        ));
    }

    #[test]
    fn test_push_evicts_oldest_first() {
        let mut store = FrameStore::new(2).unwrap();
        assert!(store.push(tagged_frame(1)).is_none());
        assert!(store.push(tagged_frame(2)).is_none());
        let evicted = store.push(tagged_frame(3)).unwrap();
        assert_eq!(tag(&evicted), 1);
        assert_eq!(tag(store.second_latest().unwrap()), 2);
        assert_eq!(tag(store.latest().unwrap()), 3);
    }

    #[test]
    fn test_latest_mut_updates_newest() {
        let mut store = FrameStore::new(2).unwrap();
        store.push(tagged_frame(1));
        store.push(tagged_frame(2));
        store.latest_mut().unwrap().keypoints.push(Keypoint::new(1.0, 1.0, 4.0));
        assert_eq!(store.latest().unwrap().keypoints.len(), 1);
        assert!(store.second_latest().unwrap().keypoints.is_empty());
    }

    proptest! {
        #[test]
        fn prop_size_bounded_and_keeps_newest(capacity in 1usize..6, pushes in 0usize..40) {
            let mut store = FrameStore::new(capacity).unwrap();
            for i in 0..pushes {
                store.push(tagged_frame(i as u8));
                prop_assert!(store.len() <= capacity);
            }
            let kept: Vec<u8> = store.iter().map(tag).collect();
            let first = pushes.saturating_sub(capacity);
            let expected: Vec<u8> = (first..pushes).map(|i| i as u8).collect();
            prop_assert_eq!(kept, expected);
        }
    }
}
