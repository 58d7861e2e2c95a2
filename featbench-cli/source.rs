use featbench_core::{FatalError, FatalResult, Image, ImageSequenceConfig};
use log::trace;

/// Supplies the grayscale image for an absolute sequence index
pub trait ImageSource: Send + Sync {
    fn load(&self, index: usize) -> FatalResult<Image>;
}

/// Numbered image files on disk, decoded with the `image` crate
#[derive(Debug, Clone)]
pub struct FileSequence {
    config: ImageSequenceConfig,
}

impl FileSequence {
    pub fn new(config: ImageSequenceConfig) -> Self {
        Self { config }
    }
}

impl ImageSource for FileSequence {
    fn load(&self, index: usize) -> FatalResult<Image> {
        let path = self.config.path_for(index);
        trace!("loading {}", path.display());
        let img = image::open(&path).map_err(|e| FatalError::ImageLoad {
            index,
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Ok(img.to_luma8())
    }
}

/// Images held in memory, index `i` is the `i`-th image
#[derive(Debug, Clone, Default)]
pub struct InMemorySequence {
    images: Vec<Image>,
}

impl InMemorySequence {
    pub fn new(images: Vec<Image>) -> Self {
        Self { images }
    }
}

impl ImageSource for InMemorySequence {
    fn load(&self, index: usize) -> FatalResult<Image> {
        self.images.get(index).cloned().ok_or_else(|| FatalError::ImageLoad {
            index,
            path: "<memory>".to_string(),
            reason: format!("only {} images available", self.images.len()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_is_image_load_error() {
        let config = ImageSequenceConfig {
            base_path: "/nonexistent".into(),
            ..Default::default()
        };
        let err = FileSequence::new(config).load(3).unwrap_err();
        match err {
            FatalError::ImageLoad { index, path, .. } => {
                assert_eq!(index, 3);
                assert!(path.ends_with("0000000003.png"), "{}", path);
            }
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn test_file_sequence_round_trip() {
        let dir = std::env::temp_dir().join(format!("featbench-source-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let img = Image::from_fn(16, 8, |x, y| image::Luma([(x * 10 + y) as u8]));
        img.save(dir.join("frame_07.png")).unwrap();

        let source = FileSequence::new(ImageSequenceConfig {
            base_path: dir.clone(),
            prefix: "frame_".to_string(),
            extension: ".png".to_string(),
            start: 7,
            end: 7,
            fill_width: 2,
        });
        assert_eq!(source.load(7).unwrap(), img);
        std::fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn test_in_memory_out_of_range() {
        let source = InMemorySequence::new(vec![Image::new(4, 4)]);
        assert!(source.load(0).is_ok());
        assert!(matches!(source.load(1), Err(FatalError::ImageLoad { index: 1, .. })));
    }
}
