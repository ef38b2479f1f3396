use std::path::Path;

use crate::shared::image_buffer::ImageBuffer;
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::video_reader::VideoReader;

/// Decodes any format the `image` crate knows into an RGBA buffer.
pub fn load_rgba(path: &Path, index: usize) -> Result<ImageBuffer, Box<dyn std::error::Error>> {
    let decoded = image::open(path)
        .map_err(|e| format!("Failed to decode {}: {e}", path.display()))?
        .into_rgba8();
    let (width, height) = decoded.dimensions();
    if width == 0 || height == 0 {
        return Err(format!("Image has no pixels: {}", path.display()).into());
    }
    Ok(ImageBuffer::new(decoded.into_raw(), width, height, index))
}

/// A still image presented as a one-frame video (`fps = 0`).
#[derive(Default)]
pub struct ImageFileReader {
    frame: Option<ImageBuffer>,
}

impl ImageFileReader {
    pub fn new() -> Self {
        Self::default()
    }
}

impl VideoReader for ImageFileReader {
    fn open(&mut self, path: &Path) -> Result<VideoMetadata, Box<dyn std::error::Error>> {
        let frame = load_rgba(path, 0)?;
        let metadata = VideoMetadata {
            width: frame.width(),
            height: frame.height(),
            fps: 0.0,
            total_frames: 1,
            source_path: Some(path.to_path_buf()),
        };
        self.frame = Some(frame);
        Ok(metadata)
    }

    fn frames(
        &mut self,
    ) -> Box<dyn Iterator<Item = Result<ImageBuffer, Box<dyn std::error::Error>>> + '_> {
        match self.frame.take() {
            Some(frame) => Box::new(std::iter::once(Ok(frame))),
            None => Box::new(std::iter::once(Err("ImageFileReader: not opened".into()))),
        }
    }

    fn close(&mut self) {
        self.frame = None;
    }
}
