use std::path::Path;

use crate::shared::image_buffer::ImageBuffer;
use crate::shared::video_metadata::VideoMetadata;

/// Source of decoded RGBA frames.
///
/// Decoding lives behind this trait; the pipeline only sees
/// [`ImageBuffer`]s carrying their frame index.
pub trait VideoReader: Send {
    fn open(&mut self, path: &Path) -> Result<VideoMetadata, Box<dyn std::error::Error>>;

    /// Frames in presentation order.
    fn frames(
        &mut self,
    ) -> Box<dyn Iterator<Item = Result<ImageBuffer, Box<dyn std::error::Error>>> + '_>;

    fn close(&mut self);
}
