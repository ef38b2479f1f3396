use std::path::Path;

use crate::shared::image_buffer::ImageBuffer;
use crate::shared::video_metadata::VideoMetadata;

/// Sink for processed frames. Frames arrive in index order.
pub trait VideoWriter: Send {
    fn open(
        &mut self,
        path: &Path,
        metadata: &VideoMetadata,
    ) -> Result<(), Box<dyn std::error::Error>>;

    fn write(&mut self, frame: &ImageBuffer) -> Result<(), Box<dyn std::error::Error>>;

    /// Flushes and finalizes the output.
    fn close(&mut self) -> Result<(), Box<dyn std::error::Error>>;
}
