use std::path::Path;

use crate::shared::image_buffer::ImageBuffer;

/// Encodes a single image to a file chosen by its extension.
pub trait ImageWriter: Send {
    fn write(&self, path: &Path, image: &ImageBuffer) -> Result<(), Box<dyn std::error::Error>>;
}
