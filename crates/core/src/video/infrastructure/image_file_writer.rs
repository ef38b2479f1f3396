use std::path::Path;

use crate::shared::image_buffer::ImageBuffer;
use crate::video::domain::image_writer::ImageWriter;

/// Encodes with the `image` crate; the format follows the file extension.
///
/// Formats without an alpha channel (JPEG, BMP) get the RGB channels only.
#[derive(Clone, Copy, Debug, Default)]
pub struct ImageFileWriter;

impl ImageFileWriter {
    pub fn new() -> Self {
        Self
    }
}

impl ImageWriter for ImageFileWriter {
    fn write(&self, path: &Path, image: &ImageBuffer) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let rgba = image::RgbaImage::from_raw(image.width(), image.height(), image.data().to_vec())
            .ok_or("Image buffer does not match its dimensions")?;

        let keeps_alpha = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| matches!(e.to_lowercase().as_str(), "png" | "tif" | "tiff" | "webp"))
            .unwrap_or(true);

        if keeps_alpha {
            rgba.save(path)?;
        } else {
            image::DynamicImage::ImageRgba8(rgba).into_rgb8().save(path)?;
        }
        Ok(())
    }
}
