use std::path::Path;

use crate::masking::domain::shape::Shape;
use crate::shared::geometry::Size;
use crate::video::domain::image_writer::ImageWriter;
use crate::video::domain::video_reader::VideoReader;

use super::image_pipeline::ImagePipeline;

/// Still-photo export: read → [`ImagePipeline::apply_blur`] → write.
pub struct BlurImageUseCase {
    reader: Box<dyn VideoReader>,
    image_writer: Box<dyn ImageWriter>,
    pipeline: ImagePipeline,
}

impl BlurImageUseCase {
    pub fn new(
        reader: Box<dyn VideoReader>,
        image_writer: Box<dyn ImageWriter>,
        pipeline: ImagePipeline,
    ) -> Self {
        Self {
            reader,
            image_writer,
            pipeline,
        }
    }

    /// Returns the size of the written image, which is capped at the
    /// pipeline's working resolution.
    pub fn execute(
        &mut self,
        input_path: &Path,
        output_path: &Path,
        shapes: &[Shape],
        radius: f64,
    ) -> Result<Size, Box<dyn std::error::Error>> {
        let metadata = self.reader.open(input_path)?;
        let frame = self.reader.frames().next().ok_or("No frames in image")??;
        self.reader.close();

        log::info!(
            "Blurring {} shape(s) in {}x{} image",
            shapes.len(),
            metadata.width,
            metadata.height
        );
        let output = self.pipeline.apply_blur(&frame, shapes, radius);
        self.image_writer.write(output_path, &output)?;
        Ok(output.size())
    }
}
