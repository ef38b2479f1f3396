use std::path::{Path, PathBuf};

use crate::shared::image_buffer::ImageBuffer;
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::image_writer::ImageWriter;
use crate::video::domain::video_writer::VideoWriter;

use super::image_file_writer::ImageFileWriter;

/// Writes frames as `frame_NNNNNN.<ext>` into an output directory.
pub struct ImageSequenceWriter {
    extension: String,
    encoder: ImageFileWriter,
    dir: Option<PathBuf>,
    written: usize,
}

impl ImageSequenceWriter {
    pub fn new(extension: &str) -> Self {
        Self {
            extension: extension.trim_start_matches('.').to_lowercase(),
            encoder: ImageFileWriter::new(),
            dir: None,
            written: 0,
        }
    }

    pub fn frames_written(&self) -> usize {
        self.written
    }

    fn frame_path(dir: &Path, index: usize, extension: &str) -> PathBuf {
        dir.join(format!("frame_{index:06}.{extension}"))
    }
}

impl Default for ImageSequenceWriter {
    fn default() -> Self {
        Self::new("png")
    }
}

impl VideoWriter for ImageSequenceWriter {
    fn open(
        &mut self,
        path: &Path,
        metadata: &VideoMetadata,
    ) -> Result<(), Box<dyn std::error::Error>> {
        std::fs::create_dir_all(path)?;
        log::debug!(
            "Writing {} frame(s) of {}x{} to {}",
            metadata.total_frames,
            metadata.width,
            metadata.height,
            path.display()
        );
        self.dir = Some(path.to_path_buf());
        self.written = 0;
        Ok(())
    }

    fn write(&mut self, frame: &ImageBuffer) -> Result<(), Box<dyn std::error::Error>> {
        let dir = self.dir.as_ref().ok_or("ImageSequenceWriter: not opened")?;
        let path = Self::frame_path(dir, frame.index(), &self.extension);
        self.encoder.write(&path, frame)?;
        self.written += 1;
        Ok(())
    }

    fn close(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(dir) = self.dir.take() {
            log::info!("Wrote {} frame(s) to {}", self.written, dir.display());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::video::infrastructure::image_file_reader::load_rgba;

    fn metadata() -> VideoMetadata {
        VideoMetadata {
            width: 4,
            height: 4,
            fps: 30.0,
            total_frames: 2,
            source_path: None,
        }
    }

    #[test]
    fn test_writes_numbered_files() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        let mut writer = ImageSequenceWriter::default();
        writer.open(&out, &metadata()).unwrap();
        writer
            .write(&ImageBuffer::filled(4, 4, [9, 9, 9, 255]).with_index(0))
            .unwrap();
        writer
            .write(&ImageBuffer::filled(4, 4, [7, 7, 7, 255]).with_index(1))
            .unwrap();
        writer.close().unwrap();

        assert_eq!(writer.frames_written(), 2);
        let second = load_rgba(&out.join("frame_000001.png"), 1).unwrap();
        assert_eq!(second.pixel(0, 0), [7, 7, 7, 255]);
        assert!(out.join("frame_000000.png").exists());
    }

    #[test]
    fn test_write_before_open_is_error() {
        let mut writer = ImageSequenceWriter::new(".PNG");
        assert!(writer.write(&ImageBuffer::filled(2, 2, [0; 4])).is_err());
    }

    #[test]
    fn test_extension_is_normalized() {
        let writer = ImageSequenceWriter::new(".PNG");
        assert_eq!(writer.extension, "png");
    }
}
