use std::path::{Path, PathBuf};

use crate::shared::constants::IMAGE_EXTENSIONS;
use crate::shared::image_buffer::ImageBuffer;
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::video_reader::VideoReader;

use super::image_file_reader::load_rgba;

/// Reads a directory of numbered still images as video frames.
///
/// Files are ordered by the last run of digits in their name, then by name,
/// so `frame_2.png` comes before `frame_10.png`. Frame indices follow that
/// order starting at 0. Dimensions come from the first frame; later frames
/// of another size are an error.
pub struct ImageSequenceReader {
    fps: f64,
    paths: Vec<PathBuf>,
    size: Option<(u32, u32)>,
}

impl ImageSequenceReader {
    pub fn new(fps: f64) -> Self {
        Self {
            fps,
            paths: Vec::new(),
            size: None,
        }
    }
}

impl VideoReader for ImageSequenceReader {
    fn open(&mut self, path: &Path) -> Result<VideoMetadata, Box<dyn std::error::Error>> {
        let mut paths: Vec<PathBuf> = std::fs::read_dir(path)
            .map_err(|e| format!("Cannot read frame directory {}: {e}", path.display()))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.is_file() && is_image(p))
            .collect();
        if paths.is_empty() {
            return Err(format!("No image frames in {}", path.display()).into());
        }
        paths.sort_by(|a, b| sort_key(a).cmp(&sort_key(b)));

        let first = image::image_dimensions(&paths[0])
            .map_err(|e| format!("Failed to read {}: {e}", paths[0].display()))?;
        log::info!(
            "Opened {} frame(s) of {}x{} from {}",
            paths.len(),
            first.0,
            first.1,
            path.display()
        );

        let metadata = VideoMetadata {
            width: first.0,
            height: first.1,
            fps: self.fps,
            total_frames: paths.len(),
            source_path: Some(path.to_path_buf()),
        };
        self.paths = paths;
        self.size = Some(first);
        Ok(metadata)
    }

    fn frames(
        &mut self,
    ) -> Box<dyn Iterator<Item = Result<ImageBuffer, Box<dyn std::error::Error>>> + '_> {
        let Some(expected) = self.size else {
            return Box::new(std::iter::once(Err(
                "ImageSequenceReader: not opened".into()
            )));
        };
        Box::new(
            self.paths
                .iter()
                .enumerate()
                .map(move |(index, path)| load_frame(path, index, expected)),
        )
    }

    fn close(&mut self) {
        self.paths.clear();
        self.size = None;
    }
}

fn load_frame(
    path: &Path,
    index: usize,
    expected: (u32, u32),
) -> Result<ImageBuffer, Box<dyn std::error::Error>> {
    let frame = load_rgba(path, index)?;
    if (frame.width(), frame.height()) != expected {
        return Err(format!(
            "{} is {}x{}, expected {}x{}",
            path.display(),
            frame.width(),
            frame.height(),
            expected.0,
            expected.1
        )
        .into());
    }
    Ok(frame)
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.contains(&e.to_lowercase().as_str()))
        .unwrap_or(false)
}

fn sort_key(path: &Path) -> (Option<u64>, String) {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_string();
    let digits: String = stem
        .chars()
        .rev()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    (digits.parse().ok(), stem)
}
