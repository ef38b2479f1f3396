use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::detection::domain::face_detector::FaceDetector;
use crate::detection::domain::face_region::FaceRegion;
use crate::shared::image_buffer::ImageBuffer;

/// Faces reported for one frame, as stored in a detections file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FrameDetections {
    pub frame: usize,
    #[serde(default)]
    pub faces: Vec<FaceRegion>,
}

/// Answers detection requests from results computed ahead of time,
/// keyed by frame index.
///
/// Stands in for a live detector when detection ran in another process.
/// Frames without an entry have no faces.
#[derive(Clone, Debug, Default)]
pub struct PrecomputedFaceDetector {
    by_frame: HashMap<usize, Vec<FaceRegion>>,
}

impl PrecomputedFaceDetector {
    pub fn new(by_frame: HashMap<usize, Vec<FaceRegion>>) -> Self {
        Self { by_frame }
    }

    /// Later entries for the same frame add to earlier ones.
    pub fn from_detections(detections: Vec<FrameDetections>) -> Self {
        let mut by_frame: HashMap<usize, Vec<FaceRegion>> = HashMap::new();
        for entry in detections {
            by_frame.entry(entry.frame).or_default().extend(entry.faces);
        }
        Self { by_frame }
    }

    pub fn frame_count(&self) -> usize {
        self.by_frame.len()
    }
}

impl FaceDetector for PrecomputedFaceDetector {
    fn detect(&self, image: &ImageBuffer) -> Result<Vec<FaceRegion>, Box<dyn std::error::Error>> {
        Ok(self.by_frame.get(&image.index()).cloned().unwrap_or_default())
    }
}
