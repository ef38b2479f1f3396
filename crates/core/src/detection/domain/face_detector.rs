use crate::shared::image_buffer::ImageBuffer;

use super::face_region::FaceRegion;

/// Domain interface for the external face detector.
///
/// Calls are synchronous from the core's point of view; detectors backed by
/// an asynchronous engine block at their own boundary. `&self` plus `Sync`
/// lets concurrent frame workers share one detector, so implementations
/// must not carry per-frame state between calls.
pub trait FaceDetector: Send + Sync {
    fn detect(&self, image: &ImageBuffer) -> Result<Vec<FaceRegion>, Box<dyn std::error::Error>>;
}
