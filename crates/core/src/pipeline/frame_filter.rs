use std::sync::Arc;

use crate::detection::domain::face_detector::FaceDetector;
use crate::shared::composite_job::CompositeJob;
use crate::shared::geometry::Size;
use crate::shared::image_buffer::ImageBuffer;

use super::frame_compositor::{FrameCompositor, FrameOutcome};

/// What a video export calls per frame.
///
/// `configure` runs once before the first frame; `process_frame` may then
/// run concurrently on any number of frames.
pub trait FrameFilter: Send + Sync {
    fn configure(&mut self, render_size: Size, job: Arc<CompositeJob>);

    fn process_frame(&self, frame: &ImageBuffer) -> FrameOutcome;
}

/// Runs the [`FrameCompositor`] with a fixed detector and job.
pub struct CompositingFrameFilter {
    compositor: FrameCompositor,
    detector: Box<dyn FaceDetector>,
    job: Option<Arc<CompositeJob>>,
    render_size: Option<Size>,
}

impl CompositingFrameFilter {
    pub fn new(compositor: FrameCompositor, detector: Box<dyn FaceDetector>) -> Self {
        Self {
            compositor,
            detector,
            job: None,
            render_size: None,
        }
    }

    pub fn render_size(&self) -> Option<Size> {
        self.render_size
    }

    pub fn is_configured(&self) -> bool {
        self.job.is_some()
    }
}

impl FrameFilter for CompositingFrameFilter {
    fn configure(&mut self, render_size: Size, job: Arc<CompositeJob>) {
        log::debug!(
            "Configured filter for {}x{} with {} target(s)",
            render_size.width,
            render_size.height,
            job.targets().len()
        );
        self.render_size = Some(render_size);
        self.job = Some(job);
    }

    /// Frames arriving before `configure` pass through unchanged and flagged.
    fn process_frame(&self, frame: &ImageBuffer) -> FrameOutcome {
        let Some(job) = &self.job else {
            log::warn!("Frame {} arrived before configure", frame.index());
            return FrameOutcome {
                frame: frame.clone(),
                passed_through: true,
                blurred_regions: 0,
            };
        };
        if let Some(size) = self.render_size {
            if size != frame.size() {
                log::trace!(
                    "Frame {} is {}x{}, render size {}x{}",
                    frame.index(),
                    frame.width(),
                    frame.height(),
                    size.width,
                    size.height
                );
            }
        }
        self.compositor.process(frame, job, self.detector.as_ref())
    }
}
