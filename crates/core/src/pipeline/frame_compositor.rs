use crate::blurring::domain::blur_kernel::BlurKernel;
use crate::blurring::infrastructure::gaussian_blur_kernel::GaussianBlurKernel;
use crate::compositing::compositor::Compositor;
use crate::detection::domain::face_detector::FaceDetector;
use crate::detection::domain::face_matcher::{CoordinateSpace, FaceMatcher};
use crate::detection::domain::face_quality_scorer::{FaceQualityScorer, QualityPolicy};
use crate::masking::infrastructure::shape_mask_rasterizer::{
    FaceMaskPolicy, PathMaskPolicy, ShapeMaskRasterizer,
};
use crate::shared::composite_job::CompositeJob;
use crate::shared::constants::{DEBUG_CENTER_FRACTION, DEFAULT_REGION_INSET};
use crate::shared::geometry::Rect;
use crate::shared::image_buffer::ImageBuffer;

#[derive(Clone, Debug, PartialEq)]
pub struct FrameCompositorConfig {
    /// Pixels added on every side of a matched region before blurring.
    pub inset: f64,
    /// Cutoff for following a detected face, in frame pixels.
    pub max_match_distance: Option<f64>,
    /// Drop faces that fail `quality` before matching.
    pub quality_filter: bool,
    pub quality: QualityPolicy,
    /// Feather layers used for the per-region ellipse.
    pub face_mask: FaceMaskPolicy,
    /// Blur the frame center when nothing else was blurred. Diagnostic only.
    pub debug_center_fallback: bool,
    /// Frame rate used to turn frame indices into timestamps; 0 for stills.
    pub fps: f64,
}

impl Default for FrameCompositorConfig {
    fn default() -> Self {
        Self {
            inset: DEFAULT_REGION_INSET,
            max_match_distance: None,
            quality_filter: true,
            quality: QualityPolicy::default(),
            face_mask: FaceMaskPolicy::default(),
            debug_center_fallback: false,
            fps: 0.0,
        }
    }
}

/// Result of processing one frame.
#[derive(Clone, Debug, PartialEq)]
pub struct FrameOutcome {
    pub frame: ImageBuffer,
    /// The frame failed and is the unmodified input.
    pub passed_through: bool,
    pub blurred_regions: usize,
}

impl FrameOutcome {
    fn pass_through(frame: &ImageBuffer) -> Self {
        Self {
            frame: frame.clone(),
            passed_through: true,
            blurred_regions: 0,
        }
    }
}

/// Per-frame entry point of a video export.
///
/// Holds no per-frame state: `process` may run concurrently and out of
/// order on any number of frames, all sharing one job and one detector.
pub struct FrameCompositor {
    kernel: Box<dyn BlurKernel>,
    rasterizer: ShapeMaskRasterizer,
    compositor: Compositor,
    matcher: FaceMatcher,
    scorer: FaceQualityScorer,
    config: FrameCompositorConfig,
}

impl FrameCompositor {
    pub fn new(kernel: Box<dyn BlurKernel>, config: FrameCompositorConfig) -> Self {
        Self {
            kernel,
            rasterizer: ShapeMaskRasterizer::new(
                PathMaskPolicy::default(),
                config.face_mask.clone(),
            ),
            compositor: Compositor::new(),
            matcher: FaceMatcher::new(config.max_match_distance),
            scorer: FaceQualityScorer::new(config.quality.clone()),
            config,
        }
    }

    pub fn config(&self) -> &FrameCompositorConfig {
        &self.config
    }

    /// Blurs every target of `job` in `frame`, following the face the
    /// detector reports nearest to it. A detector or blur failure yields
    /// the original frame, flagged as passed through.
    pub fn process(
        &self,
        frame: &ImageBuffer,
        job: &CompositeJob,
        detector: &dyn FaceDetector,
    ) -> FrameOutcome {
        let faces = match detector.detect(frame) {
            Ok(faces) => faces,
            Err(e) => {
                log::warn!("Frame {}: detection failed, passing through: {e}", frame.index());
                return FrameOutcome::pass_through(frame);
            }
        };
        let candidates = if self.config.quality_filter {
            self.scorer.filter(&faces, frame.size())
        } else {
            faces
        };

        let space = CoordinateSpace::new(job.reference_size(), frame.size());
        let regions =
            self.matcher
                .match_targets(job.targets(), &candidates, space, self.frame_time(frame));

        let mut out = frame.clone();
        let mut blurred = 0;
        for (region, target) in regions.iter().zip(job.targets()) {
            match self.blur_region(&mut out, region.rect, job.strength_for(target)) {
                Ok(true) => blurred += 1,
                Ok(false) => {}
                Err(e) => {
                    log::warn!("Frame {}: blur failed, passing through: {e}", frame.index());
                    return FrameOutcome::pass_through(frame);
                }
            }
        }

        if blurred == 0 && self.config.debug_center_fallback {
            let size = frame.size();
            let center = Rect::from_center(
                size.bounds().center(),
                size.width as f64 * DEBUG_CENTER_FRACTION,
                size.height as f64 * DEBUG_CENTER_FRACTION,
            );
            log::debug!("Frame {}: nothing matched, blurring center", frame.index());
            match self.blur_region(&mut out, center, job.strength()) {
                Ok(hit) => blurred += usize::from(hit),
                Err(e) => {
                    log::warn!("Frame {}: blur failed, passing through: {e}", frame.index());
                    return FrameOutcome::pass_through(frame);
                }
            }
        }

        log::trace!(
            "Frame {}: {} candidate(s), {blurred} region(s) blurred",
            frame.index(),
            candidates.len()
        );
        FrameOutcome {
            frame: out,
            passed_through: false,
            blurred_regions: blurred,
        }
    }

    /// Blurs the ellipse inscribed in `rect` grown by the inset. Returns
    /// `false` when the region misses the frame.
    fn blur_region(
        &self,
        out: &mut ImageBuffer,
        rect: Rect,
        strength: f64,
    ) -> Result<bool, Box<dyn std::error::Error>> {
        let grown = rect.inflated(self.config.inset);
        let Some(pixels) = grown.to_pixel_rect(out.size()) else {
            return Ok(false);
        };

        let patch = out.crop(pixels);
        let blurred = self.kernel.blur(&patch, strength)?;
        let local = Rect::new(
            grown.x - pixels.x as f64,
            grown.y - pixels.y as f64,
            grown.width,
            grown.height,
        );
        let mask = self.rasterizer.ellipse_mask(local, patch.size());
        let composited = self.compositor.try_composite(&patch, &blurred, &mask)?;
        out.paste(&composited, pixels);
        Ok(true)
    }

    fn frame_time(&self, frame: &ImageBuffer) -> f64 {
        if self.config.fps > 0.0 {
            frame.index() as f64 / self.config.fps
        } else {
            0.0
        }
    }
}

impl Default for FrameCompositor {
    fn default() -> Self {
        Self::new(
            Box::new(GaussianBlurKernel::new()),
            FrameCompositorConfig::default(),
        )
    }
}
