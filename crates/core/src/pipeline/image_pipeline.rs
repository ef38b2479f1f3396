use image::imageops::{self, FilterType};
use image::RgbaImage;

use crate::blurring::domain::blur_kernel::BlurKernel;
use crate::blurring::infrastructure::gaussian_blur_kernel::GaussianBlurKernel;
use crate::compositing::compositor::Compositor;
use crate::masking::domain::mask_rasterizer::MaskRasterizer;
use crate::masking::domain::shape::Shape;
use crate::masking::infrastructure::shape_mask_rasterizer::{
    FaceMaskPolicy, PathMaskPolicy, ShapeMaskRasterizer,
};
use crate::shared::constants::{DEFAULT_BLUR_RADIUS, MAX_WORKING_SIDE};
use crate::shared::image_buffer::ImageBuffer;

#[derive(Clone, Debug, PartialEq)]
pub struct ImagePipelineConfig {
    /// Longest side of the working buffer. Larger inputs are downscaled.
    pub max_side: u32,
    /// Radius used by [`ImagePipeline::apply`].
    pub radius: f64,
}

impl Default for ImagePipelineConfig {
    fn default() -> Self {
        Self {
            max_side: MAX_WORKING_SIDE,
            radius: DEFAULT_BLUR_RADIUS,
        }
    }
}

/// Still-photo blur: downscale, blur, mask, composite.
///
/// The output is at the working resolution, not the source resolution.
/// Mask or blur failures are logged and yield the unblurred working image.
pub struct ImagePipeline {
    kernel: Box<dyn BlurKernel>,
    rasterizer: Box<dyn MaskRasterizer>,
    compositor: Compositor,
    config: ImagePipelineConfig,
}

impl ImagePipeline {
    pub fn new(
        kernel: Box<dyn BlurKernel>,
        rasterizer: Box<dyn MaskRasterizer>,
        config: ImagePipelineConfig,
    ) -> Self {
        Self {
            kernel,
            rasterizer,
            compositor: Compositor::new(),
            config,
        }
    }

    /// Preset for user-drawn paths.
    pub fn for_paths() -> Self {
        Self::new(
            Box::new(GaussianBlurKernel::new()),
            Box::new(ShapeMaskRasterizer::default()),
            ImagePipelineConfig::default(),
        )
    }

    /// Preset for detected faces, with the given expansion and feather policy.
    pub fn for_faces(face_policy: FaceMaskPolicy) -> Self {
        Self::new(
            Box::new(GaussianBlurKernel::new()),
            Box::new(ShapeMaskRasterizer::new(PathMaskPolicy::default(), face_policy)),
            ImagePipelineConfig::default(),
        )
    }

    pub fn config(&self) -> &ImagePipelineConfig {
        &self.config
    }

    /// [`ImagePipeline::apply_blur`] at the configured radius.
    pub fn apply(&self, image: &ImageBuffer, shapes: &[Shape]) -> ImageBuffer {
        self.apply_blur(image, shapes, self.config.radius)
    }

    /// Blurs `shapes` (given in source pixel coordinates) into `image`.
    pub fn apply_blur(&self, image: &ImageBuffer, shapes: &[Shape], radius: f64) -> ImageBuffer {
        let (working, factor) = downscale_to(image, self.config.max_side);
        if shapes.is_empty() {
            return working;
        }

        let scaled: Vec<Shape> = if factor == 1.0 {
            shapes.to_vec()
        } else {
            shapes.iter().map(|s| s.scaled(factor)).collect()
        };

        let blurred = match self.kernel.blur(&working, radius) {
            Ok(b) => b,
            Err(e) => {
                log::warn!("Blur failed, returning unblurred image: {e}");
                return working;
            }
        };
        let mask = match self.rasterizer.rasterize(&scaled, working.size()) {
            Ok(m) => m,
            Err(e) => {
                log::warn!("Mask creation failed, returning unblurred image: {e}");
                return working;
            }
        };
        log::debug!(
            "Composited {} shape(s) at {}x{} (scale {factor:.3}, radius {radius})",
            scaled.len(),
            working.width(),
            working.height()
        );

        self.compositor.composite(&working, &blurred, &mask)
    }
}

/// Uniform downscale so the longest side is at most `max_side`. Never upscales.
/// Returns the working image and the factor applied to coordinates.
fn downscale_to(image: &ImageBuffer, max_side: u32) -> (ImageBuffer, f64) {
    let longest = image.size().max_side();
    if max_side == 0 || longest <= max_side {
        return (image.clone(), 1.0);
    }

    let factor = max_side as f64 / longest as f64;
    let w = ((image.width() as f64 * factor).round() as u32).clamp(1, max_side);
    let h = ((image.height() as f64 * factor).round() as u32).clamp(1, max_side);

    let Some(src) = RgbaImage::from_raw(image.width(), image.height(), image.data().to_vec())
    else {
        return (image.clone(), 1.0);
    };
    let resized = imageops::resize(&src, w, h, FilterType::Triangle);
    (
        ImageBuffer::new(resized.into_raw(), w, h, image.index()),
        factor,
    )
}
