use crate::blurring::domain::blur_kernel::{BlurError, BlurKernel};
use crate::shared::image_buffer::{ImageBuffer, CHANNELS};

use super::gaussian::{self, GaussianKernel};

/// Radii beyond this produce an effectively uniform blur; clamping keeps the
/// kernel allocation bounded.
pub const MAX_BLUR_RADIUS: f64 = 1024.0;

/// CPU separable Gaussian blur over all four channels.
///
/// Stateless, so one instance can serve concurrent frame workers; scratch
/// buffers are allocated per call.
#[derive(Clone, Copy, Debug, Default)]
pub struct GaussianBlurKernel;

impl GaussianBlurKernel {
    pub fn new() -> Self {
        Self
    }
}

impl BlurKernel for GaussianBlurKernel {
    fn blur(&self, image: &ImageBuffer, radius: f64) -> Result<ImageBuffer, BlurError> {
        if !radius.is_finite() {
            return Err(BlurError::InvalidRadius(radius));
        }
        let mut out = image.clone();
        if radius <= 0.0 {
            return Ok(out);
        }

        let kernel = GaussianKernel::for_radius(radius.min(MAX_BLUR_RADIUS));
        let (w, h) = (image.width() as usize, image.height() as usize);
        gaussian::blur_in_place(out.data_mut(), w, h, CHANNELS, &kernel);
        Ok(out)
    }
}
