use thiserror::Error;

use crate::shared::image_buffer::ImageBuffer;

#[derive(Error, Debug, PartialEq)]
pub enum BlurError {
    #[error("blur radius must be finite, got {0}")]
    InvalidRadius(f64),
}

/// Domain interface for whole-buffer blurring.
///
/// Contract: the output has the input's size; `radius <= 0` returns a copy;
/// a larger radius never blurs less; the result is deterministic for a given
/// `(image, radius)`. Implementations are shared across frame workers and
/// must not keep per-call scratch state.
pub trait BlurKernel: Send + Sync {
    fn blur(&self, image: &ImageBuffer, radius: f64) -> Result<ImageBuffer, BlurError>;
}
