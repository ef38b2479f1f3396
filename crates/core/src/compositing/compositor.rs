use thiserror::Error;

use crate::masking::domain::blur_mask::BlurMask;
use crate::shared::geometry::Size;
use crate::shared::image_buffer::{ImageBuffer, CHANNELS};

#[derive(Error, Debug, PartialEq)]
pub enum CompositeError {
    #[error("buffer size mismatch: original {original:?}, blurred {blurred:?}, mask {mask:?}")]
    DimensionMismatch {
        original: Size,
        blurred: Size,
        mask: Size,
    },
}

/// Per-pixel blend of a sharp and a blurred buffer through a mask.
///
/// `out.rgb = original.rgb * (1 - m) + blurred.rgb * m` with `m = mask / 255`,
/// rounded to the nearest integer. Alpha always comes from `original`.
#[derive(Clone, Copy, Debug, Default)]
pub struct Compositor;

impl Compositor {
    pub fn new() -> Self {
        Self
    }

    /// Blends the buffers.
    ///
    /// # Panics
    ///
    /// When the three sizes differ. That is a wiring bug in the caller, not a
    /// condition to recover from; use [`Compositor::try_composite`] to check.
    pub fn composite(
        &self,
        original: &ImageBuffer,
        blurred: &ImageBuffer,
        mask: &BlurMask,
    ) -> ImageBuffer {
        self.try_composite(original, blurred, mask)
            .unwrap_or_else(|e| panic!("{e}"))
    }

    pub fn try_composite(
        &self,
        original: &ImageBuffer,
        blurred: &ImageBuffer,
        mask: &BlurMask,
    ) -> Result<ImageBuffer, CompositeError> {
        if original.size() != blurred.size() || original.size() != mask.size() {
            return Err(CompositeError::DimensionMismatch {
                original: original.size(),
                blurred: blurred.size(),
                mask: mask.size(),
            });
        }

        let mut data = original.data().to_vec();
        for ((out, blur), &m) in data
            .chunks_exact_mut(CHANNELS)
            .zip(blurred.data().chunks_exact(CHANNELS))
            .zip(mask.data())
        {
            if m == 0 {
                continue;
            }
            for c in 0..3 {
                out[c] = blend_channel(out[c], blur[c], m);
            }
        }

        Ok(ImageBuffer::new(
            data,
            original.width(),
            original.height(),
            original.index(),
        ))
    }
}

/// Integer blend with round-half-up; the result always lies between the
/// two inputs.
fn blend_channel(original: u8, blurred: u8, alpha: u8) -> u8 {
    let a = alpha as u32;
    ((original as u32 * (255 - a) + blurred as u32 * a + 127) / 255) as u8
}
