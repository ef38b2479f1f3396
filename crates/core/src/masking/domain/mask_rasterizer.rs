use thiserror::Error;

use crate::shared::geometry::Size;

use super::blur_mask::BlurMask;
use super::shape::Shape;

#[derive(Error, Debug, PartialEq)]
pub enum MaskError {
    #[error("cannot rasterize a mask for an empty {0}x{1} image")]
    EmptyImage(u32, u32),
    #[error("shape {0} has non-finite coordinates")]
    NonFiniteShape(usize),
}

/// Domain interface for turning shapes into a blend mask.
///
/// This is the pluggable shape-to-mask strategy of the photo pipeline.
pub trait MaskRasterizer: Send + Sync {
    fn rasterize(&self, shapes: &[Shape], size: Size) -> Result<BlurMask, MaskError>;
}
