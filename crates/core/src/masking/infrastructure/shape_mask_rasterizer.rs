use crate::detection::domain::face_region::FaceRegion;
use crate::masking::domain::blur_mask::BlurMask;
use crate::masking::domain::mask_rasterizer::{MaskError, MaskRasterizer};
use crate::masking::domain::shape::{BlurPath, Shape};
use crate::shared::constants::{FACE_ASPECT_RATIO, FACE_EXPANSION_FACTOR, TAP_CIRCLE_RADIUS_FRACTION};
use crate::shared::geometry::{Rect, Size};

use super::scanline;

/// One concentric ellipse of the face feather.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FeatherLayer {
    /// Inset of each side, as a fraction of the face ellipse's size.
    pub inset: f64,
    pub alpha: u8,
}

/// How face rectangles become feathered ellipses.
#[derive(Clone, Debug, PartialEq)]
pub struct FaceMaskPolicy {
    pub expansion: f64,
    /// Target width:height ratio.
    pub aspect_ratio: f64,
    /// Concentric ellipses, outermost first, unioned by max. An inner layer
    /// only shows where its alpha exceeds every layer around it, so with the
    /// default 255 outer ellipse the inner 204 and 230 layers leave the mask
    /// unchanged and the visible softening is the antialiased rim.
    pub layers: Vec<FeatherLayer>,
    pub antialias: bool,
}

impl Default for FaceMaskPolicy {
    fn default() -> Self {
        Self {
            expansion: FACE_EXPANSION_FACTOR,
            aspect_ratio: FACE_ASPECT_RATIO,
            layers: vec![
                FeatherLayer {
                    inset: 0.0,
                    alpha: 255,
                },
                FeatherLayer {
                    inset: 0.15,
                    alpha: 204,
                },
                FeatherLayer {
                    inset: 0.225,
                    alpha: 230,
                },
            ],
            antialias: true,
        }
    }
}

impl FaceMaskPolicy {
    /// Expands the face around its center and fits it to the face aspect
    /// ratio, growing whichever side is short. The result is not clamped.
    pub fn fit(&self, face: &Rect) -> Rect {
        let w = face.width * self.expansion;
        let h = face.height * self.expansion;
        let height = h.max(w / self.aspect_ratio);
        let width = height * self.aspect_ratio;
        Rect::from_center(face.center(), width, height)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct PathMaskPolicy {
    /// Radius of a single-point path, as a fraction of `min(width, height)`.
    pub tap_radius_fraction: f64,
}

impl Default for PathMaskPolicy {
    fn default() -> Self {
        Self {
            tap_radius_fraction: TAP_CIRCLE_RADIUS_FRACTION,
        }
    }
}

/// Rasterizes paths hard-edged at 255 and faces as feathered ellipses.
///
/// Shapes are unioned in order; coverage saturates at 255.
#[derive(Clone, Debug, Default)]
pub struct ShapeMaskRasterizer {
    path_policy: PathMaskPolicy,
    face_policy: FaceMaskPolicy,
}

impl ShapeMaskRasterizer {
    pub fn new(path_policy: PathMaskPolicy, face_policy: FaceMaskPolicy) -> Self {
        Self {
            path_policy,
            face_policy,
        }
    }

    pub fn face_policy(&self) -> &FaceMaskPolicy {
        &self.face_policy
    }

    /// A mask holding only the feathered ellipse inscribed in `bounds`,
    /// without face expansion or aspect fitting.
    pub fn ellipse_mask(&self, bounds: Rect, size: Size) -> BlurMask {
        let mut mask = BlurMask::new(size);
        self.paint_layers(&mut mask, bounds);
        mask
    }

    fn paint_path(&self, mask: &mut BlurMask, path: &BlurPath) {
        match path.points.as_slice() {
            [] => {}
            [center] => {
                let radius = mask.size().min_side() as f64 * self.path_policy.tap_radius_fraction;
                scanline::fill_circle(mask, *center, radius, 255);
            }
            points => scanline::fill_polygon(mask, points, 255),
        }
    }

    fn paint_face(&self, mask: &mut BlurMask, face: &FaceRegion) {
        let fitted = self.face_policy.fit(&face.rect);
        if let Some(bounds) = fitted.clamp_to(mask.size()) {
            self.paint_layers(mask, bounds);
        }
    }

    fn paint_layers(&self, mask: &mut BlurMask, bounds: Rect) {
        for layer in &self.face_policy.layers {
            let ellipse = bounds.inset_by_fraction(layer.inset);
            scanline::fill_ellipse(mask, ellipse, layer.alpha, self.face_policy.antialias);
        }
    }
}

impl MaskRasterizer for ShapeMaskRasterizer {
    fn rasterize(&self, shapes: &[Shape], size: Size) -> Result<BlurMask, MaskError> {
        if size.is_empty() {
            return Err(MaskError::EmptyImage(size.width, size.height));
        }

        let mut mask = BlurMask::new(size);
        for (i, shape) in shapes.iter().enumerate() {
            match shape {
                Shape::Path(path) => {
                    if !path.is_finite() {
                        return Err(MaskError::NonFiniteShape(i));
                    }
                    self.paint_path(&mut mask, path);
                }
                Shape::Face(face) => {
                    let r = face.rect;
                    if ![r.x, r.y, r.width, r.height].iter().all(|v| v.is_finite()) {
                        return Err(MaskError::NonFiniteShape(i));
                    }
                    self.paint_face(&mut mask, face);
                }
            }
        }
        Ok(mask)
    }
}
