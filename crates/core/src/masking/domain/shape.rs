use serde::{Deserialize, Serialize};

use crate::detection::domain::face_region::FaceRegion;
use crate::shared::geometry::Point;

/// A freehand stroke in source image pixel coordinates.
///
/// One point means "tap": a filled circle. Two or more points form a closed
/// polygon.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BlurPath {
    pub points: Vec<Point>,
}

impl BlurPath {
    pub fn new(points: Vec<Point>) -> Self {
        Self { points }
    }

    pub fn tap(at: Point) -> Self {
        Self { points: vec![at] }
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn scaled(&self, factor: f64) -> BlurPath {
        BlurPath {
            points: self.points.iter().map(|p| p.scaled(factor, factor)).collect(),
        }
    }

    pub fn is_finite(&self) -> bool {
        self.points.iter().all(|p| p.x.is_finite() && p.y.is_finite())
    }
}

/// Something the user asked to blur.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Shape {
    Path(BlurPath),
    Face(FaceRegion),
}

impl Shape {
    /// Same shape in a uniformly rescaled coordinate space.
    pub fn scaled(&self, factor: f64) -> Shape {
        match self {
            Shape::Path(path) => Shape::Path(path.scaled(factor)),
            Shape::Face(face) => Shape::Face(face.scaled(factor, factor)),
        }
    }
}
