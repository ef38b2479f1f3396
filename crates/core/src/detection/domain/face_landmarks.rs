//! Facial landmark groups reported by a detector.
//!
//! The core only cares which of the four groups (left eye, right eye, nose,
//! mouth) the detector managed to locate; completeness feeds the quality
//! policy.

use serde::{Deserialize, Serialize};

use crate::shared::geometry::Point;

/// Number of landmark groups a complete detection carries.
pub const LANDMARK_GROUPS: usize = 4;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FaceLandmarks {
    #[serde(default)]
    pub left_eye: Option<Point>,
    #[serde(default)]
    pub right_eye: Option<Point>,
    #[serde(default)]
    pub nose: Option<Point>,
    #[serde(default)]
    pub mouth: Option<Point>,
}

impl FaceLandmarks {
    pub fn new(
        left_eye: Option<Point>,
        right_eye: Option<Point>,
        nose: Option<Point>,
        mouth: Option<Point>,
    ) -> Self {
        Self {
            left_eye,
            right_eye,
            nose,
            mouth,
        }
    }

    fn groups(&self) -> [Option<Point>; LANDMARK_GROUPS] {
        [self.left_eye, self.right_eye, self.nose, self.mouth]
    }

    pub fn visible_count(&self) -> usize {
        self.groups().iter().filter(|p| p.is_some()).count()
    }

    /// Fraction of landmark groups present, in [0, 1].
    pub fn completeness(&self) -> f64 {
        self.visible_count() as f64 / LANDMARK_GROUPS as f64
    }
}
