use serde::{Deserialize, Serialize};

use crate::shared::geometry::{Point, Rect};

use super::face_landmarks::FaceLandmarks;

/// A face candidate reported by a detector, in source image pixel coordinates.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FaceRegion {
    pub rect: Rect,
    pub confidence: f64,
    #[serde(default)]
    pub landmarks: Option<FaceLandmarks>,
}

impl FaceRegion {
    pub fn new(rect: Rect, confidence: f64) -> Self {
        Self {
            rect,
            confidence: confidence.clamp(0.0, 1.0),
            landmarks: None,
        }
    }

    pub fn with_landmarks(mut self, landmarks: FaceLandmarks) -> Self {
        self.landmarks = Some(landmarks);
        self
    }

    pub fn center(&self) -> Point {
        self.rect.center()
    }

    /// `None` when the detector supplied no landmark data at all.
    pub fn landmark_completeness(&self) -> Option<f64> {
        self.landmarks.as_ref().map(FaceLandmarks::completeness)
    }

    /// Same face with the rectangle scaled per axis (coordinate-space change).
    pub fn scaled(&self, sx: f64, sy: f64) -> FaceRegion {
        let landmarks = self.landmarks.as_ref().map(|lm| FaceLandmarks {
            left_eye: lm.left_eye.map(|p| p.scaled(sx, sy)),
            right_eye: lm.right_eye.map(|p| p.scaled(sx, sy)),
            nose: lm.nose.map(|p| p.scaled(sx, sy)),
            mouth: lm.mouth.map(|p| p.scaled(sx, sy)),
        });
        FaceRegion {
            rect: self.rect.scaled(sx, sy),
            confidence: self.confidence,
            landmarks,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_confidence_clamped() {
        let f = FaceRegion::new(Rect::new(0.0, 0.0, 10.0, 10.0), 1.7);
        assert_relative_eq!(f.confidence, 1.0);
    }

    #[test]
    fn test_completeness_absent_without_landmarks() {
        let f = FaceRegion::new(Rect::new(0.0, 0.0, 10.0, 10.0), 0.9);
        assert!(f.landmark_completeness().is_none());
    }

    #[test]
    fn test_completeness_with_empty_landmarks_is_zero() {
        let f = FaceRegion::new(Rect::new(0.0, 0.0, 10.0, 10.0), 0.9)
            .with_landmarks(FaceLandmarks::default());
        assert_eq!(f.landmark_completeness(), Some(0.0));
    }

    #[test]
    fn test_scaled_moves_rect_and_landmarks() {
        let f = FaceRegion::new(Rect::new(10.0, 20.0, 30.0, 40.0), 0.8).with_landmarks(
            FaceLandmarks {
                nose: Some(Point::new(25.0, 40.0)),
                ..Default::default()
            },
        );
        let s = f.scaled(0.5, 0.5);
        assert_eq!(s.rect, Rect::new(5.0, 10.0, 15.0, 20.0));
        assert_eq!(s.landmarks.unwrap().nose, Some(Point::new(12.5, 20.0)));
        assert_relative_eq!(s.confidence, 0.8);
    }
}
