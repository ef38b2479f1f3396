use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::geometry::{Rect, Size};

/// Opaque identity of a user-marked region.
pub type TargetId = u32;

#[derive(Error, Debug, PartialEq)]
pub enum JobError {
    #[error("reference frame size must be non-zero, got {0}x{1}")]
    EmptyReferenceFrame(u32, u32),
    #[error("blur strength must be finite and non-negative, got {0}")]
    InvalidStrength(f64),
    #[error("target {0} has an empty reference rectangle")]
    EmptyTarget(TargetId),
    #[error("target {0} has a non-finite reference rectangle")]
    NonFiniteTarget(TargetId),
    #[error("target id {0} is used more than once")]
    DuplicateTarget(TargetId),
}

/// A region the user marked on the reference frame.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BlurTarget {
    pub id: TargetId,
    /// Rectangle in reference-frame pixel coordinates.
    pub reference_rect: Rect,
    /// Overrides the job strength for this target.
    #[serde(default)]
    pub strength: Option<f64>,
}

impl BlurTarget {
    pub fn new(id: TargetId, reference_rect: Rect) -> Self {
        Self {
            id,
            reference_rect,
            strength: None,
        }
    }

    pub fn with_strength(mut self, strength: f64) -> Self {
        self.strength = Some(strength);
        self
    }
}

/// Immutable snapshot of an export job's blur configuration.
///
/// Built once before export and shared read-only (usually behind an `Arc`)
/// by every concurrent frame call. There are no mutators: changing targets
/// or strength means building a new job.
#[derive(Clone, Debug, PartialEq)]
pub struct CompositeJob {
    strength: f64,
    targets: Vec<BlurTarget>,
    reference_size: Size,
}

impl CompositeJob {
    pub fn new(
        strength: f64,
        targets: Vec<BlurTarget>,
        reference_size: Size,
    ) -> Result<Self, JobError> {
        if reference_size.is_empty() {
            return Err(JobError::EmptyReferenceFrame(
                reference_size.width,
                reference_size.height,
            ));
        }
        validate_strength(strength)?;

        let mut seen = HashSet::with_capacity(targets.len());
        for target in &targets {
            if !seen.insert(target.id) {
                return Err(JobError::DuplicateTarget(target.id));
            }
            let r = target.reference_rect;
            if ![r.x, r.y, r.width, r.height].iter().all(|v| v.is_finite()) {
                return Err(JobError::NonFiniteTarget(target.id));
            }
            if r.is_empty() {
                return Err(JobError::EmptyTarget(target.id));
            }
            if let Some(s) = target.strength {
                validate_strength(s)?;
            }
        }

        Ok(Self {
            strength,
            targets,
            reference_size,
        })
    }

    pub fn strength(&self) -> f64 {
        self.strength
    }

    pub fn targets(&self) -> &[BlurTarget] {
        &self.targets
    }

    pub fn reference_size(&self) -> Size {
        self.reference_size
    }

    pub fn strength_for(&self, target: &BlurTarget) -> f64 {
        target.strength.unwrap_or(self.strength)
    }
}

fn validate_strength(strength: f64) -> Result<(), JobError> {
    if strength.is_finite() && strength >= 0.0 {
        Ok(())
    } else {
        Err(JobError::InvalidStrength(strength))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    fn rect() -> Rect {
        Rect::new(10.0, 10.0, 50.0, 50.0)
    }

    #[test]
    fn test_valid_job() {
        let job = CompositeJob::new(
            20.0,
            vec![BlurTarget::new(1, rect()), BlurTarget::new(2, rect())],
            Size::new(640, 480),
        )
        .unwrap();
        assert_eq!(job.targets().len(), 2);
        assert_eq!(job.reference_size(), Size::new(640, 480));
        assert_relative_eq!(job.strength(), 20.0);
    }

    #[test]
    fn test_empty_targets_allowed() {
        assert!(CompositeJob::new(20.0, vec![], Size::new(10, 10)).is_ok());
    }

    #[test]
    fn test_rejects_empty_reference_frame() {
        let err = CompositeJob::new(20.0, vec![], Size::new(0, 480)).unwrap_err();
        assert_eq!(err, JobError::EmptyReferenceFrame(0, 480));
    }

    #[test]
    fn test_rejects_invalid_strength() {
        assert_eq!(
            CompositeJob::new(f64::NAN, vec![], Size::new(10, 10))
                .unwrap_err()
                .to_string(),
            "blur strength must be finite and non-negative, got NaN"
        );
        assert!(CompositeJob::new(-1.0, vec![], Size::new(10, 10)).is_err());
        let bad_target = BlurTarget::new(1, rect()).with_strength(f64::INFINITY);
        assert!(CompositeJob::new(5.0, vec![bad_target], Size::new(10, 10)).is_err());
    }

    #[test]
    fn test_rejects_duplicate_ids() {
        let err = CompositeJob::new(
            20.0,
            vec![BlurTarget::new(7, rect()), BlurTarget::new(7, rect())],
            Size::new(100, 100),
        )
        .unwrap_err();
        assert_eq!(err, JobError::DuplicateTarget(7));
    }

    #[test]
    fn test_rejects_empty_target_rect() {
        let target = BlurTarget::new(3, Rect::new(0.0, 0.0, 0.0, 10.0));
        let err = CompositeJob::new(20.0, vec![target], Size::new(100, 100)).unwrap_err();
        assert_eq!(err, JobError::EmptyTarget(3));
    }

    #[rstest]
    #[case::nan_x(Rect::new(f64::NAN, 10.0, 20.0, 20.0))]
    #[case::infinite_y(Rect::new(10.0, f64::NEG_INFINITY, 20.0, 20.0))]
    #[case::infinite_width(Rect::new(10.0, 10.0, f64::INFINITY, 20.0))]
    fn test_rejects_non_finite_target_rect(#[case] rect: Rect) {
        let err = CompositeJob::new(20.0, vec![BlurTarget::new(4, rect)], Size::new(100, 100))
            .unwrap_err();
        assert_eq!(err, JobError::NonFiniteTarget(4));
    }

    #[test]
    fn test_strength_override() {
        let plain = BlurTarget::new(1, rect());
        let strong = BlurTarget::new(2, rect()).with_strength(45.0);
        let job = CompositeJob::new(20.0, vec![plain.clone(), strong.clone()], Size::new(100, 100))
            .unwrap();
        assert_relative_eq!(job.strength_for(&plain), 20.0);
        assert_relative_eq!(job.strength_for(&strong), 45.0);
    }
}
