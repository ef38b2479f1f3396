use crate::shared::composite_job::{BlurTarget, TargetId};
use crate::shared::geometry::{Rect, Size};

use super::face_region::FaceRegion;

/// Maps rectangles from the reference frame to the frame being processed.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CoordinateSpace {
    pub reference: Size,
    pub frame: Size,
}

impl CoordinateSpace {
    pub fn new(reference: Size, frame: Size) -> Self {
        Self { reference, frame }
    }

    pub fn to_frame(&self, rect: &Rect) -> Rect {
        if self.reference.is_empty() {
            return *rect;
        }
        rect.scaled(
            self.frame.width as f64 / self.reference.width as f64,
            self.frame.height as f64 / self.reference.height as f64,
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum MatchSource {
    /// Followed a face detected in this frame.
    Tracked { distance: f64 },
    /// No usable face; blur stays at the target's reference position.
    Fallback,
}

/// Where a target should be blurred in the current frame.
#[derive(Clone, Debug, PartialEq)]
pub struct MatchedRegion {
    pub target_id: TargetId,
    /// Rectangle in current-frame pixel coordinates.
    pub rect: Rect,
    pub source: MatchSource,
}

impl MatchedRegion {
    pub fn is_tracked(&self) -> bool {
        matches!(self.source, MatchSource::Tracked { .. })
    }
}

/// Nearest-centroid matching of user targets to the faces of one frame.
///
/// Stateless: the result depends only on the arguments, so frames can be
/// matched in any order and from any thread. Several targets may follow the
/// same face.
#[derive(Clone, Debug, Default)]
pub struct FaceMatcher {
    max_distance: Option<f64>,
}

impl FaceMatcher {
    /// `max_distance` in current-frame pixels. `None` accepts the nearest face
    /// however far away it is.
    pub fn new(max_distance: Option<f64>) -> Self {
        Self { max_distance }
    }

    pub fn max_distance(&self) -> Option<f64> {
        self.max_distance
    }

    pub fn match_targets(
        &self,
        targets: &[BlurTarget],
        candidates: &[FaceRegion],
        space: CoordinateSpace,
        frame_time: f64,
    ) -> Vec<MatchedRegion> {
        targets
            .iter()
            .map(|target| {
                let reference = space.to_frame(&target.reference_rect);
                let region = match self.nearest(&reference, candidates) {
                    Some((face, distance)) => MatchedRegion {
                        target_id: target.id,
                        rect: face.rect,
                        source: MatchSource::Tracked { distance },
                    },
                    None => MatchedRegion {
                        target_id: target.id,
                        rect: reference,
                        source: MatchSource::Fallback,
                    },
                };
                log::trace!(
                    "t={frame_time:.3}s target {} -> {:?}",
                    target.id,
                    region.source
                );
                region
            })
            .collect()
    }

    fn nearest<'a>(
        &self,
        reference: &Rect,
        candidates: &'a [FaceRegion],
    ) -> Option<(&'a FaceRegion, f64)> {
        let anchor = reference.center();
        candidates
            .iter()
            .filter(|face| !face.rect.is_empty())
            .map(|face| (face, face.center().distance_to(anchor)))
            .filter(|(_, d)| d.is_finite())
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .filter(|(_, d)| self.max_distance.map_or(true, |max| *d <= max))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::geometry::Point;
    use approx::assert_relative_eq;

    const SIZE: Size = Size {
        width: 1000,
        height: 1000,
    };

    fn same_space() -> CoordinateSpace {
        CoordinateSpace::new(SIZE, SIZE)
    }

    fn face_at(x: f64, y: f64) -> FaceRegion {
        FaceRegion::new(Rect::from_center(Point::new(x, y), 40.0, 40.0), 0.9)
    }

    fn target_at(id: TargetId, x: f64, y: f64) -> BlurTarget {
        BlurTarget::new(id, Rect::from_center(Point::new(x, y), 40.0, 40.0))
    }

    #[test]
    fn test_picks_nearest_candidate() {
        let near = face_at(102.0, 98.0);
        let far = face_at(500.0, 500.0);
        let matched = FaceMatcher::default().match_targets(
            &[target_at(1, 100.0, 100.0)],
            &[far, near.clone()],
            same_space(),
            0.0,
        );
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].rect, near.rect);
        assert!(matched[0].is_tracked());
        match matched[0].source {
            MatchSource::Tracked { distance } => assert_relative_eq!(distance, 8f64.sqrt()),
            MatchSource::Fallback => panic!("expected a tracked match"),
        }
    }

    #[test]
    fn test_no_candidates_falls_back_to_reference() {
        let target = target_at(4, 100.0, 100.0);
        let matched = FaceMatcher::default().match_targets(&[target.clone()], &[], same_space(), 0.0);
        assert_eq!(matched[0].rect, target.reference_rect);
        assert_eq!(matched[0].source, MatchSource::Fallback);
        assert_eq!(matched[0].target_id, 4);
    }

    #[test]
    fn test_unbounded_matcher_accepts_distant_face() {
        let far = face_at(900.0, 900.0);
        let matched = FaceMatcher::new(None).match_targets(
            &[target_at(1, 50.0, 50.0)],
            &[far.clone()],
            same_space(),
            0.0,
        );
        assert_eq!(matched[0].rect, far.rect);
    }

    #[test]
    fn test_max_distance_rejects_distant_face() {
        let target = target_at(1, 50.0, 50.0);
        let matched = FaceMatcher::new(Some(100.0)).match_targets(
            &[target.clone()],
            &[face_at(900.0, 900.0)],
            same_space(),
            0.0,
        );
        assert_eq!(matched[0].source, MatchSource::Fallback);
        assert_eq!(matched[0].rect, target.reference_rect);
    }

    #[test]
    fn test_one_region_per_target_in_order() {
        let matched = FaceMatcher::default().match_targets(
            &[target_at(1, 100.0, 100.0), target_at(2, 800.0, 800.0)],
            &[face_at(110.0, 100.0), face_at(790.0, 800.0)],
            same_space(),
            0.5,
        );
        assert_eq!(matched.len(), 2);
        assert_eq!(matched[0].target_id, 1);
        assert_eq!(matched[0].rect.center(), Point::new(110.0, 100.0));
        assert_eq!(matched[1].target_id, 2);
        assert_eq!(matched[1].rect.center(), Point::new(790.0, 800.0));
    }

    #[test]
    fn test_empty_candidate_rects_are_ignored() {
        let target = target_at(1, 100.0, 100.0);
        let degenerate = FaceRegion::new(Rect::new(100.0, 100.0, 0.0, 0.0), 0.9);
        let matched =
            FaceMatcher::default().match_targets(&[target.clone()], &[degenerate], same_space(), 0.0);
        assert_eq!(matched[0].source, MatchSource::Fallback);
    }

    #[test]
    fn test_reference_rect_scaled_into_frame_space() {
        // Marked at (100, 100) on a 1000x1000 reference, frame is half size.
        let space = CoordinateSpace::new(SIZE, Size::new(500, 500));
        let matched = FaceMatcher::default().match_targets(
            &[target_at(1, 100.0, 100.0)],
            &[face_at(52.0, 50.0), face_at(100.0, 100.0)],
            space,
            0.0,
        );
        assert_eq!(matched[0].rect.center(), Point::new(52.0, 50.0));

        let fallback = FaceMatcher::default().match_targets(&[target_at(1, 100.0, 100.0)], &[], space, 0.0);
        assert_eq!(fallback[0].rect, Rect::new(40.0, 40.0, 20.0, 20.0));
    }
}
