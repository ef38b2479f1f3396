use crate::shared::geometry::Size;

use super::face_region::FaceRegion;

/// Tunable "usable face" policy.
///
/// Weights sum to 1.0 so the composite score stays in [0, 1]. The floors
/// are hard gates applied independently of the composite score.
#[derive(Clone, Debug, PartialEq)]
pub struct QualityPolicy {
    pub confidence_weight: f64,
    pub landmark_weight: f64,
    pub aspect_weight: f64,
    pub size_weight: f64,
    pub centeredness_weight: f64,
    pub min_score: f64,
    pub min_confidence: f64,
    pub min_landmark_completeness: f64,
    /// Area fractions between these bounds get the full size factor.
    pub preferred_area: (f64, f64),
    /// Area fraction at which the size factor falls back to zero.
    pub max_area: f64,
}

impl Default for QualityPolicy {
    fn default() -> Self {
        Self {
            confidence_weight: 0.30,
            landmark_weight: 0.25,
            aspect_weight: 0.20,
            size_weight: 0.15,
            centeredness_weight: 0.10,
            min_score: 0.75,
            min_confidence: 0.70,
            min_landmark_completeness: 0.75,
            preferred_area: (0.01, 0.10),
            max_area: 0.50,
        }
    }
}

/// Per-factor values in [0, 1], before weighting.
#[derive(Clone, Debug, PartialEq)]
pub struct QualityFactors {
    pub confidence: f64,
    pub landmarks: f64,
    pub aspect: f64,
    pub size: f64,
    pub centeredness: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FaceQuality {
    pub passes: bool,
    pub score: f64,
    pub factors: QualityFactors,
}

/// Rejects the cheap detector's false positives (text, patterns) before they
/// are blurred or used for tracking.
#[derive(Clone, Debug, Default)]
pub struct FaceQualityScorer {
    policy: QualityPolicy,
}

impl FaceQualityScorer {
    pub fn new(policy: QualityPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &QualityPolicy {
        &self.policy
    }

    pub fn score(&self, face: &FaceRegion, image_size: Size) -> FaceQuality {
        let p = &self.policy;
        let completeness = face.landmark_completeness();

        let factors = QualityFactors {
            confidence: face.confidence.clamp(0.0, 1.0),
            landmarks: completeness.unwrap_or(0.0),
            aspect: aspect_factor(face),
            size: self.size_factor(face, image_size),
            centeredness: centeredness_factor(face, image_size),
        };

        let score = (factors.confidence * p.confidence_weight
            + factors.landmarks * p.landmark_weight
            + factors.aspect * p.aspect_weight
            + factors.size * p.size_weight
            + factors.centeredness * p.centeredness_weight)
            .clamp(0.0, 1.0);

        let landmarks_ok = completeness.map_or(true, |c| c >= p.min_landmark_completeness);
        let passes =
            score >= p.min_score && factors.confidence >= p.min_confidence && landmarks_ok;

        FaceQuality {
            passes,
            score,
            factors,
        }
    }

    /// Keeps the faces that pass the policy, in detection order.
    pub fn filter(&self, faces: &[FaceRegion], image_size: Size) -> Vec<FaceRegion> {
        faces
            .iter()
            .filter(|f| {
                let quality = self.score(f, image_size);
                if !quality.passes {
                    log::trace!(
                        "Rejected face at ({:.0}, {:.0}): score {:.2}, confidence {:.2}",
                        f.rect.x,
                        f.rect.y,
                        quality.score,
                        f.confidence
                    );
                }
                quality.passes
            })
            .cloned()
            .collect()
    }

    /// Linear ramp up to the preferred band, flat inside it, linear fall-off
    /// above it.
    fn size_factor(&self, face: &FaceRegion, image_size: Size) -> f64 {
        let image_area = image_size.area();
        if image_area <= 0.0 {
            return 0.0;
        }
        let ratio = face.rect.area() / image_area;
        let (low, high) = self.policy.preferred_area;
        let factor = if ratio < low {
            ratio / low
        } else if ratio <= high {
            1.0
        } else {
            1.0 - (ratio - high) / (self.policy.max_area - high)
        };
        factor.clamp(0.0, 1.0)
    }
}

fn aspect_factor(face: &FaceRegion) -> f64 {
    if face.rect.height <= 0.0 {
        return 0.0;
    }
    (1.0 - (face.rect.width / face.rect.height - 1.0).abs()).max(0.0)
}

/// 1.0 at the image center, 0.0 at a corner.
fn centeredness_factor(face: &FaceRegion, image_size: Size) -> f64 {
    let half_diagonal = (image_size.width as f64).hypot(image_size.height as f64) / 2.0;
    if half_diagonal <= 0.0 {
        return 0.0;
    }
    let distance = face.center().distance_to(image_size.bounds().center());
    (1.0 - distance / half_diagonal).clamp(0.0, 1.0)
}
