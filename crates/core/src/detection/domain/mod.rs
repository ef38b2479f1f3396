pub mod face_detector;
pub mod face_landmarks;
pub mod face_matcher;
pub mod face_quality_scorer;
pub mod face_region;
