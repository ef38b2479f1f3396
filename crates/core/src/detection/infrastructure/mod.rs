pub mod precomputed_face_detector;
