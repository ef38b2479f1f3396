use std::path::PathBuf;

/// Stream properties shared by readers and writers. Stills report `fps = 0`.
#[derive(Clone, Debug, PartialEq)]
pub struct VideoMetadata {
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    pub total_frames: usize,
    pub source_path: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(fps: f64) -> VideoMetadata {
        VideoMetadata {
            width: 1920,
            height: 1080,
            fps,
            total_frames: 900,
            source_path: Some(PathBuf::from("/tmp/frames")),
        }
    }

    #[test]
    fn test_construction() {
        let m = meta(30.0);
        assert_eq!(m.width, 1920);
        assert_eq!(m.height, 1080);
        assert_eq!(m.total_frames, 900);
        assert_eq!(m.source_path, Some(PathBuf::from("/tmp/frames")));
    }
}
