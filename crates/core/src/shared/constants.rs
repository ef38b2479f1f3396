/// Longest side of the working buffer in the photo pipeline.
pub const MAX_WORKING_SIDE: u32 = 1024;

/// Default blur radius for both photo presets, in working-buffer pixels.
pub const DEFAULT_BLUR_RADIUS: f64 = 70.0;

/// Single-point paths become circles with this fraction of `min(width, height)`.
pub const TAP_CIRCLE_RADIUS_FRACTION: f64 = 0.05;

/// Face rectangles grow by this factor around their center before masking.
pub const FACE_EXPANSION_FACTOR: f64 = 1.3;

/// Face-like width:height ratio the expanded rectangle is fit to.
pub const FACE_ASPECT_RATIO: f64 = 0.8;

/// Pixels added around each tracked region before blurring a video frame.
pub const DEFAULT_REGION_INSET: f64 = 16.0;

/// Fraction of each side of the frame covered by the diagnostic center blur.
pub const DEBUG_CENTER_FRACTION: f64 = 0.25;

/// Worker threads for frame processing when the caller does not choose.
pub const DEFAULT_FRAME_WORKERS: usize = 4;

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff", "tif", "webp"];
