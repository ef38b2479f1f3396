pub mod composite_job;
pub mod constants;
pub mod geometry;
pub mod image_buffer;
pub mod video_metadata;
