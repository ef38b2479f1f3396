pub mod blur_image_use_case;
pub mod blur_video_use_case;
pub mod frame_compositor;
pub mod frame_executor;
pub mod frame_filter;
pub mod image_pipeline;
pub mod infrastructure;
pub mod pipeline_logger;
