//! Region-based blur compositing for still images and video frames.
//!
//! Photos go through [`pipeline::image_pipeline::ImagePipeline`]; video
//! exports call [`pipeline::frame_compositor::FrameCompositor`] once per
//! frame, usually via a [`pipeline::frame_filter::FrameFilter`] driven by
//! [`pipeline::infrastructure::threaded_frame_executor::ThreadedFrameExecutor`].

pub mod blurring;
pub mod compositing;
pub mod detection;
pub mod masking;
pub mod pipeline;
pub mod shared;
pub mod video;
