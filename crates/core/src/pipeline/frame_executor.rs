use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use crate::shared::constants::DEFAULT_FRAME_WORKERS;
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::video_reader::VideoReader;
use crate::video::domain::video_writer::VideoWriter;

use super::frame_filter::FrameFilter;
use super::pipeline_logger::PipelineLogger;

const DEFAULT_CHANNEL_CAPACITY: usize = 8;

/// Settings for one export run.
pub struct ExportConfig {
    /// Threads calling `process_frame` concurrently.
    pub workers: usize,
    /// Bound of each inter-thread queue.
    pub channel_capacity: usize,
    /// Called after every written frame; returning `false` cancels.
    pub on_progress: Option<Box<dyn Fn(usize, usize) -> bool + Send>>,
    /// Set from anywhere to cancel the whole export.
    pub cancelled: Arc<AtomicBool>,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_FRAME_WORKERS,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            on_progress: None,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }
}

/// What an export produced.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ExportReport {
    pub frames_written: usize,
    /// Frames written unmodified because processing them failed.
    pub warnings: usize,
}

/// Runs read, filter, write over a whole video.
///
/// Implementations must write frames in source order however they schedule
/// the filter. A frame that fails to process is written unmodified and
/// counted as a warning; only I/O failures and cancellation abort the job.
pub trait FrameExecutor: Send {
    #[allow(clippy::too_many_arguments)]
    fn execute(
        &self,
        reader: Box<dyn VideoReader>,
        writer: Box<dyn VideoWriter>,
        filter: Arc<dyn FrameFilter>,
        metadata: &VideoMetadata,
        output_path: &Path,
        config: ExportConfig,
        logger: &mut dyn PipelineLogger,
    ) -> Result<ExportReport, Box<dyn std::error::Error>>;
}
