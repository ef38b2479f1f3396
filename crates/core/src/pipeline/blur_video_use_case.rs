use std::path::Path;
use std::sync::Arc;

use crate::shared::composite_job::CompositeJob;
use crate::shared::geometry::Size;
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::video_reader::VideoReader;
use crate::video::domain::video_writer::VideoWriter;

use super::frame_executor::{ExportConfig, ExportReport, FrameExecutor};
use super::frame_filter::FrameFilter;
use super::pipeline_logger::PipelineLogger;

/// Orchestrates a video export: configures the filter with the job, then
/// hands everything to a [`FrameExecutor`].
///
/// Single use: `execute` consumes the owned components, so a second call
/// fails.
pub struct BlurVideoUseCase {
    reader: Option<Box<dyn VideoReader>>,
    writer: Option<Box<dyn VideoWriter>>,
    filter: Option<Box<dyn FrameFilter>>,
    executor: Box<dyn FrameExecutor>,
    job: Arc<CompositeJob>,
    config: Option<ExportConfig>,
}

impl BlurVideoUseCase {
    pub fn new(
        reader: Box<dyn VideoReader>,
        writer: Box<dyn VideoWriter>,
        filter: Box<dyn FrameFilter>,
        executor: Box<dyn FrameExecutor>,
        job: Arc<CompositeJob>,
        config: ExportConfig,
    ) -> Self {
        Self {
            reader: Some(reader),
            writer: Some(writer),
            filter: Some(filter),
            executor,
            job,
            config: Some(config),
        }
    }

    pub fn execute(
        &mut self,
        metadata: &VideoMetadata,
        output_path: &Path,
        logger: &mut dyn PipelineLogger,
    ) -> Result<ExportReport, Box<dyn std::error::Error>> {
        const USED: &str = "Export already executed";
        let mut filter = self.filter.take().ok_or(USED)?;
        filter.configure(Size::new(metadata.width, metadata.height), Arc::clone(&self.job));
        let filter: Arc<dyn FrameFilter> = Arc::from(filter);

        let report = self.executor.execute(
            self.reader.take().ok_or(USED)?,
            self.writer.take().ok_or(USED)?,
            filter,
            metadata,
            output_path,
            self.config.take().ok_or(USED)?,
            logger,
        )?;

        if report.warnings > 0 {
            log::warn!(
                "{} of {} frame(s) were written without blur",
                report.warnings,
                report.frames_written
            );
        }
        Ok(report)
    }
}
