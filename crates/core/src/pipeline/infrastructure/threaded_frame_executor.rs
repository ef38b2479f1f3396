use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Instant;

use crossbeam_channel::{Receiver, Sender};

use crate::pipeline::frame_compositor::FrameOutcome;
use crate::pipeline::frame_executor::{ExportConfig, ExportReport, FrameExecutor};
use crate::pipeline::frame_filter::FrameFilter;
use crate::pipeline::pipeline_logger::PipelineLogger;
use crate::shared::image_buffer::ImageBuffer;
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::video_reader::VideoReader;
use crate::video::domain::video_writer::VideoWriter;

type SendError = Box<dyn std::error::Error + Send + Sync>;

/// Position of a frame in decode order. Independent of the frame's own
/// index so gaps in source numbering cannot stall reordering.
type Seq = usize;

struct Processed {
    outcome: FrameOutcome,
    duration_ms: f64,
}

/// Executes an export with a thread per stage and a pool of filter workers.
///
/// Layout: `reader → N workers [process_frame] → main [reorder] → writer`
///
/// Workers finish out of order; the main thread holds finished frames until
/// every earlier one has been handed to the writer. The reader needs a credit
/// per decoded frame and the main thread returns it once the frame is handed
/// to the writer, so at most `channel_capacity + workers` frames are alive
/// between decode and write however long one frame stalls.
pub struct ThreadedFrameExecutor;

impl ThreadedFrameExecutor {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ThreadedFrameExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameExecutor for ThreadedFrameExecutor {
    fn execute(
        &self,
        reader: Box<dyn VideoReader>,
        mut writer: Box<dyn VideoWriter>,
        filter: Arc<dyn FrameFilter>,
        metadata: &VideoMetadata,
        output_path: &Path,
        config: ExportConfig,
        logger: &mut dyn PipelineLogger,
    ) -> Result<ExportReport, Box<dyn std::error::Error>> {
        let cap = config.channel_capacity.max(1);
        let workers = config.workers.max(1);

        writer.open(output_path, metadata)?;
        logger.info(&format!(
            "Exporting {} frame(s) with {workers} worker(s)",
            metadata.total_frames
        ));

        let (frame_tx, frame_rx) =
            crossbeam_channel::bounded::<(Seq, Result<ImageBuffer, SendError>)>(cap);
        let (done_tx, done_rx) =
            crossbeam_channel::bounded::<(Seq, Result<Processed, SendError>)>(cap);
        let (write_tx, write_rx) = crossbeam_channel::bounded::<ImageBuffer>(cap);
        let window = cap + workers;
        let (credit_tx, credit_rx) = crossbeam_channel::bounded::<()>(window);
        for _ in 0..window {
            credit_tx.send(())?;
        }

        let reader_handle = spawn_reader(reader, frame_tx, credit_rx, config.cancelled.clone());
        let worker_handles: Vec<_> = (0..workers)
            .map(|_| {
                spawn_worker(
                    Arc::clone(&filter),
                    frame_rx.clone(),
                    done_tx.clone(),
                    config.cancelled.clone(),
                )
            })
            .collect();
        drop(frame_rx);
        drop(done_tx);
        let writer_handle = spawn_writer(writer, write_rx);

        let outcome = run_main_loop(
            done_rx,
            &write_tx,
            &credit_tx,
            metadata.total_frames,
            &config,
            logger,
        );
        drop(credit_tx);
        drop(write_tx);

        let report = join_threads(reader_handle, worker_handles, writer_handle, outcome)?;
        logger.summary();
        Ok(report)
    }
}

fn spawn_reader(
    mut reader: Box<dyn VideoReader>,
    frame_tx: Sender<(Seq, Result<ImageBuffer, SendError>)>,
    credit_rx: Receiver<()>,
    cancelled: Arc<AtomicBool>,
) -> JoinHandle<Box<dyn VideoReader>> {
    std::thread::spawn(move || {
        let mut frames = reader.frames().enumerate();
        loop {
            // A closed credit channel means the main loop has stopped.
            if credit_rx.recv().is_err() || cancelled.load(Ordering::Relaxed) {
                break;
            }
            let Some((seq, frame_result)) = frames.next() else {
                break;
            };
            let mapped = frame_result.map_err(|e| -> SendError { e.to_string().into() });
            let failed = mapped.is_err();
            if frame_tx.send((seq, mapped)).is_err() || failed {
                break;
            }
        }
        drop(frames);
        reader
    })
}

fn spawn_worker(
    filter: Arc<dyn FrameFilter>,
    frame_rx: Receiver<(Seq, Result<ImageBuffer, SendError>)>,
    done_tx: Sender<(Seq, Result<Processed, SendError>)>,
    cancelled: Arc<AtomicBool>,
) -> JoinHandle<()> {
    std::thread::spawn(move || {
        for (seq, frame_result) in frame_rx {
            if cancelled.load(Ordering::Relaxed) {
                break;
            }
            let result = frame_result.map(|frame| process_guarded(filter.as_ref(), &frame));
            if done_tx.send((seq, result)).is_err() {
                break;
            }
        }
    })
}

/// A panicking filter costs one frame, not the export.
fn process_guarded(filter: &dyn FrameFilter, frame: &ImageBuffer) -> Processed {
    let started = Instant::now();
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| filter.process_frame(frame)))
        .unwrap_or_else(|_| {
            log::error!("Frame {} panicked during processing", frame.index());
            FrameOutcome {
                frame: frame.clone(),
                passed_through: true,
                blurred_regions: 0,
            }
        });
    Processed {
        outcome,
        duration_ms: started.elapsed().as_secs_f64() * 1000.0,
    }
}

fn spawn_writer(
    mut writer: Box<dyn VideoWriter>,
    write_rx: Receiver<ImageBuffer>,
) -> JoinHandle<Result<Box<dyn VideoWriter>, SendError>> {
    std::thread::spawn(move || {
        for frame in write_rx {
            writer
                .write(&frame)
                .map_err(|e| -> SendError { e.to_string().into() })?;
        }
        Ok(writer)
    })
}

/// Collects finished frames, restores decode order and feeds the writer.
fn run_main_loop(
    done_rx: Receiver<(Seq, Result<Processed, SendError>)>,
    write_tx: &Sender<ImageBuffer>,
    credit_tx: &Sender<()>,
    total_frames: usize,
    config: &ExportConfig,
    logger: &mut dyn PipelineLogger,
) -> Result<ExportReport, Box<dyn std::error::Error>> {
    let mut pending: BTreeMap<Seq, Processed> = BTreeMap::new();
    let mut next: Seq = 0;
    let mut report = ExportReport::default();

    for (seq, result) in done_rx {
        if config.cancelled.load(Ordering::Relaxed) {
            return Err("Export cancelled".into());
        }
        let processed = result.map_err(|e| -> Box<dyn std::error::Error> {
            format!("Failed to read frame {seq}: {e}").into()
        })?;
        pending.insert(seq, processed);
        logger.metric("reorder_depth", pending.len() as f64);

        while let Some(processed) = pending.remove(&next) {
            flush(processed, write_tx, total_frames, config, logger, &mut report)?;
            let _ = credit_tx.try_send(());
            next += 1;
        }
    }

    if config.cancelled.load(Ordering::Relaxed) {
        return Err("Export cancelled".into());
    }
    // Only reachable with gaps, which a failed read already reported.
    for (_, processed) in std::mem::take(&mut pending) {
        flush(processed, write_tx, total_frames, config, logger, &mut report)?;
    }
    Ok(report)
}

fn flush(
    processed: Processed,
    write_tx: &Sender<ImageBuffer>,
    total_frames: usize,
    config: &ExportConfig,
    logger: &mut dyn PipelineLogger,
    report: &mut ExportReport,
) -> Result<(), Box<dyn std::error::Error>> {
    let Processed {
        outcome,
        duration_ms,
    } = processed;
    logger.timing("process", duration_ms);
    if outcome.passed_through {
        report.warnings += 1;
        logger.warning(&format!(
            "Frame {} written without blur",
            outcome.frame.index()
        ));
    }

    write_tx
        .send(outcome.frame)
        .map_err(|_| "Writer channel closed unexpectedly")?;
    report.frames_written += 1;
    logger.progress(report.frames_written, total_frames);

    if let Some(ref callback) = config.on_progress {
        if !callback(report.frames_written, total_frames) {
            config.cancelled.store(true, Ordering::Relaxed);
            return Err("Export cancelled".into());
        }
    }
    Ok(())
}

/// Joins all threads; the main loop's error wins, then the first thread
/// failure in pipeline order.
fn join_threads(
    reader_handle: JoinHandle<Box<dyn VideoReader>>,
    worker_handles: Vec<JoinHandle<()>>,
    writer_handle: JoinHandle<Result<Box<dyn VideoWriter>, SendError>>,
    outcome: Result<ExportReport, Box<dyn std::error::Error>>,
) -> Result<ExportReport, Box<dyn std::error::Error>> {
    let mut first_error = outcome.as_ref().err().map(|e| e.to_string());
    let mut set_if_none = |err: String| {
        if first_error.is_none() {
            first_error = Some(err);
        }
    };

    match reader_handle.join() {
        Ok(mut r) => r.close(),
        Err(_) => set_if_none("Reader thread panicked".to_string()),
    }
    for handle in worker_handles {
        if handle.join().is_err() {
            set_if_none("Worker thread panicked".to_string());
        }
    }
    match writer_handle.join() {
        Ok(Ok(mut w)) => {
            if let Err(e) = w.close() {
                set_if_none(e.to_string());
            }
        }
        Ok(Err(e)) => set_if_none(e.to_string()),
        Err(_) => set_if_none("Writer thread panicked".to_string()),
    }

    match (first_error, outcome) {
        (None, Ok(report)) => Ok(report),
        (Some(e), _) => Err(e.into()),
        (None, Err(e)) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::pipeline_logger::{NullPipelineLogger, StdoutPipelineLogger};
    use crate::shared::composite_job::CompositeJob;
    use crate::shared::geometry::Size;
    use std::sync::Mutex;
    use std::time::Duration;

    struct StubReader {
        frames: Vec<Result<ImageBuffer, String>>,
        closed: Arc<Mutex<bool>>,
    }

    impl StubReader {
        fn new(count: usize) -> Self {
            Self {
                frames: (0..count).map(|i| Ok(frame(i))).collect(),
                closed: Arc::new(Mutex::new(false)),
            }
        }
    }

    impl VideoReader for StubReader {
        fn open(&mut self, _path: &Path) -> Result<VideoMetadata, Box<dyn std::error::Error>> {
            Ok(metadata(self.frames.len()))
        }

        fn frames(
            &mut self,
        ) -> Box<dyn Iterator<Item = Result<ImageBuffer, Box<dyn std::error::Error>>> + '_>
        {
            Box::new(self.frames.drain(..).map(|r| r.map_err(|e| e.into())))
        }

        fn close(&mut self) {
            *self.closed.lock().unwrap() = true;
        }
    }

    #[derive(Default)]
    struct StubWriter {
        written: Arc<Mutex<Vec<ImageBuffer>>>,
        closed: Arc<Mutex<bool>>,
        fail_at: Option<usize>,
    }

    impl VideoWriter for StubWriter {
        fn open(
            &mut self,
            _path: &Path,
            _metadata: &VideoMetadata,
        ) -> Result<(), Box<dyn std::error::Error>> {
            Ok(())
        }

        fn write(&mut self, frame: &ImageBuffer) -> Result<(), Box<dyn std::error::Error>> {
            let mut written = self.written.lock().unwrap();
            if Some(written.len()) == self.fail_at {
                return Err("disk full".into());
            }
            written.push(frame.clone());
            Ok(())
        }

        fn close(&mut self) -> Result<(), Box<dyn std::error::Error>> {
            *self.closed.lock().unwrap() = true;
            Ok(())
        }
    }

    /// Marks frames by inverting the first byte; earlier frames sleep longer
    /// so workers finish out of order.
    struct SlowInvertFilter {
        fail_every: Option<usize>,
    }

    impl FrameFilter for SlowInvertFilter {
        fn configure(&mut self, _render_size: Size, _job: Arc<CompositeJob>) {}

        fn process_frame(&self, frame: &ImageBuffer) -> FrameOutcome {
            std::thread::sleep(Duration::from_millis(((7 - frame.index() % 8) * 2) as u64));
            if let Some(n) = self.fail_every {
                if frame.index() % n == n - 1 {
                    return FrameOutcome {
                        frame: frame.clone(),
                        passed_through: true,
                        blurred_regions: 0,
                    };
                }
            }
            let mut out = frame.clone();
            out.data_mut()[0] = 255 - out.data()[0];
            FrameOutcome {
                frame: out,
                passed_through: false,
                blurred_regions: 1,
            }
        }
    }

    /// Holds frame 0 back so every later frame piles up behind it.
    struct StallFirstFrameFilter;

    impl FrameFilter for StallFirstFrameFilter {
        fn configure(&mut self, _render_size: Size, _job: Arc<CompositeJob>) {}

        fn process_frame(&self, frame: &ImageBuffer) -> FrameOutcome {
            if frame.index() == 0 {
                std::thread::sleep(Duration::from_millis(300));
            }
            FrameOutcome {
                frame: frame.clone(),
                passed_through: false,
                blurred_regions: 0,
            }
        }
    }

    struct PanickingFilter;

    impl FrameFilter for PanickingFilter {
        fn configure(&mut self, _render_size: Size, _job: Arc<CompositeJob>) {}

        fn process_frame(&self, frame: &ImageBuffer) -> FrameOutcome {
            if frame.index() == 1 {
                panic!("boom");
            }
            FrameOutcome {
                frame: frame.clone(),
                passed_through: false,
                blurred_regions: 0,
            }
        }
    }

    fn frame(index: usize) -> ImageBuffer {
        ImageBuffer::filled(4, 4, [index as u8, 0, 0, 255]).with_index(index)
    }

    fn metadata(total: usize) -> VideoMetadata {
        VideoMetadata {
            width: 4,
            height: 4,
            fps: 30.0,
            total_frames: total,
            source_path: None,
        }
    }

    fn run(
        reader: StubReader,
        writer: StubWriter,
        filter: Arc<dyn FrameFilter>,
        config: ExportConfig,
    ) -> Result<ExportReport, Box<dyn std::error::Error>> {
        let total = reader.frames.len();
        ThreadedFrameExecutor::new().execute(
            Box::new(reader),
            Box::new(writer),
            filter,
            &metadata(total),
            Path::new("out"),
            config,
            &mut NullPipelineLogger,
        )
    }

    #[test]
    fn test_writes_every_frame_in_order() {
        let writer = StubWriter::default();
        let written = writer.written.clone();
        let closed = writer.closed.clone();

        let report = run(
            StubReader::new(20),
            writer,
            Arc::new(SlowInvertFilter { fail_every: None }),
            ExportConfig::default(),
        )
        .unwrap();

        assert_eq!(report.frames_written, 20);
        assert_eq!(report.warnings, 0);
        let written = written.lock().unwrap();
        let indices: Vec<usize> = written.iter().map(|f| f.index()).collect();
        assert_eq!(indices, (0..20).collect::<Vec<_>>());
        assert!(written.iter().all(|f| f.data()[0] == 255 - f.index() as u8));
        assert!(*closed.lock().unwrap());
    }

    #[test]
    fn test_passed_through_frames_count_as_warnings() {
        let writer = StubWriter::default();
        let written = writer.written.clone();
        let mut logger = StdoutPipelineLogger::new(100);

        let report = ThreadedFrameExecutor::new()
            .execute(
                Box::new(StubReader::new(9)),
                Box::new(writer),
                Arc::new(SlowInvertFilter {
                    fail_every: Some(3),
                }),
                &metadata(9),
                Path::new("out"),
                ExportConfig::default(),
                &mut logger,
            )
            .unwrap();

        assert_eq!(report.frames_written, 9);
        assert_eq!(report.warnings, 3);
        assert_eq!(logger.warnings(), 3);
        assert!(logger.mean_timing("process").is_some());
        assert_eq!(written.lock().unwrap()[2].data()[0], 2);
    }

    #[test]
    fn test_panicking_frame_is_passed_through() {
        let writer = StubWriter::default();
        let written = writer.written.clone();

        let report = run(
            StubReader::new(3),
            writer,
            Arc::new(PanickingFilter),
            ExportConfig {
                workers: 2,
                ..Default::default()
            },
        )
        .unwrap();

        assert_eq!(report.frames_written, 3);
        assert_eq!(report.warnings, 1);
        assert_eq!(written.lock().unwrap()[1], frame(1));
    }

    #[test]
    fn test_stalled_frame_bounds_frames_in_flight() {
        let writer = StubWriter::default();
        let written = writer.written.clone();
        let mut logger = StdoutPipelineLogger::new(1000);

        let report = ThreadedFrameExecutor::new()
            .execute(
                Box::new(StubReader::new(400)),
                Box::new(writer),
                Arc::new(StallFirstFrameFilter),
                &metadata(400),
                Path::new("out"),
                ExportConfig {
                    workers: 4,
                    channel_capacity: 2,
                    ..Default::default()
                },
                &mut logger,
            )
            .unwrap();

        assert_eq!(report.frames_written, 400);
        let depth = logger.max_metric("reorder_depth").unwrap();
        assert!(depth <= 6.0, "reorder depth {depth} exceeds capacity + workers");
        let written = written.lock().unwrap();
        assert!(written.iter().enumerate().all(|(i, f)| f.index() == i));
    }

    #[test]
    fn test_single_worker() {
        let report = run(
            StubReader::new(5),
            StubWriter::default(),
            Arc::new(SlowInvertFilter { fail_every: None }),
            ExportConfig {
                workers: 1,
                channel_capacity: 1,
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(report.frames_written, 5);
    }

    #[test]
    fn test_progress_callback_can_cancel() {
        let writer = StubWriter::default();
        let written = writer.written.clone();
        let calls = Arc::new(Mutex::new(Vec::new()));
        let seen = calls.clone();

        let result = run(
            StubReader::new(30),
            writer,
            Arc::new(SlowInvertFilter { fail_every: None }),
            ExportConfig {
                on_progress: Some(Box::new(move |current, total| {
                    seen.lock().unwrap().push((current, total));
                    current < 3
                })),
                ..Default::default()
            },
        );

        assert!(result.unwrap_err().to_string().contains("cancelled"));
        assert_eq!(calls.lock().unwrap().last(), Some(&(3, 30)));
        assert!(written.lock().unwrap().len() <= 3);
    }

    #[test]
    fn test_pre_cancelled_export_fails() {
        let config = ExportConfig::default();
        config.cancelled.store(true, Ordering::Relaxed);
        let result = run(
            StubReader::new(10),
            StubWriter::default(),
            Arc::new(SlowInvertFilter { fail_every: None }),
            config,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_read_error_aborts() {
        let mut reader = StubReader::new(2);
        reader.frames.push(Err("corrupt frame".to_string()));
        let err = run(
            reader,
            StubWriter::default(),
            Arc::new(SlowInvertFilter { fail_every: None }),
            ExportConfig::default(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("corrupt frame"));
    }

    #[test]
    fn test_write_error_aborts() {
        let writer = StubWriter {
            fail_at: Some(1),
            ..Default::default()
        };
        let err = run(
            StubReader::new(12),
            writer,
            Arc::new(SlowInvertFilter { fail_every: None }),
            ExportConfig::default(),
        )
        .unwrap_err();
        assert!(!err.to_string().is_empty());
    }

    #[test]
    fn test_reader_is_closed() {
        let reader = StubReader::new(2);
        let closed = reader.closed.clone();
        run(
            reader,
            StubWriter::default(),
            Arc::new(SlowInvertFilter { fail_every: None }),
            ExportConfig::default(),
        )
        .unwrap();
        assert!(*closed.lock().unwrap());
    }
}
