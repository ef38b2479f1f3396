use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use veil_core::blurring::infrastructure::gaussian_blur_kernel::GaussianBlurKernel;
use veil_core::detection::domain::face_detector::FaceDetector;
use veil_core::detection::infrastructure::precomputed_face_detector::{
    FrameDetections, PrecomputedFaceDetector,
};
use veil_core::masking::domain::shape::Shape;
use veil_core::masking::infrastructure::shape_mask_rasterizer::{
    FaceMaskPolicy, PathMaskPolicy, ShapeMaskRasterizer,
};
use veil_core::pipeline::blur_image_use_case::BlurImageUseCase;
use veil_core::pipeline::blur_video_use_case::BlurVideoUseCase;
use veil_core::pipeline::frame_compositor::{FrameCompositor, FrameCompositorConfig};
use veil_core::pipeline::frame_executor::ExportConfig;
use veil_core::pipeline::frame_filter::CompositingFrameFilter;
use veil_core::pipeline::image_pipeline::{ImagePipeline, ImagePipelineConfig};
use veil_core::pipeline::infrastructure::threaded_frame_executor::ThreadedFrameExecutor;
use veil_core::pipeline::pipeline_logger::StdoutPipelineLogger;
use veil_core::shared::composite_job::{BlurTarget, CompositeJob};
use veil_core::shared::constants::{
    DEFAULT_BLUR_RADIUS, DEFAULT_FRAME_WORKERS, DEFAULT_REGION_INSET, FACE_EXPANSION_FACTOR,
    IMAGE_EXTENSIONS, MAX_WORKING_SIDE,
};
use veil_core::shared::geometry::Size;
use veil_core::video::domain::video_reader::VideoReader;
use veil_core::video::infrastructure::image_file_reader::ImageFileReader;
use veil_core::video::infrastructure::image_file_writer::ImageFileWriter;
use veil_core::video::infrastructure::image_sequence_reader::ImageSequenceReader;
use veil_core::video::infrastructure::image_sequence_writer::ImageSequenceWriter;

/// Blur user-marked regions in photos and frame sequences.
#[derive(Parser)]
#[command(name = "veil", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Blur paths and faces in a still image.
    Image(ImageArgs),
    /// Blur tracked targets across a directory of numbered frames.
    Video(VideoArgs),
}

#[derive(Args)]
struct ImageArgs {
    /// Input image file.
    input: PathBuf,

    /// Output image file; the format follows the extension.
    output: PathBuf,

    /// JSON array of shapes in source pixel coordinates.
    #[arg(long)]
    shapes: PathBuf,

    /// Blur radius in working-resolution pixels.
    #[arg(long, default_value_t = DEFAULT_BLUR_RADIUS)]
    radius: f64,

    /// Longest side of the output; larger inputs are downscaled.
    #[arg(long, default_value_t = MAX_WORKING_SIDE)]
    max_side: u32,

    /// Growth factor applied to face rectangles before masking.
    #[arg(long, default_value_t = FACE_EXPANSION_FACTOR)]
    face_expansion: f64,
}

#[derive(Args)]
struct VideoArgs {
    /// Directory of numbered input frames.
    frames: PathBuf,

    /// Directory for the processed frames.
    output: PathBuf,

    /// JSON job description: strength, reference size and targets.
    #[arg(long)]
    job: PathBuf,

    /// JSON array of per-frame detections. Without it every target stays
    /// at its reference position.
    #[arg(long)]
    detections: Option<PathBuf>,

    /// Frame rate of the sequence.
    #[arg(long, default_value_t = 30.0)]
    fps: f64,

    /// Frames processed concurrently.
    #[arg(long, default_value_t = DEFAULT_FRAME_WORKERS)]
    workers: usize,

    /// Pixels added around each region before blurring.
    #[arg(long, default_value_t = DEFAULT_REGION_INSET)]
    inset: f64,

    /// Ignore detected faces farther than this from a target, in pixels.
    #[arg(long)]
    max_match_distance: Option<f64>,

    /// Match against every detected face, not only high-quality ones.
    #[arg(long)]
    no_quality_filter: bool,

    /// Blur the frame center when no target could be placed.
    #[arg(long)]
    debug_center_fallback: bool,

    /// Extension of the written frames.
    #[arg(long, default_value = "png")]
    format: String,
}

/// On-disk form of a [`CompositeJob`].
#[derive(Debug, Deserialize)]
struct JobFile {
    strength: f64,
    reference_size: Size,
    #[serde(default)]
    targets: Vec<BlurTarget>,
}

impl JobFile {
    fn into_job(self) -> Result<CompositeJob, Box<dyn std::error::Error>> {
        Ok(CompositeJob::new(
            self.strength,
            self.targets,
            self.reference_size,
        )?)
    }
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    match Cli::parse().command {
        Command::Image(args) => {
            validate_image(&args)?;
            run_image(&args)
        }
        Command::Video(args) => {
            validate_video(&args)?;
            run_video(&args)
        }
    }
}

fn run_image(args: &ImageArgs) -> Result<(), Box<dyn std::error::Error>> {
    let shapes: Vec<Shape> = read_json(&args.shapes)?;
    let face_policy = FaceMaskPolicy {
        expansion: args.face_expansion,
        ..FaceMaskPolicy::default()
    };
    let pipeline = ImagePipeline::new(
        Box::new(GaussianBlurKernel::new()),
        Box::new(ShapeMaskRasterizer::new(
            PathMaskPolicy::default(),
            face_policy,
        )),
        ImagePipelineConfig {
            max_side: args.max_side,
            radius: args.radius,
        },
    );

    let mut use_case = BlurImageUseCase::new(
        Box::new(ImageFileReader::new()),
        Box::new(ImageFileWriter::new()),
        pipeline,
    );
    let size = use_case.execute(&args.input, &args.output, &shapes, args.radius)?;
    log::info!(
        "Output written to {} ({}x{})",
        args.output.display(),
        size.width,
        size.height
    );
    Ok(())
}

fn run_video(args: &VideoArgs) -> Result<(), Box<dyn std::error::Error>> {
    let job: JobFile = read_json(&args.job)?;
    let job = Arc::new(job.into_job()?);
    let detector: Box<dyn FaceDetector> = match &args.detections {
        Some(path) => {
            let detections: Vec<FrameDetections> = read_json(path)?;
            Box::new(PrecomputedFaceDetector::from_detections(detections))
        }
        None => Box::new(PrecomputedFaceDetector::default()),
    };

    let mut reader: Box<dyn VideoReader> = Box::new(ImageSequenceReader::new(args.fps));
    let metadata = reader.open(&args.frames)?;

    let compositor = FrameCompositor::new(
        Box::new(GaussianBlurKernel::new()),
        FrameCompositorConfig {
            inset: args.inset,
            max_match_distance: args.max_match_distance,
            quality_filter: !args.no_quality_filter,
            debug_center_fallback: args.debug_center_fallback,
            fps: metadata.fps,
            ..FrameCompositorConfig::default()
        },
    );

    let total = metadata.total_frames;
    let progress: Box<dyn Fn(usize, usize) -> bool + Send> = Box::new(move |current, _| {
        eprint!("\rProcessing frame {current}/{total}");
        true
    });
    let config = ExportConfig {
        workers: args.workers,
        on_progress: Some(progress),
        ..ExportConfig::default()
    };

    let mut use_case = BlurVideoUseCase::new(
        reader,
        Box::new(ImageSequenceWriter::new(&args.format)),
        Box::new(CompositingFrameFilter::new(compositor, detector)),
        Box::new(ThreadedFrameExecutor::new()),
        job,
        config,
    );
    let mut logger = StdoutPipelineLogger::default();
    let report = use_case.execute(&metadata, &args.output, &mut logger)?;
    eprintln!();
    log::info!(
        "{} frame(s) written to {} ({} without blur)",
        report.frames_written,
        args.output.display(),
        report.warnings
    );
    Ok(())
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, Box<dyn std::error::Error>> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| format!("Cannot read {}: {e}", path.display()))?;
    serde_json::from_str(&text)
        .map_err(|e| format!("Invalid JSON in {}: {e}", path.display()).into())
}

fn validate_image(args: &ImageArgs) -> Result<(), Box<dyn std::error::Error>> {
    if !args.input.is_file() {
        return Err(format!("Input file not found: {}", args.input.display()).into());
    }
    if !is_image(&args.output) {
        return Err(format!(
            "Output must have an image extension ({}), got {}",
            IMAGE_EXTENSIONS.join(", "),
            args.output.display()
        )
        .into());
    }
    if !args.shapes.is_file() {
        return Err(format!("Shapes file not found: {}", args.shapes.display()).into());
    }
    if !args.radius.is_finite() || args.radius < 0.0 {
        return Err(format!("Radius must be a non-negative number, got {}", args.radius).into());
    }
    if args.max_side == 0 {
        return Err("Max side must be positive".into());
    }
    if !args.face_expansion.is_finite() || args.face_expansion < 1.0 {
        return Err(format!(
            "Face expansion must be at least 1.0, got {}",
            args.face_expansion
        )
        .into());
    }
    Ok(())
}

fn validate_video(args: &VideoArgs) -> Result<(), Box<dyn std::error::Error>> {
    if !args.frames.is_dir() {
        return Err(format!("Frame directory not found: {}", args.frames.display()).into());
    }
    if !args.job.is_file() {
        return Err(format!("Job file not found: {}", args.job.display()).into());
    }
    if let Some(path) = &args.detections {
        if !path.is_file() {
            return Err(format!("Detections file not found: {}", path.display()).into());
        }
    }
    if args.frames == args.output {
        return Err("Output directory must differ from the input directory".into());
    }
    if !args.fps.is_finite() || args.fps <= 0.0 {
        return Err(format!("Frame rate must be positive, got {}", args.fps).into());
    }
    if args.workers == 0 {
        return Err("Workers must be at least 1".into());
    }
    if !args.inset.is_finite() || args.inset < 0.0 {
        return Err(format!("Inset must be a non-negative number, got {}", args.inset).into());
    }
    if let Some(d) = args.max_match_distance {
        if !d.is_finite() || d <= 0.0 {
            return Err(format!("Max match distance must be positive, got {d}").into());
        }
    }
    let format = args.format.trim_start_matches('.').to_lowercase();
    if !IMAGE_EXTENSIONS.contains(&format.as_str()) {
        return Err(format!(
            "Format must be one of {}, got '{}'",
            IMAGE_EXTENSIONS.join(", "),
            args.format
        )
        .into());
    }
    Ok(())
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use veil_core::shared::geometry::Rect;

    fn image_args(dir: &Path) -> ImageArgs {
        let input = dir.join("in.png");
        let shapes = dir.join("shapes.json");
        std::fs::write(&input, b"not really a png").unwrap();
        std::fs::write(&shapes, b"[]").unwrap();
        ImageArgs {
            input,
            output: dir.join("out.jpg"),
            shapes,
            radius: DEFAULT_BLUR_RADIUS,
            max_side: MAX_WORKING_SIDE,
            face_expansion: FACE_EXPANSION_FACTOR,
        }
    }

    fn video_args(dir: &Path) -> VideoArgs {
        let frames = dir.join("frames");
        std::fs::create_dir_all(&frames).unwrap();
        let job = dir.join("job.json");
        std::fs::write(&job, b"{}").unwrap();
        VideoArgs {
            frames,
            output: dir.join("out"),
            job,
            detections: None,
            fps: 30.0,
            workers: DEFAULT_FRAME_WORKERS,
            inset: DEFAULT_REGION_INSET,
            max_match_distance: None,
            no_quality_filter: false,
            debug_center_fallback: false,
            format: "png".to_string(),
        }
    }

    #[test]
    fn test_cli_parses_subcommands() {
        let cli = Cli::try_parse_from([
            "veil", "video", "in", "out", "--job", "job.json", "--workers", "2",
            "--max-match-distance", "80", "--no-quality-filter",
        ])
        .unwrap();
        match cli.command {
            Command::Video(args) => {
                assert_eq!(args.workers, 2);
                assert_eq!(args.max_match_distance, Some(80.0));
                assert!(args.no_quality_filter);
                assert!(!args.debug_center_fallback);
            }
            Command::Image(_) => panic!("expected video"),
        }

        let cli = Cli::try_parse_from(["veil", "image", "a.png", "b.png", "--shapes", "s.json"])
            .unwrap();
        match cli.command {
            Command::Image(args) => assert_eq!(args.radius, DEFAULT_BLUR_RADIUS),
            Command::Video(_) => panic!("expected image"),
        }
    }

    #[test]
    fn test_validate_image_accepts_defaults() {
        let dir = tempfile::tempdir().unwrap();
        assert!(validate_image(&image_args(dir.path())).is_ok());
    }

    #[test]
    fn test_validate_image_rejects_bad_values() {
        let dir = tempfile::tempdir().unwrap();

        let mut args = image_args(dir.path());
        args.radius = -1.0;
        assert!(validate_image(&args).is_err());

        let mut args = image_args(dir.path());
        args.output = dir.path().join("out.txt");
        assert!(validate_image(&args).is_err());

        let mut args = image_args(dir.path());
        args.face_expansion = 0.5;
        assert!(validate_image(&args).is_err());

        let mut args = image_args(dir.path());
        args.input = dir.path().join("missing.png");
        assert!(validate_image(&args).is_err());
    }

    #[test]
    fn test_validate_video() {
        let dir = tempfile::tempdir().unwrap();
        assert!(validate_video(&video_args(dir.path())).is_ok());

        let mut args = video_args(dir.path());
        args.workers = 0;
        assert!(validate_video(&args).is_err());

        let mut args = video_args(dir.path());
        args.max_match_distance = Some(0.0);
        assert!(validate_video(&args).is_err());

        let mut args = video_args(dir.path());
        args.format = "gif".to_string();
        assert!(validate_video(&args).is_err());

        let mut args = video_args(dir.path());
        args.output = args.frames.clone();
        assert!(validate_video(&args).is_err());
    }

    #[test]
    fn test_job_file_parses_and_validates() {
        let json = r#"{
            "strength": 40,
            "reference_size": {"width": 1920, "height": 1080},
            "targets": [
                {"id": 1, "reference_rect": {"x": 100, "y": 80, "width": 60, "height": 60}},
                {"id": 2, "reference_rect": {"x": 900, "y": 400, "width": 80, "height": 90}, "strength": 10}
            ]
        }"#;
        let job = serde_json::from_str::<JobFile>(json).unwrap().into_job().unwrap();
        assert_eq!(job.targets().len(), 2);
        assert_eq!(job.targets()[0].reference_rect, Rect::new(100.0, 80.0, 60.0, 60.0));
        assert_eq!(job.strength_for(&job.targets()[1]), 10.0);

        let bad = r#"{"strength": -1, "reference_size": {"width": 10, "height": 10}}"#;
        assert!(serde_json::from_str::<JobFile>(bad).unwrap().into_job().is_err());
    }

    #[test]
    fn test_read_json_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shapes.json");
        std::fs::write(&path, b"{ nope").unwrap();
        let err = read_json::<Vec<Shape>>(&path).unwrap_err();
        assert!(err.to_string().contains("shapes.json"));
    }
}
