use std::collections::BTreeMap;
use std::time::Instant;

/// Observer for export orchestration events.
///
/// The executor reports through this instead of printing, so the CLI, tests
/// and embedding hosts each decide what to show.
pub trait PipelineLogger: Send {
    /// Frames written so far out of `total` (0 when unknown).
    fn progress(&mut self, written: usize, total: usize);

    /// Time one stage took for one frame.
    fn timing(&mut self, stage: &str, duration_ms: f64);

    /// Point-in-time sample, e.g. reorder buffer depth.
    fn metric(&mut self, name: &str, value: f64);

    /// A frame was passed through unprocessed.
    fn warning(&mut self, message: &str);

    fn info(&mut self, message: &str);

    /// End-of-export report. Default: nothing.
    fn summary(&self) {}
}

/// Discards everything.
pub struct NullPipelineLogger;

impl PipelineLogger for NullPipelineLogger {
    fn progress(&mut self, _written: usize, _total: usize) {}
    fn timing(&mut self, _stage: &str, _duration_ms: f64) {}
    fn metric(&mut self, _name: &str, _value: f64) {}
    fn warning(&mut self, _message: &str) {}
    fn info(&mut self, _message: &str) {}
}

#[derive(Clone, Debug, Default, PartialEq)]
struct Series {
    count: usize,
    total: f64,
    max: f64,
}

impl Series {
    fn push(&mut self, value: f64) {
        self.count += 1;
        self.total += value;
        self.max = self.max.max(value);
    }

    fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.total / self.count as f64
        }
    }
}

/// Forwards to the `log` facade and keeps running aggregates for a summary.
///
/// Progress lines are emitted every `every` frames and on the last frame.
pub struct StdoutPipelineLogger {
    every: usize,
    started: Instant,
    frames: usize,
    warnings: usize,
    timings: BTreeMap<String, Series>,
    metrics: BTreeMap<String, Series>,
}

impl StdoutPipelineLogger {
    pub fn new(every: usize) -> Self {
        Self {
            every: every.max(1),
            started: Instant::now(),
            frames: 0,
            warnings: 0,
            timings: BTreeMap::new(),
            metrics: BTreeMap::new(),
        }
    }

    pub fn warnings(&self) -> usize {
        self.warnings
    }

    /// Mean recorded duration for `stage`.
    pub fn mean_timing(&self, stage: &str) -> Option<f64> {
        self.timings.get(stage).map(Series::mean)
    }

    pub fn max_metric(&self, name: &str) -> Option<f64> {
        self.metrics.get(name).map(|s| s.max)
    }

    /// `None` until something was recorded.
    pub fn summary_string(&self) -> Option<String> {
        if self.frames == 0 && self.timings.is_empty() {
            return None;
        }
        let elapsed = self.started.elapsed().as_secs_f64();
        let mut lines = vec![format!(
            "Export summary: {} frame(s), {} passed through, {elapsed:.1}s",
            self.frames, self.warnings
        )];
        for (stage, series) in &self.timings {
            lines.push(format!(
                "  {stage:10} avg {:6.1}ms  max {:6.1}ms  ({} calls)",
                series.mean(),
                series.max,
                series.count
            ));
        }
        for (name, series) in &self.metrics {
            lines.push(format!("  {name}: avg {:.1}, max {:.0}", series.mean(), series.max));
        }
        if self.frames > 0 && elapsed > 0.0 {
            lines.push(format!("  {:.1} fps", self.frames as f64 / elapsed));
        }
        Some(lines.join("\n"))
    }
}

impl Default for StdoutPipelineLogger {
    fn default() -> Self {
        Self::new(25)
    }
}

impl PipelineLogger for StdoutPipelineLogger {
    fn progress(&mut self, written: usize, total: usize) {
        self.frames = written;
        if written % self.every == 0 || written == total {
            if total > 0 {
                let pct = written as f64 / total as f64 * 100.0;
                log::info!("Frame {written}/{total} ({pct:.1}%)");
            } else {
                log::info!("Frame {written}");
            }
        }
    }

    fn timing(&mut self, stage: &str, duration_ms: f64) {
        self.timings.entry(stage.to_string()).or_default().push(duration_ms);
    }

    fn metric(&mut self, name: &str, value: f64) {
        self.metrics.entry(name.to_string()).or_default().push(value);
    }

    fn warning(&mut self, message: &str) {
        self.warnings += 1;
        log::warn!("{message}");
    }

    fn info(&mut self, message: &str) {
        log::info!("{message}");
    }

    fn summary(&self) {
        if let Some(text) = self.summary_string() {
            log::info!("\n{text}");
        }
    }
}
