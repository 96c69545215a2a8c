use std::collections::HashMap;
use std::time::Instant;

/// Cross-cutting logger for session loop events.
///
/// Decouples the session loop from the output mechanism so tests can run
/// silently while the server reports stage timings through `log`.
pub trait PipelineLogger: Send {
    /// Report that `frames` frames have been streamed so far.
    fn progress(&mut self, frames: u64);

    /// Record how long a named stage took for one tick.
    fn timing(&mut self, stage: &str, duration_ms: f64);

    /// Record a point-in-time metric (e.g. detections per classified frame).
    fn metric(&mut self, name: &str, value: f64);

    /// Log a human-readable status message.
    fn info(&mut self, message: &str);

    /// Emit an end-of-session summary. Default: no-op.
    fn summary(&self) {}
}

/// Silent logger that discards all events.
pub struct NullPipelineLogger;

impl PipelineLogger for NullPipelineLogger {
    fn progress(&mut self, _frames: u64) {}
    fn timing(&mut self, _stage: &str, _duration_ms: f64) {}
    fn metric(&mut self, _name: &str, _value: f64) {}
    fn info(&mut self, _message: &str) {}
}

/// Running count, sum and max of one stage or metric.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SampleStats {
    pub count: u64,
    pub total: f64,
    pub max: f64,
}

impl SampleStats {
    fn record(&mut self, value: f64) {
        if self.count == 0 || value > self.max {
            self.max = value;
        }
        self.count += 1;
        self.total += value;
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.total / self.count as f64
        }
    }
}

/// Aggregates per-stage timings and metrics for one session and logs a
/// summary when the session ends.
///
/// Sessions run until the client leaves, so only running aggregates are
/// kept. Progress is logged at debug level every `throttle_frames` frames.
pub struct StatsPipelineLogger {
    label: String,
    throttle_frames: u64,
    timings: HashMap<String, SampleStats>,
    metrics: HashMap<String, SampleStats>,
    start_time: Instant,
    frames: u64,
}

impl StatsPipelineLogger {
    pub fn new(label: impl Into<String>, throttle_frames: u64) -> Self {
        Self {
            label: label.into(),
            throttle_frames: throttle_frames.max(1),
            timings: HashMap::new(),
            metrics: HashMap::new(),
            start_time: Instant::now(),
            frames: 0,
        }
    }

    /// Returns the formatted summary string, or `None` if no data recorded.
    pub fn summary_string(&self) -> Option<String> {
        if self.timings.is_empty() && self.metrics.is_empty() {
            return None;
        }

        let elapsed_ms = self.start_time.elapsed().as_secs_f64() * 1000.0;
        let mut lines = vec![format!(
            "Session summary for {} ({} frames, {:.1}s):",
            self.label,
            self.frames,
            elapsed_ms / 1000.0
        )];

        let mut stages: Vec<_> = self.timings.keys().collect();
        stages.sort();
        for stage in stages {
            let stats = &self.timings[stage];
            lines.push(format!(
                "  {stage:10}: avg {:6.1}ms  max {:6.1}ms  ({} samples)",
                stats.mean(),
                stats.max,
                stats.count
            ));
        }

        let mut names: Vec<_> = self.metrics.keys().collect();
        names.sort();
        for name in names {
            lines.push(format!("  {name}: avg {:.1}", self.metrics[name].mean()));
        }

        if self.frames > 0 && elapsed_ms > 0.0 {
            let fps = self.frames as f64 / (elapsed_ms / 1000.0);
            lines.push(format!("  Throughput: {fps:.1} fps"));
        }

        Some(lines.join("\n"))
    }

    pub fn timings_for(&self, stage: &str) -> Option<SampleStats> {
        self.timings.get(stage).copied()
    }

    pub fn metrics_for(&self, name: &str) -> Option<SampleStats> {
        self.metrics.get(name).copied()
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }
}

impl PipelineLogger for StatsPipelineLogger {
    fn progress(&mut self, frames: u64) {
        self.frames = frames;
        if frames % self.throttle_frames == 0 {
            log::debug!("{}: streamed {frames} frames", self.label);
        }
    }

    fn timing(&mut self, stage: &str, duration_ms: f64) {
        record_into(&mut self.timings, stage, duration_ms);
    }

    fn metric(&mut self, name: &str, value: f64) {
        record_into(&mut self.metrics, name, value);
    }

    fn info(&mut self, message: &str) {
        log::info!("{}: {message}", self.label);
    }

    fn summary(&self) {
        if let Some(text) = self.summary_string() {
            log::info!("\n\n{text}");
        }
    }
}

/// Allocates the key only on first sight.
fn record_into(map: &mut HashMap<String, SampleStats>, key: &str, value: f64) {
    match map.get_mut(key) {
        Some(stats) => stats.record(value),
        None => {
            let mut stats = SampleStats::default();
            stats.record(value);
            map.insert(key.to_string(), stats);
        }
    }
}
