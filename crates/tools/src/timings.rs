use kestrel_render::PassKind;
use std::fmt;
use std::time::{Duration, Instant};

/// Accumulates CPU time spent recording each render pass and reports the
/// per-frame average every `interval` frames.
#[derive(Debug, Clone)]
pub struct PassTimings {
    totals: [Duration; PassKind::ORDER.len()],
    frames: u32,
    interval: u32,
}

impl Default for PassTimings {
    fn default() -> Self {
        Self::new(60)
    }
}

/// Average time per pass over one reporting interval.
#[derive(Debug, Clone, PartialEq)]
pub struct TimingReport {
    pub frames: u32,
    pub averages: Vec<(PassKind, Duration)>,
}

impl TimingReport {
    pub fn average(&self, pass: PassKind) -> Option<Duration> {
        self.averages.iter().find(|(p, _)| *p == pass).map(|(_, d)| *d)
    }

    pub fn total(&self) -> Duration {
        self.averages.iter().map(|(_, d)| *d).sum()
    }
}

impl fmt::Display for TimingReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "avg over {} frames:", self.frames)?;
        for (pass, avg) in &self.averages {
            write!(f, " {pass}={:.3}ms", avg.as_secs_f64() * 1000.0)?;
        }
        Ok(())
    }
}

fn slot(pass: PassKind) -> usize {
    PassKind::ORDER
        .iter()
        .position(|p| *p == pass)
        .unwrap_or_default()
}

impl PassTimings {
    pub fn new(interval: u32) -> Self {
        Self {
            totals: Default::default(),
            frames: 0,
            interval: interval.max(1),
        }
    }

    pub fn record(&mut self, pass: PassKind, elapsed: Duration) {
        self.totals[slot(pass)] += elapsed;
    }

    /// Run `f` and charge its duration to `pass`.
    pub fn time<R>(&mut self, pass: PassKind, f: impl FnOnce() -> R) -> R {
        let start = Instant::now();
        let result = f();
        self.record(pass, start.elapsed());
        result
    }

    /// Close a frame. Every `interval` frames the averages are logged,
    /// returned and the accumulators reset.
    pub fn end_frame(&mut self) -> Option<TimingReport> {
        self.frames += 1;
        if self.frames < self.interval {
            return None;
        }
        let frames = self.frames;
        let report = TimingReport {
            frames,
            averages: PassKind::ORDER
                .iter()
                .zip(self.totals.iter())
                .map(|(pass, total)| (*pass, *total / frames))
                .collect(),
        };
        self.totals = Default::default();
        self.frames = 0;
        tracing::debug!("pass timings {report}");
        Some(report)
    }

    pub fn frames_pending(&self) -> u32 {
        self.frames
    }
}
