use serde::{Deserialize, Serialize};

/// Timing configuration for the frame loop.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeConfig {
    /// Physics step length in seconds.
    pub fixed_time_step: f32,
    /// Delta used when the measured frame delta is zero, negative or not finite.
    pub fallback_delta: f32,
    /// Cap on fixed steps per frame. `None` runs every step the accumulator holds.
    pub max_steps_per_frame: Option<u32>,
}

impl Default for TimeConfig {
    fn default() -> Self {
        Self {
            fixed_time_step: 1.0 / 60.0,
            fallback_delta: 1.0 / 60.0,
            max_steps_per_frame: None,
        }
    }
}

/// Absorbs float drift so that deltas summing to `k` steps yield `k` steps.
const EPSILON: f64 = 1e-6;

/// Largest `alpha` the clock reports; keeps it strictly below one.
const ALPHA_MAX: f32 = 1.0 - f32::EPSILON;

/// Fixed-step accumulator.
///
/// Each frame, [`begin_frame`](Self::begin_frame) adds the frame delta and
/// [`next_step`](Self::next_step) is polled until it returns false; every
/// `true` consumes one fixed step. What is left over gives the render
/// interpolation factor [`alpha`](Self::alpha).
#[derive(Debug, Clone)]
pub struct FixedStepClock {
    config: TimeConfig,
    step: f64,
    accumulator: f64,
    elapsed: f64,
    steps_this_frame: u32,
    total_steps: u64,
}

impl FixedStepClock {
    pub fn new(config: TimeConfig) -> Self {
        let step = if config.fixed_time_step.is_finite() && config.fixed_time_step > 0.0 {
            config.fixed_time_step
        } else {
            tracing::warn!(
                step = config.fixed_time_step,
                "invalid fixed time step, using 1/60"
            );
            1.0 / 60.0
        };
        Self {
            config: TimeConfig {
                fixed_time_step: step,
                ..config
            },
            step: step as f64,
            accumulator: 0.0,
            elapsed: 0.0,
            steps_this_frame: 0,
            total_steps: 0,
        }
    }

    pub fn config(&self) -> &TimeConfig {
        &self.config
    }

    pub fn fixed_time_step(&self) -> f32 {
        self.config.fixed_time_step
    }

    /// The delta the clock will actually use for a measured `dt`.
    pub fn effective_delta(&self, dt: f32) -> f32 {
        if dt.is_finite() && dt > 0.0 {
            dt
        } else {
            self.config.fallback_delta
        }
    }

    /// Start a frame: add the (sanitised) delta to the accumulator and
    /// return it.
    pub fn begin_frame(&mut self, dt: f32) -> f32 {
        let dt = self.effective_delta(dt);
        self.accumulator += dt as f64;
        self.elapsed += dt as f64;
        self.steps_this_frame = 0;
        dt
    }

    /// Consume one fixed step if the accumulator holds one.
    pub fn next_step(&mut self) -> bool {
        if self.accumulator + EPSILON < self.step {
            return false;
        }
        if let Some(max) = self.config.max_steps_per_frame
            && self.steps_this_frame >= max
        {
            let dropped = (self.accumulator / self.step).floor();
            tracing::warn!(
                max,
                dropped,
                "fixed step budget exhausted, dropping accumulated time"
            );
            self.accumulator -= dropped * self.step;
            return false;
        }
        self.accumulator = (self.accumulator - self.step).max(0.0);
        if self.accumulator < EPSILON {
            self.accumulator = 0.0;
        }
        self.steps_this_frame += 1;
        self.total_steps += 1;
        true
    }

    /// Leftover fraction of a step, in `[0, 1)`.
    pub fn alpha(&self) -> f32 {
        ((self.accumulator / self.step) as f32).clamp(0.0, ALPHA_MAX)
    }

    pub fn accumulator(&self) -> f64 {
        self.accumulator
    }

    /// Seconds since the clock started, summed from sanitised deltas.
    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    pub fn steps_this_frame(&self) -> u32 {
        self.steps_this_frame
    }

    pub fn total_steps(&self) -> u64 {
        self.total_steps
    }
}

impl Default for FixedStepClock {
    fn default() -> Self {
        Self::new(TimeConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_frame(clock: &mut FixedStepClock, dt: f32) -> u32 {
        clock.begin_frame(dt);
        let mut steps = 0;
        while clock.next_step() {
            steps += 1;
        }
        steps
    }

    #[test]
    fn non_positive_delta_uses_fallback() {
        let clock = FixedStepClock::default();
        for dt in [0.0, -0.5, f32::NAN, f32::NEG_INFINITY] {
            assert_eq!(clock.effective_delta(dt), 1.0 / 60.0);
        }
        assert_eq!(clock.effective_delta(0.25), 0.25);
    }

    #[test]
    fn zero_delta_still_advances_one_step() {
        let mut clock = FixedStepClock::default();
        assert_eq!(run_frame(&mut clock, 0.0), 1);
        assert_eq!(clock.accumulator(), 0.0);
    }

    #[test]
    fn deltas_summing_to_k_steps_run_k_steps() {
        let step = 1.0 / 60.0;
        let mut clock = FixedStepClock::default();
        let mut total = 0;
        for dt in [step * 0.5, step * 0.5, step * 3.0, step * 0.25, step * 0.75, step] {
            total += run_frame(&mut clock, dt);
        }
        assert_eq!(total, 6);
        assert!(clock.accumulator() < 1e-6);
        assert_eq!(clock.total_steps(), 6);
    }

    #[test]
    fn many_small_frames_do_not_drift() {
        let mut clock = FixedStepClock::new(TimeConfig {
            fixed_time_step: 0.01,
            ..TimeConfig::default()
        });
        let mut total = 0;
        for _ in 0..1000 {
            total += run_frame(&mut clock, 0.0025);
        }
        assert_eq!(total, 250);
    }

    #[test]
    fn fast_frames_may_run_zero_steps() {
        let mut clock = FixedStepClock::default();
        assert_eq!(run_frame(&mut clock, 1.0 / 240.0), 0);
        assert!((clock.alpha() - 0.25).abs() < 1e-4);
    }

    #[test]
    fn alpha_stays_in_unit_interval() {
        let mut clock = FixedStepClock::default();
        for i in 0..500 {
            let dt = 0.001 + (i % 37) as f32 * 0.0013;
            run_frame(&mut clock, dt);
            let alpha = clock.alpha();
            assert!((0.0..1.0).contains(&alpha), "alpha {alpha}");
        }
    }

    #[test]
    fn unbounded_by_default() {
        let mut clock = FixedStepClock::default();
        assert_eq!(run_frame(&mut clock, 2.0), 120);
    }

    #[test]
    fn step_cap_drops_whole_steps_and_keeps_fraction() {
        let mut clock = FixedStepClock::new(TimeConfig {
            fixed_time_step: 0.1,
            max_steps_per_frame: Some(3),
            ..TimeConfig::default()
        });
        assert_eq!(run_frame(&mut clock, 1.05), 3);
        assert!((clock.alpha() - 0.5).abs() < 1e-3);
        assert_eq!(run_frame(&mut clock, 0.05), 1);
    }

    #[test]
    fn invalid_step_falls_back() {
        let clock = FixedStepClock::new(TimeConfig {
            fixed_time_step: 0.0,
            ..TimeConfig::default()
        });
        assert_eq!(clock.fixed_time_step(), 1.0 / 60.0);
    }
}
