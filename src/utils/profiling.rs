use log::{log_enabled, Level};
use std::time::{Duration, Instant};

/// Timing and counters gathered for a single scene step.
#[derive(Debug, Default, Clone, Copy)]
pub struct StepProfile {
    pub pre_step_time: Duration,
    pub collide_time: Duration,
    pub dispatch_time: Duration,
    pub integrate_time: Duration,
    pub read_back_time: Duration,
    pub total_time: Duration,

    pub body_count: usize,
    pub joint_count: usize,
    pub collision_count: usize,
    pub event_count: usize,
    pub ccd_corrections: usize,
    pub nan_repairs: usize,
}

impl StepProfile {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Emits the profile at debug level.
    pub fn report(&self) {
        if !log_enabled!(Level::Debug) {
            return;
        }
        let total_us = self.total_time.as_micros().max(1) as f32;
        let share = |d: Duration| (d.as_micros() as f32 / total_us) * 100.0;

        log::debug!(
            "step: {:.3} ms, bodies {}, joints {}, collisions {}, events {}, ccd {}, nan {}",
            self.total_time.as_secs_f32() * 1000.0,
            self.body_count,
            self.joint_count,
            self.collision_count,
            self.event_count,
            self.ccd_corrections,
            self.nan_repairs
        );
        log::debug!(
            "  pre {:.1}% | collide {:.1}% | dispatch {:.1}% | integrate {:.1}% | read-back {:.1}%",
            share(self.pre_step_time),
            share(self.collide_time),
            share(self.dispatch_time),
            share(self.integrate_time),
            share(self.read_back_time)
        );
    }
}

/// Accumulates the elapsed time of a scope into a profile slot and traces it.
pub struct ScopedTimer<'a> {
    label: &'static str,
    start: Instant,
    output: &'a mut Duration,
}

impl<'a> ScopedTimer<'a> {
    pub fn new(label: &'static str, output: &'a mut Duration) -> Self {
        if log_enabled!(Level::Trace) {
            log::trace!("start {label}");
        }
        Self {
            label,
            start: Instant::now(),
            output,
        }
    }
}

impl<'a> Drop for ScopedTimer<'a> {
    fn drop(&mut self) {
        let elapsed = self.start.elapsed();
        *self.output += elapsed;
        if log_enabled!(Level::Trace) {
            log::trace!("end {} ({} µs)", self.label, elapsed.as_micros());
        }
    }
}
