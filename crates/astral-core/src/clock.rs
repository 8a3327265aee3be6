//! Frame clock: elapsed seconds plus the per-frame delta.

use instant::Instant;
use std::time::Duration;

use crate::constants::MAX_FRAME_DELTA_SEC;

/// Snapshot returned by every clock step.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FrameTick {
    pub elapsed: f32,
    pub delta: f32,
    pub frame: u64,
}

/// Monotonic frame clock.
///
/// Elapsed time is the sum of clamped per-frame deltas rather than raw wall
/// time, so a tab that was hidden for a minute resumes where it left off
/// instead of jumping every animation forward.
#[derive(Clone, Debug)]
pub struct FrameClock {
    last: Option<Instant>,
    elapsed: f32,
    delta: f32,
    frame: u64,
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameClock {
    pub fn new() -> Self {
        Self {
            last: None,
            elapsed: 0.0,
            delta: 0.0,
            frame: 0,
        }
    }

    /// Advance using the wall clock. The first tick only anchors the clock.
    pub fn tick(&mut self) -> FrameTick {
        let now = Instant::now();
        let dt = match self.last {
            Some(prev) => now - prev,
            None => Duration::ZERO,
        };
        self.last = Some(now);
        self.advance(dt)
    }

    /// Advance by an explicit duration (tests, offline stepping).
    pub fn advance(&mut self, dt: Duration) -> FrameTick {
        let dt_sec = dt.as_secs_f32().clamp(0.0, MAX_FRAME_DELTA_SEC);
        self.delta = dt_sec;
        self.elapsed += dt_sec;
        self.frame += 1;
        self.current()
    }

    pub fn current(&self) -> FrameTick {
        FrameTick {
            elapsed: self.elapsed,
            delta: self.delta,
            frame: self.frame,
        }
    }

    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    pub fn delta(&self) -> f32 {
        self.delta
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }
}
