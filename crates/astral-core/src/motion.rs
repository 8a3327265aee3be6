//! Per-frame motion drivers shared by every engine.

use crate::constants::{
    BASS_BAND_END, BLESSING_WAVE_DURATION_SEC, DEFAULT_CAMERA_FOV_DEG, MID_BAND_END,
};

/// Value snapshot of the shared animation drivers for one frame.
///
/// Engines receive it by reference and never write back into it; anything an
/// engine derives (parallax, eased values) lives in its own state.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MotionState {
    /// Monotonic seconds since the clock started.
    pub time: f32,
    /// Page scroll in \[0, 1\].
    pub scroll_progress: f32,
    /// Smoothed audio band energies in \[0, 1\].
    pub bass_motion: f32,
    pub mid_motion: f32,
    pub high_motion: f32,
    /// One-shot pulse envelope in \[0, 1\]; 0 when no wave is running.
    pub blessing_wave_progress: f32,
    /// Position within the current breath cycle, \[0, 1).
    pub breath_phase: f32,
    /// Inhale depth, \[0, 1\].
    pub breath_strength: f32,
    /// Externally driven rotation, radians.
    pub rotation_sync: f32,
    /// Vertical field of view, degrees.
    pub camera_fov: f32,
}

impl Default for MotionState {
    fn default() -> Self {
        Self {
            time: 0.0,
            scroll_progress: 0.0,
            bass_motion: 0.0,
            mid_motion: 0.0,
            high_motion: 0.0,
            blessing_wave_progress: 0.0,
            breath_phase: 0.0,
            breath_strength: 0.0,
            rotation_sync: 0.0,
            camera_fov: DEFAULT_CAMERA_FOV_DEG,
        }
    }
}

impl MotionState {
    /// Combined audio energy, weighted towards the low end.
    pub fn audio_energy(&self) -> f32 {
        (0.5 * self.bass_motion + 0.3 * self.mid_motion + 0.2 * self.high_motion).clamp(0.0, 1.0)
    }
}

/// Three-band energy split of an analyser spectrum.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct AudioBands {
    pub bass: f32,
    pub mid: f32,
    pub high: f32,
}

impl AudioBands {
    pub fn new(bass: f32, mid: f32, high: f32) -> Self {
        Self { bass, mid, high }.clamped()
    }

    pub fn clamped(self) -> Self {
        let c = |v: f32| if v.is_finite() { v.clamp(0.0, 1.0) } else { 0.0 };
        Self {
            bass: c(self.bass),
            mid: c(self.mid),
            high: c(self.high),
        }
    }

    /// Split byte frequency data (0..=255 per bin) using the default band
    /// boundaries.
    pub fn from_byte_spectrum(bins: &[u8]) -> Self {
        Self::split(bins.len(), BASS_BAND_END, MID_BAND_END, |i| {
            bins[i] as f32 / 255.0
        })
    }

    /// Split float frequency data in decibels, mapping `[min_db, max_db]` to
    /// `[0, 1]`.
    pub fn from_decibel_spectrum(bins: &[f32], min_db: f32, max_db: f32) -> Self {
        let span = (max_db - min_db).max(f32::EPSILON);
        Self::split(bins.len(), BASS_BAND_END, MID_BAND_END, |i| {
            let v = bins[i];
            if v.is_finite() {
                ((v - min_db) / span).clamp(0.0, 1.0)
            } else {
                0.0
            }
        })
    }

    /// Average `sample(i)` over three contiguous bin ranges. Each band gets at
    /// least one bin when the spectrum has three or more.
    pub fn split(
        len: usize,
        bass_end: f32,
        mid_end: f32,
        sample: impl Fn(usize) -> f32,
    ) -> Self {
        if len == 0 {
            return Self::default();
        }
        let bass_end = ((len as f32 * bass_end.clamp(0.0, 1.0)).round() as usize).clamp(1, len);
        let mid_end = ((len as f32 * mid_end.clamp(0.0, 1.0)).round() as usize)
            .clamp((bass_end + 1).min(len), len);
        let avg = |lo: usize, hi: usize| {
            if hi <= lo {
                0.0
            } else {
                (lo..hi).map(&sample).sum::<f32>() / (hi - lo) as f32
            }
        };
        Self {
            bass: avg(0, bass_end),
            mid: avg(bass_end, mid_end),
            high: avg(mid_end, len),
        }
        .clamped()
    }
}

/// Timed one-shot pulse: rises 0 → 1 → 0 over `duration` seconds.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BlessingWave {
    start: f32,
    strength: f32,
    duration: f32,
}

impl BlessingWave {
    pub fn new(start: f32, strength: f32, duration: f32) -> Self {
        Self {
            start,
            strength: if strength.is_finite() {
                strength.clamp(0.0, 1.0)
            } else {
                0.0
            },
            duration: if duration.is_finite() && duration > 0.0 {
                duration
            } else {
                BLESSING_WAVE_DURATION_SEC
            },
        }
    }

    pub fn start(&self) -> f32 {
        self.start
    }

    pub fn strength(&self) -> f32 {
        self.strength
    }

    pub fn duration(&self) -> f32 {
        self.duration
    }

    /// Linear progress through the wave, clamped to \[0, 1\].
    pub fn progress(&self, time: f32) -> f32 {
        ((time - self.start) / self.duration).clamp(0.0, 1.0)
    }

    pub fn is_finished(&self, time: f32) -> bool {
        time - self.start >= self.duration
    }

    /// Envelope value at `time`: a half sine scaled by strength.
    pub fn sample(&self, time: f32) -> f32 {
        if time <= self.start || self.is_finished(time) {
            return 0.0;
        }
        let p = self.progress(time);
        ((std::f32::consts::PI * p).sin() * self.strength).clamp(0.0, 1.0)
    }
}
