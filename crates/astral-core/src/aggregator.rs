//! Merges scroll, audio, clock and camera inputs into one [`MotionState`].

use std::f32::consts::TAU;

use crate::clock::FrameTick;
use crate::config::AggregatorConfig;
use crate::constants::{MAX_CAMERA_FOV_DEG, MIN_CAMERA_FOV_DEG};
use crate::motion::{AudioBands, MotionState};

/// Collects the latest raw input from each upstream source and produces one
/// smoothed [`MotionState`] per frame.
///
/// Inputs may arrive at any cadence (scroll events, analyser reads); only
/// [`MotionAggregator::sample`] advances smoothing, so the result depends on
/// frame time, not on how often inputs were pushed.
#[derive(Clone, Debug)]
pub struct MotionAggregator {
    config: AggregatorConfig,
    scroll_progress: f32,
    raw_bands: AudioBands,
    smoothed: AudioBands,
    rotation_sync: f32,
    camera_fov: f32,
}

impl Default for MotionAggregator {
    fn default() -> Self {
        Self::new(AggregatorConfig::default())
    }
}

impl MotionAggregator {
    pub fn new(config: AggregatorConfig) -> Self {
        let camera_fov = config
            .camera_fov_deg
            .clamp(MIN_CAMERA_FOV_DEG, MAX_CAMERA_FOV_DEG);
        Self {
            config,
            scroll_progress: 0.0,
            raw_bands: AudioBands::default(),
            smoothed: AudioBands::default(),
            rotation_sync: 0.0,
            camera_fov,
        }
    }

    pub fn config(&self) -> &AggregatorConfig {
        &self.config
    }

    /// Set scroll progress directly. Overscroll and NaN are clamped into
    /// \[0, 1\].
    pub fn set_scroll_progress(&mut self, raw: f32) {
        self.scroll_progress = clamp_unit(raw);
    }

    /// Derive scroll progress from a scroll container's geometry.
    ///
    /// A document that does not scroll (content shorter than the viewport)
    /// reports 0.
    pub fn set_scroll_position(&mut self, scroll_top: f32, scroll_height: f32, viewport_height: f32) {
        let scrollable = scroll_height - viewport_height;
        let progress = if scrollable > 0.0 {
            scroll_top / scrollable
        } else {
            0.0
        };
        if !(0.0..=1.0).contains(&progress) {
            log::debug!("clamping overscroll progress {progress:.3}");
        }
        self.set_scroll_progress(progress);
    }

    /// Add a relative scroll delta expressed in progress units.
    pub fn scroll_by(&mut self, delta: f32) {
        self.set_scroll_progress(self.scroll_progress + delta);
    }

    pub fn scroll_progress(&self) -> f32 {
        self.scroll_progress
    }

    /// Record raw (unsmoothed) band energies for the next sample.
    pub fn set_audio_bands(&mut self, raw: AudioBands) {
        self.raw_bands = raw.clamped();
    }

    /// Record raw band energies from byte analyser bins.
    pub fn push_byte_spectrum(&mut self, bins: &[u8]) {
        let bands = AudioBands::split(
            bins.len(),
            self.config.bass_band_end,
            self.config.mid_band_end,
            |i| bins[i] as f32 / 255.0,
        );
        self.set_audio_bands(bands);
    }

    /// Silence the audio input; smoothed bands decay towards zero.
    pub fn clear_audio(&mut self) {
        self.raw_bands = AudioBands::default();
    }

    pub fn smoothed_bands(&self) -> AudioBands {
        self.smoothed
    }

    pub fn set_rotation_sync(&mut self, radians: f32) {
        if radians.is_finite() {
            self.rotation_sync = radians;
        }
    }

    pub fn set_camera_fov(&mut self, degrees: f32) {
        if degrees.is_finite() {
            self.camera_fov = degrees.clamp(MIN_CAMERA_FOV_DEG, MAX_CAMERA_FOV_DEG);
        }
    }

    /// Produce this frame's state. Audio bands follow the raw input with an
    /// exponential moving average whose rate depends on `tick.delta`.
    pub fn sample(&mut self, tick: FrameTick) -> MotionState {
        let alpha = ema_alpha(tick.delta, self.config.audio_tau_sec);
        self.smoothed = AudioBands {
            bass: ema(self.smoothed.bass, self.raw_bands.bass, alpha),
            mid: ema(self.smoothed.mid, self.raw_bands.mid, alpha),
            high: ema(self.smoothed.high, self.raw_bands.high, alpha),
        }
        .clamped();
        let (breath_phase, breath_strength) = breath(tick.elapsed, self.config.breath_period_sec);
        MotionState {
            time: tick.elapsed,
            scroll_progress: self.scroll_progress,
            bass_motion: self.smoothed.bass,
            mid_motion: self.smoothed.mid,
            high_motion: self.smoothed.high,
            blessing_wave_progress: 0.0,
            breath_phase,
            breath_strength,
            rotation_sync: self.rotation_sync,
            camera_fov: self.camera_fov,
        }
    }
}

#[inline]
fn clamp_unit(v: f32) -> f32 {
    if v.is_finite() {
        v.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Blend factor for a frame of `dt` seconds with time constant `tau`.
#[inline]
pub fn ema_alpha(dt: f32, tau: f32) -> f32 {
    if tau <= 0.0 {
        return 1.0;
    }
    (1.0 - (-dt.max(0.0) / tau).exp()).clamp(0.0, 1.0)
}

#[inline]
fn ema(prev: f32, target: f32, alpha: f32) -> f32 {
    prev + (target - prev) * alpha
}

/// Breath phase in \[0, 1) and strength in \[0, 1\] at `time`.
pub fn breath(time: f32, period: f32) -> (f32, f32) {
    if period <= 0.0 || !time.is_finite() {
        return (0.0, 0.0);
    }
    let phase = (time / period).rem_euclid(1.0);
    let strength = 0.5 - 0.5 * (TAU * phase).cos();
    (phase, strength.clamp(0.0, 1.0))
}
