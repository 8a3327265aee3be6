use crate::constants::*;
use crate::mesh::LayerSpec;

/// Rendering budget for a motif. `Reduced` is the mobile / low-power variant.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Quality {
    #[default]
    Full,
    Reduced,
}

impl Quality {
    /// Pick a quality from coarse device hints.
    pub fn from_device(viewport_width: f32, logical_cores: u32) -> Self {
        if viewport_width < 768.0 || logical_cores <= 4 {
            Quality::Reduced
        } else {
            Quality::Full
        }
    }

    /// Scale a count for this quality, keeping at least `min` when the full
    /// count is non-zero.
    pub fn scale_count(self, full: u32, min: u32) -> u32 {
        match self {
            Quality::Full => full,
            Quality::Reduced if full == 0 => 0,
            Quality::Reduced => (full / 2).max(min),
        }
    }
}

/// Parameters for turning raw inputs into a [`crate::MotionState`].
#[derive(Clone, Debug, PartialEq)]
pub struct AggregatorConfig {
    pub audio_tau_sec: f32,
    pub bass_band_end: f32,
    pub mid_band_end: f32,
    pub breath_period_sec: f32,
    pub camera_fov_deg: f32,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            audio_tau_sec: AUDIO_EMA_TAU_SEC,
            bass_band_end: BASS_BAND_END,
            mid_band_end: MID_BAND_END,
            breath_period_sec: BREATH_PERIOD_SEC,
            camera_fov_deg: DEFAULT_CAMERA_FOV_DEG,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct BlessingConfig {
    pub duration_sec: f32,
}

impl Default for BlessingConfig {
    fn default() -> Self {
        Self {
            duration_sec: BLESSING_WAVE_DURATION_SEC,
        }
    }
}

/// Immutable construction parameters for a visual engine.
///
/// There are no setters: a different configuration means a different mesh, so
/// callers build a new engine instead.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    pub(crate) key: String,
    pub(crate) layers: Vec<LayerSpec>,
    pub(crate) quality: Quality,
    pub(crate) intensity: f32,
    pub(crate) parallax_strength: f32,
    pub(crate) particle_size: f32,
    pub(crate) two_sided: bool,
    pub(crate) section: Option<String>,
}

impl EngineConfig {
    pub fn new(key: impl Into<String>, layers: Vec<LayerSpec>) -> Self {
        Self {
            key: key.into(),
            layers,
            quality: Quality::Full,
            intensity: 1.0,
            parallax_strength: DEFAULT_PARALLAX_STRENGTH,
            particle_size: DEFAULT_PARTICLE_SIZE,
            two_sided: false,
            section: None,
        }
    }

    pub fn with_quality(mut self, quality: Quality) -> Self {
        self.quality = quality;
        self
    }

    pub fn with_intensity(mut self, intensity: f32) -> Self {
        self.intensity = intensity.max(0.0);
        self
    }

    pub fn with_parallax(mut self, strength: f32) -> Self {
        self.parallax_strength = strength;
        self
    }

    pub fn with_particle_size(mut self, size: f32) -> Self {
        self.particle_size = size.max(0.0);
        self
    }

    pub fn two_sided(mut self, two_sided: bool) -> Self {
        self.two_sided = two_sided;
        self
    }

    /// Only receive broadcasts while `section` is on screen.
    pub fn in_section(mut self, section: impl Into<String>) -> Self {
        self.section = Some(section.into());
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn layers(&self) -> &[LayerSpec] {
        &self.layers
    }

    pub fn quality(&self) -> Quality {
        self.quality
    }

    pub fn intensity(&self) -> f32 {
        self.intensity
    }

    pub fn parallax_strength(&self) -> f32 {
        self.parallax_strength
    }

    pub fn particle_size(&self) -> f32 {
        self.particle_size
    }

    pub fn is_two_sided(&self) -> bool {
        self.two_sided
    }

    pub fn section(&self) -> Option<&str> {
        self.section.as_deref()
    }
}
