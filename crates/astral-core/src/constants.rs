// Motion, smoothing and mesh-layout tuning constants: time constants, clamp
// limits and buffer capacities.

// Frame clock
pub const MAX_FRAME_DELTA_SEC: f32 = 0.1; // longer gaps (hidden tab) advance by this much

// Audio band smoothing (EMA time constant, seconds)
pub const AUDIO_EMA_TAU_SEC: f32 = 0.18;

// Band split as fractions of the analyser bin range
pub const BASS_BAND_END: f32 = 0.10;
pub const MID_BAND_END: f32 = 0.40;

// Decibel window used when the analyser reports float (dB) spectra
pub const SPECTRUM_MIN_DB: f32 = -100.0;
pub const SPECTRUM_MAX_DB: f32 = -30.0;

// Breath cadence (one inhale + exhale)
pub const BREATH_PERIOD_SEC: f32 = 8.0;

// Blessing wave one-shot pulse
pub const BLESSING_WAVE_DURATION_SEC: f32 = 2.4;

// Camera
pub const DEFAULT_CAMERA_FOV_DEG: f32 = 45.0;
pub const MIN_CAMERA_FOV_DEG: f32 = 10.0;
pub const MAX_CAMERA_FOV_DEG: f32 = 120.0;
pub const CAMERA_Z: f32 = 6.0;

// Layer tagging
pub const LAYER_SENTINEL: f32 = -1.0; // tag value for vertices outside a layer
pub const MAX_GPU_LAYERS: usize = 8; // two vec4 tag slots per vertex

// Pointer parallax
pub const DEFAULT_PARALLAX_STRENGTH: f32 = 0.15;
pub const POINTER_EASE_TAU_SEC: f32 = 0.25; // pointer follow lag

// Engine defaults
pub const DEFAULT_PARTICLE_SIZE: f32 = 0.04; // world units

// Post-FX fallback render target size
pub const FALLBACK_RESOLUTION: [u32; 2] = [1, 1];
