/// Result alias that carries the crate [`Error`] type.
pub type Result<T> = std::result::Result<T, Error>;

/// Construction-time failures. Steady-state per-frame failures never surface
/// here; the orchestrator logs and swallows them.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// A layer parameter is out of range (negative radius, NaN size, ...).
    #[error("layer '{layer}': {reason}")]
    InvalidLayer { layer: String, reason: String },

    /// Two layers in one mesh share a name.
    #[error("duplicate layer name '{0}'")]
    DuplicateLayer(String),

    /// A custom layer's positions/uvs/indices disagree with each other.
    #[error("layer '{layer}': {positions} positions but {uvs} uvs")]
    BufferLengthMismatch {
        layer: String,
        positions: usize,
        uvs: usize,
    },

    /// A custom layer references a vertex it does not own.
    #[error("layer '{layer}': index {index} out of range for {vertex_count} vertices")]
    IndexOutOfRange {
        layer: String,
        index: u32,
        vertex_count: usize,
    },

    /// The combined mesh no longer fits 32-bit indices.
    #[error("mesh exceeds u32 index range ({0} vertices)")]
    IndexOverflow(usize),

    /// The GPU tag block only has room for a fixed number of layers.
    #[error("{count} layers exceed the GPU tag capacity of {max}")]
    TooManyLayers { count: usize, max: usize },

    /// Disposed engines cannot be reactivated; build a fresh instance.
    #[error("engine '{0}' is disposed")]
    EngineDisposed(String),

    /// The orchestrator was disposed; nothing registered with it would run.
    #[error("engine '{0}' cannot activate on a disposed orchestrator")]
    OrchestratorDisposed(String),
}

impl Error {
    pub(crate) fn invalid_layer(layer: &str, reason: impl Into<String>) -> Self {
        Self::InvalidLayer {
            layer: layer.to_string(),
            reason: reason.into(),
        }
    }
}
