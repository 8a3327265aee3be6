//! Motion orchestration and layered procedural meshes for audio and scroll
//! reactive motifs. Platform independent; the web frontend lives in
//! `astral-web`.

pub mod aggregator;
pub mod camera;
pub mod clock;
pub mod config;
pub mod constants;
pub mod engine;
pub mod error;
pub mod mesh;
pub mod motifs;
pub mod motion;
pub mod orchestrator;
pub mod postfx;

pub static MOTIF_WGSL: &str = include_str!("../shaders/motif.wgsl");
pub static POST_WGSL: &str = include_str!("../shaders/post.wgsl");

pub use aggregator::MotionAggregator;
pub use camera::{Camera, CameraUniforms};
pub use clock::{FrameClock, FrameTick};
pub use config::{AggregatorConfig, BlessingConfig, EngineConfig, Quality};
pub use engine::{EngineLifecycle, EngineUniforms, LifecycleState, MotionReceiver, VisualEngine};
pub use error::{Error, Result};
pub use mesh::{GpuVertex, LayerKind, LayerRange, LayerSpec, LayeredMesh};
pub use motifs::Motif;
pub use motion::{AudioBands, BlessingWave, MotionState};
pub use orchestrator::{
    create_orchestrator, BroadcastReport, EngineHandle, EventData, MotionOrchestrator,
    SceneEvent, SceneHandle, SectionEvent, SectionHandle,
};
pub use postfx::{PostFxKind, PostFxPass, PostFxUniforms};
