//! Representative motif layer recipes.
//!
//! Each motif is a short list of layers; the reduced variant trims segment
//! and particle counts and may empty a layer entirely.

use glam::Vec3;

use crate::config::{EngineConfig, Quality};
use crate::mesh::LayerSpec;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Motif {
    AstralGate,
    Lotus,
    ChakraColumn,
    OrbitRings,
    TrailRibbon,
}

impl Motif {
    pub const ALL: [Motif; 5] = [
        Motif::AstralGate,
        Motif::Lotus,
        Motif::ChakraColumn,
        Motif::OrbitRings,
        Motif::TrailRibbon,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Motif::AstralGate => "astral_gate",
            Motif::Lotus => "lotus",
            Motif::ChakraColumn => "chakra_column",
            Motif::OrbitRings => "orbit_rings",
            Motif::TrailRibbon => "trail_ribbon",
        }
    }

    pub fn layers(self, quality: Quality) -> Vec<LayerSpec> {
        match self {
            Motif::AstralGate => astral_gate(quality),
            Motif::Lotus => lotus(quality),
            Motif::ChakraColumn => chakra_column(quality),
            Motif::OrbitRings => orbit_rings(quality),
            Motif::TrailRibbon => trail_ribbon(quality),
        }
    }

    /// Engine config with this motif's layers and rendering flags.
    pub fn engine_config(self, key: impl Into<String>, quality: Quality) -> EngineConfig {
        EngineConfig::new(key, self.layers(quality))
            .with_quality(quality)
            .two_sided(matches!(self, Motif::Lotus | Motif::TrailRibbon))
    }
}

fn astral_gate(q: Quality) -> Vec<LayerSpec> {
    vec![
        LayerSpec::disc("core", q.scale_count(64, 24), 0.6),
        LayerSpec::ring("halo", q.scale_count(96, 32), 0.9, 1.25),
        LayerSpec::spikes("rays", q.scale_count(24, 12), 1.3, 2.1, 0.08, 0.0),
        LayerSpec::particles("dust", q.scale_count(600, 150), 1.0, 2.6, 0.4, 7),
    ]
}

fn lotus(q: Quality) -> Vec<LayerSpec> {
    vec![
        LayerSpec::disc("heart", q.scale_count(48, 16), 0.3),
        LayerSpec::spikes("inner_petals", 8, 0.25, 1.0, 0.45, 0.1),
        LayerSpec::spikes("outer_petals", 12, 0.5, 1.6, 0.6, 0.15).at(Vec3::new(0.0, 0.0, -0.05)),
        LayerSpec::particles("pollen", q.scale_count(300, 80), 0.2, 0.9, 0.2, 11),
    ]
}

const CHAKRA_COUNT: usize = 7;

fn chakra_column(q: Quality) -> Vec<LayerSpec> {
    let spacing = 0.8;
    let mut layers: Vec<LayerSpec> = (0..CHAKRA_COUNT)
        .map(|i| {
            let y = (i as f32 - (CHAKRA_COUNT as f32 - 1.0) * 0.5) * spacing;
            LayerSpec::disc(format!("chakra_{i}"), q.scale_count(32, 12), 0.28)
                .at(Vec3::new(0.0, y, 0.0))
        })
        .collect();
    layers.push(LayerSpec::sheet("spine", 1, q.scale_count(24, 8), 0.05, 5.2));
    layers
}

fn orbit_rings(q: Quality) -> Vec<LayerSpec> {
    let satellites = match q {
        Quality::Full => 48,
        Quality::Reduced => 0,
    };
    vec![
        LayerSpec::disc("sun", q.scale_count(48, 16), 0.35),
        LayerSpec::ring("orbit_inner", q.scale_count(128, 48), 0.95, 1.0),
        LayerSpec::ring("orbit_outer", q.scale_count(160, 64), 1.75, 1.8),
        LayerSpec::particles("satellites", satellites, 0.95, 1.8, 0.0, 23),
    ]
}

fn trail_ribbon(q: Quality) -> Vec<LayerSpec> {
    let points: Vec<Vec3> = (0..8)
        .map(|i| {
            let t = i as f32 / 7.0;
            let angle = t * std::f32::consts::TAU * 1.25;
            let r = 0.4 + 1.6 * t;
            Vec3::new(r * angle.cos(), r * angle.sin(), -0.5 + t)
        })
        .collect();
    vec![
        LayerSpec::ribbon("trail", points, q.scale_count(128, 48), 0.12),
        LayerSpec::particles("sparks", q.scale_count(200, 60), 0.3, 2.0, 0.6, 31),
    ]
}
