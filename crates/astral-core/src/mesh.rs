//! Layered procedural meshes.
//!
//! A motif packs several independent sub-shapes into one vertex buffer. Each
//! layer is described host-side by a typed [`LayerKind`]; only at the GPU
//! boundary is membership flattened into per-vertex tag floats (the layer's
//! ordinal for its own vertices, [`LAYER_SENTINEL`] everywhere else) so a
//! single shader can branch per layer.
//!
//! Layout rules shared by every generator:
//! - vertices are appended at a running cursor; an empty layer leaves the
//!   cursor untouched;
//! - quads are split as `(a, b, c), (b, d, c)` where `a→b` runs along +u and
//!   `a→c` along +v, so every triangle is counter-clockwise in UV space (and
//!   in the XY plane for flat layers);
//! - disc fans run `(center, rim[i], rim[i + 1])` with increasing angle, which
//!   has the same orientation.

use glam::Vec3;
use rand::prelude::*;
use std::f32::consts::TAU;

use crate::constants::{LAYER_SENTINEL, MAX_GPU_LAYERS};
use crate::error::{Error, Result};

/// Geometry of one layer.
#[derive(Clone, Debug, PartialEq)]
pub enum LayerKind {
    /// Filled circle: one center vertex plus `segments` rim vertices.
    Disc { segments: u32, radius: f32 },
    /// Annulus with a duplicated seam column so UVs wrap cleanly. `v` runs
    /// from the outer edge (0) to the inner edge (1).
    Ring {
        segments: u32,
        inner_radius: f32,
        outer_radius: f32,
    },
    /// Flat grid in the XY plane centered on the origin.
    Sheet {
        columns: u32,
        rows: u32,
        width: f32,
        height: f32,
    },
    /// Radial spikes; each spike is one quad from `inner_radius` to
    /// `outer_radius`.
    Spikes {
        count: u32,
        inner_radius: f32,
        outer_radius: f32,
        base_width: f32,
        tip_width: f32,
    },
    /// Billboard particle quads. All four corners share the particle center;
    /// the shader expands them using the corner UV.
    Particles {
        count: u32,
        inner_radius: f32,
        outer_radius: f32,
        thickness: f32,
        seed: u64,
    },
    /// Flat ribbon along a Catmull-Rom spline through `points`.
    Ribbon {
        points: Vec<Vec3>,
        segments: u32,
        width: f32,
    },
    /// Pre-built geometry with local indices.
    Custom {
        positions: Vec<[f32; 3]>,
        uvs: Vec<[f32; 2]>,
        indices: Vec<u32>,
    },
}

impl LayerKind {
    /// Vertices this layer will emit.
    pub fn vertex_count(&self) -> u64 {
        match self {
            LayerKind::Disc { segments, .. } if *segments > 0 => *segments as u64 + 1,
            LayerKind::Ring { segments, .. } | LayerKind::Ribbon { segments, .. }
                if *segments > 0 =>
            {
                2 * (*segments as u64 + 1)
            }
            LayerKind::Sheet { columns, rows, .. } if *columns > 0 && *rows > 0 => {
                (*columns as u64 + 1) * (*rows as u64 + 1)
            }
            LayerKind::Spikes { count, .. } | LayerKind::Particles { count, .. } => {
                4 * *count as u64
            }
            LayerKind::Custom { positions, .. } => positions.len() as u64,
            _ => 0,
        }
    }

    /// Indices this layer will emit.
    pub fn index_count(&self) -> u64 {
        match self {
            LayerKind::Disc { segments, .. } => 3 * *segments as u64,
            LayerKind::Ring { segments, .. } | LayerKind::Ribbon { segments, .. } => {
                6 * *segments as u64
            }
            LayerKind::Sheet { columns, rows, .. } => 6 * *columns as u64 * *rows as u64,
            LayerKind::Spikes { count, .. } | LayerKind::Particles { count, .. } => {
                6 * *count as u64
            }
            LayerKind::Custom { indices, .. } => indices.len() as u64,
        }
    }
}

/// A named layer plus a translation applied to all of its vertices.
#[derive(Clone, Debug, PartialEq)]
pub struct LayerSpec {
    pub name: String,
    pub kind: LayerKind,
    pub offset: Vec3,
}

impl LayerSpec {
    pub fn new(name: impl Into<String>, kind: LayerKind) -> Self {
        Self {
            name: name.into(),
            kind,
            offset: Vec3::ZERO,
        }
    }

    pub fn at(mut self, offset: Vec3) -> Self {
        self.offset = offset;
        self
    }

    pub fn disc(name: impl Into<String>, segments: u32, radius: f32) -> Self {
        Self::new(name, LayerKind::Disc { segments, radius })
    }

    pub fn ring(name: impl Into<String>, segments: u32, inner_radius: f32, outer_radius: f32) -> Self {
        Self::new(
            name,
            LayerKind::Ring {
                segments,
                inner_radius,
                outer_radius,
            },
        )
    }

    pub fn sheet(name: impl Into<String>, columns: u32, rows: u32, width: f32, height: f32) -> Self {
        Self::new(
            name,
            LayerKind::Sheet {
                columns,
                rows,
                width,
                height,
            },
        )
    }

    pub fn spikes(
        name: impl Into<String>,
        count: u32,
        inner_radius: f32,
        outer_radius: f32,
        base_width: f32,
        tip_width: f32,
    ) -> Self {
        Self::new(
            name,
            LayerKind::Spikes {
                count,
                inner_radius,
                outer_radius,
                base_width,
                tip_width,
            },
        )
    }

    pub fn particles(
        name: impl Into<String>,
        count: u32,
        inner_radius: f32,
        outer_radius: f32,
        thickness: f32,
        seed: u64,
    ) -> Self {
        Self::new(
            name,
            LayerKind::Particles {
                count,
                inner_radius,
                outer_radius,
                thickness,
                seed,
            },
        )
    }

    pub fn ribbon(name: impl Into<String>, points: Vec<Vec3>, segments: u32, width: f32) -> Self {
        Self::new(
            name,
            LayerKind::Ribbon {
                points,
                segments,
                width,
            },
        )
    }

    fn validate(&self) -> Result<()> {
        let name = self.name.as_str();
        let finite_non_negative = |label: &str, v: f32| {
            if v.is_finite() && v >= 0.0 {
                Ok(())
            } else {
                Err(Error::invalid_layer(name, format!("{label} must be finite and >= 0, got {v}")))
            }
        };
        if !self.offset.is_finite() {
            return Err(Error::invalid_layer(name, "offset must be finite"));
        }
        match &self.kind {
            LayerKind::Disc { segments, radius } => {
                if (1..3).contains(segments) {
                    return Err(Error::invalid_layer(name, "a disc needs at least 3 segments"));
                }
                finite_non_negative("radius", *radius)
            }
            LayerKind::Ring {
                inner_radius,
                outer_radius,
                ..
            } => {
                finite_non_negative("inner_radius", *inner_radius)?;
                finite_non_negative("outer_radius", *outer_radius)?;
                if inner_radius > outer_radius {
                    return Err(Error::invalid_layer(name, "inner_radius exceeds outer_radius"));
                }
                Ok(())
            }
            LayerKind::Sheet { width, height, .. } => {
                finite_non_negative("width", *width)?;
                finite_non_negative("height", *height)
            }
            LayerKind::Spikes {
                inner_radius,
                outer_radius,
                base_width,
                tip_width,
                ..
            } => {
                finite_non_negative("inner_radius", *inner_radius)?;
                finite_non_negative("outer_radius", *outer_radius)?;
                finite_non_negative("base_width", *base_width)?;
                finite_non_negative("tip_width", *tip_width)?;
                if inner_radius > outer_radius {
                    return Err(Error::invalid_layer(name, "inner_radius exceeds outer_radius"));
                }
                Ok(())
            }
            LayerKind::Particles {
                inner_radius,
                outer_radius,
                thickness,
                ..
            } => {
                finite_non_negative("inner_radius", *inner_radius)?;
                finite_non_negative("outer_radius", *outer_radius)?;
                finite_non_negative("thickness", *thickness)?;
                if inner_radius > outer_radius {
                    return Err(Error::invalid_layer(name, "inner_radius exceeds outer_radius"));
                }
                Ok(())
            }
            LayerKind::Ribbon {
                points,
                segments,
                width,
            } => {
                finite_non_negative("width", *width)?;
                if *segments > 0 && points.len() < 2 {
                    return Err(Error::invalid_layer(name, "a ribbon needs at least 2 points"));
                }
                if points.iter().any(|p| !p.is_finite()) {
                    return Err(Error::invalid_layer(name, "ribbon points must be finite"));
                }
                Ok(())
            }
            LayerKind::Custom {
                positions,
                uvs,
                indices,
            } => {
                if positions.len() != uvs.len() {
                    return Err(Error::BufferLengthMismatch {
                        layer: self.name.clone(),
                        positions: positions.len(),
                        uvs: uvs.len(),
                    });
                }
                if indices.len() % 3 != 0 {
                    return Err(Error::invalid_layer(
                        name,
                        format!("{} indices do not form whole triangles", indices.len()),
                    ));
                }
                if let Some(&index) = indices.iter().find(|&&i| i as usize >= positions.len()) {
                    return Err(Error::IndexOutOfRange {
                        layer: self.name.clone(),
                        index,
                        vertex_count: positions.len(),
                    });
                }
                Ok(())
            }
        }
    }
}

/// Where one layer landed inside the combined buffers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LayerRange {
    pub name: String,
    pub ordinal: u32,
    pub first_vertex: u32,
    pub vertex_count: u32,
    pub first_index: u32,
    pub index_count: u32,
}

impl LayerRange {
    pub fn is_empty(&self) -> bool {
        self.vertex_count == 0
    }

    pub fn contains_vertex(&self, vertex: u32) -> bool {
        vertex >= self.first_vertex && vertex - self.first_vertex < self.vertex_count
    }
}

/// Interleaved vertex handed to the GPU: position, uv and one tag per layer
/// slot (ordinal or sentinel).
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct GpuVertex {
    pub position: [f32; 3],
    pub uv: [f32; 2],
    pub tags: [f32; MAX_GPU_LAYERS],
}

/// Flat buffers for a whole multi-layer mesh.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LayeredMesh {
    positions: Vec<[f32; 3]>,
    uvs: Vec<[f32; 2]>,
    layer_tags: Vec<Vec<f32>>,
    indices: Vec<u32>,
    layers: Vec<LayerRange>,
}

impl LayeredMesh {
    /// Build a mesh from an ordered layer list. Fails on malformed layers
    /// before any buffer is produced.
    pub fn build(specs: &[LayerSpec]) -> Result<Self> {
        let mut total_vertices: u64 = 0;
        let mut total_indices: u64 = 0;
        for (i, spec) in specs.iter().enumerate() {
            spec.validate()?;
            if specs[..i].iter().any(|s| s.name == spec.name) {
                return Err(Error::DuplicateLayer(spec.name.clone()));
            }
            total_vertices += spec.kind.vertex_count();
            total_indices += spec.kind.index_count();
        }
        if total_vertices > u32::MAX as u64 || total_indices > u32::MAX as u64 {
            return Err(Error::IndexOverflow(total_vertices as usize));
        }

        let mut writer = MeshWriter::with_capacity(total_vertices as usize, total_indices as usize);
        let mut layers = Vec::with_capacity(specs.len());
        for (ordinal, spec) in specs.iter().enumerate() {
            let first_vertex = writer.cursor;
            let first_index = writer.indices.len() as u32;
            writer.offset = spec.offset;
            writer.emit(&spec.kind);
            let vertex_count = writer.cursor - first_vertex;
            debug_assert_eq!(vertex_count as u64, spec.kind.vertex_count());
            layers.push(LayerRange {
                name: spec.name.clone(),
                ordinal: ordinal as u32,
                first_vertex,
                vertex_count,
                first_index,
                index_count: writer.indices.len() as u32 - first_index,
            });
        }

        let vertex_total = writer.cursor as usize;
        let layer_tags = layers
            .iter()
            .map(|range| {
                let mut tags = vec![LAYER_SENTINEL; vertex_total];
                let start = range.first_vertex as usize;
                let end = start + range.vertex_count as usize;
                tags[start..end].fill(range.ordinal as f32);
                tags
            })
            .collect();

        let mesh = Self {
            positions: writer.positions,
            uvs: writer.uvs,
            layer_tags,
            indices: writer.indices,
            layers,
        };
        log::debug!(
            "built layered mesh: {} layers, {} vertices, {} indices",
            mesh.layers.len(),
            mesh.vertex_count(),
            mesh.indices.len()
        );
        Ok(mesh)
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn positions(&self) -> &[[f32; 3]] {
        &self.positions
    }

    pub fn uvs(&self) -> &[[f32; 2]] {
        &self.uvs
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub fn layers(&self) -> &[LayerRange] {
        &self.layers
    }

    pub fn layer(&self, name: &str) -> Option<&LayerRange> {
        self.layers.iter().find(|l| l.name == name)
    }

    /// Per-vertex tag buffer for one layer.
    pub fn layer_attribute(&self, ordinal: usize) -> Option<&[f32]> {
        self.layer_tags.get(ordinal).map(Vec::as_slice)
    }

    pub fn layer_attributes(&self) -> &[Vec<f32>] {
        &self.layer_tags
    }

    /// Ordinal of the layer owning `vertex`.
    pub fn layer_of_vertex(&self, vertex: u32) -> Option<u32> {
        self.layers
            .iter()
            .find(|l| l.contains_vertex(vertex))
            .map(|l| l.ordinal)
    }

    /// Interleave into GPU vertices. Layers beyond the tag block capacity
    /// cannot be expressed and are rejected.
    pub fn gpu_vertices(&self) -> Result<Vec<GpuVertex>> {
        if self.layers.len() > MAX_GPU_LAYERS {
            return Err(Error::TooManyLayers {
                count: self.layers.len(),
                max: MAX_GPU_LAYERS,
            });
        }
        let vertices = (0..self.vertex_count())
            .map(|v| {
                let mut tags = [LAYER_SENTINEL; MAX_GPU_LAYERS];
                for (slot, layer) in tags.iter_mut().zip(&self.layer_tags) {
                    *slot = layer[v];
                }
                GpuVertex {
                    position: self.positions[v],
                    uv: self.uvs[v],
                    tags,
                }
            })
            .collect();
        Ok(vertices)
    }

    /// Drop host-side buffers once they have been uploaded.
    pub fn release(&mut self) {
        *self = Self::default();
    }
}

/// Append-only writer with the shared running vertex cursor.
struct MeshWriter {
    positions: Vec<[f32; 3]>,
    uvs: Vec<[f32; 2]>,
    indices: Vec<u32>,
    cursor: u32,
    offset: Vec3,
}

impl MeshWriter {
    fn with_capacity(vertices: usize, indices: usize) -> Self {
        Self {
            positions: Vec::with_capacity(vertices),
            uvs: Vec::with_capacity(vertices),
            indices: Vec::with_capacity(indices),
            cursor: 0,
            offset: Vec3::ZERO,
        }
    }

    fn vertex(&mut self, position: Vec3, uv: [f32; 2]) -> u32 {
        let index = self.cursor;
        self.positions.push((position + self.offset).to_array());
        self.uvs.push(uv);
        self.cursor += 1;
        index
    }

    fn triangle(&mut self, a: u32, b: u32, c: u32) {
        self.indices.extend_from_slice(&[a, b, c]);
    }

    fn quad(&mut self, a: u32, b: u32, c: u32, d: u32) {
        self.triangle(a, b, c);
        self.triangle(b, d, c);
    }

    /// Triangulate a `(columns + 1) x (rows + 1)` row-major vertex grid
    /// starting at `base`.
    fn grid(&mut self, base: u32, columns: u32, rows: u32) {
        let stride = columns + 1;
        for row in 0..rows {
            for col in 0..columns {
                let a = base + row * stride + col;
                let b = a + 1;
                let c = a + stride;
                let d = c + 1;
                self.quad(a, b, c, d);
            }
        }
    }

    fn emit(&mut self, kind: &LayerKind) {
        match kind {
            LayerKind::Disc { segments, radius } => self.disc(*segments, *radius),
            LayerKind::Ring {
                segments,
                inner_radius,
                outer_radius,
            } => self.ring(*segments, *inner_radius, *outer_radius),
            LayerKind::Sheet {
                columns,
                rows,
                width,
                height,
            } => self.sheet(*columns, *rows, *width, *height),
            LayerKind::Spikes {
                count,
                inner_radius,
                outer_radius,
                base_width,
                tip_width,
            } => self.spikes(*count, *inner_radius, *outer_radius, *base_width, *tip_width),
            LayerKind::Particles {
                count,
                inner_radius,
                outer_radius,
                thickness,
                seed,
            } => self.particles(*count, *inner_radius, *outer_radius, *thickness, *seed),
            LayerKind::Ribbon {
                points,
                segments,
                width,
            } => self.ribbon(points, *segments, *width),
            LayerKind::Custom {
                positions,
                uvs,
                indices,
            } => {
                let base = self.cursor;
                for (p, uv) in positions.iter().zip(uvs) {
                    self.vertex(Vec3::from_array(*p), *uv);
                }
                self.indices.extend(indices.iter().map(|i| base + i));
            }
        }
    }

    fn disc(&mut self, segments: u32, radius: f32) {
        if segments == 0 {
            return;
        }
        let center = self.vertex(Vec3::ZERO, [0.5, 0.5]);
        let first_rim = self.cursor;
        for i in 0..segments {
            let theta = TAU * i as f32 / segments as f32;
            let (s, c) = theta.sin_cos();
            self.vertex(
                Vec3::new(radius * c, radius * s, 0.0),
                [0.5 + 0.5 * c, 0.5 + 0.5 * s],
            );
        }
        for i in 0..segments {
            let next = (i + 1) % segments;
            self.triangle(center, first_rim + i, first_rim + next);
        }
    }

    fn ring(&mut self, segments: u32, inner_radius: f32, outer_radius: f32) {
        if segments == 0 {
            return;
        }
        let base = self.cursor;
        for (row, radius) in [outer_radius, inner_radius].into_iter().enumerate() {
            for i in 0..=segments {
                let u = i as f32 / segments as f32;
                let (s, c) = (TAU * u).sin_cos();
                self.vertex(Vec3::new(radius * c, radius * s, 0.0), [u, row as f32]);
            }
        }
        self.grid(base, segments, 1);
    }

    fn sheet(&mut self, columns: u32, rows: u32, width: f32, height: f32) {
        if columns == 0 || rows == 0 {
            return;
        }
        let base = self.cursor;
        for row in 0..=rows {
            let v = row as f32 / rows as f32;
            for col in 0..=columns {
                let u = col as f32 / columns as f32;
                self.vertex(
                    Vec3::new((u - 0.5) * width, (v - 0.5) * height, 0.0),
                    [u, v],
                );
            }
        }
        self.grid(base, columns, rows);
    }

    fn spikes(&mut self, count: u32, inner: f32, outer: f32, base_width: f32, tip_width: f32) {
        for k in 0..count {
            let theta = TAU * k as f32 / count as f32;
            let (s, c) = theta.sin_cos();
            let radial = Vec3::new(c, s, 0.0);
            let tangent = Vec3::new(-s, c, 0.0);
            let base = radial * inner;
            let tip = radial * outer;
            let a = self.vertex(base + tangent * (0.5 * base_width), [0.0, 0.0]);
            let b = self.vertex(base - tangent * (0.5 * base_width), [1.0, 0.0]);
            let c = self.vertex(tip + tangent * (0.5 * tip_width), [0.0, 1.0]);
            let d = self.vertex(tip - tangent * (0.5 * tip_width), [1.0, 1.0]);
            self.quad(a, b, c, d);
        }
    }

    fn particles(&mut self, count: u32, inner: f32, outer: f32, thickness: f32, seed: u64) {
        let mut rng = StdRng::seed_from_u64(seed);
        let (r0, r1) = (inner * inner, outer * outer);
        for _ in 0..count {
            let theta = rng.gen::<f32>() * TAU;
            // sqrt of a uniform in r^2 spreads particles evenly over the annulus
            let r = (r0 + (r1 - r0) * rng.gen::<f32>()).sqrt();
            let z = (rng.gen::<f32>() - 0.5) * thickness;
            let center = Vec3::new(r * theta.cos(), r * theta.sin(), z);
            let a = self.vertex(center, [0.0, 0.0]);
            let b = self.vertex(center, [1.0, 0.0]);
            let c = self.vertex(center, [0.0, 1.0]);
            let d = self.vertex(center, [1.0, 1.0]);
            self.quad(a, b, c, d);
        }
    }

    fn ribbon(&mut self, points: &[Vec3], segments: u32, width: f32) {
        if segments == 0 {
            return;
        }
        let base = self.cursor;
        let samples: Vec<(Vec3, Vec3)> = (0..=segments)
            .map(|i| catmull_rom_sample(points, i as f32 / segments as f32))
            .collect();
        for (row, side_sign) in [(0.0_f32, -0.5_f32), (1.0, 0.5)] {
            for (i, (point, tangent)) in samples.iter().enumerate() {
                let mut side = Vec3::Z.cross(*tangent).normalize_or_zero();
                if side == Vec3::ZERO {
                    side = Vec3::Y;
                }
                let u = i as f32 / segments as f32;
                self.vertex(*point + side * (side_sign * width), [u, row]);
            }
        }
        self.grid(base, segments, 1);
    }
}

/// Position and tangent at `t` in \[0, 1\] along a uniform Catmull-Rom spline
/// through `points` (end points are duplicated as phantom neighbours).
pub fn catmull_rom_sample(points: &[Vec3], t: f32) -> (Vec3, Vec3) {
    match points.len() {
        0 => (Vec3::ZERO, Vec3::X),
        1 => (points[0], Vec3::X),
        n => {
            let spans = (n - 1) as f32;
            let scaled = t.clamp(0.0, 1.0) * spans;
            let span = (scaled.floor() as usize).min(n - 2);
            let local = scaled - span as f32;
            let p0 = points[span.saturating_sub(1)];
            let p1 = points[span];
            let p2 = points[span + 1];
            let p3 = points[(span + 2).min(n - 1)];
            let t2 = local * local;
            let t3 = t2 * local;
            let position = 0.5
                * ((2.0 * p1)
                    + (-p0 + p2) * local
                    + (2.0 * p0 - 5.0 * p1 + 4.0 * p2 - p3) * t2
                    + (-p0 + 3.0 * p1 - 3.0 * p2 + p3) * t3);
            let tangent = 0.5
                * ((-p0 + p2)
                    + 2.0 * (2.0 * p0 - 5.0 * p1 + 4.0 * p2 - p3) * local
                    + 3.0 * (-p0 + 3.0 * p1 - 3.0 * p2 + p3) * t2);
            (position, tangent.normalize_or_zero())
        }
    }
}
