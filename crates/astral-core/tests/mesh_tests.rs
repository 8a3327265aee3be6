// Host-side tests for the layered procedural mesh builder: buffer
// consistency, layer tag exclusivity, winding and construction errors.

use astral_core::constants::{LAYER_SENTINEL, MAX_GPU_LAYERS};
use astral_core::*;
use glam::Vec3;
use rand::prelude::*;

fn uv_area(mesh: &LayeredMesh, tri: &[u32]) -> f32 {
    let [a, b, c] = [tri[0], tri[1], tri[2]].map(|i| mesh.uvs()[i as usize]);
    (b[0] - a[0]) * (c[1] - a[1]) - (b[1] - a[1]) * (c[0] - a[0])
}

fn xy_area(mesh: &LayeredMesh, tri: &[u32]) -> f32 {
    let [a, b, c] = [tri[0], tri[1], tri[2]].map(|i| mesh.positions()[i as usize]);
    (b[0] - a[0]) * (c[1] - a[1]) - (b[1] - a[1]) * (c[0] - a[0])
}

fn random_layer(rng: &mut StdRng, name: String) -> LayerSpec {
    let kind = match rng.gen_range(0..6) {
        0 => {
            let segments = if rng.gen_bool(0.2) { 0 } else { rng.gen_range(3..72) };
            LayerKind::Disc {
                segments,
                radius: rng.gen_range(0.1..2.0),
            }
        }
        1 => {
            let inner = rng.gen_range(0.0..1.0);
            LayerKind::Ring {
                segments: rng.gen_range(0..96),
                inner_radius: inner,
                outer_radius: inner + rng.gen_range(0.01..1.0),
            }
        }
        2 => LayerKind::Sheet {
            columns: rng.gen_range(0..12),
            rows: rng.gen_range(0..12),
            width: rng.gen_range(0.1..4.0),
            height: rng.gen_range(0.1..4.0),
        },
        3 => LayerKind::Spikes {
            count: rng.gen_range(0..40),
            inner_radius: rng.gen_range(0.0..0.5),
            outer_radius: rng.gen_range(0.5..2.5),
            base_width: rng.gen_range(0.01..0.3),
            tip_width: rng.gen_range(0.0..0.1),
        },
        4 => LayerKind::Particles {
            count: rng.gen_range(0..300),
            inner_radius: 0.2,
            outer_radius: rng.gen_range(0.2..3.0),
            thickness: rng.gen_range(0.0..0.5),
            seed: rng.gen(),
        },
        _ => {
            let n = rng.gen_range(2..7);
            let points = (0..n)
                .map(|_| Vec3::new(rng.gen_range(-2.0..2.0), rng.gen_range(-2.0..2.0), 0.0))
                .collect();
            LayerKind::Ribbon {
                points,
                segments: rng.gen_range(0..64),
                width: rng.gen_range(0.01..0.3),
            }
        }
    };
    LayerSpec::new(name, kind)
}

fn random_specs(rng: &mut StdRng) -> Vec<LayerSpec> {
    let n = rng.gen_range(1..=MAX_GPU_LAYERS);
    (0..n).map(|i| random_layer(rng, format!("layer_{i}"))).collect()
}

#[test]
fn disc_and_particles_scenario() {
    // 63 rim segments + center = 64 vertices; 25 particles x 4 corners = 100
    let mesh = LayeredMesh::build(&[
        LayerSpec::disc("disc", 63, 1.0),
        LayerSpec::particles("particles", 25, 0.5, 2.0, 0.1, 3),
    ])
    .unwrap();
    assert_eq!(mesh.layer("disc").unwrap().vertex_count, 64);
    assert_eq!(mesh.layer("particles").unwrap().vertex_count, 100);
    assert_eq!(mesh.vertex_count(), 164);
    assert_eq!(mesh.indices().iter().copied().max(), Some(163));
}

#[test]
fn indices_stay_in_range_for_random_layer_sets() {
    let mut rng = StdRng::seed_from_u64(0xA57A1);
    for _ in 0..200 {
        let specs = random_specs(&mut rng);
        let mesh = LayeredMesh::build(&specs).unwrap();
        let vc = mesh.vertex_count() as u32;
        assert_eq!(mesh.index_count() % 3, 0);
        assert!(mesh.indices().iter().all(|&i| i < vc));
        assert_eq!(mesh.positions().len(), mesh.uvs().len());
        let expected: u64 = specs.iter().map(|s| s.kind.vertex_count()).sum();
        assert_eq!(vc as u64, expected);
    }
}

#[test]
fn exactly_one_tag_per_vertex_is_non_negative() {
    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..200 {
        let specs = random_specs(&mut rng);
        let mesh = LayeredMesh::build(&specs).unwrap();
        assert_eq!(mesh.layer_attributes().len(), specs.len());
        for tags in mesh.layer_attributes() {
            assert_eq!(tags.len(), mesh.vertex_count());
        }
        for v in 0..mesh.vertex_count() {
            let owners: Vec<usize> = mesh
                .layer_attributes()
                .iter()
                .enumerate()
                .filter(|(_, tags)| tags[v] >= 0.0)
                .map(|(ordinal, _)| ordinal)
                .collect();
            assert_eq!(owners.len(), 1, "vertex {v}");
            let ordinal = owners[0];
            assert_eq!(mesh.layer_attribute(ordinal).unwrap()[v], ordinal as f32);
            assert_eq!(mesh.layer_of_vertex(v as u32), Some(ordinal as u32));
        }

        let gpu = mesh.gpu_vertices().unwrap();
        assert_eq!(gpu.len(), mesh.vertex_count());
        for vertex in &gpu {
            let live = vertex.tags.iter().filter(|t| **t >= 0.0).count();
            assert_eq!(live, 1);
            let unused = &vertex.tags[specs.len()..];
            assert!(unused.iter().all(|t| *t == LAYER_SENTINEL));
        }
    }
}

#[test]
fn triangles_never_cross_layers() {
    let mut rng = StdRng::seed_from_u64(99);
    for _ in 0..100 {
        let mesh = LayeredMesh::build(&random_specs(&mut rng)).unwrap();
        for range in mesh.layers() {
            let start = range.first_index as usize;
            let end = start + range.index_count as usize;
            for &i in &mesh.indices()[start..end] {
                assert!(range.contains_vertex(i), "{} leaked index {i}", range.name);
            }
        }
    }
}

#[test]
fn layer_ranges_are_contiguous() {
    let mut rng = StdRng::seed_from_u64(1234);
    for _ in 0..100 {
        let mesh = LayeredMesh::build(&random_specs(&mut rng)).unwrap();
        let mut cursor = 0;
        let mut index_cursor = 0;
        for (ordinal, range) in mesh.layers().iter().enumerate() {
            assert_eq!(range.ordinal as usize, ordinal);
            assert_eq!(range.first_vertex, cursor);
            assert_eq!(range.first_index, index_cursor);
            cursor += range.vertex_count;
            index_cursor += range.index_count;
        }
        assert_eq!(cursor as usize, mesh.vertex_count());
        assert_eq!(index_cursor as usize, mesh.index_count());
    }
}

#[test]
fn empty_layer_leaves_cursor_unchanged() {
    let mesh = LayeredMesh::build(&[
        LayerSpec::disc("sun", 16, 0.5),
        LayerSpec::particles("satellites", 0, 1.0, 2.0, 0.0, 1),
        LayerSpec::ring("orbit", 32, 1.0, 1.1),
    ])
    .unwrap();

    let sun = mesh.layer("sun").unwrap();
    let satellites = mesh.layer("satellites").unwrap();
    let orbit = mesh.layer("orbit").unwrap();
    assert!(satellites.is_empty());
    assert_eq!(satellites.index_count, 0);
    assert_eq!(satellites.first_vertex, sun.vertex_count);
    assert_eq!(orbit.first_vertex, sun.vertex_count);
    assert_eq!(satellites.first_index, orbit.first_index);

    // still emits a well-formed, all-sentinel attribute buffer
    let tags = mesh.layer_attribute(1).unwrap();
    assert_eq!(tags.len(), mesh.vertex_count());
    assert!(tags.iter().all(|t| *t == LAYER_SENTINEL));
}

#[test]
fn empty_mesh_is_well_formed() {
    let mesh = LayeredMesh::build(&[LayerSpec::sheet("nothing", 0, 4, 1.0, 1.0)]).unwrap();
    assert!(mesh.is_empty());
    assert!(mesh.indices().is_empty());
    assert_eq!(mesh.layers().len(), 1);
    assert!(mesh.gpu_vertices().unwrap().is_empty());
}

#[test]
fn every_generated_triangle_is_ccw_in_uv_space() {
    let mut rng = StdRng::seed_from_u64(5150);
    for _ in 0..100 {
        let mesh = LayeredMesh::build(&random_specs(&mut rng)).unwrap();
        for tri in mesh.indices().chunks_exact(3) {
            assert!(uv_area(&mesh, tri) > 0.0, "triangle {tri:?}");
        }
    }
}

#[test]
fn flat_layers_face_the_camera() {
    let mesh = LayeredMesh::build(&[
        LayerSpec::disc("disc", 24, 1.0),
        LayerSpec::ring("ring", 24, 0.5, 1.0),
        LayerSpec::sheet("sheet", 4, 3, 2.0, 1.0),
        LayerSpec::spikes("spikes", 12, 0.5, 1.5, 0.2, 0.05),
        LayerSpec::ribbon(
            "ribbon",
            vec![Vec3::new(-1.0, 0.0, 0.0), Vec3::new(0.0, 0.5, 0.0), Vec3::new(1.0, 0.0, 0.0)],
            16,
            0.1,
        ),
    ])
    .unwrap();
    for tri in mesh.indices().chunks_exact(3) {
        assert!(xy_area(&mesh, tri) > 0.0, "triangle {tri:?}");
    }
}

#[test]
fn quads_follow_abc_bdc_convention() {
    let mesh = LayeredMesh::build(&[LayerSpec::sheet("sheet", 1, 1, 1.0, 1.0)]).unwrap();
    // a=0 b=1 c=2 d=3
    assert_eq!(mesh.indices(), &[0, 1, 2, 1, 3, 2]);

    let disc = LayeredMesh::build(&[LayerSpec::disc("disc", 3, 1.0)]).unwrap();
    assert_eq!(disc.indices(), &[0, 1, 2, 0, 2, 3, 0, 3, 1]);
}

#[test]
fn offset_translates_layer_vertices() {
    let mesh = LayeredMesh::build(&[
        LayerSpec::disc("low", 8, 1.0).at(Vec3::new(0.0, -2.0, 0.0)),
        LayerSpec::disc("high", 8, 1.0).at(Vec3::new(0.0, 2.0, 0.0)),
    ])
    .unwrap();
    assert_eq!(mesh.positions()[0], [0.0, -2.0, 0.0]);
    let high = mesh.layer("high").unwrap();
    assert_eq!(mesh.positions()[high.first_vertex as usize], [0.0, 2.0, 0.0]);
}

#[test]
fn particles_are_deterministic_per_seed_and_inside_annulus() {
    let build = |seed| {
        LayeredMesh::build(&[LayerSpec::particles("p", 64, 0.5, 1.5, 0.2, seed)]).unwrap()
    };
    assert_eq!(build(42), build(42));
    assert_ne!(build(42).positions(), build(43).positions());

    let mesh = build(42);
    for quad in mesh.positions().chunks_exact(4) {
        assert!(quad.iter().all(|p| p == &quad[0]));
        let r = (quad[0][0] * quad[0][0] + quad[0][1] * quad[0][1]).sqrt();
        assert!((0.5 - 1e-4..=1.5 + 1e-4).contains(&r));
        assert!(quad[0][2].abs() <= 0.1 + 1e-6);
    }
}

#[test]
fn custom_layer_indices_are_rebased() {
    let mesh = LayeredMesh::build(&[
        LayerSpec::disc("disc", 4, 1.0),
        LayerSpec::new(
            "tri",
            LayerKind::Custom {
                positions: vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
                uvs: vec![[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]],
                indices: vec![0, 1, 2],
            },
        ),
    ])
    .unwrap();
    let tri = mesh.layer("tri").unwrap();
    assert_eq!(tri.first_vertex, 5);
    let start = tri.first_index as usize;
    assert_eq!(&mesh.indices()[start..], &[5, 6, 7]);
}

#[test]
fn malformed_layers_fail_at_construction() {
    let err = LayeredMesh::build(&[LayerSpec::disc("d", 2, 1.0)]).unwrap_err();
    assert!(matches!(err, Error::InvalidLayer { .. }));

    let err = LayeredMesh::build(&[LayerSpec::ring("r", 8, 2.0, 1.0)]).unwrap_err();
    assert!(matches!(err, Error::InvalidLayer { .. }));

    // inverted spikes would wind clockwise and vanish under back-face culling
    let err = LayeredMesh::build(&[LayerSpec::spikes("rays", 4, 1.5, 0.5, 0.2, 0.1)]).unwrap_err();
    assert_eq!(
        err,
        Error::InvalidLayer {
            layer: "rays".into(),
            reason: "inner_radius exceeds outer_radius".into()
        }
    );

    let err = LayeredMesh::build(&[LayerSpec::disc("d", 8, f32::NAN)]).unwrap_err();
    assert!(matches!(err, Error::InvalidLayer { .. }));

    let err = LayeredMesh::build(&[LayerSpec::ribbon("t", vec![Vec3::ZERO], 8, 0.1)]).unwrap_err();
    assert!(matches!(err, Error::InvalidLayer { .. }));

    let err = LayeredMesh::build(&[
        LayerSpec::disc("same", 8, 1.0),
        LayerSpec::ring("same", 8, 0.5, 1.0),
    ])
    .unwrap_err();
    assert_eq!(err, Error::DuplicateLayer("same".into()));

    let err = LayeredMesh::build(&[LayerSpec::new(
        "c",
        LayerKind::Custom {
            positions: vec![[0.0; 3]; 3],
            uvs: vec![[0.0; 2]; 2],
            indices: vec![0, 1, 2],
        },
    )])
    .unwrap_err();
    assert_eq!(
        err,
        Error::BufferLengthMismatch {
            layer: "c".into(),
            positions: 3,
            uvs: 2
        }
    );

    let err = LayeredMesh::build(&[LayerSpec::new(
        "c",
        LayerKind::Custom {
            positions: vec![[0.0; 3]; 3],
            uvs: vec![[0.0; 2]; 3],
            indices: vec![0, 1, 3],
        },
    )])
    .unwrap_err();
    assert!(matches!(err, Error::IndexOutOfRange { index: 3, .. }));

    let err = LayeredMesh::build(&[LayerSpec::new(
        "c",
        LayerKind::Custom {
            positions: vec![[0.0; 3]; 3],
            uvs: vec![[0.0; 2]; 3],
            indices: vec![0, 1],
        },
    )])
    .unwrap_err();
    assert!(matches!(err, Error::InvalidLayer { .. }));
}

#[test]
fn gpu_packing_rejects_more_layers_than_tag_slots() {
    let specs: Vec<LayerSpec> = (0..=MAX_GPU_LAYERS)
        .map(|i| LayerSpec::disc(format!("d{i}"), 4, 1.0))
        .collect();
    let mesh = LayeredMesh::build(&specs).unwrap();
    assert_eq!(
        mesh.gpu_vertices().unwrap_err(),
        Error::TooManyLayers {
            count: MAX_GPU_LAYERS + 1,
            max: MAX_GPU_LAYERS
        }
    );
}

#[test]
fn gpu_vertex_layout_is_tightly_packed() {
    assert_eq!(std::mem::size_of::<GpuVertex>(), (3 + 2 + MAX_GPU_LAYERS) * 4);
    let mesh = LayeredMesh::build(&[LayerSpec::sheet("s", 2, 2, 1.0, 1.0)]).unwrap();
    let verts = mesh.gpu_vertices().unwrap();
    let bytes: &[u8] = bytemuck::cast_slice(&verts);
    assert_eq!(bytes.len(), verts.len() * std::mem::size_of::<GpuVertex>());
    assert_eq!(verts[0].tags[0], 0.0);
}

#[test]
fn release_drops_host_buffers() {
    let mut mesh = LayeredMesh::build(&[LayerSpec::disc("d", 8, 1.0)]).unwrap();
    mesh.release();
    assert!(mesh.is_empty());
    assert!(mesh.layers().is_empty());
}

#[test]
fn catmull_rom_passes_through_endpoints() {
    let points = [Vec3::new(0.0, 0.0, 0.0), Vec3::new(1.0, 1.0, 0.0), Vec3::new(2.0, 0.0, 0.0)];
    let (start, _) = mesh::catmull_rom_sample(&points, 0.0);
    let (mid, _) = mesh::catmull_rom_sample(&points, 0.5);
    let (end, tangent) = mesh::catmull_rom_sample(&points, 1.0);
    assert!(start.distance(points[0]) < 1e-5);
    assert!(mid.distance(points[1]) < 1e-5);
    assert!(end.distance(points[2]) < 1e-5);
    assert!((tangent.length() - 1.0).abs() < 1e-4);
}
