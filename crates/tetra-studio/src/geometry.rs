//! Demo geometry: a coloured cube with outlined edges and corner dots.

use glam::{Quat, Vec2, Vec3, Vec4};
use tetra_engine::scene::{Dot, Lin, MeshVertex, Tri};

const CORNERS: [Vec3; 8] = [
    Vec3::new(-1.0, -1.0, -1.0),
    Vec3::new(1.0, -1.0, -1.0),
    Vec3::new(1.0, 1.0, -1.0),
    Vec3::new(-1.0, 1.0, -1.0),
    Vec3::new(-1.0, -1.0, 1.0),
    Vec3::new(1.0, -1.0, 1.0),
    Vec3::new(1.0, 1.0, 1.0),
    Vec3::new(-1.0, 1.0, 1.0),
];

/// Corner indices per face, counter-clockwise seen from outside.
const FACES: [([usize; 4], Vec3); 6] = [
    ([4, 5, 6, 7], Vec3::Z),
    ([1, 0, 3, 2], Vec3::NEG_Z),
    ([5, 1, 2, 6], Vec3::X),
    ([0, 4, 7, 3], Vec3::NEG_X),
    ([7, 6, 2, 3], Vec3::Y),
    ([0, 1, 5, 4], Vec3::NEG_Y),
];

#[rustfmt::skip]
const EDGES: [[usize; 2]; 12] = [
    [0, 1], [1, 2], [2, 3], [3, 0],
    [4, 5], [5, 6], [6, 7], [7, 4],
    [0, 4], [1, 5], [2, 6], [3, 7],
];

const FACE_COLORS: [Vec4; 6] = [
    Vec4::new(0.91, 0.30, 0.24, 1.0),
    Vec4::new(0.20, 0.60, 0.86, 1.0),
    Vec4::new(0.18, 0.80, 0.44, 1.0),
    Vec4::new(0.95, 0.77, 0.06, 1.0),
    Vec4::new(0.61, 0.35, 0.71, 1.0),
    Vec4::new(0.90, 0.49, 0.13, 1.0),
];

const EDGE_COLOR: Vec4 = Vec4::new(1.0, 1.0, 1.0, 1.0);
const DOT_COLOR: Vec4 = Vec4::new(0.1, 0.1, 0.1, 1.0);

/// Cube geometry rotated by `angle` radians about a tilted axis.
pub fn cube(angle: f32) -> (Vec<Tri>, Vec<Lin>, Vec<Dot>) {
    let rot = Quat::from_axis_angle(Vec3::new(1.0, 2.0, 0.5).normalize(), angle);
    let corner = |i: usize| rot * (CORNERS[i] * 0.8);

    let uvs = [Vec2::ZERO, Vec2::X, Vec2::ONE, Vec2::Y];
    let mut tris = Vec::with_capacity(12);
    for (face, (idx, normal)) in FACES.iter().enumerate() {
        let norm = rot * *normal;
        let vert = |k: usize| MeshVertex {
            pos: corner(idx[k]),
            norm,
            uv: uvs[k],
            col: FACE_COLORS[face],
        };
        tris.push(Tri {
            verts: [vert(0), vert(1), vert(2)],
        });
        tris.push(Tri {
            verts: [vert(0), vert(2), vert(3)],
        });
    }

    let lins = EDGES
        .iter()
        .map(|&[a, b]| {
            let mut lin = Lin::new(corner(a), corner(b), EDGE_COLOR);
            lin.norm = (corner(a) + corner(b)).normalize_or_zero();
            lin
        })
        .collect();

    let dots = (0..CORNERS.len())
        .map(|i| Dot {
            pos: corner(i),
            norm: corner(i).normalize_or_zero(),
            col: DOT_COLOR,
        })
        .collect();

    (tris, lins, dots)
}
