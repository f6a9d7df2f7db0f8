//! Fixed geometry tables of a unit voxel.
//!
//! Corners are numbered by their `(x, y, z)` offsets:
//!
//! ```text
//!     7 ------ 6        y
//!    /|       /|        |
//!   3 ------ 2 |        +-- x
//!   | 4 -----|-5       /
//!   |/       |/       z
//!   0 ------ 1
//! ```
//!
//! Every face lists its four corners as `[bottom-left, top-left, bottom-right, top-right]`
//! seen from outside the voxel, the same order as the atlas UV quads.

use cgmath::{Point3, Vector3};

use crate::engine_state::voxels::block::block_side::BlockSide;

/// Offsets of the eight corners of a unit voxel.
pub const CUBE_CORNERS: [[u8; 3]; 8] = [
    [0, 0, 0],
    [1, 0, 0],
    [1, 1, 0],
    [0, 1, 0],
    [0, 0, 1],
    [1, 0, 1],
    [1, 1, 1],
    [0, 1, 1],
];

/// Corners of each face in `BlockSide` order, `[bl, tl, br, tr]`.
pub const FACE_CORNERS: [[usize; 4]; 6] = [
    [4, 7, 5, 6], // FRONT  (+z)
    [1, 2, 0, 3], // BACK   (-z)
    [0, 4, 1, 5], // BOTTOM (-y)
    [7, 3, 6, 2], // TOP    (+y)
    [0, 3, 4, 7], // LEFT   (-x)
    [5, 6, 1, 2], // RIGHT  (+x)
];

/// Two counter-clockwise triangles over a face's four corners.
pub const FACE_TRIANGLES: [u32; 6] = [0, 2, 1, 1, 2, 3];

/// Offset of a face corner from the voxel's minimum corner.
#[inline]
pub fn corner_offset(side: BlockSide, corner: usize) -> [u8; 3] {
    CUBE_CORNERS[FACE_CORNERS[side as usize][corner]]
}

/// Chunk-local position of a face corner.
#[inline]
pub fn corner_position(voxel: Point3<usize>, side: BlockSide, corner: usize) -> Point3<f32> {
    let [x, y, z] = corner_offset(side, corner);
    Point3::new(
        (voxel.x + x as usize) as f32,
        (voxel.y + y as usize) as f32,
        (voxel.z + z as usize) as f32,
    )
}

/// The face normal as a float vector.
#[inline]
pub fn face_normal(side: BlockSide) -> Vector3<f32> {
    side.normal().cast::<f32>().unwrap_or_else(Vector3::unit_y)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::InnerSpace;

    #[test]
    fn face_corners_lie_on_the_face_plane() {
        for side in BlockSide::all() {
            let normal = side.normal();
            let axis = side.axis();
            let plane = if [normal.x, normal.y, normal.z][axis] > 0 { 1 } else { 0 };
            for corner in 0..4 {
                assert_eq!(corner_offset(side, corner)[axis], plane, "{side:?}");
            }
        }
    }

    #[test]
    fn triangles_wind_towards_the_normal() {
        let voxel = Point3::new(0, 0, 0);
        for side in BlockSide::all() {
            let normal = face_normal(side);
            for triangle in FACE_TRIANGLES.chunks(3) {
                let [a, b, c] = [0, 1, 2].map(|i| corner_position(voxel, side, triangle[i] as usize));
                let winding = (b - a).cross(c - a);
                assert!(winding.dot(normal) > 0.0, "{side:?} winds away from its normal");
            }
        }
    }
}
