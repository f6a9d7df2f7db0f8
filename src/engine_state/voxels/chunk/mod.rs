//! # Chunk Module
//!
//! This module provides [`ChunkCoord`], [`ChunkVoxelBuffer`] and the fixed index
//! mappings every consumer of voxel data agrees on.
//!
//! ## Layout
//!
//! A chunk is a `CHUNK_SIZE x CHUNK_HEIGHT x CHUNK_SIZE` column of voxels stored
//! densely, X fastest, then Z, then Y:
//!
//! ```text
//! voxel_index(x, y, z)   = x + CHUNK_SIZE * (z + CHUNK_SIZE * y)
//! cluster_index(x, y, z) = x + CLUSTER_SIZE * (z + CLUSTER_SIZE * y)
//! ```
//!
//! A cluster is the 3x3 neighbourhood of chunks around a centre chunk, used by
//! the light and mesh stages. Chunk `(dx, dz)` of the neighbourhood (each in
//! `-1..=1`) occupies cluster columns `(dx + 1) * CHUNK_SIZE ..` on X and
//! `(dz + 1) * CHUNK_SIZE ..` on Z, so a horizontal row of a chunk is a
//! contiguous run in both layouts.

use std::{
    fmt,
    ops::{Add, Sub},
};

use cgmath::Point3;

use super::block::{block_type::BlockType, VoxelId};

pub mod chunk_iteration;

/// The width and depth of a chunk in voxels.
pub const CHUNK_SIZE: usize = 16;
/// The height of a chunk (and of the world) in voxels.
pub const CHUNK_HEIGHT: usize = 128;
/// The number of voxels in one horizontal layer of a chunk.
pub const CHUNK_PLANE_SIZE: usize = CHUNK_SIZE * CHUNK_SIZE;
/// The total number of voxels in a chunk.
pub const CHUNK_VOLUME: usize = CHUNK_PLANE_SIZE * CHUNK_HEIGHT;
/// The width and depth of a 3x3 chunk cluster.
pub const CLUSTER_SIZE: usize = CHUNK_SIZE * 3;
/// The number of voxels in one horizontal layer of a cluster.
pub const CLUSTER_PLANE_SIZE: usize = CLUSTER_SIZE * CLUSTER_SIZE;
/// The total number of voxels in a cluster.
pub const CLUSTER_VOLUME: usize = CLUSTER_PLANE_SIZE * CHUNK_HEIGHT;

/// Linear index of a chunk-local voxel.
#[inline]
pub fn voxel_index(x: usize, y: usize, z: usize) -> usize {
    x + CHUNK_SIZE * (z + CHUNK_SIZE * y)
}

/// Inverse of [`voxel_index`].
#[inline]
pub fn voxel_position(index: usize) -> (usize, usize, usize) {
    (
        index % CHUNK_SIZE,
        index / CHUNK_PLANE_SIZE,
        (index / CHUNK_SIZE) % CHUNK_SIZE,
    )
}

/// Linear index of a voxel inside a cluster buffer.
#[inline]
pub fn cluster_index(x: usize, y: usize, z: usize) -> usize {
    x + CLUSTER_SIZE * (z + CLUSTER_SIZE * y)
}

/// Cluster-space coordinates of a voxel of the centre chunk.
#[inline]
pub fn center_to_cluster(x: usize, z: usize) -> (usize, usize) {
    (x + CHUNK_SIZE, z + CHUNK_SIZE)
}

/// Identifies a chunk in the horizontal chunk grid.
///
/// A chunk spans the full world height, so two integers are enough. Chunk
/// `(x, z)` covers world blocks `x * CHUNK_SIZE .. (x + 1) * CHUNK_SIZE` on X
/// (likewise on Z).
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkCoord {
    /// Chunk column on the X axis.
    pub x: i32,
    /// Chunk column on the Z axis.
    pub z: i32,
}

impl ChunkCoord {
    /// Creates a chunk coordinate.
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// The chunk containing a world-space position (floor division).
    pub fn from_world_position(position: Point3<f32>) -> Self {
        Self::from_block(position.x.floor() as i32, position.z.floor() as i32)
    }

    /// The chunk containing the world block column `(x, z)`.
    pub fn from_block(x: i32, z: i32) -> Self {
        Self {
            x: x.div_euclid(CHUNK_SIZE as i32),
            z: z.div_euclid(CHUNK_SIZE as i32),
        }
    }

    /// World block coordinates of the chunk's minimum corner (at y = 0).
    pub fn world_origin(self) -> Point3<i32> {
        Point3::new(
            self.x * CHUNK_SIZE as i32,
            0,
            self.z * CHUNK_SIZE as i32,
        )
    }

    /// The coordinate offset by `(dx, dz)` chunks.
    pub fn offset(self, dx: i32, dz: i32) -> Self {
        Self::new(self.x + dx, self.z + dz)
    }
}

impl Add for ChunkCoord {
    type Output = ChunkCoord;

    fn add(self, rhs: ChunkCoord) -> ChunkCoord {
        ChunkCoord::new(self.x + rhs.x, self.z + rhs.z)
    }
}

impl Sub for ChunkCoord {
    type Output = ChunkCoord;

    fn sub(self, rhs: ChunkCoord) -> ChunkCoord {
        ChunkCoord::new(self.x - rhs.x, self.z - rhs.z)
    }
}

impl fmt::Display for ChunkCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.z)
    }
}

/// Splits a world block position into its chunk and chunk-local X/Z.
pub fn split_world_position(x: i32, z: i32) -> (ChunkCoord, usize, usize) {
    let coord = ChunkCoord::from_block(x, z);
    (
        coord,
        x.rem_euclid(CHUNK_SIZE as i32) as usize,
        z.rem_euclid(CHUNK_SIZE as i32) as usize,
    )
}

/// Dense voxel storage of one chunk, exactly [`CHUNK_VOLUME`] entries long.
///
/// Materialized chunks never hold the unset sentinel. In a
/// [`PlayerEditOverlay`](crate::engine_state::voxels::edits::PlayerEditOverlay)
/// zero entries mean "not edited".
#[derive(Clone, PartialEq, Eq)]
pub struct ChunkVoxelBuffer {
    voxels: Box<[VoxelId]>,
}

impl ChunkVoxelBuffer {
    /// A buffer with every voxel set to `id`.
    pub fn filled(id: VoxelId) -> Self {
        Self {
            voxels: vec![id; CHUNK_VOLUME].into_boxed_slice(),
        }
    }

    /// An all-sentinel buffer, as used by the edit overlay.
    pub fn unset() -> Self {
        Self::filled(BlockType::UNSET.id())
    }

    /// Voxel at chunk-local coordinates.
    #[inline]
    pub fn get(&self, x: usize, y: usize, z: usize) -> VoxelId {
        self.voxels[voxel_index(x, y, z)]
    }

    /// Sets the voxel at chunk-local coordinates.
    #[inline]
    pub fn set(&mut self, x: usize, y: usize, z: usize, id: VoxelId) {
        self.voxels[voxel_index(x, y, z)] = id;
    }

    /// The raw voxel slice in [`voxel_index`] order.
    pub fn as_slice(&self) -> &[VoxelId] {
        &self.voxels
    }

    /// The raw voxel slice in [`voxel_index`] order, mutably.
    pub fn as_mut_slice(&mut self) -> &mut [VoxelId] {
        &mut self.voxels
    }

    /// Iterates over `(linear index, id)` of every non-sentinel voxel.
    pub fn set_entries(&self) -> impl Iterator<Item = (usize, VoxelId)> + '_ {
        self.voxels
            .iter()
            .enumerate()
            .filter(|(_, id)| **id != BlockType::UNSET.id())
            .map(|(index, id)| (index, *id))
    }
}

impl fmt::Debug for ChunkVoxelBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChunkVoxelBuffer")
            .field("set_entries", &self.set_entries().count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_coordinates_use_floor_division() {
        assert_eq!(ChunkCoord::from_block(0, 15), ChunkCoord::new(0, 0));
        assert_eq!(ChunkCoord::from_block(16, -1), ChunkCoord::new(1, -1));
        assert_eq!(ChunkCoord::from_block(-16, -17), ChunkCoord::new(-1, -2));
        assert_eq!(
            ChunkCoord::from_world_position(Point3::new(-0.5, 40.0, 31.9)),
            ChunkCoord::new(-1, 1)
        );
    }

    #[test]
    fn split_world_position_is_consistent_with_origin() {
        for (x, z) in [(0, 0), (-1, -1), (17, -33), (-160, 5)] {
            let (coord, lx, lz) = split_world_position(x, z);
            let origin = coord.world_origin();
            assert_eq!(origin.x + lx as i32, x);
            assert_eq!(origin.z + lz as i32, z);
        }
    }

    #[test]
    fn voxel_index_round_trips() {
        for &(x, y, z) in &[(0, 0, 0), (15, 0, 0), (0, 127, 0), (3, 64, 15), (15, 127, 15)] {
            let index = voxel_index(x, y, z);
            assert!(index < CHUNK_VOLUME);
            assert_eq!(voxel_position(index), (x, y, z));
        }
        assert_eq!(voxel_index(15, 127, 15), CHUNK_VOLUME - 1);
    }

    #[test]
    fn chunk_rows_are_contiguous_in_the_cluster() {
        let (cx, cz) = center_to_cluster(0, 7);
        let start = cluster_index(cx, 30, cz);
        let (ex, ez) = center_to_cluster(CHUNK_SIZE - 1, 7);
        assert_eq!(cluster_index(ex, 30, ez), start + CHUNK_SIZE - 1);
    }

    #[test]
    fn set_entries_skip_sentinels() {
        let mut buffer = ChunkVoxelBuffer::unset();
        buffer.set(1, 2, 3, BlockType::STONE.id());
        let entries: Vec<_> = buffer.set_entries().collect();
        assert_eq!(entries, vec![(voxel_index(1, 2, 3), BlockType::STONE.id())]);
    }
}
