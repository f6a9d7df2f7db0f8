//! Light propagation and surface extraction for voxel chunks.
//!
//! This module turns a 3x3 cluster of voxel data into the renderable surface of
//! its centre chunk. The work is split into two stages that run back to back on
//! a worker thread:
//! 1. [`light::propagate_light`]: sky light plus flood fill over the whole cluster
//! 2. [`surface::extract_surface`]: visible faces of the centre chunk with per-vertex light
//!
//! # Architecture
//! - [`ComputeWork`]: the buffers one pipeline run reads and writes
//! - `light`: the two light passes
//! - `surface`: face culling and quad emission
//! - `mesh/`: the output arrays and the fixed cube tables

pub mod light;
pub mod mesh;
pub mod surface;

pub use mesh::MeshData;

use crate::engine_state::voxels::{
    block::{block_type::BlockType, VoxelId},
    chunk::{ChunkCoord, CLUSTER_VOLUME},
};

/// The buffers of one compute pipeline run.
///
/// The work is owned by exactly one party at a time: the streaming pool while
/// idle, the running task while in flight. Allocations are reused between runs.
#[derive(Debug, Clone, PartialEq)]
pub struct ComputeWork {
    /// The chunk whose surface is extracted
    pub coord: ChunkCoord,
    /// Snapshot of the 3x3 cluster around `coord`
    pub cluster: Vec<VoxelId>,
    /// Light level per cluster voxel
    pub light: Vec<f32>,
    /// Extracted surface of the centre chunk
    pub mesh: MeshData,
}

impl ComputeWork {
    /// Allocates cluster and light buffers for one run.
    pub fn new(coord: ChunkCoord) -> Self {
        ComputeWork {
            coord,
            cluster: vec![BlockType::AIR.id(); CLUSTER_VOLUME],
            light: vec![0.0; CLUSTER_VOLUME],
            mesh: MeshData::new(),
        }
    }

    /// Retargets the buffers at another chunk. Contents are left for the next
    /// copy to overwrite.
    pub fn reset(&mut self, coord: ChunkCoord) {
        self.coord = coord;
        self.mesh.clear();
    }
}
