//! # World Model
//!
//! This module provides the `WorldModel` which owns every materialized chunk
//! buffer and the player edit overlay.
//!
//! ## Architecture
//!
//! Only chunks inside the data range of the observer are materialized. Each one
//! is regenerated from the seed and then has the player's edits laid over it, so
//! evicting a chunk never loses anything: the overlay outlives the buffer.
//!
//! ## Contract
//!
//! Point queries are only valid inside the materialized region. Asking for a
//! voxel of a chunk that is not materialized is a caller bug and panics.

use std::{
    collections::HashMap,
    sync::Arc,
};

use cgmath::Point3;
use log::{debug, info};
use rayon::prelude::*;
use web_time::Instant;

use crate::{
    engine_state::voxels::{
        block::{block_type::BlockType, BlockRegistry, VoxelId},
        chunk::{
            cluster_index, split_world_position, voxel_index, ChunkCoord, ChunkVoxelBuffer,
            CHUNK_HEIGHT, CHUNK_SIZE, CLUSTER_VOLUME,
        },
        edits::PlayerEditOverlay,
        tasks::chunk_generation_task::ChunkGenerationTask,
        terrain::TerrainGenerator,
    },
    error::{PersistError, WorldError},
};

/// Owner of the materialized voxel data and the player's edits.
pub struct WorldModel {
    /// Shared generator used by every generation job
    generator: Arc<TerrainGenerator>,
    /// Block properties, used to validate edits and answer solidity queries
    registry: Arc<BlockRegistry>,
    /// At most one buffer per materialized chunk
    chunks: HashMap<ChunkCoord, ChunkVoxelBuffer>,
    /// Every voxel the player changed, materialized or not
    edits: PlayerEditOverlay,
}

impl WorldModel {
    /// Creates a world model with nothing materialized and no edits.
    pub fn new(generator: Arc<TerrainGenerator>, registry: Arc<BlockRegistry>) -> Self {
        WorldModel {
            generator,
            registry,
            chunks: HashMap::new(),
            edits: PlayerEditOverlay::new(),
        }
    }

    /// The terrain generator.
    pub fn generator(&self) -> Arc<TerrainGenerator> {
        self.generator.clone()
    }

    /// The block registry.
    pub fn registry(&self) -> &Arc<BlockRegistry> {
        &self.registry
    }

    /// Generates every requested chunk and stores it with the edits applied.
    ///
    /// One generation job per chunk runs on the rayon pool. The call returns only
    /// once every job has finished. Chunks that are already materialized are
    /// regenerated, which yields the same buffer.
    pub fn materialize(&mut self, coords: &[ChunkCoord]) {
        if coords.is_empty() {
            return;
        }

        let start = Instant::now();
        let generated: Vec<(ChunkCoord, ChunkVoxelBuffer)> = coords
            .par_iter()
            .map(|coord| {
                let task = ChunkGenerationTask::new(self.generator.clone(), *coord);
                (task.coord(), task.run())
            })
            .collect();

        for (coord, mut buffer) in generated {
            self.edits.apply_to(coord, &mut buffer);
            self.chunks.insert(coord, buffer);
        }

        debug!(
            "Materialized {} chunks in {:?} ({} resident)",
            coords.len(),
            start.elapsed(),
            self.chunks.len()
        );
    }

    /// Drops the buffers of the given chunks. Their edits are kept.
    pub fn evict(&mut self, coords: &[ChunkCoord]) {
        for coord in coords {
            self.chunks.remove(coord);
        }
    }

    /// Whether `coord` currently has a buffer.
    pub fn is_materialized(&self, coord: ChunkCoord) -> bool {
        self.chunks.contains_key(&coord)
    }

    /// Number of materialized chunks.
    pub fn materialized_count(&self) -> usize {
        self.chunks.len()
    }

    /// The materialized chunks, in no particular order.
    pub fn materialized_coords(&self) -> impl Iterator<Item = ChunkCoord> + '_ {
        self.chunks.keys().copied()
    }

    /// The buffer of a materialized chunk.
    pub fn chunk(&self, coord: ChunkCoord) -> Option<&ChunkVoxelBuffer> {
        self.chunks.get(&coord)
    }

    /// Voxel at a world position, or `None` if its chunk is not materialized.
    pub fn try_get_voxel(&self, x: i32, y: i32, z: i32) -> Option<VoxelId> {
        if y < 0 || y >= CHUNK_HEIGHT as i32 {
            return Some(BlockType::AIR.id());
        }
        if y == 0 {
            return Some(BlockType::BEDROCK.id());
        }
        let (coord, local_x, local_z) = split_world_position(x, z);
        self.chunks
            .get(&coord)
            .map(|chunk| chunk.get(local_x, y as usize, local_z))
    }

    /// Voxel at a world position.
    ///
    /// Above and below the world is air, and `y == 0` is always bedrock.
    ///
    /// # Panics
    /// Panics if the position lies in a chunk that is not materialized.
    pub fn get_voxel(&self, x: i32, y: i32, z: i32) -> VoxelId {
        match self.try_get_voxel(x, y, z) {
            Some(id) => id,
            None => panic!(
                "voxel ({x}, {y}, {z}) queried in chunk {}, which is not materialized",
                ChunkCoord::from_block(x, z)
            ),
        }
    }

    /// Whether the voxel at a world position is solid.
    ///
    /// # Panics
    /// Same contract as [`WorldModel::get_voxel`].
    pub fn check_solid_at_world_position(&self, x: i32, y: i32, z: i32) -> bool {
        self.registry.is_solid(self.get_voxel(x, y, z))
    }

    /// Changes a voxel and records the change in the edit overlay.
    ///
    /// Returns the chunks whose meshes are now stale: the edited chunk first,
    /// then every neighbour sharing a face, edge or corner with the voxel.
    pub fn edit_voxel(
        &mut self,
        position: Point3<i32>,
        id: VoxelId,
    ) -> Result<Vec<ChunkCoord>, WorldError> {
        if position.y == 0 {
            return Err(WorldError::ImmutableBedrock);
        }
        if position.y < 0 || position.y >= CHUNK_HEIGHT as i32 {
            return Err(WorldError::VerticalOutOfRange(position.y));
        }
        if id == BlockType::UNSET.id() {
            return Err(WorldError::SentinelVoxel);
        }
        if !self.registry.contains(id) {
            return Err(WorldError::UnknownVoxel(id));
        }

        let (coord, local_x, local_z) = split_world_position(position.x, position.z);
        let chunk = self
            .chunks
            .get_mut(&coord)
            .ok_or(WorldError::NotMaterialized(coord))?;
        let y = position.y as usize;
        chunk.set(local_x, y, local_z, id);
        self.edits.set(coord, voxel_index(local_x, y, local_z), id);

        Ok(edit_neighbours(coord, local_x, local_z))
    }

    /// The player's edits.
    pub fn edit_overlay(&self) -> &PlayerEditOverlay {
        &self.edits
    }

    /// Number of chunks with at least one edit.
    pub fn edited_chunk_count(&self) -> usize {
        self.edits.len()
    }

    /// Encodes the edit overlay.
    pub fn serialize(&self) -> Vec<u8> {
        self.edits.serialize()
    }

    /// Replaces the edit overlay with a decoded save blob.
    ///
    /// On error the current overlay is left untouched. On success every
    /// materialized chunk touched by the old or the new overlay is regenerated,
    /// so the buffers agree with the edits.
    pub fn deserialize(&mut self, bytes: &[u8]) -> Result<(), PersistError> {
        let edits = PlayerEditOverlay::deserialize(bytes)?;
        let stale: Vec<ChunkCoord> = self
            .edits
            .iter()
            .chain(edits.iter())
            .map(|(coord, _)| *coord)
            .filter(|coord| self.chunks.contains_key(coord))
            .collect();

        info!("Loaded edits for {} chunks", edits.len());
        self.edits = edits;
        self.materialize(&stale);
        Ok(())
    }

    /// Copies the 3x3 neighbourhood around `center` into a cluster buffer.
    ///
    /// The streaming world materializes the whole neighbourhood before calling
    /// this. Neighbours that are still missing are filled with air. `out` must
    /// hold exactly [`CLUSTER_VOLUME`] voxels.
    pub fn copy_cluster(&self, center: ChunkCoord, out: &mut [VoxelId]) {
        assert_eq!(out.len(), CLUSTER_VOLUME, "cluster buffer has the wrong size");
        let air = BlockType::AIR.id();

        for dz in -1..=1i32 {
            for dx in -1..=1i32 {
                let chunk = self.chunks.get(&center.offset(dx, dz));
                let cluster_x = (dx + 1) as usize * CHUNK_SIZE;
                let cluster_z = (dz + 1) as usize * CHUNK_SIZE;

                for y in 0..CHUNK_HEIGHT {
                    for z in 0..CHUNK_SIZE {
                        let dst = cluster_index(cluster_x, y, cluster_z + z);
                        let row = &mut out[dst..dst + CHUNK_SIZE];
                        match chunk {
                            Some(chunk) => {
                                let src = voxel_index(0, y, z);
                                row.copy_from_slice(&chunk.as_slice()[src..src + CHUNK_SIZE]);
                            }
                            None => row.fill(air),
                        }
                    }
                }
            }
        }
    }
}

/// The chunks whose meshes see a voxel at local `(x, z)` of `coord`.
///
/// The owning chunk comes first, then face neighbours and, at corners, the
/// diagonal neighbour.
pub fn edit_neighbours(coord: ChunkCoord, local_x: usize, local_z: usize) -> Vec<ChunkCoord> {
    let dx = if local_x == 0 {
        -1
    } else if local_x == CHUNK_SIZE - 1 {
        1
    } else {
        0
    };
    let dz = if local_z == 0 {
        -1
    } else if local_z == CHUNK_SIZE - 1 {
        1
    } else {
        0
    };

    let mut affected = vec![coord];
    if dx != 0 {
        affected.push(coord.offset(dx, 0));
    }
    if dz != 0 {
        affected.push(coord.offset(0, dz));
    }
    if dx != 0 && dz != 0 {
        affected.push(coord.offset(dx, dz));
    }
    affected
}
