//! # Chunk Generation Task
//!
//! This module defines the `ChunkGenerationTask` which produces the voxel data
//! of one chunk. The world model fans one task per requested chunk out on the
//! rayon pool and joins them before `materialize` returns.

use std::sync::Arc;

use rayon::prelude::*;

use crate::engine_state::voxels::{
    block::block_type::BlockType,
    chunk::{ChunkCoord, ChunkVoxelBuffer, CHUNK_PLANE_SIZE, CHUNK_SIZE},
    terrain::{ColumnSample, TerrainGenerator},
};

/// A task that generates the terrain of one chunk.
///
/// The task owns the buffer it fills and hands it back when it finishes, so
/// nothing else can read a chunk that is still being generated.
pub struct ChunkGenerationTask {
    /// Shared read-only generator
    generator: Arc<TerrainGenerator>,
    /// The chunk to generate
    coord: ChunkCoord,
}

impl ChunkGenerationTask {
    /// Creates a new chunk generation task.
    ///
    /// # Arguments
    /// * `generator` - The world's terrain generator
    /// * `coord` - The chunk whose voxels should be produced
    pub fn new(generator: Arc<TerrainGenerator>, coord: ChunkCoord) -> Self {
        ChunkGenerationTask { generator, coord }
    }

    /// The chunk this task generates.
    pub fn coord(&self) -> ChunkCoord {
        self.coord
    }

    /// Runs the generation and returns the finished buffer.
    ///
    /// Columns are classified first, in parallel, then every Y layer is filled
    /// in parallel from the classification.
    pub fn run(&self) -> ChunkVoxelBuffer {
        let origin = self.coord.world_origin();
        let generator = self.generator.as_ref();
        let biomes = generator.biomes().biomes();

        let columns: Vec<ColumnSample> = (0..CHUNK_PLANE_SIZE)
            .into_par_iter()
            .map(|column| {
                let x = origin.x + (column % CHUNK_SIZE) as i32;
                let z = origin.z + (column / CHUNK_SIZE) as i32;
                generator.classify(x, z)
            })
            .collect();

        let mut buffer = ChunkVoxelBuffer::filled(BlockType::AIR.id());
        buffer
            .as_mut_slice()
            .par_chunks_mut(CHUNK_PLANE_SIZE)
            .enumerate()
            .for_each(|(y, layer)| {
                for (column, voxel) in layer.iter_mut().enumerate() {
                    let sample = columns[column];
                    if y > 0 && y >= sample.terrain_height {
                        continue;
                    }
                    let biome = &biomes[sample.biome_index];
                    *voxel = generator.generate(
                        origin.x + (column % CHUNK_SIZE) as i32,
                        y,
                        origin.z + (column / CHUNK_SIZE) as i32,
                        sample.terrain_height,
                        biome,
                        &biome.ore_veins,
                    );
                }
            });

        buffer
    }
}
