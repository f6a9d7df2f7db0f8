//! # Terrain Generation
//!
//! Procedural terrain, in two passes:
//!
//! 1. **Column classification** samples the temperature field, blends every
//!    biome's height with a sharp power-law weight and assigns the biome with the
//!    nearest temperature.
//! 2. **Material pass** turns `(y, terrain height, biome)` into a voxel id:
//!    bedrock at the bottom, air above the surface, ore veins first and the
//!    biome's layer blocks otherwise.
//!
//! The two passes are independent: the biome whose blocks a column uses is not
//! necessarily the one that dominated its height.

use std::sync::Arc;

use crate::engine_state::voxels::{
    block::{block_type::BlockType, VoxelId},
    chunk::CHUNK_HEIGHT,
};

use self::biome::{BiomeProfile, BiomeTable, OreMask, OreVein};
use self::noise::{NoiseAlgorithm, NoiseField};

pub mod biome;
pub mod curve;
pub mod noise;

/// Exponent of the biome blend weight.
const BIOME_BLEND_EXPONENT: i32 = 50;

/// Result of classifying one world column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnSample {
    /// Index of the assigned biome in the biome table.
    pub biome_index: usize,
    /// Number of non-air voxels in the column, in `[0, CHUNK_HEIGHT)`.
    pub terrain_height: usize,
}

/// Deterministic terrain generator for one world seed.
///
/// Immutable after construction and shared through an `Arc` with every
/// generation job.
pub struct TerrainGenerator {
    seed: u32,
    noise: NoiseField,
    biomes: Arc<BiomeTable>,
}

impl TerrainGenerator {
    /// Creates a generator over a loaded biome table.
    pub fn new(seed: u32, biomes: Arc<BiomeTable>) -> Self {
        Self {
            seed,
            noise: NoiseField::new(seed),
            biomes,
        }
    }

    /// The world seed.
    pub fn seed(&self) -> u32 {
        self.seed
    }

    /// The biome table the generator classifies against.
    pub fn biomes(&self) -> &Arc<BiomeTable> {
        &self.biomes
    }

    /// Classifies a column against the generator's own biome table.
    pub fn classify(&self, world_x: i32, world_z: i32) -> ColumnSample {
        let (biome_index, terrain_height) =
            self.classify_column(world_x, world_z, self.biomes.biomes());
        ColumnSample {
            biome_index,
            terrain_height,
        }
    }

    /// Returns `(biome index, terrain height)` of a column.
    ///
    /// Each biome weighs `(N - min(|t_b - t|, N))^50` where `N` is the biome count
    /// and `t` the column temperature. The height is the floored weighted mean of
    /// every biome's own height. The biome is the one with the smallest
    /// temperature distance (first one on ties).
    ///
    /// `biomes` must not be empty; loaded tables never are.
    pub fn classify_column(
        &self,
        world_x: i32,
        world_z: i32,
        biomes: &[BiomeProfile],
    ) -> (usize, usize) {
        let (x, z) = (world_x as f64, world_z as f64);
        let temperature = self.noise.temperature(x, z);
        let biome_count = biomes.len() as f64;

        let mut weighted_height = 0.0;
        let mut total_weight = 0.0;
        let mut lowest = CHUNK_HEIGHT - 1;
        let mut highest = 0;
        let mut nearest = (0, f64::INFINITY, 0);

        for (index, biome) in biomes.iter().enumerate() {
            let distance = (biome.temperature - temperature).abs();
            let height = self.height_of(x, z, biome);
            let weight = (biome_count - distance.min(biome_count)).powi(BIOME_BLEND_EXPONENT);

            weighted_height += weight * height as f64;
            total_weight += weight;
            lowest = lowest.min(height);
            highest = highest.max(height);

            if distance < nearest.1 {
                nearest = (index, distance, height);
            }
        }

        let terrain_height = if total_weight > 0.0 {
            // The epsilon keeps a mean of equal heights from flooring one below.
            ((weighted_height / total_weight + 1e-9).floor() as usize).clamp(lowest, highest)
        } else {
            nearest.2
        };

        (nearest.0, terrain_height.min(CHUNK_HEIGHT - 1))
    }

    /// A biome's own terrain height at a column.
    fn height_of(&self, x: f64, z: f64, biome: &BiomeProfile) -> usize {
        biome.height_for(self.noise.sample_2d(x, z, &biome.noise))
    }

    /// Voxel id at `(world_x, y, world_z)` of a column already classified.
    pub fn generate(
        &self,
        world_x: i32,
        y: usize,
        world_z: i32,
        terrain_height: usize,
        biome: &BiomeProfile,
        ore_veins: &[OreVein],
    ) -> VoxelId {
        if y == 0 {
            return BlockType::BEDROCK.id();
        }
        if y >= terrain_height {
            return BlockType::AIR.id();
        }

        let layer = OreMask::layer_of(y, terrain_height);
        for vein in ore_veins {
            if !vein.mask.intersects(layer) || !vein.contains_height(y) {
                continue;
            }
            let threshold = vein.threshold_at(y);
            let present = match vein.algorithm {
                NoiseAlgorithm::Perlin2d => self.noise.presence_2d(
                    world_x as f64,
                    world_z as f64,
                    vein.frequency,
                    vein.offset,
                    threshold,
                ),
                NoiseAlgorithm::Perlin3d => self.noise.presence_3d(
                    world_x as f64,
                    y as f64,
                    world_z as f64,
                    vein.frequency,
                    vein.offset,
                    threshold,
                ),
            };
            if present {
                return vein.block;
            }
        }

        biome.layer_block(layer)
    }
}
