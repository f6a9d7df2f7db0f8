//! # Block Module
//!
//! This module provides block properties for the voxel engine: which ids are
//! solid, which let light and sight through, and where each face's texture
//! lives in the atlas.

use bitvec::prelude::BitVec;

use block_side::BlockSide;
use block_type::{BlockType, BLOCK_TYPE_COUNT};

pub mod block_side;
pub mod block_type;

/// The underlying integer type used to represent voxels in memory.
///
/// `0` is the "unset" overlay sentinel, `1` is air, everything else is a block.
pub type VoxelId = u8;

/// Number of texture tiles per row (and per column) of the square atlas.
pub const ATLAS_TILES_PER_ROW: usize = 16;

/// Maps each block type to its corresponding atlas tile for each face.
///
/// The outer array is indexed by `BlockType` as a `usize`.
/// The inner array contains 6 tile indices, one for each face in the order:
/// [Front, Back, Bottom, Top, Left, Right]
pub static BLOCK_TYPE_TO_TEXTURE_INDICES: [[usize; 6]; BLOCK_TYPE_COUNT] = [
    [0, 0, 0, 0, 0, 0],       // UNSET (never meshed)
    [0, 0, 0, 0, 0, 0],       // AIR (never meshed)
    [1, 1, 1, 1, 1, 1],       // BEDROCK
    [2, 2, 2, 2, 2, 2],       // STONE
    [3, 3, 3, 3, 3, 3],       // DIRT
    [4, 4, 3, 5, 4, 4],       // GRASS (top: 5, bottom: 3, sides: 4)
    [6, 6, 6, 6, 6, 6],       // SAND
    [7, 7, 7, 7, 7, 7],       // GRAVEL
    [8, 8, 3, 9, 8, 8],       // SNOW (top: 9, bottom: dirt)
    [16, 16, 16, 16, 16, 16], // COAL_ORE
    [17, 17, 17, 17, 17, 17], // IRON_ORE
    [18, 18, 18, 18, 18, 18], // GOLD_ORE
    [19, 19, 19, 19, 19, 19], // LEAVES
    [20, 20, 20, 20, 20, 20], // GLASS
    [21, 21, 22, 22, 21, 21], // WOOD (rings on top and bottom)
];

/// Physical and visual properties of a single voxel id.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockProperties {
    /// Debug name.
    pub name: &'static str,
    /// Participates in collision.
    pub solid: bool,
    /// Neighbouring faces stay visible and light passes through.
    pub transparent: bool,
    /// Fraction of light kept when sunlight passes downwards through the voxel.
    pub light_pass: f32,
    /// Atlas tile per face, in `BlockSide` order.
    pub texture_indices: [usize; 6],
}

/// UV coordinates of a face quad in corner order [bottom-left, top-left, bottom-right, top-right].
pub type UvQuad = [[f32; 2]; 4];

/// Read-only table of block properties, shared by generation, lighting and meshing.
///
/// Solidity and transparency are mirrored into bit masks for the hot paths, and
/// the UV quad of every (voxel id, face) pair is precomputed once.
#[derive(Debug, Clone)]
pub struct BlockRegistry {
    properties: Vec<BlockProperties>,
    solid_mask: BitVec,
    transparent_mask: BitVec,
    uv_table: Vec<[UvQuad; 6]>,
}

impl Default for BlockRegistry {
    fn default() -> Self {
        let mut properties = Vec::with_capacity(BLOCK_TYPE_COUNT);
        for id in 0..BLOCK_TYPE_COUNT {
            let block_type = BlockType::from_id(id as VoxelId).unwrap_or(BlockType::AIR);
            let (name, solid, transparent, light_pass) = match block_type {
                BlockType::UNSET => ("unset", false, true, 1.0),
                BlockType::AIR => ("air", false, true, 1.0),
                BlockType::BEDROCK => ("bedrock", true, false, 0.0),
                BlockType::STONE => ("stone", true, false, 0.0),
                BlockType::DIRT => ("dirt", true, false, 0.0),
                BlockType::GRASS => ("grass", true, false, 0.0),
                BlockType::SAND => ("sand", true, false, 0.0),
                BlockType::GRAVEL => ("gravel", true, false, 0.0),
                BlockType::SNOW => ("snow", true, false, 0.0),
                BlockType::COAL_ORE => ("coal_ore", true, false, 0.0),
                BlockType::IRON_ORE => ("iron_ore", true, false, 0.0),
                BlockType::GOLD_ORE => ("gold_ore", true, false, 0.0),
                BlockType::LEAVES => ("leaves", true, true, 0.6),
                BlockType::GLASS => ("glass", true, true, 1.0),
                BlockType::WOOD => ("wood", true, false, 0.0),
            };
            properties.push(BlockProperties {
                name,
                solid,
                transparent,
                light_pass,
                texture_indices: BLOCK_TYPE_TO_TEXTURE_INDICES[id],
            });
        }

        Self::new(properties)
    }
}

impl BlockRegistry {
    /// Builds a registry from per-id properties. Index `i` describes voxel id `i`.
    pub fn new(properties: Vec<BlockProperties>) -> Self {
        let solid_mask = properties.iter().map(|p| p.solid).collect();
        let transparent_mask = properties.iter().map(|p| p.transparent).collect();
        let uv_table = properties
            .iter()
            .map(|p| {
                let mut faces = [[[0.0; 2]; 4]; 6];
                for side in BlockSide::all() {
                    faces[side as usize] = Self::tile_uvs(p.texture_indices[side as usize]);
                }
                faces
            })
            .collect();

        Self {
            properties,
            solid_mask,
            transparent_mask,
            uv_table,
        }
    }

    /// Computes the UV quad of an atlas tile. Row 0 is the top of the atlas image.
    fn tile_uvs(tile: usize) -> UvQuad {
        let step = 1.0 / ATLAS_TILES_PER_ROW as f32;
        let u0 = (tile % ATLAS_TILES_PER_ROW) as f32 * step;
        let v0 = (tile / ATLAS_TILES_PER_ROW) as f32 * step;
        let (u1, v1) = (u0 + step, v0 + step);
        [[u0, v1], [u0, v0], [u1, v1], [u1, v0]]
    }

    /// Number of registered ids.
    pub fn len(&self) -> usize {
        self.properties.len()
    }

    /// Whether the registry has no ids at all.
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    /// Whether `id` names a registered block (the unset sentinel does not).
    pub fn contains(&self, id: VoxelId) -> bool {
        id != BlockType::UNSET.id() && (id as usize) < self.properties.len()
    }

    /// Properties of `id`, if registered.
    pub fn properties(&self, id: VoxelId) -> Option<&BlockProperties> {
        self.properties.get(id as usize)
    }

    /// Whether `id` blocks movement. Unknown ids are treated as solid.
    pub fn is_solid(&self, id: VoxelId) -> bool {
        self.solid_mask.get(id as usize).map_or(true, |bit| *bit)
    }

    /// Whether faces next to `id` are visible and light passes it. Unknown ids are opaque.
    pub fn is_transparent(&self, id: VoxelId) -> bool {
        self.transparent_mask
            .get(id as usize)
            .map_or(false, |bit| *bit)
    }

    /// Fraction of light a voxel lets through on the way down.
    pub fn light_pass(&self, id: VoxelId) -> f32 {
        self.properties
            .get(id as usize)
            .map_or(0.0, |p| p.light_pass)
    }

    /// Precomputed UV quad for one face of `id`.
    pub fn uv_quad(&self, id: VoxelId, side: BlockSide) -> &UvQuad {
        let row = self.uv_table.get(id as usize).unwrap_or(&self.uv_table[0]);
        &row[side as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn air_and_sentinel_are_see_through() {
        let registry = BlockRegistry::default();
        for id in [BlockType::AIR.id(), BlockType::UNSET.id()] {
            assert!(!registry.is_solid(id));
            assert!(registry.is_transparent(id));
        }
        assert!(!registry.contains(BlockType::UNSET.id()));
        assert!(registry.contains(BlockType::WOOD.id()));
    }

    #[test]
    fn unknown_ids_are_solid_and_opaque() {
        let registry = BlockRegistry::default();
        assert!(registry.is_solid(200));
        assert!(!registry.is_transparent(200));
        assert!(!registry.contains(200));
    }

    #[test]
    fn grass_top_uses_its_own_tile() {
        let registry = BlockRegistry::default();
        let grass = BlockType::GRASS.id();
        let top = registry.uv_quad(grass, BlockSide::TOP);
        let side = registry.uv_quad(grass, BlockSide::FRONT);
        assert_ne!(top, side);

        let step = 1.0 / ATLAS_TILES_PER_ROW as f32;
        assert!((top[1][0] - 5.0 * step).abs() < 1e-6);
        assert!((top[2][0] - top[0][0] - step).abs() < 1e-6);
    }
}
