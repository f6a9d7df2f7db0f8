//! # Block Type Module
//!
//! This module defines the built-in block types of the voxel world and the
//! name lookup used when biome definitions refer to blocks by name.

use num_derive::FromPrimitive;

use super::VoxelId;

/// Enumerates all built-in block types in the voxel world.
///
/// The discriminant is the [`VoxelId`] stored in chunk buffers. The
/// `FromPrimitive` derive allows conversion back from raw ids, which is
/// used when validating edits and decoding save data.
#[repr(u8)]
#[allow(non_camel_case_types)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, FromPrimitive)]
pub enum BlockType {
    /// Overlay sentinel: "no player override, inherit the generated voxel".
    /// Never stored in a materialized chunk buffer.
    UNSET = 0,

    /// Empty space.
    AIR = 1,

    /// The undestructible bottom layer of the world.
    BEDROCK = 2,

    /// Default bottom-layer material.
    STONE = 3,

    /// Common middle-layer material.
    DIRT = 4,

    /// Grass-topped dirt.
    GRASS = 5,

    /// Desert and beach material.
    SAND = 6,

    /// Loose stone, found in cold biomes.
    GRAVEL = 7,

    /// Snow cover.
    SNOW = 8,

    /// Shallow ore.
    COAL_ORE = 9,

    /// Mid-depth ore.
    IRON_ORE = 10,

    /// Deep ore.
    GOLD_ORE = 11,

    /// Foliage. Solid but lets some light through.
    LEAVES = 12,

    /// Fully transparent solid block.
    GLASS = 13,

    /// Tree trunks and planks.
    WOOD = 14,
}

/// Number of built-in block types (including the sentinel).
pub const BLOCK_TYPE_COUNT: usize = 15;

/// Compile-time lookup from the names used in biome definitions to block types.
pub static BLOCK_NAMES: phf::Map<&'static str, BlockType> = phf::phf_map! {
    "air" => BlockType::AIR,
    "bedrock" => BlockType::BEDROCK,
    "stone" => BlockType::STONE,
    "dirt" => BlockType::DIRT,
    "grass" => BlockType::GRASS,
    "sand" => BlockType::SAND,
    "gravel" => BlockType::GRAVEL,
    "snow" => BlockType::SNOW,
    "coal_ore" => BlockType::COAL_ORE,
    "iron_ore" => BlockType::IRON_ORE,
    "gold_ore" => BlockType::GOLD_ORE,
    "leaves" => BlockType::LEAVES,
    "glass" => BlockType::GLASS,
    "wood" => BlockType::WOOD,
};

impl BlockType {
    /// Converts a raw [`VoxelId`] to a `BlockType`, if it names one.
    pub fn from_id(id: VoxelId) -> Option<Self> {
        num::FromPrimitive::from_u8(id)
    }

    /// Looks a block type up by its configuration name (`"stone"`, `"iron_ore"`, ...).
    pub fn from_name(name: &str) -> Option<Self> {
        BLOCK_NAMES.get(name).copied()
    }

    /// The raw id stored in chunk buffers.
    pub fn id(self) -> VoxelId {
        self as VoxelId
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_round_trip_through_from_primitive() {
        for id in 0..BLOCK_TYPE_COUNT as u8 {
            let block_type = BlockType::from_id(id).unwrap();
            assert_eq!(block_type.id(), id);
        }
        assert_eq!(BlockType::from_id(BLOCK_TYPE_COUNT as u8), None);
    }

    #[test]
    fn names_resolve_but_sentinel_has_no_name() {
        assert_eq!(BlockType::from_name("iron_ore"), Some(BlockType::IRON_ORE));
        assert_eq!(BlockType::from_name("unset"), None);
        assert_eq!(BlockType::from_name("Stone"), None);
    }

    #[test]
    fn ore_variants_keep_their_ids() {
        let ores = [BlockType::COAL_ORE, BlockType::IRON_ORE, BlockType::GOLD_ORE];
        for (ore, name) in ores.into_iter().zip(["coal_ore", "iron_ore", "gold_ore"]) {
            assert_eq!(BlockType::from_name(name), Some(ore));
            assert_eq!(BlockType::from_id(ore.id()), Some(ore));
        }
        assert_eq!(BlockType::GOLD_ORE.id(), 11);
    }
}
