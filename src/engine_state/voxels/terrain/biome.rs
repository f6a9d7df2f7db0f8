//! # Biome Module
//!
//! Biome and ore vein definitions as they appear in configuration, and the
//! validated, pre-sampled profiles the generator reads.
//!
//! Definitions refer to blocks by name. Loading resolves every name through the
//! block name table, checks every range and pre-samples every curve into a
//! lookup indexed by `[0, CHUNK_HEIGHT)`. A loaded [`BiomeTable`] is immutable
//! and shared read-only with the generation jobs.

use bitflags::bitflags;
use log::info;
use serde::{Deserialize, Serialize};

use crate::{
    engine_state::voxels::{
        block::{block_type::BlockType, VoxelId},
        chunk::CHUNK_HEIGHT,
    },
    error::ConfigError,
};

use super::{
    curve::Curve,
    noise::{NoiseAlgorithm, NoiseParams},
};

bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    /// Material layers of a terrain column.
    pub struct OreMask: u8 {
        /// The surface voxel (`y == height - 1`).
        const TOP = 0b0000_0001;
        /// The three voxels below the surface.
        const MIDDLE = 0b0000_0010;
        /// Everything deeper.
        const BOTTOM = 0b0000_0100;
    }
}

impl OreMask {
    /// The layer a voxel at `y` falls into in a column of `terrain_height`.
    ///
    /// Only meaningful for `y < terrain_height`.
    pub fn layer_of(y: usize, terrain_height: usize) -> OreMask {
        if y + 1 == terrain_height {
            OreMask::TOP
        } else if y + 4 >= terrain_height {
            OreMask::MIDDLE
        } else {
            OreMask::BOTTOM
        }
    }
}

/// Layer names accepted in vein masks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerName {
    /// [`OreMask::TOP`]
    Top,
    /// [`OreMask::MIDDLE`]
    Middle,
    /// [`OreMask::BOTTOM`]
    Bottom,
}

impl From<LayerName> for OreMask {
    fn from(layer: LayerName) -> Self {
        match layer {
            LayerName::Top => OreMask::TOP,
            LayerName::Middle => OreMask::MIDDLE,
            LayerName::Bottom => OreMask::BOTTOM,
        }
    }
}

fn default_threshold_curve() -> Curve {
    Curve::constant(0.5)
}

/// Configuration of an ore vein.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OreVeinDefinition {
    /// Block name placed by the vein.
    pub block: String,
    /// Layers the vein may replace.
    pub mask: Vec<LayerName>,
    /// Lowest y the vein may appear at.
    pub min_height: u32,
    /// One past the highest y the vein may appear at.
    pub max_height: u32,
    /// Presence noise frequency. `0` makes the field constant.
    pub frequency: f64,
    /// Offset added to the scaled sample position.
    #[serde(default)]
    pub offset: f64,
    /// 2D or 3D presence sampling.
    pub algorithm: NoiseAlgorithm,
    /// Presence threshold as a function of `y / (CHUNK_HEIGHT - 1)`.
    #[serde(default = "default_threshold_curve")]
    pub threshold_curve: Curve,
}

/// Configuration of a biome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BiomeDefinition {
    /// Display name, used in error messages.
    pub name: String,
    /// Temperature the biome is centred on, compared against the `[0, 1]` temperature field.
    pub temperature: f64,
    /// Lowest terrain height.
    pub min_height: u32,
    /// One past the highest terrain height.
    pub max_height: u32,
    /// Height noise parameters.
    #[serde(default)]
    pub noise: NoiseParams,
    /// Remaps the height noise before it is scaled into `[min_height, max_height)`.
    #[serde(default)]
    pub height_curve: Curve,
    /// Surface block name.
    pub top_block: String,
    /// Sub-surface block name.
    pub middle_block: String,
    /// Deep block name.
    pub bottom_block: String,
    /// Ore veins, tested in order.
    #[serde(default)]
    pub ore_veins: Vec<OreVeinDefinition>,
}

/// A validated ore vein with its threshold lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct OreVein {
    /// Placed block id.
    pub block: VoxelId,
    /// Layers the vein may replace.
    pub mask: OreMask,
    /// Lowest y (inclusive).
    pub min_height: usize,
    /// Highest y (exclusive).
    pub max_height: usize,
    /// Presence noise frequency.
    pub frequency: f64,
    /// Presence noise offset.
    pub offset: f64,
    /// Presence sampling dimensionality.
    pub algorithm: NoiseAlgorithm,
    threshold_lookup: Vec<f64>,
}

impl OreVein {
    /// Whether `y` lies inside `[min_height, max_height)`.
    #[inline]
    pub fn contains_height(&self, y: usize) -> bool {
        y >= self.min_height && y < self.max_height
    }

    /// Pre-sampled presence threshold at `y`.
    #[inline]
    pub fn threshold_at(&self, y: usize) -> f64 {
        self.threshold_lookup[y.min(CHUNK_HEIGHT - 1)]
    }
}

/// A validated biome with its height lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct BiomeProfile {
    /// Display name.
    pub name: String,
    /// Centre temperature.
    pub temperature: f64,
    /// Lowest terrain height (inclusive).
    pub min_height: usize,
    /// Highest terrain height (exclusive).
    pub max_height: usize,
    /// Height noise parameters.
    pub noise: NoiseParams,
    /// Surface block id.
    pub top_block: VoxelId,
    /// Sub-surface block id.
    pub middle_block: VoxelId,
    /// Deep block id.
    pub bottom_block: VoxelId,
    /// Ore veins, first match wins.
    pub ore_veins: Vec<OreVein>,
    height_lookup: Vec<usize>,
}

impl BiomeProfile {
    /// Terrain height for a `[0, 1]` height noise value.
    pub fn height_for(&self, noise01: f64) -> usize {
        let index = ((CHUNK_HEIGHT as f64 * noise01).floor().max(0.0) as usize).min(CHUNK_HEIGHT - 1);
        self.height_lookup[index].min(CHUNK_HEIGHT - 1)
    }

    /// Block id of a material layer.
    pub fn layer_block(&self, layer: OreMask) -> VoxelId {
        if layer.contains(OreMask::TOP) {
            self.top_block
        } else if layer.contains(OreMask::MIDDLE) {
            self.middle_block
        } else {
            self.bottom_block
        }
    }
}

fn resolve_block(name: &str) -> Result<VoxelId, ConfigError> {
    BlockType::from_name(name)
        .map(BlockType::id)
        .ok_or_else(|| ConfigError::UnknownBlock(name.to_owned()))
}

fn invalid(biome: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidBiome {
        biome: biome.to_owned(),
        reason: reason.into(),
    }
}

impl OreVeinDefinition {
    fn resolve(&self, biome: &str) -> Result<OreVein, ConfigError> {
        let block = resolve_block(&self.block)?;
        let mask = self
            .mask
            .iter()
            .fold(OreMask::empty(), |mask, layer| mask | OreMask::from(*layer));
        if mask.is_empty() {
            return Err(invalid(biome, format!("vein `{}` has an empty mask", self.block)));
        }
        if self.min_height >= self.max_height || self.max_height as usize > CHUNK_HEIGHT {
            return Err(invalid(
                biome,
                format!(
                    "vein `{}` height range [{}, {}) is empty or exceeds {CHUNK_HEIGHT}",
                    self.block, self.min_height, self.max_height
                ),
            ));
        }
        if !self.frequency.is_finite() || !self.offset.is_finite() {
            return Err(invalid(
                biome,
                format!("vein `{}` has non-finite noise parameters", self.block),
            ));
        }
        self.threshold_curve.validate()?;

        Ok(OreVein {
            block,
            mask,
            min_height: self.min_height as usize,
            max_height: self.max_height as usize,
            frequency: self.frequency,
            offset: self.offset,
            algorithm: self.algorithm,
            threshold_lookup: self.threshold_curve.sample(CHUNK_HEIGHT),
        })
    }
}

impl BiomeDefinition {
    /// Validates the definition and pre-samples its curves.
    pub fn resolve(&self) -> Result<BiomeProfile, ConfigError> {
        let name = self.name.as_str();
        if !self.temperature.is_finite() {
            return Err(invalid(name, "temperature must be finite"));
        }
        if self.min_height >= self.max_height || self.max_height as usize > CHUNK_HEIGHT {
            return Err(invalid(
                name,
                format!(
                    "height range [{}, {}) is empty or exceeds {CHUNK_HEIGHT}",
                    self.min_height, self.max_height
                ),
            ));
        }
        let noise = self.noise;
        if noise.octaves == 0
            || !noise.frequency.is_finite()
            || !noise.lacunarity.is_finite()
            || !noise.persistence.is_finite()
        {
            return Err(invalid(name, "noise needs at least one octave and finite parameters"));
        }
        self.height_curve.validate()?;

        let (min, max) = (self.min_height as usize, self.max_height as usize);
        let height_lookup = self
            .height_curve
            .sample(CHUNK_HEIGHT)
            .into_iter()
            .map(|t| {
                let height = (min as f64 + (max - min) as f64 * t).floor();
                (height.max(0.0) as usize).clamp(min, max - 1)
            })
            .collect();

        let ore_veins = self
            .ore_veins
            .iter()
            .map(|vein| vein.resolve(name))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(BiomeProfile {
            name: self.name.clone(),
            temperature: self.temperature,
            min_height: min,
            max_height: max,
            noise,
            top_block: resolve_block(&self.top_block)?,
            middle_block: resolve_block(&self.middle_block)?,
            bottom_block: resolve_block(&self.bottom_block)?,
            ore_veins,
            height_lookup,
        })
    }
}

#[derive(Deserialize)]
struct BiomeTableDefinition {
    biomes: Vec<BiomeDefinition>,
}

/// The loaded biome set.
#[derive(Debug, Clone, PartialEq)]
pub struct BiomeTable {
    biomes: Vec<BiomeProfile>,
}

impl BiomeTable {
    /// Validates every definition. An empty list is a configuration error.
    pub fn from_definitions(definitions: &[BiomeDefinition]) -> Result<Self, ConfigError> {
        if definitions.is_empty() {
            return Err(ConfigError::NoBiomes);
        }
        let biomes = definitions
            .iter()
            .map(BiomeDefinition::resolve)
            .collect::<Result<Vec<_>, _>>()?;

        info!(
            "Loaded {} biomes ({} ore veins)",
            biomes.len(),
            biomes.iter().map(|b| b.ore_veins.len()).sum::<usize>()
        );
        Ok(Self { biomes })
    }

    /// Parses `{"biomes": [...]}` and validates it.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let table: BiomeTableDefinition = serde_json::from_str(json)?;
        Self::from_definitions(&table.biomes)
    }

    /// The built-in biome set.
    pub fn default_table() -> Result<Self, ConfigError> {
        Self::from_definitions(&default_definitions()?)
    }

    /// The profiles, in definition order.
    pub fn biomes(&self) -> &[BiomeProfile] {
        &self.biomes
    }

    /// Number of biomes.
    pub fn len(&self) -> usize {
        self.biomes.len()
    }

    /// Always false for a loaded table.
    pub fn is_empty(&self) -> bool {
        self.biomes.is_empty()
    }
}

fn vein(
    block: &str,
    mask: &[LayerName],
    (min_height, max_height): (u32, u32),
    frequency: f64,
    algorithm: NoiseAlgorithm,
    threshold_curve: Curve,
) -> OreVeinDefinition {
    OreVeinDefinition {
        block: block.to_owned(),
        mask: mask.to_vec(),
        min_height,
        max_height,
        frequency,
        offset: 0.0,
        algorithm,
        threshold_curve,
    }
}

fn biome(
    name: &str,
    temperature: f64,
    (min_height, max_height): (u32, u32),
    frequency: f64,
    [top, middle, bottom]: [&str; 3],
) -> BiomeDefinition {
    BiomeDefinition {
        name: name.to_owned(),
        temperature,
        min_height,
        max_height,
        noise: NoiseParams {
            frequency,
            ..NoiseParams::default()
        },
        height_curve: Curve::linear(),
        top_block: top.to_owned(),
        middle_block: middle.to_owned(),
        bottom_block: bottom.to_owned(),
        ore_veins: vec![
            vein(
                "gold_ore",
                &[LayerName::Bottom],
                (1, 32),
                0.11,
                NoiseAlgorithm::Perlin3d,
                Curve::constant(0.8),
            ),
            vein(
                "iron_ore",
                &[LayerName::Bottom],
                (1, 64),
                0.09,
                NoiseAlgorithm::Perlin3d,
                Curve::constant(0.76),
            ),
            vein(
                "coal_ore",
                &[LayerName::Bottom, LayerName::Middle],
                (16, 110),
                0.07,
                NoiseAlgorithm::Perlin3d,
                Curve::constant(0.72),
            ),
        ],
    }
}

fn default_definitions() -> Result<Vec<BiomeDefinition>, ConfigError> {
    let mut tundra = biome("tundra", 0.2, (50, 72), 0.012, ["snow", "gravel", "stone"]);
    tundra.ore_veins.insert(
        0,
        vein(
            "gravel",
            &[LayerName::Top],
            (0, CHUNK_HEIGHT as u32),
            0.05,
            NoiseAlgorithm::Perlin2d,
            Curve::constant(0.7),
        ),
    );

    let mut mountains = biome("mountains", 0.35, (64, 120), 0.02, ["stone", "stone", "stone"]);
    mountains.height_curve = Curve::new(vec![(0.0, 0.0), (0.6, 0.25), (1.0, 1.0)])?;

    let plains = biome("plains", 0.5, (56, 70), 0.008, ["grass", "dirt", "stone"]);
    let desert = biome("desert", 0.75, (54, 66), 0.006, ["sand", "sand", "stone"]);

    Ok(vec![tundra, mountains, plains, desert])
}
