//! # Errors
//!
//! One error type per concern:
//! - [`ConfigError`]: malformed world, biome, ore or block configuration. Fatal at load time.
//! - [`WorldError`]: a voxel edit the world model refuses to apply.
//! - [`PersistError`]: a save blob that does not decode.
//! - [`PoolError`]: a streaming pool invariant would be violated.
//! - [`TaskError`]: a background task vanished without delivering its result.
//!
//! Querying a voxel in a chunk that is not materialized is not an error value:
//! it is a contract violation and panics.

use thiserror::Error;

use crate::engine_state::{streaming::partition::SlotState, voxels::chunk::ChunkCoord};

/// Configuration that cannot be turned into a working world.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The biome table is empty.
    #[error("biome table must contain at least one biome")]
    NoBiomes,

    /// A biome definition is inconsistent.
    #[error("biome `{biome}`: {reason}")]
    InvalidBiome {
        /// Name of the offending biome.
        biome: String,
        /// What is wrong with it.
        reason: String,
    },

    /// A block name that the block registry does not know.
    #[error("unknown block name `{0}`")]
    UnknownBlock(String),

    /// A curve without keys, or with unordered or non-finite keys.
    #[error("invalid curve: {0}")]
    InvalidCurve(String),

    /// World-level settings out of range.
    #[error("invalid world configuration: {0}")]
    InvalidWorld(String),

    /// The configuration text is not valid JSON for the expected shape.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// An edit request rejected by the world model.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WorldError {
    /// The edit lies above or below the world.
    #[error("y = {0} is outside the editable range")]
    VerticalOutOfRange(i32),

    /// The bottom layer is bedrock and cannot be changed.
    #[error("the bedrock layer cannot be edited")]
    ImmutableBedrock,

    /// Voxel id 0 is the "no override" sentinel, not a block.
    #[error("voxel id 0 is reserved as the unset sentinel")]
    SentinelVoxel,

    /// The id is not registered.
    #[error("unknown voxel id {0}")]
    UnknownVoxel(u8),

    /// Edits can only target chunks whose data is loaded.
    #[error("chunk {0} is not materialized")]
    NotMaterialized(ChunkCoord),
}

/// A save blob that cannot be decoded.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PersistError {
    /// The blob ends in the middle of a field.
    #[error("save data truncated at byte {offset}: {needed} more bytes required")]
    Truncated {
        /// Byte offset of the field being read.
        offset: usize,
        /// Bytes the field needs.
        needed: usize,
    },

    /// A count field is negative.
    #[error("negative count {count} at byte {offset}")]
    NegativeCount {
        /// Byte offset of the count.
        offset: usize,
        /// Decoded value.
        count: i32,
    },

    /// A voxel entry points outside the chunk.
    #[error("voxel index {index} in chunk {coord} is out of range")]
    IndexOutOfRange {
        /// Chunk the entry belongs to.
        coord: ChunkCoord,
        /// Decoded linear index.
        index: i32,
    },

    /// A voxel entry stores the unset sentinel.
    #[error("voxel index {index} in chunk {coord} stores the unset sentinel")]
    SentinelEntry {
        /// Chunk the entry belongs to.
        coord: ChunkCoord,
        /// Decoded linear index.
        index: i32,
    },

    /// The same voxel of a chunk has two entries.
    #[error("voxel index {index} in chunk {coord} appears more than once")]
    DuplicateEntry {
        /// Chunk the entry belongs to.
        coord: ChunkCoord,
        /// Decoded linear index.
        index: i32,
    },

    /// The same chunk appears twice.
    #[error("chunk {0} appears more than once")]
    DuplicateChunk(ChunkCoord),

    /// Bytes left over after the last chunk.
    #[error("{0} trailing bytes after the last chunk")]
    TrailingBytes(usize),
}

/// A streaming pool operation that would break the partition invariants.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PoolError {
    /// Every slot of the pool is in use.
    #[error("pool exhausted ({capacity} slots in use)")]
    Exhausted {
        /// Total slots in the pool.
        capacity: usize,
    },

    /// The chunk's pipeline is still running and cannot be recycled yet.
    #[error("chunk {0} is still in flight")]
    InFlight(ChunkCoord),

    /// Scheduling requires the chunk to hold a passive buffer.
    #[error("chunk {coord} is not passive (state {state:?})")]
    NotPassive {
        /// The chunk.
        coord: ChunkCoord,
        /// Its current state, if it has a buffer at all.
        state: Option<SlotState>,
    },

    /// Removal requires the chunk to be in the rendered partition.
    #[error("chunk {coord} is not rendered (state {state:?})")]
    NotRendered {
        /// The chunk.
        coord: ChunkCoord,
        /// Its current state, if it has a buffer at all.
        state: Option<SlotState>,
    },

    /// The coordinate side table disagrees with the slot array.
    #[error("side table mismatch: {0}")]
    SideTableMismatch(String),
}

/// A task failure observed while polling its handle.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TaskError {
    /// The worker dropped the completion without sending a result.
    #[error("task was dropped before delivering its result")]
    Lost,
}
