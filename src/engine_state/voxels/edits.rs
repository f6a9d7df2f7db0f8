//! # Player Edit Overlay
//!
//! Sparse record of every voxel a player changed, kept per chunk and never
//! evicted while the session lives. Generated terrain plus this overlay
//! reconstructs the whole world, so the overlay is all that gets persisted.
//!
//! ## Save Format
//!
//! Little-endian, no header:
//!
//! ```text
//! edited_chunk_count: i32
//! per chunk:   x: i32, z: i32, entry_count: i32
//! per entry:   linear_index: i32, voxel_id: u8
//! ```
//!
//! Chunks are written in coordinate order so equal overlays encode to equal bytes.

use std::collections::BTreeMap;

use crate::{
    engine_state::voxels::{
        block::{block_type::BlockType, VoxelId},
        chunk::{ChunkCoord, ChunkVoxelBuffer, CHUNK_VOLUME},
    },
    error::PersistError,
};

const CHUNK_HEADER_SIZE: usize = 12;
const ENTRY_SIZE: usize = 5;

/// Per-chunk voxel overrides. Zero entries mean "keep the generated voxel".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlayerEditOverlay {
    chunks: BTreeMap<ChunkCoord, ChunkVoxelBuffer>,
}

impl PlayerEditOverlay {
    /// An overlay without edits.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an override, creating the chunk's entry on first use.
    pub fn set(&mut self, coord: ChunkCoord, index: usize, id: VoxelId) {
        let chunk = self
            .chunks
            .entry(coord)
            .or_insert_with(ChunkVoxelBuffer::unset);
        chunk.as_mut_slice()[index] = id;
    }

    /// The overrides of one chunk.
    pub fn get(&self, coord: ChunkCoord) -> Option<&ChunkVoxelBuffer> {
        self.chunks.get(&coord)
    }

    /// Writes every override of `coord` into a freshly generated buffer.
    pub fn apply_to(&self, coord: ChunkCoord, buffer: &mut ChunkVoxelBuffer) {
        let Some(edits) = self.chunks.get(&coord) else {
            return;
        };
        for (voxel, edit) in buffer.as_mut_slice().iter_mut().zip(edits.as_slice()) {
            if *edit != BlockType::UNSET.id() {
                *voxel = *edit;
            }
        }
    }

    /// Number of chunks with at least one recorded edit.
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Whether nothing has been edited.
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Edited chunks in coordinate order.
    pub fn iter(&self) -> impl Iterator<Item = (&ChunkCoord, &ChunkVoxelBuffer)> {
        self.chunks.iter()
    }

    /// Encodes the overlay in the save format.
    pub fn serialize(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(4 + self.chunks.len() * CHUNK_HEADER_SIZE);
        bytes.extend_from_slice(&(self.chunks.len() as i32).to_le_bytes());

        for (coord, chunk) in &self.chunks {
            let entries: Vec<_> = chunk.set_entries().collect();
            bytes.reserve(CHUNK_HEADER_SIZE + entries.len() * ENTRY_SIZE);
            bytes.extend_from_slice(&coord.x.to_le_bytes());
            bytes.extend_from_slice(&coord.z.to_le_bytes());
            bytes.extend_from_slice(&(entries.len() as i32).to_le_bytes());
            for (index, id) in entries {
                bytes.extend_from_slice(&(index as i32).to_le_bytes());
                bytes.push(id);
            }
        }

        bytes
    }

    /// Decodes a save blob. Fails on truncated, malformed or trailing data.
    pub fn deserialize(bytes: &[u8]) -> Result<Self, PersistError> {
        let mut reader = ByteReader::new(bytes);
        let chunk_count = reader.read_count()?;
        let mut chunks = BTreeMap::new();

        for _ in 0..chunk_count {
            let coord = ChunkCoord::new(reader.read_i32()?, reader.read_i32()?);
            let entry_count = reader.read_count()?;
            let mut chunk = ChunkVoxelBuffer::unset();

            for _ in 0..entry_count {
                let index = reader.read_i32()?;
                let id = reader.read_u8()?;
                if index < 0 || index as usize >= CHUNK_VOLUME {
                    return Err(PersistError::IndexOutOfRange { coord, index });
                }
                if id == BlockType::UNSET.id() {
                    return Err(PersistError::SentinelEntry { coord, index });
                }
                let slot = &mut chunk.as_mut_slice()[index as usize];
                if *slot != BlockType::UNSET.id() {
                    return Err(PersistError::DuplicateEntry { coord, index });
                }
                *slot = id;
            }

            if chunks.insert(coord, chunk).is_some() {
                return Err(PersistError::DuplicateChunk(coord));
            }
        }

        if reader.remaining() > 0 {
            return Err(PersistError::TrailingBytes(reader.remaining()));
        }
        Ok(Self { chunks })
    }
}

/// Bounds-checked little-endian cursor.
struct ByteReader<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> ByteReader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, offset: 0 }
    }

    fn remaining(&self) -> usize {
        self.bytes.len() - self.offset
    }

    fn take<const N: usize>(&mut self) -> Result<[u8; N], PersistError> {
        let truncated = PersistError::Truncated {
            offset: self.offset,
            needed: N,
        };
        let field = self
            .bytes
            .get(self.offset..self.offset + N)
            .ok_or(truncated)?;
        self.offset += N;
        let mut out = [0; N];
        out.copy_from_slice(field);
        Ok(out)
    }

    fn read_i32(&mut self) -> Result<i32, PersistError> {
        self.take::<4>().map(i32::from_le_bytes)
    }

    fn read_u8(&mut self) -> Result<u8, PersistError> {
        self.take::<1>().map(|[byte]| byte)
    }

    fn read_count(&mut self) -> Result<usize, PersistError> {
        let offset = self.offset;
        let count = self.read_i32()?;
        usize::try_from(count).map_err(|_| PersistError::NegativeCount { offset, count })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_state::voxels::chunk::voxel_index;

    fn sample_overlay() -> PlayerEditOverlay {
        let mut overlay = PlayerEditOverlay::new();
        overlay.set(ChunkCoord::new(-3, 7), voxel_index(0, 1, 0), BlockType::GLASS.id());
        overlay.set(ChunkCoord::new(-3, 7), voxel_index(15, 127, 15), BlockType::AIR.id());
        overlay.set(ChunkCoord::new(2, 0), voxel_index(4, 60, 9), BlockType::WOOD.id());
        overlay
    }

    #[test]
    fn empty_overlay_is_a_single_zero_count() {
        let bytes = PlayerEditOverlay::new().serialize();
        assert_eq!(bytes, 0i32.to_le_bytes());
        assert!(PlayerEditOverlay::deserialize(&bytes).unwrap().is_empty());
    }

    #[test]
    fn layout_matches_the_save_format() {
        let mut overlay = PlayerEditOverlay::new();
        overlay.set(ChunkCoord::new(1, -2), 300, 5);
        let bytes = overlay.serialize();

        let mut expected = Vec::new();
        expected.extend_from_slice(&1i32.to_le_bytes());
        expected.extend_from_slice(&1i32.to_le_bytes());
        expected.extend_from_slice(&(-2i32).to_le_bytes());
        expected.extend_from_slice(&1i32.to_le_bytes());
        expected.extend_from_slice(&300i32.to_le_bytes());
        expected.push(5);
        assert_eq!(bytes, expected);
    }

    #[test]
    fn round_trip_reproduces_the_overlay() {
        let overlay = sample_overlay();
        let decoded = PlayerEditOverlay::deserialize(&overlay.serialize()).unwrap();
        assert_eq!(decoded, overlay);
        assert_eq!(decoded.serialize(), overlay.serialize());
    }

    #[test]
    fn apply_to_only_replaces_edited_voxels() {
        let overlay = sample_overlay();
        let mut buffer = ChunkVoxelBuffer::filled(BlockType::STONE.id());
        overlay.apply_to(ChunkCoord::new(-3, 7), &mut buffer);
        assert_eq!(buffer.get(0, 1, 0), BlockType::GLASS.id());
        assert_eq!(buffer.get(15, 127, 15), BlockType::AIR.id());
        assert_eq!(buffer.get(1, 1, 0), BlockType::STONE.id());
    }

    #[test]
    fn malformed_blobs_are_rejected() {
        assert_eq!(
            PlayerEditOverlay::deserialize(&[]),
            Err(PersistError::Truncated { offset: 0, needed: 4 })
        );
        assert!(matches!(
            PlayerEditOverlay::deserialize(&(-1i32).to_le_bytes()),
            Err(PersistError::NegativeCount { offset: 0, count: -1 })
        ));

        let mut bytes = sample_overlay().serialize();
        bytes.pop();
        assert!(matches!(
            PlayerEditOverlay::deserialize(&bytes),
            Err(PersistError::Truncated { .. })
        ));

        let mut bytes = sample_overlay().serialize();
        bytes.push(0);
        assert_eq!(
            PlayerEditOverlay::deserialize(&bytes),
            Err(PersistError::TrailingBytes(1))
        );

        let mut bytes = Vec::new();
        for value in [1i32, 0, 0, 1, CHUNK_VOLUME as i32] {
            bytes.extend_from_slice(&value.to_le_bytes());
        }
        bytes.push(3);
        assert!(matches!(
            PlayerEditOverlay::deserialize(&bytes),
            Err(PersistError::IndexOutOfRange { .. })
        ));
    }

    #[test]
    fn repeated_voxel_entries_are_rejected() {
        let mut bytes = Vec::new();
        for value in [1i32, 4, -1, 2] {
            bytes.extend_from_slice(&value.to_le_bytes());
        }
        for id in [BlockType::GLASS.id(), BlockType::WOOD.id()] {
            bytes.extend_from_slice(&77i32.to_le_bytes());
            bytes.push(id);
        }
        assert_eq!(
            PlayerEditOverlay::deserialize(&bytes),
            Err(PersistError::DuplicateEntry {
                coord: ChunkCoord::new(4, -1),
                index: 77
            })
        );
    }
}
