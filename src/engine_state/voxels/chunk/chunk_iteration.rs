//! # Chunk Iteration Module
//!
//! This module provides an iterator that walks every voxel of a chunk column by
//! column, starting at the top of each column and descending to the bottom.
//!
//! ## Traversal Order
//!
//! Columns are visited X fastest, then Z. Inside a column Y runs from
//! `CHUNK_HEIGHT - 1` down to `0`. Surface extraction relies on this order: the
//! first visible voxels of a column are its exposed top faces.

use cgmath::Point3;

use super::{voxel_index, CHUNK_HEIGHT, CHUNK_SIZE};

/// An iterator over every voxel position of a chunk, top-down per column.
///
/// Yields `(local position, linear index)` pairs. It keeps the linear index in
/// step with the position so callers never recompute [`voxel_index`].
pub struct ChunkColumnIterator {
    /// Current X position within the chunk
    local_x: usize,
    /// Current Y position within the current column
    local_y: usize,
    /// Current Z position within the chunk
    local_z: usize,
    /// Whether every column has been visited
    done: bool,
}

impl ChunkColumnIterator {
    /// Creates an iterator positioned at the top of column `(0, 0)`.
    pub fn new() -> Self {
        ChunkColumnIterator {
            local_x: 0,
            local_y: CHUNK_HEIGHT - 1,
            local_z: 0,
            done: false,
        }
    }

    /// Moves to the next voxel, stepping to the next column when the current one
    /// reaches the bottom of the chunk.
    fn advance(&mut self) {
        if self.local_y > 0 {
            self.local_y -= 1;
            return;
        }

        self.local_y = CHUNK_HEIGHT - 1;
        self.local_x += 1;
        if self.local_x == CHUNK_SIZE {
            self.local_x = 0;
            self.local_z += 1;
            if self.local_z == CHUNK_SIZE {
                self.done = true;
            }
        }
    }
}

impl Default for ChunkColumnIterator {
    fn default() -> Self {
        Self::new()
    }
}

impl Iterator for ChunkColumnIterator {
    type Item = (Point3<usize>, usize);

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let position = Point3::new(self.local_x, self.local_y, self.local_z);
        let index = voxel_index(self.local_x, self.local_y, self.local_z);
        self.advance();

        Some((position, index))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.done {
            return (0, Some(0));
        }
        let columns_left = CHUNK_SIZE * CHUNK_SIZE - (self.local_x + CHUNK_SIZE * self.local_z);
        let remaining = (columns_left - 1) * CHUNK_HEIGHT + self.local_y + 1;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for ChunkColumnIterator {}

#[cfg(test)]
mod tests {
    use super::super::CHUNK_VOLUME;
    use super::*;

    #[test]
    fn visits_every_voxel_once() {
        let mut seen = vec![false; CHUNK_VOLUME];
        let iterator = ChunkColumnIterator::new();
        assert_eq!(iterator.len(), CHUNK_VOLUME);

        for (position, index) in iterator {
            assert_eq!(index, voxel_index(position.x, position.y, position.z));
            assert!(!seen[index]);
            seen[index] = true;
        }
        assert!(seen.iter().all(|visited| *visited));
    }

    #[test]
    fn columns_descend_from_the_top() {
        let first: Vec<_> = ChunkColumnIterator::new()
            .take(CHUNK_HEIGHT + 1)
            .map(|(position, _)| position)
            .collect();
        assert_eq!(first[0], Point3::new(0, CHUNK_HEIGHT - 1, 0));
        assert_eq!(first[CHUNK_HEIGHT - 1], Point3::new(0, 0, 0));
        assert_eq!(first[CHUNK_HEIGHT], Point3::new(1, CHUNK_HEIGHT - 1, 0));
    }
}
