//! Renderable chunk meshes.
//!
//! The mesh pool is a fixed array partitioned into `[0, active)` bound meshes
//! and `[active, capacity)` free ones. Binding takes the first free slot and
//! unbinding swaps the slot to the end of the bound range, so the bound meshes
//! are always one contiguous slice.

use std::collections::HashMap;

use cgmath::Point3;

use crate::{
    engine_state::{
        rendering::{meshing::MeshData, Vertex},
        voxels::chunk::ChunkCoord,
    },
    error::PoolError,
};

/// A chunk mesh ready for upload.
#[derive(Debug, Default)]
pub struct MeshBuffer {
    coord: Option<ChunkCoord>,
    mesh: MeshData,
    vertices: Vec<Vertex>,
}

impl MeshBuffer {
    /// The chunk this mesh belongs to.
    pub fn coord(&self) -> Option<ChunkCoord> {
        self.coord
    }

    /// World-space position of the mesh's local origin.
    pub fn origin(&self) -> Point3<i32> {
        self.coord.unwrap_or_default().world_origin()
    }

    /// Flat vertex, normal, uv, color and index arrays.
    pub fn mesh(&self) -> &MeshData {
        &self.mesh
    }

    /// Interleaved vertex records.
    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    /// Interleaved vertices as raw bytes.
    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    /// Triangle indices as raw bytes.
    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.mesh.indices)
    }

    /// Number of faces in the mesh.
    pub fn face_count(&self) -> usize {
        self.mesh.face_count()
    }

    fn upload(&mut self, coord: ChunkCoord, mesh: &MeshData) {
        self.coord = Some(coord);
        self.mesh.copy_from(mesh);
        self.vertices.clear();
        self.vertices.extend(mesh.interleaved());
    }

    fn reset(&mut self) {
        self.coord = None;
        self.mesh.clear();
        self.vertices.clear();
    }
}

/// Fixed-capacity pool of [`MeshBuffer`]s.
#[derive(Debug)]
pub struct MeshPool {
    buffers: Vec<MeshBuffer>,
    index_of: HashMap<ChunkCoord, usize>,
    active: usize,
}

impl MeshPool {
    /// Creates a pool of `capacity` free buffers.
    pub fn new(capacity: usize) -> Self {
        MeshPool {
            buffers: (0..capacity).map(|_| MeshBuffer::default()).collect(),
            index_of: HashMap::with_capacity(capacity),
            active: 0,
        }
    }

    /// Total number of buffers.
    pub fn capacity(&self) -> usize {
        self.buffers.len()
    }

    /// Number of bound buffers.
    pub fn len(&self) -> usize {
        self.active
    }

    /// Whether nothing is bound.
    pub fn is_empty(&self) -> bool {
        self.active == 0
    }

    /// The bound meshes.
    pub fn bound(&self) -> &[MeshBuffer] {
        &self.buffers[..self.active]
    }

    /// The mesh bound to `coord`.
    pub fn get(&self, coord: ChunkCoord) -> Option<&MeshBuffer> {
        self.index_of.get(&coord).map(|&index| &self.buffers[index])
    }

    /// Uploads `mesh` for `coord`, reusing the buffer already bound to it or
    /// taking a free one.
    pub fn bind(&mut self, coord: ChunkCoord, mesh: &MeshData) -> Result<(), PoolError> {
        let index = match self.index_of.get(&coord) {
            Some(&index) => index,
            None => {
                if self.active == self.buffers.len() {
                    return Err(PoolError::Exhausted {
                        capacity: self.buffers.len(),
                    });
                }
                let index = self.active;
                self.active += 1;
                self.index_of.insert(coord, index);
                index
            }
        };
        self.buffers[index].upload(coord, mesh);
        Ok(())
    }

    /// Returns the buffer bound to `coord` to the free range. Returns whether
    /// anything was bound.
    pub fn unbind(&mut self, coord: ChunkCoord) -> bool {
        let Some(index) = self.index_of.remove(&coord) else {
            return false;
        };
        let last = self.active - 1;
        self.buffers.swap(index, last);
        if let Some(moved) = self.buffers[index].coord {
            if index != last {
                self.index_of.insert(moved, index);
            }
        }
        self.buffers[last].reset();
        self.active = last;
        true
    }

    /// Verifies that the side table matches the bound range.
    pub fn check_invariants(&self) -> Result<(), PoolError> {
        if self.index_of.len() != self.active {
            return Err(PoolError::SideTableMismatch(format!(
                "{} mesh side table entries for {} bound meshes",
                self.index_of.len(),
                self.active
            )));
        }
        for (index, buffer) in self.buffers.iter().enumerate() {
            let consistent = match buffer.coord {
                Some(coord) => index < self.active && self.index_of.get(&coord) == Some(&index),
                None => index >= self.active,
            };
            if !consistent {
                return Err(PoolError::SideTableMismatch(format!(
                    "mesh slot {index} holds {:?} (bound range {})",
                    buffer.coord, self.active
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::Vector3;

    fn quad_mesh() -> MeshData {
        let mut mesh = MeshData::new();
        mesh.push_quad(
            [
                Point3::new(0.0, 1.0, 0.0),
                Point3::new(0.0, 1.0, 1.0),
                Point3::new(1.0, 1.0, 0.0),
                Point3::new(1.0, 1.0, 1.0),
            ],
            Vector3::unit_y(),
            &[[0.0; 2]; 4],
            [1.0; 4],
        );
        mesh
    }

    #[test]
    fn bind_rebind_unbind() {
        let mut pool = MeshPool::new(2);
        let a = ChunkCoord::new(-1, 2);
        let b = ChunkCoord::new(5, 5);

        pool.bind(a, &quad_mesh()).unwrap();
        pool.bind(b, &MeshData::new()).unwrap();
        assert_eq!(
            pool.bind(ChunkCoord::new(9, 9), &MeshData::new()),
            Err(PoolError::Exhausted { capacity: 2 })
        );

        pool.bind(b, &quad_mesh()).unwrap();
        assert_eq!(pool.len(), 2);
        assert_eq!(pool.get(b).unwrap().face_count(), 1);

        let mesh = pool.get(a).unwrap();
        assert_eq!(mesh.origin(), Point3::new(-16, 0, 32));
        assert_eq!(mesh.vertex_bytes().len(), 4 * std::mem::size_of::<Vertex>());
        assert_eq!(mesh.index_bytes().len(), 6 * 4);

        assert!(pool.unbind(a));
        assert!(!pool.unbind(a));
        assert_eq!(pool.bound().len(), 1);
        assert_eq!(pool.bound()[0].coord(), Some(b));
        pool.check_invariants().unwrap();
    }
}
