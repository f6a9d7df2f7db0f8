//! Flat mesh buffers produced by surface extraction.

use cgmath::{Point3, Vector3};

use crate::engine_state::rendering::vertex::Vertex;

use super::face::FACE_TRIANGLES;

/// The output of surface extraction for one chunk.
///
/// Per-vertex attributes live in parallel arrays, ready to be uploaded as
/// separate streams or interleaved with [`MeshData::interleaved`]. Buffers are
/// cleared, not freed, between uses so a recycled `MeshData` keeps its capacity.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshData {
    /// Chunk-local vertex positions
    pub positions: Vec<[f32; 3]>,
    /// Face normals, one per vertex
    pub normals: Vec<[f32; 3]>,
    /// Atlas coordinates
    pub uvs: Vec<[f32; 2]>,
    /// Light colors (`[l, l, l, 1]`)
    pub colors: Vec<[f32; 4]>,
    /// Triangle list indices
    pub indices: Vec<u32>,
}

impl MeshData {
    /// An empty mesh.
    pub fn new() -> Self {
        Self::default()
    }

    /// Empties every array, keeping allocations.
    pub fn clear(&mut self) {
        self.positions.clear();
        self.normals.clear();
        self.uvs.clear();
        self.colors.clear();
        self.indices.clear();
    }

    /// Number of vertices.
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Number of indices.
    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    /// Number of quads (faces).
    pub fn face_count(&self) -> usize {
        self.positions.len() / 4
    }

    /// Whether there is nothing to draw.
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Appends one quad: four corners in `[bl, tl, br, tr]` order and their
    /// two triangles.
    pub fn push_quad(
        &mut self,
        corners: [Point3<f32>; 4],
        normal: Vector3<f32>,
        uvs: &[[f32; 2]; 4],
        light: [f32; 4],
    ) {
        let base = self.positions.len() as u32;
        for corner in 0..4 {
            self.positions.push(corners[corner].into());
            self.normals.push(normal.into());
            self.uvs.push(uvs[corner]);
            let level = light[corner];
            self.colors.push([level, level, level, 1.0]);
        }
        self.indices
            .extend(FACE_TRIANGLES.iter().map(|index| base + index));
    }

    /// The vertices as interleaved records.
    pub fn interleaved(&self) -> Vec<Vertex> {
        (0..self.positions.len())
            .map(|i| Vertex {
                position: self.positions[i],
                normal: self.normals[i],
                tex_coords: self.uvs[i],
                color: self.colors[i],
            })
            .collect()
    }

    /// Replaces the contents with a copy of `other`, reusing allocations.
    pub fn copy_from(&mut self, other: &MeshData) {
        self.clear();
        self.positions.extend_from_slice(&other.positions);
        self.normals.extend_from_slice(&other.normals);
        self.uvs.extend_from_slice(&other.uvs);
        self.colors.extend_from_slice(&other.colors);
        self.indices.extend_from_slice(&other.indices);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quads_share_four_vertices() {
        let mut mesh = MeshData::new();
        let corners = [
            Point3::new(0.0, 0.0, 1.0),
            Point3::new(0.0, 1.0, 1.0),
            Point3::new(1.0, 0.0, 1.0),
            Point3::new(1.0, 1.0, 1.0),
        ];
        let uvs = [[0.0, 1.0], [0.0, 0.0], [1.0, 1.0], [1.0, 0.0]];
        mesh.push_quad(corners, Vector3::unit_z(), &uvs, [1.0; 4]);
        mesh.push_quad(corners, Vector3::unit_z(), &uvs, [0.5; 4]);

        assert_eq!(mesh.vertex_count(), 8);
        assert_eq!(mesh.face_count(), 2);
        assert_eq!(mesh.indices[6..], [4, 6, 5, 5, 6, 7]);
        assert_eq!(mesh.interleaved()[5].color, [0.5, 0.5, 0.5, 1.0]);

        let mut copy = MeshData::new();
        copy.copy_from(&mesh);
        assert_eq!(copy, mesh);
        mesh.clear();
        assert!(mesh.is_empty());
    }
}
