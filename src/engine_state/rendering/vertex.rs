//! Vertex data structures for mesh upload.
//!
//! This module defines the interleaved vertex record handed to the rendering
//! collaborator together with the index buffer of a chunk mesh.

use cgmath::{Point3, Vector3};

/// A vertex of a chunk mesh, laid out for direct GPU upload.
///
/// # Memory Layout
/// - Position: [f32; 3] (12 bytes), chunk-local
/// - Normal: [f32; 3] (12 bytes)
/// - Texture Coordinates: [f32; 2] (8 bytes), atlas space
/// - Color: [f32; 4] (16 bytes), light level in RGB, alpha 1
///
/// Total size: 48 bytes
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    /// Position relative to the chunk origin
    pub position: [f32; 3],
    /// Face normal
    pub normal: [f32; 3],
    /// UV texture coordinates in the atlas
    pub tex_coords: [f32; 2],
    /// Vertex color (light level)
    pub color: [f32; 4],
}

impl Vertex {
    /// Creates a new vertex.
    ///
    /// # Arguments
    /// * `position` - Chunk-local position of the vertex
    /// * `normal` - Normal of the face the vertex belongs to
    /// * `tex_coords` - Atlas UV coordinates
    /// * `light` - Light level in `[0, 1]`, written into the RGB channels
    pub fn new(position: Point3<f32>, normal: Vector3<f32>, tex_coords: [f32; 2], light: f32) -> Self {
        Vertex {
            position: position.into(),
            normal: normal.into(),
            tex_coords,
            color: [light, light, light, 1.0],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertex_is_tightly_packed() {
        assert_eq!(std::mem::size_of::<Vertex>(), 48);
        let vertex = Vertex::new(Point3::new(1.0, 2.0, 3.0), Vector3::unit_y(), [0.5, 0.25], 0.8);
        let bytes: &[u8] = bytemuck::bytes_of(&vertex);
        assert_eq!(bytes.len(), 48);
        assert_eq!(vertex.color, [0.8, 0.8, 0.8, 1.0]);
    }
}
