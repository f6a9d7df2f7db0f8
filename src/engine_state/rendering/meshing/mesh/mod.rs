//! Mesh data for voxel rendering.
//!
//! # Architecture
//! - [`MeshData`]: flat vertex/normal/uv/color/index arrays of one chunk mesh
//! - [`face`]: the fixed cube-corner and triangle tables faces are built from

pub mod face;
mod mesh;

pub use mesh::*;
