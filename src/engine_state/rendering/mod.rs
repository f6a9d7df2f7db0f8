//! Compute side of rendering for the voxel engine.
//!
//! This module turns voxel data into renderable surfaces. It contains the light
//! and surface algorithms, the tasks that run them on worker threads and the
//! vertex layout handed to an external renderer. Nothing here talks to a GPU.

pub mod meshing;
pub mod tasks;
mod vertex;

// Re-export commonly used types
pub use vertex::Vertex;
