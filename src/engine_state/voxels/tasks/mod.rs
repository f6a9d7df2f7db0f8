//! # Voxel Task System
//!
//! This module contains tasks related to voxel world generation. Generation
//! tasks are fanned out on the rayon pool and joined by the world model, so
//! they never cross the worker channels used by the mesh pipeline.

pub mod chunk_generation_task;
