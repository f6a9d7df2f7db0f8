//! # Voxel Engine Core
//!
//! This module contains the voxel data side of the engine: what a voxel is,
//! how chunks are laid out, how terrain is generated and who owns it.
//!
//! ## Architecture
//!
//! * **Block**: voxel ids, block properties and the atlas table
//! * **Chunk**: chunk coordinates, the fixed linear index mapping and dense buffers
//! * **Terrain**: noise, biomes, ore veins and the terrain generator
//! * **Tasks**: chunk generation jobs run on the rayon pool
//! * **Edits**: the player edit overlay and its save format
//! * **World**: the `WorldModel` owning materialized chunks and edits
//!
//! ## Data Flow
//!
//! 1. The streaming layer asks the world model to materialize chunks entering data range
//! 2. Generation jobs fill one buffer each and are joined before the call returns
//! 3. Player edits are laid over generated buffers and recorded in the overlay
//! 4. Mesh jobs copy 3x3 clusters out of the model; they never alias its buffers

pub mod block;
pub mod chunk;
pub mod edits;
pub mod tasks;
pub mod terrain;
pub mod world;
