#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![warn(rustdoc::invalid_rust_codeblocks)]

//! # Voxel Streaming
//!
//! The streaming core of a voxel engine: an effectively infinite terrain is generated
//! chunk by chunk around a moving observer, lit, meshed on background workers and
//! recycled through fixed-capacity buffer pools as the observer moves.
//!
//! ## Key Modules
//!
//! * `config` - World configuration (view radius, worker count, seed, ...)
//! * `error` - Error types for configuration, edits, persistence and pooling
//! * `engine_state` - The streaming world, voxel data, meshing pipeline and task management
//!
//! ## Architecture
//!
//! The crate follows a layered architecture with clear separation between:
//! * Procedural generation (noise, biomes, ore veins)
//! * Voxel data ownership and player edits (`WorldModel`)
//! * Spatial bounds management (precomputed rings around the observer)
//! * The light + surface compute pipeline, executed on worker threads
//! * The state-partitioned buffer pool that tracks chunks until they are renderable
//!
//! Rendering, input and physics are external collaborators: they read mesh buffers
//! and voxel queries, nothing more.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use voxel_streaming::{config::WorldConfig, engine_state::World};
//!
//! let mut world = World::with_defaults(WorldConfig::default()).unwrap();
//! world.set_observer_position(cgmath::Point3::new(0.0, 80.0, 0.0));
//! loop {
//!     world.tick();
//!     for mesh in world.meshes() {
//!         // hand mesh.vertex_bytes() / mesh.index_bytes() to the renderer
//!         let _ = mesh;
//!     }
//! }
//! ```

use std::error::Error;

use cgmath::Point3;
use log::info;

use config::WorldConfig;
use engine_state::{voxels::block::block_type::BlockType, World};

pub mod config;
pub mod engine_state;
pub mod error;

pub use engine_state::voxels::chunk::ChunkCoord;
pub use engine_state::voxels::world::WorldModel;

/// Number of simulated frames the headless driver runs.
const DEMO_TICKS: u32 = 600;

/// Distance in blocks the observer walks per simulated frame.
const DEMO_STEP: f32 = 0.75;

/// Runs the headless streaming demo.
///
/// The observer walks along the X axis while the world streams chunks in and out.
/// A handful of random edits are applied along the way and the edit overlay is
/// round-tripped through the save format at the end.
///
/// An optional JSON world configuration path is read from the first argument.
pub fn run() -> Result<(), Box<dyn Error>> {
    let mut log_builder = env_logger::Builder::new();
    log_builder
        .target(env_logger::Target::Stdout)
        .parse_env("RUST_LOG")
        .init();

    info!("Logger initialized");

    let config = match std::env::args().nth(1) {
        Some(path) => WorldConfig::from_json(&std::fs::read_to_string(path)?)?,
        None => WorldConfig::default(),
    };

    let mut world = World::with_defaults(config.clone())?;
    let mut rng = fastrand::Rng::with_seed(u64::from(config.seed));
    let mut position = Point3::new(0.5, 90.0, 0.5);

    for frame in 0..DEMO_TICKS {
        position.x += DEMO_STEP;
        world.set_observer_position(position);
        world.tick();

        if frame % 60 == 59 {
            let target = Point3::new(
                position.x.floor() as i32 + rng.i32(-8..8),
                rng.i32(1..100),
                position.z.floor() as i32 + rng.i32(-8..8),
            );
            match world.edit_voxel(target, BlockType::GLASS as u8) {
                Ok(affected) => info!("Edited {:?}, re-rendering {} chunks", target, affected.len()),
                Err(err) => info!("Edit at {:?} rejected: {}", target, err),
            }
            info!("{}", world.stats());
        }
    }

    world.wait_until_idle(std::time::Duration::from_secs(10));

    let blob = world.world_model().serialize();
    let mut restored = WorldModel::new(world.world_model().generator(), world.registry());
    restored.deserialize(&blob)?;
    info!(
        "Save blob of {} bytes restores {} edited chunks",
        blob.len(),
        restored.edited_chunk_count()
    );

    Ok(())
}
