//! # Voxel Streaming Demo Entry Point
//!
//! Headless driver for the streaming core. It walks an observer through the
//! world, logs streaming statistics and round-trips the edit overlay.
//!
//! ## Usage
//!
//! ```bash
//! RUST_LOG=info cargo run --release -- [world_config.json]
//! ```

fn main() {
    if let Err(err) = voxel_streaming::run() {
        log::error!("{}", err);
        eprintln!("{}", err);
        std::process::exit(1);
    }
}
