//! Light propagation over a 3x3 chunk cluster.
//!
//! Light is a scalar in `[0, 1]`. It is computed in two passes:
//!
//! 1. **Sky pass**: every column of the cluster starts at full light above the
//!    world and walks down. An opaque voxel cuts the light to zero; a transparent
//!    one scales it by its pass-through coefficient.
//! 2. **Diffusion**: lit voxels next to a dimmer see-through neighbour seed a BFS
//!    queue; each step spreads `level - LIGHT_FALLOFF` into see-through neighbours
//!    that are darker, across chunk borders, until the level drops below
//!    `LIGHT_THRESHOLD`.

use std::collections::VecDeque;

use crate::engine_state::voxels::{
    block::{BlockRegistry, VoxelId},
    chunk::{cluster_index, CHUNK_HEIGHT, CLUSTER_PLANE_SIZE, CLUSTER_SIZE, CLUSTER_VOLUME},
};

/// Light lost per diffusion step.
pub const LIGHT_FALLOFF: f32 = 0.08;
/// Voxels at or below this level do not spread light any further.
pub const LIGHT_THRESHOLD: f32 = 0.08;

/// Calls `f` with the cluster index of every face neighbour of `index`.
#[inline]
fn for_each_neighbour(index: usize, mut f: impl FnMut(usize)) {
    let x = index % CLUSTER_SIZE;
    let z = (index / CLUSTER_SIZE) % CLUSTER_SIZE;
    let y = index / CLUSTER_PLANE_SIZE;

    if x > 0 {
        f(index - 1);
    }
    if x + 1 < CLUSTER_SIZE {
        f(index + 1);
    }
    if z > 0 {
        f(index - CLUSTER_SIZE);
    }
    if z + 1 < CLUSTER_SIZE {
        f(index + CLUSTER_SIZE);
    }
    if y > 0 {
        f(index - CLUSTER_PLANE_SIZE);
    }
    if y + 1 < CHUNK_HEIGHT {
        f(index + CLUSTER_PLANE_SIZE);
    }
}

/// Straight top-down sunlight for every column of the cluster.
pub fn sky_pass(cluster: &[VoxelId], light: &mut [f32], registry: &BlockRegistry) {
    for z in 0..CLUSTER_SIZE {
        for x in 0..CLUSTER_SIZE {
            let mut level = 1.0f32;
            for y in (0..CHUNK_HEIGHT).rev() {
                let index = cluster_index(x, y, z);
                let id = cluster[index];
                if registry.is_transparent(id) {
                    level *= registry.light_pass(id);
                } else {
                    level = 0.0;
                }
                light[index] = level;
            }
        }
    }
}

/// Spreads light from lit voxels into darker see-through neighbours.
///
/// Returns the number of queue entries processed.
pub fn diffuse(cluster: &[VoxelId], light: &mut [f32], registry: &BlockRegistry) -> usize {
    let mut queue = VecDeque::new();

    for index in 0..CLUSTER_VOLUME {
        let level = light[index];
        if level <= LIGHT_THRESHOLD {
            continue;
        }
        let mut has_darker_neighbour = false;
        for_each_neighbour(index, |neighbour| {
            if light[neighbour] < level - LIGHT_FALLOFF
                && registry.is_transparent(cluster[neighbour])
            {
                has_darker_neighbour = true;
            }
        });
        if has_darker_neighbour {
            queue.push_back(index);
        }
    }

    let mut processed = 0;
    while let Some(index) = queue.pop_front() {
        processed += 1;
        let spread = light[index] - LIGHT_FALLOFF;
        if spread <= 0.0 {
            continue;
        }
        for_each_neighbour(index, |neighbour| {
            if light[neighbour] < spread && registry.is_transparent(cluster[neighbour]) {
                light[neighbour] = spread;
                if spread > LIGHT_THRESHOLD {
                    queue.push_back(neighbour);
                }
            }
        });
    }

    processed
}

/// Runs both passes. `cluster` and `light` must be [`CLUSTER_VOLUME`] long.
pub fn propagate_light(cluster: &[VoxelId], light: &mut [f32], registry: &BlockRegistry) -> usize {
    debug_assert_eq!(cluster.len(), CLUSTER_VOLUME);
    debug_assert_eq!(light.len(), CLUSTER_VOLUME);
    sky_pass(cluster, light, registry);
    diffuse(cluster, light, registry)
}
