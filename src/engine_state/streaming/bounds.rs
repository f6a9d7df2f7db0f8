//! Precomputed streaming bounds around the observer.
//!
//! Two tiers share the same shape: the data tier (voxel buffers) and the render
//! tier (meshes). Each tier has a generation disk, an add ring on its edge and
//! a remove ring `hysteresis` chunks further out. All sets are stored as chunk
//! offsets relative to the observer and computed once.
//!
//! A cell belongs to a disk of radius `R` when any of its four corners lies
//! within `R` of the observer chunk's centre. A ring of radius `R` is the disk
//! of radius `R` minus the disk of radius `R - 1`.

use std::collections::HashSet;

use crate::{engine_state::voxels::chunk::ChunkCoord, error::ConfigError};

/// Smallest data lookahead whose disk holds the whole 3x3 cluster of every
/// render chunk. A diagonal neighbour's nearest corner is at most `sqrt(2)`
/// further out than the render chunk's, so one extra chunk misses corners.
pub const MIN_DATA_LOOKAHEAD: u32 = 2;

/// Whether the cell at `offset` touches the disk of `radius` chunks.
///
/// Works in doubled coordinates so the corner test stays exact.
pub fn in_disk(offset: ChunkCoord, radius: u32) -> bool {
    let limit = 4 * i64::from(radius) * i64::from(radius);
    let (x, z) = (2 * i64::from(offset.x), 2 * i64::from(offset.z));
    [(-1, -1), (-1, 1), (1, -1), (1, 1)]
        .iter()
        .any(|(cx, cz)| (x + cx).pow(2) + (z + cz).pow(2) <= limit)
}

/// Every offset of a disk, nearest first.
pub fn disk(radius: u32) -> Vec<ChunkCoord> {
    let r = radius as i32 + 1;
    let mut offsets: Vec<ChunkCoord> = (-r..=r)
        .flat_map(|z| (-r..=r).map(move |x| ChunkCoord::new(x, z)))
        .filter(|&offset| in_disk(offset, radius))
        .collect();
    offsets.sort_by_key(|o| (o.x * o.x + o.z * o.z, o.z, o.x));
    offsets
}

/// The outermost one-chunk band of a disk.
pub fn ring(radius: u32) -> Vec<ChunkCoord> {
    disk(radius)
        .into_iter()
        .filter(|&offset| radius == 0 || !in_disk(offset, radius - 1))
        .collect()
}

/// Chunks entering and leaving a tier.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RingDelta {
    /// Chunks to bring in
    pub added: Vec<ChunkCoord>,
    /// Chunks to let go
    pub removed: Vec<ChunkCoord>,
}

impl RingDelta {
    /// Whether nothing changes.
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// The precomputed sets of one tier.
#[derive(Debug, Clone)]
pub struct TierBounds {
    radius: u32,
    remove_radius: u32,
    generation_region: Vec<ChunkCoord>,
    add_ring: Vec<ChunkCoord>,
    remove_ring: Vec<ChunkCoord>,
    retain_region: Vec<ChunkCoord>,
}

impl TierBounds {
    fn new(radius: u32, hysteresis: u32) -> Self {
        let remove_radius = radius + hysteresis;
        TierBounds {
            radius,
            remove_radius,
            generation_region: disk(radius),
            add_ring: ring(radius),
            remove_ring: ring(remove_radius),
            retain_region: disk(remove_radius - 1),
        }
    }

    /// Radius of the generation disk.
    pub fn radius(&self) -> u32 {
        self.radius
    }

    /// Radius of the remove ring.
    pub fn remove_radius(&self) -> u32 {
        self.remove_radius
    }

    /// Offsets that must be present around the observer.
    pub fn generation_region(&self) -> &[ChunkCoord] {
        &self.generation_region
    }

    /// Offsets that may enter on a one-chunk move.
    pub fn add_ring(&self) -> &[ChunkCoord] {
        &self.add_ring
    }

    /// Offsets that leave on a one-chunk move.
    pub fn remove_ring(&self) -> &[ChunkCoord] {
        &self.remove_ring
    }

    /// Offsets that are kept once present.
    pub fn retain_region(&self) -> &[ChunkCoord] {
        &self.retain_region
    }

    /// Delta after the observer moved one chunk along one axis to `center`.
    ///
    /// `present` answers whether a chunk is currently part of the tier.
    pub fn step(&self, center: ChunkCoord, present: impl Fn(ChunkCoord) -> bool) -> RingDelta {
        RingDelta {
            added: self
                .add_ring
                .iter()
                .map(|&offset| center + offset)
                .filter(|&coord| !present(coord))
                .collect(),
            removed: self
                .remove_ring
                .iter()
                .map(|&offset| center + offset)
                .filter(|&coord| present(coord))
                .collect(),
        }
    }

    /// Delta that brings an arbitrary current set in line with `center`.
    pub fn resync(&self, center: ChunkCoord, current: &HashSet<ChunkCoord>) -> RingDelta {
        let retained = self.remove_radius - 1;
        let mut removed: Vec<ChunkCoord> = current
            .iter()
            .copied()
            .filter(|&coord| !in_disk(coord - center, retained))
            .collect();
        removed.sort();

        RingDelta {
            added: self
                .generation_region
                .iter()
                .map(|&offset| center + offset)
                .filter(|coord| !current.contains(coord))
                .collect(),
            removed,
        }
    }
}

/// Bounds of both tiers, built from the world configuration.
#[derive(Debug, Clone)]
pub struct BoundsLookup {
    data: TierBounds,
    render: TierBounds,
}

impl BoundsLookup {
    /// Precomputes every set.
    ///
    /// # Arguments
    /// * `view_radius` - Radius of the render tier
    /// * `lookahead` - Extra data radius so neighbours exist before meshing,
    ///   raised to [`MIN_DATA_LOOKAHEAD`] if smaller
    /// * `hysteresis` - Distance between add and remove rings, at least 1
    pub fn new(view_radius: u32, lookahead: u32, hysteresis: u32) -> Result<Self, ConfigError> {
        if hysteresis == 0 {
            return Err(ConfigError::InvalidWorld(
                "removal hysteresis must be at least 1".to_string(),
            ));
        }
        Ok(BoundsLookup {
            data: TierBounds::new(view_radius + lookahead.max(MIN_DATA_LOOKAHEAD), hysteresis),
            render: TierBounds::new(view_radius, hysteresis),
        })
    }

    /// The voxel data tier.
    pub fn data(&self) -> &TierBounds {
        &self.data
    }

    /// The mesh tier.
    pub fn render(&self) -> &TierBounds {
        &self.render
    }

    /// Compute slots the streaming pool needs so a full render tier plus the
    /// chunks waiting to leave it always fit.
    pub fn pool_capacity(&self) -> usize {
        disk(self.render.remove_radius).len() + self.render.generation_region.len()
    }

    /// Longest move, in unit steps, still handled ring by ring.
    pub fn max_incremental_steps(&self) -> u32 {
        2 * self.data.radius + 1
    }
}

/// Intermediate observer chunks of a move, one unit step at a time, X first.
/// The last entry is `to`.
pub fn unit_steps(from: ChunkCoord, to: ChunkCoord) -> Vec<ChunkCoord> {
    let mut steps = Vec::with_capacity(((to.x - from.x).abs() + (to.z - from.z).abs()) as usize);
    let mut current = from;
    while current.x != to.x {
        current.x += (to.x - current.x).signum();
        steps.push(current);
    }
    while current.z != to.z {
        current.z += (to.z - current.z).signum();
        steps.push(current);
    }
    steps
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disks_are_symmetric_and_nested() {
        assert!(disk(0).is_empty());
        assert_eq!(disk(1).len(), 4 + 4 + 1);
        for radius in 1..6 {
            let inner: HashSet<_> = disk(radius).into_iter().collect();
            let outer: HashSet<_> = disk(radius + 1).into_iter().collect();
            assert!(inner.is_subset(&outer));
            for offset in &inner {
                assert!(inner.contains(&ChunkCoord::new(-offset.x, offset.z)));
                assert!(inner.contains(&ChunkCoord::new(offset.z, offset.x)));
            }
        }
        assert_eq!(disk(3)[0], ChunkCoord::new(0, 0));
    }

    #[test]
    fn unit_steps_walk_the_axes() {
        let from = ChunkCoord::new(0, 0);
        assert_eq!(
            unit_steps(from, ChunkCoord::new(2, -1)),
            vec![ChunkCoord::new(1, 0), ChunkCoord::new(2, 0), ChunkCoord::new(2, -1)]
        );
        assert!(unit_steps(from, from).is_empty());
    }

    #[test]
    fn stepping_keeps_the_tier_between_its_disks() {
        let bounds = BoundsLookup::new(3, 1, 2).unwrap();
        let tier = bounds.data();
        let mut center = ChunkCoord::new(0, 0);
        let mut present = HashSet::new();
        present.extend(tier.resync(center, &present).added);

        for target in [ChunkCoord::new(4, 0), ChunkCoord::new(4, 5), ChunkCoord::new(-2, 1)] {
            for step in unit_steps(center, target) {
                let delta = tier.step(step, |coord| present.contains(&coord));
                for coord in &delta.removed {
                    present.remove(coord);
                }
                present.extend(delta.added);
                center = step;

                for offset in tier.generation_region() {
                    assert!(present.contains(&(center + *offset)));
                }
                for coord in &present {
                    assert!(in_disk(*coord - center, tier.remove_radius() - 1));
                }
            }
        }
    }

    #[test]
    fn data_tier_holds_every_render_cluster() {
        for view_radius in 1..12 {
            for lookahead in 0..3 {
                let bounds = BoundsLookup::new(view_radius, lookahead, 1).unwrap();
                let data: HashSet<_> = bounds.data().generation_region().iter().copied().collect();
                for offset in bounds.render().generation_region() {
                    for dz in -1..=1 {
                        for dx in -1..=1 {
                            assert!(
                                data.contains(&offset.offset(dx, dz)),
                                "radius {view_radius}, lookahead {lookahead}: {} misses ({dx}, {dz})",
                                offset
                            );
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn zero_hysteresis_is_rejected() {
        assert!(BoundsLookup::new(4, 1, 0).is_err());
    }
}
