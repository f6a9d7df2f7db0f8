//! # Streaming
//!
//! Everything that decides which chunks exist around the observer and tracks
//! their meshes through the compute pipeline.
//!
//! ## Architecture
//!
//! * `bounds` - precomputed generation disks and add/remove rings of both tiers
//! * `partition` - the swap-partitioned slot array behind the pool
//! * `compute_buffer` - a slot's work buffers and pending task handle
//! * `mesh_buffer` - renderable meshes and their own partitioned pool
//! * [`StreamingPool`] - compute slots and mesh buffers driven together
//!
//! ## Chunk Lifecycle
//!
//! 1. `acquire` gives a chunk a passive compute slot
//! 2. `schedule_render` snapshots its cluster, activates the slot and returns
//!    the first pipeline task
//! 3. `sweep_completed` polls every in-flight slot once per tick and binds
//!    finished meshes
//! 4. `remove` frees a rendered chunk's slot and mesh

use std::sync::Arc;

use log::{error, warn};

use crate::{
    engine_state::{
        rendering::{
            meshing::{ComputeWork, MeshData},
            tasks::light_propagation_task::LightPropagationTask,
        },
        task_management::{handle::task_handle, task::Task},
        voxels::{block::BlockRegistry, chunk::ChunkCoord, world::WorldModel},
    },
    error::PoolError,
};

use compute_buffer::ComputeBuffer;
use mesh_buffer::{MeshBuffer, MeshPool};
use partition::{PartitionedPool, SlotState};

pub mod bounds;
pub mod compute_buffer;
pub mod mesh_buffer;
pub mod partition;

/// Slot counts of a [`StreamingPool`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolCounts {
    /// Chunks with a bound mesh and an idle slot
    pub rendered: usize,
    /// Chunks whose pipeline is running
    pub in_flight: usize,
    /// Chunks waiting to be scheduled
    pub passive: usize,
    /// Unused slots
    pub free: usize,
    /// Bound meshes
    pub meshes: usize,
}

/// Fixed-capacity compute slots and mesh buffers of the streaming world.
pub struct StreamingPool {
    compute: PartitionedPool<ComputeBuffer>,
    meshes: MeshPool,
    /// Work buffers returned by finished pipelines
    spare_work: Vec<ComputeWork>,
    spare_limit: usize,
}

impl StreamingPool {
    /// Creates a pool with `capacity` compute slots and as many mesh buffers.
    ///
    /// At most `spare_limit` idle work allocations are kept for reuse.
    pub fn new(capacity: usize, spare_limit: usize) -> Self {
        StreamingPool {
            compute: PartitionedPool::new(capacity),
            meshes: MeshPool::new(capacity),
            spare_work: Vec::new(),
            spare_limit,
        }
    }

    /// Number of compute slots.
    pub fn capacity(&self) -> usize {
        self.compute.capacity()
    }

    /// State of a chunk's slot, if it has one.
    pub fn state(&self, coord: ChunkCoord) -> Option<SlotState> {
        self.compute.state(coord)
    }

    /// Current slot counts.
    pub fn counts(&self) -> PoolCounts {
        let (rendered, in_flight, passive, free) = self.compute.counts();
        PoolCounts {
            rendered,
            in_flight,
            passive,
            free,
            meshes: self.meshes.len(),
        }
    }

    /// Gives `coord` a passive slot with work buffers attached.
    ///
    /// A rendered chunk keeps its bound mesh until the new one is ready.
    pub fn acquire(&mut self, coord: ChunkCoord) -> Result<(), PoolError> {
        let spare = &mut self.spare_work;
        let buffer = self.compute.acquire(coord)?;
        buffer.prepare(coord, || {
            spare.pop().unwrap_or_else(|| ComputeWork::new(coord))
        });
        Ok(())
    }

    /// Starts the compute pipeline of a passive chunk.
    ///
    /// The 3x3 cluster around `coord` is copied out of `world` into the
    /// slot's work buffers, which the task then owns until it completes.
    /// Returns the first task of the chain for the caller to publish.
    pub fn schedule_render(
        &mut self,
        coord: ChunkCoord,
        world: &WorldModel,
        registry: &Arc<BlockRegistry>,
        smooth_lighting: bool,
    ) -> Result<Box<dyn Task + Send>, PoolError> {
        let state = self.compute.state(coord);
        if state != Some(SlotState::Passive) {
            return Err(PoolError::NotPassive { coord, state });
        }

        let buffer = self.compute.activate(coord)?;
        let (completion, pending) = task_handle();
        let mut work = buffer
            .launch(pending)
            .unwrap_or_else(|| ComputeWork::new(coord));

        world.copy_cluster(coord, &mut work.cluster);
        Ok(Box::new(LightPropagationTask::new(
            work,
            Arc::clone(registry),
            smooth_lighting,
            completion,
        )))
    }

    /// Promotes every finished pipeline to the rendered range and binds its
    /// mesh. Returns the number of promoted chunks.
    ///
    /// A pipeline whose task was lost is completed with an empty mesh.
    pub fn sweep_completed(&mut self) -> usize {
        let meshes = &mut self.meshes;
        let spare = &mut self.spare_work;
        let spare_limit = self.spare_limit;

        self.compute.sweep(|coord, buffer| {
            let Some(outcome) = buffer.poll() else {
                return false;
            };
            let bound = match outcome {
                Ok(work) => {
                    let bound = meshes.bind(coord, &work.mesh);
                    if spare.len() < spare_limit {
                        spare.push(work);
                    }
                    bound
                }
                Err(err) => {
                    warn!("Render of {} failed: {}", coord, err);
                    meshes.bind(coord, &MeshData::new())
                }
            };
            if let Err(err) = bound {
                error!("Could not bind the mesh of {}: {}", coord, err);
            }
            true
        })
    }

    /// Frees a rendered chunk's slot and mesh.
    ///
    /// A chunk in any other state is refused with a logged dump and the pool
    /// is left untouched.
    pub fn remove(&mut self, coord: ChunkCoord) -> Result<(), PoolError> {
        let buffer = self.compute.release(coord)?;
        if let Some(work) = buffer.take_work() {
            if self.spare_work.len() < self.spare_limit {
                self.spare_work.push(work);
            }
        }
        self.meshes.unbind(coord);
        Ok(())
    }

    /// The bound meshes, one per rendered chunk.
    pub fn meshes(&self) -> &[MeshBuffer] {
        self.meshes.bound()
    }

    /// The mesh bound to `coord`.
    pub fn mesh(&self, coord: ChunkCoord) -> Option<&MeshBuffer> {
        self.meshes.get(coord)
    }

    /// Verifies both partitions and their side tables.
    pub fn check_invariants(&self) -> Result<(), PoolError> {
        self.compute.check_invariants()?;
        self.meshes.check_invariants()
    }

    /// Human-readable state of every occupied compute slot.
    pub fn dump(&self) -> String {
        self.compute.dump()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_state::{
        task_management::task::TaskResult,
        voxels::terrain::{biome::BiomeTable, TerrainGenerator},
    };

    fn run_chain(task: Box<dyn Task + Send>) {
        let mut pending: Vec<Box<dyn Task + Send>> = vec![task];
        while let Some(task) = pending.pop() {
            let result: Box<dyn TaskResult + Send> = task.process();
            pending.extend(result.handle_result());
        }
    }

    #[test]
    fn chunk_goes_through_the_whole_lifecycle() {
        let registry = Arc::new(BlockRegistry::default());
        let biomes = Arc::new(BiomeTable::default_table().unwrap());
        let mut world = WorldModel::new(
            Arc::new(TerrainGenerator::new(3, biomes)),
            registry.clone(),
        );
        let coord = ChunkCoord::new(0, 0);
        world.materialize(&[coord]);

        let mut pool = StreamingPool::new(4, 2);
        pool.acquire(coord).unwrap();
        let task = pool.schedule_render(coord, &world, &registry, true).unwrap();
        assert_eq!(pool.state(coord), Some(SlotState::InFlight));
        assert_eq!(pool.sweep_completed(), 0);
        assert_eq!(
            pool.remove(coord),
            Err(PoolError::NotRendered {
                coord,
                state: Some(SlotState::InFlight)
            })
        );

        run_chain(task);
        assert_eq!(pool.sweep_completed(), 1);
        assert_eq!(pool.state(coord), Some(SlotState::Rendered));
        let mesh = pool.mesh(coord).unwrap();
        assert!(mesh.face_count() > 0);
        pool.check_invariants().unwrap();

        pool.remove(coord).unwrap();
        assert!(pool.meshes().is_empty());
        assert_eq!(pool.counts().free, 4);
        pool.check_invariants().unwrap();
    }

    #[test]
    fn lost_pipelines_complete_with_an_empty_mesh() {
        let registry = Arc::new(BlockRegistry::default());
        let biomes = Arc::new(BiomeTable::default_table().unwrap());
        let world = WorldModel::new(Arc::new(TerrainGenerator::new(3, biomes)), registry.clone());
        let coord = ChunkCoord::new(7, 7);

        let mut pool = StreamingPool::new(1, 0);
        pool.acquire(coord).unwrap();
        drop(pool.schedule_render(coord, &world, &registry, false).unwrap());

        assert_eq!(pool.sweep_completed(), 1);
        assert_eq!(pool.mesh(coord).map(MeshBuffer::face_count), Some(0));
        assert!(matches!(
            pool.schedule_render(coord, &world, &registry, false),
            Err(PoolError::NotPassive { .. })
        ));
    }
}
