//! # Engine State Module
//!
//! The core engine module that owns the streaming world and all of its subsystems.
//!
//! ## Key Components
//!
//! * `World` - The owner of every subsystem and the per-frame `tick`
//! * `streaming` - Bounds rings and the state-partitioned buffer pool
//! * `rendering` - Light propagation, surface extraction and their tasks
//! * `task_management` - Manages asynchronous tasks and worker threads
//! * `voxels` - Handles voxel data, chunks, and world generation
//!
//! ## Architecture
//!
//! `World` exclusively owns the `WorldModel`, the `StreamingPool`, the
//! `TaskManager` and the `BoundsLookup`. Nothing is global: the biome table and
//! block registry are handed in at construction and shared read-only with the
//! generation and compute jobs.
//!
//! ## Tick Order
//!
//! 1. Drain worker results; finished light stages publish their surface stage
//! 2. Apply observer movement, data tier first, then render tier
//! 3. Sweep the pool for finished meshes
//! 4. Retry removals that had to wait for a pipeline
//! 5. Start up to `max_renders_per_tick` queued renders, generating any missing
//!    chunk of their 3x3 cluster first

use std::{
    collections::{HashSet, VecDeque},
    fmt,
    sync::Arc,
};

use cgmath::Point3;
use log::{debug, info, warn};
use web_time::{Duration, Instant};

use crate::{
    config::WorldConfig,
    error::{ConfigError, PersistError, PoolError, WorldError},
};

use streaming::{
    bounds::{unit_steps, BoundsLookup, RingDelta},
    mesh_buffer::MeshBuffer,
    partition::SlotState,
    PoolCounts, StreamingPool,
};
use task_management::TaskManager;
use voxels::{
    block::{BlockRegistry, VoxelId},
    chunk::ChunkCoord,
    terrain::{biome::BiomeTable, TerrainGenerator},
    world::WorldModel,
};

pub mod rendering;
pub mod streaming;
pub mod task_management;
pub mod voxels;

/// Snapshot of the streaming state, for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorldStats {
    /// Chunk the tiers are centred on
    pub observer: Option<ChunkCoord>,
    /// Chunks with voxel data
    pub materialized: usize,
    /// Chunks with player edits
    pub edited: usize,
    /// Chunks in the render tier
    pub visible: usize,
    /// Renders waiting for a slot
    pub queued_renders: usize,
    /// Chunks that left the render tier while their pipeline was running
    pub deferred_removals: usize,
    /// Pool slot counts
    pub pool: PoolCounts,
    /// Faces across all bound meshes
    pub faces: usize,
    /// Tasks waiting for a worker
    pub queued_tasks: usize,
    /// Workers still running
    pub live_workers: usize,
}

impl fmt::Display for WorldStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.observer {
            Some(coord) => write!(f, "observer {coord}")?,
            None => write!(f, "no observer")?,
        }
        write!(
            f,
            " | data: {} chunks, {} edited | render: {} visible, {} rendered, {} in flight, {} queued, {} leaving | {} meshes, {} faces | tasks: {} queued, {} workers",
            self.materialized,
            self.edited,
            self.visible,
            self.pool.rendered,
            self.pool.in_flight,
            self.queued_renders,
            self.deferred_removals,
            self.pool.meshes,
            self.faces,
            self.queued_tasks,
            self.live_workers
        )
    }
}

/// The streaming voxel world.
///
/// Call [`World::set_observer_position`] whenever the observer moves and
/// [`World::tick`] once per frame. Renderable meshes are read back through
/// [`World::meshes`].
pub struct World {
    config: WorldConfig,
    registry: Arc<BlockRegistry>,
    model: WorldModel,
    bounds: BoundsLookup,
    pool: StreamingPool,
    task_manager: TaskManager,
    /// Chunk the tiers are currently synced to
    observer: Option<ChunkCoord>,
    /// Chunk of the latest observer position
    target: Option<ChunkCoord>,
    /// Chunks in the render tier: queued, in flight or rendered
    visible: HashSet<ChunkCoord>,
    render_queue: VecDeque<ChunkCoord>,
    /// Chunks with a live entry in `render_queue`
    queued: HashSet<ChunkCoord>,
    deferred_removals: Vec<ChunkCoord>,
}

impl World {
    /// Creates a world with nothing loaded.
    ///
    /// # Arguments
    /// * `config` - World settings, validated here
    /// * `biomes` - Biome table shared with the generator
    /// * `registry` - Block properties shared with the compute pipeline
    ///
    /// # Returns
    /// The world, or the reason the configuration is unusable
    pub fn new(
        config: WorldConfig,
        biomes: Arc<BiomeTable>,
        registry: Arc<BlockRegistry>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        if biomes.is_empty() {
            return Err(ConfigError::NoBiomes);
        }

        let bounds = BoundsLookup::new(
            config.view_radius,
            config.data_lookahead,
            config.removal_hysteresis,
        )?;
        let generator = Arc::new(TerrainGenerator::new(config.seed, biomes));
        let model = WorldModel::new(generator, Arc::clone(&registry));
        let pool = StreamingPool::new(
            bounds.pool_capacity(),
            config.worker_count * 2 + config.max_renders_per_tick,
        );
        let task_manager = TaskManager::new(config.worker_count);

        info!(
            "World created: seed {}, view radius {}, {} pool slots",
            config.seed,
            config.view_radius,
            pool.capacity()
        );

        Ok(World {
            config,
            registry,
            model,
            bounds,
            pool,
            task_manager,
            observer: None,
            target: None,
            visible: HashSet::new(),
            render_queue: VecDeque::new(),
            queued: HashSet::new(),
            deferred_removals: Vec::new(),
        })
    }

    /// Creates a world with the built-in biomes and blocks.
    pub fn with_defaults(config: WorldConfig) -> Result<Self, ConfigError> {
        let biomes = Arc::new(BiomeTable::default_table()?);
        World::new(config, biomes, Arc::new(BlockRegistry::default()))
    }

    /// Moves the observer. Streaming catches up on the next tick.
    pub fn set_observer_position(&mut self, position: Point3<f32>) {
        self.target = Some(ChunkCoord::from_world_position(position));
    }

    /// Chunk the streaming tiers are centred on.
    pub fn observer(&self) -> Option<ChunkCoord> {
        self.observer
    }

    /// Advances the world by one frame. Never blocks on workers.
    pub fn tick(&mut self) {
        self.task_manager.process_completed_tasks();
        self.task_manager.process_queued_tasks();

        self.apply_movement();

        let completed = self.pool.sweep_completed();
        if completed > 0 {
            debug!("{} chunk meshes completed", completed);
        }

        self.process_deferred_removals();
        self.schedule_renders();
        self.task_manager.process_queued_tasks();
    }

    /// Brings both tiers in line with the latest observer chunk.
    fn apply_movement(&mut self) {
        let Some(target) = self.target else {
            return;
        };

        match self.observer {
            Some(current) if current == target => return,
            Some(current) => {
                let steps = unit_steps(current, target);
                if steps.len() as u32 > self.bounds.max_incremental_steps() {
                    debug!("Observer jumped from {} to {}, resyncing", current, target);
                    self.resync(target);
                } else {
                    for step in steps {
                        self.step_to(step);
                    }
                }
            }
            None => self.resync(target),
        }

        self.observer = Some(target);
    }

    /// Applies the ring deltas of a one-chunk move.
    fn step_to(&mut self, center: ChunkCoord) {
        let model = &self.model;
        let data = self
            .bounds
            .data()
            .step(center, |coord| model.is_materialized(coord));
        self.apply_data_delta(data);

        let visible = &self.visible;
        let render = self
            .bounds
            .render()
            .step(center, |coord| visible.contains(&coord));
        self.apply_render_delta(render);
    }

    /// Diffs both tiers against full sets around `center`.
    fn resync(&mut self, center: ChunkCoord) {
        let materialized: HashSet<ChunkCoord> = self.model.materialized_coords().collect();
        let data = self.bounds.data().resync(center, &materialized);
        self.apply_data_delta(data);

        let render = self.bounds.render().resync(center, &self.visible);
        self.apply_render_delta(render);
    }

    fn apply_data_delta(&mut self, delta: RingDelta) {
        if !delta.added.is_empty() {
            self.model.materialize(&delta.added);
        }
        if !delta.removed.is_empty() {
            self.model.evict(&delta.removed);
        }
    }

    fn apply_render_delta(&mut self, delta: RingDelta) {
        for coord in delta.added {
            self.visible.insert(coord);
            // A chunk still waiting to leave keeps its slot and mesh.
            if self.pool.state(coord).is_none() {
                self.enqueue_render(coord);
            }
        }

        for coord in delta.removed {
            self.visible.remove(&coord);
            self.queued.remove(&coord);
            match self.pool.state(coord) {
                Some(SlotState::Rendered) => {
                    if let Err(err) = self.pool.remove(coord) {
                        warn!("Could not remove chunk {}: {}", coord, err);
                    }
                }
                Some(_) => self.deferred_removals.push(coord),
                None => {}
            }
        }
    }

    fn enqueue_render(&mut self, coord: ChunkCoord) {
        if self.queued.insert(coord) {
            self.render_queue.push_back(coord);
        }
    }

    /// Removes chunks whose pipelines have finished since they left view.
    fn process_deferred_removals(&mut self) {
        let pending = std::mem::take(&mut self.deferred_removals);
        for coord in pending {
            if self.visible.contains(&coord) {
                continue;
            }
            match self.pool.state(coord) {
                Some(SlotState::Rendered) => {
                    if let Err(err) = self.pool.remove(coord) {
                        warn!("Could not remove chunk {}: {}", coord, err);
                    }
                }
                Some(_) => self.deferred_removals.push(coord),
                None => {}
            }
        }
    }

    /// Generates whatever the 3x3 cluster around `center` is missing, so the
    /// snapshot copies real neighbours.
    fn materialize_cluster(&mut self, center: ChunkCoord) {
        let missing: Vec<ChunkCoord> = (-1..=1)
            .flat_map(|dz| (-1..=1).map(move |dx| center.offset(dx, dz)))
            .filter(|coord| !self.model.is_materialized(*coord))
            .collect();
        if !missing.is_empty() {
            debug!("Materializing {} cluster chunks around {}", missing.len(), center);
            self.model.materialize(&missing);
        }
    }

    /// Starts queued renders, at most `max_renders_per_tick` of them.
    fn schedule_renders(&mut self) {
        let mut started = 0;
        let mut retry = Vec::new();

        while started < self.config.max_renders_per_tick {
            let Some(coord) = self.render_queue.pop_front() else {
                break;
            };
            if !self.queued.remove(&coord) || !self.visible.contains(&coord) {
                continue;
            }
            self.materialize_cluster(coord);

            match self.pool.acquire(coord) {
                Ok(()) => {}
                Err(PoolError::InFlight(_)) => {
                    retry.push(coord);
                    continue;
                }
                Err(err) => {
                    warn!("Render of {} postponed: {}", coord, err);
                    retry.push(coord);
                    break;
                }
            }

            match self.pool.schedule_render(
                coord,
                &self.model,
                &self.registry,
                self.config.smooth_lighting,
            ) {
                Ok(task) => {
                    self.task_manager.publish_task(task);
                    started += 1;
                }
                Err(err) => warn!("Render of {} not started: {}", coord, err),
            }
        }

        for coord in retry {
            self.enqueue_render(coord);
        }
    }

    /// Edits a voxel and re-renders every visible chunk whose mesh shows it.
    ///
    /// Returns the chunks the edit touches, the edited chunk first.
    pub fn edit_voxel(
        &mut self,
        position: Point3<i32>,
        id: VoxelId,
    ) -> Result<Vec<ChunkCoord>, WorldError> {
        let affected = self.model.edit_voxel(position, id)?;
        for &coord in &affected {
            if self.visible.contains(&coord) {
                self.enqueue_render(coord);
            }
        }
        Ok(affected)
    }

    /// Replaces the player edits with a save blob and re-renders the visible
    /// chunks around every chunk touched by the old or new edits.
    pub fn load_edits(&mut self, bytes: &[u8]) -> Result<(), PersistError> {
        let mut touched: HashSet<ChunkCoord> =
            self.model.edit_overlay().iter().map(|(coord, _)| *coord).collect();
        self.model.deserialize(bytes)?;
        touched.extend(self.model.edit_overlay().iter().map(|(coord, _)| *coord));

        for coord in touched {
            for dz in -1..=1 {
                for dx in -1..=1 {
                    let neighbour = coord.offset(dx, dz);
                    if self.visible.contains(&neighbour) {
                        self.enqueue_render(neighbour);
                    }
                }
            }
        }
        Ok(())
    }

    /// The bound meshes, one per rendered chunk.
    pub fn meshes(&self) -> &[MeshBuffer] {
        self.pool.meshes()
    }

    /// The voxel data and edits.
    pub fn world_model(&self) -> &WorldModel {
        &self.model
    }

    /// The block registry.
    pub fn registry(&self) -> Arc<BlockRegistry> {
        Arc::clone(&self.registry)
    }

    /// The configuration the world was built with.
    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    /// The precomputed bounds.
    pub fn bounds(&self) -> &BoundsLookup {
        &self.bounds
    }

    /// State of a chunk's pool slot, if it has one.
    pub fn chunk_state(&self, coord: ChunkCoord) -> Option<SlotState> {
        self.pool.state(coord)
    }

    /// Whether a chunk is part of the render tier.
    pub fn is_visible(&self, coord: ChunkCoord) -> bool {
        self.visible.contains(&coord)
    }

    /// Verifies the pool partitions.
    pub fn check_invariants(&self) -> Result<(), PoolError> {
        self.pool.check_invariants()
    }

    /// Current streaming counters.
    pub fn stats(&self) -> WorldStats {
        WorldStats {
            observer: self.observer,
            materialized: self.model.materialized_count(),
            edited: self.model.edited_chunk_count(),
            visible: self.visible.len(),
            queued_renders: self.queued.len(),
            deferred_removals: self.deferred_removals.len(),
            pool: self.pool.counts(),
            faces: self.pool.meshes().iter().map(MeshBuffer::face_count).sum(),
            queued_tasks: self.task_manager.queued_count(),
            live_workers: self.task_manager.live_worker_count(),
        }
    }

    /// Whether every requested chunk is rendered and no work is pending.
    pub fn is_idle(&self) -> bool {
        self.target == self.observer
            && self.queued.is_empty()
            && self.deferred_removals.is_empty()
            && self.pool.counts().in_flight == 0
            && self.task_manager.is_idle()
    }

    /// Ticks until the world is idle or `timeout` has passed.
    ///
    /// # Returns
    /// Whether the world became idle
    pub fn wait_until_idle(&mut self, timeout: Duration) -> bool {
        let start = Instant::now();
        loop {
            self.tick();
            if self.is_idle() {
                return true;
            }
            if start.elapsed() >= timeout {
                warn!("World still busy after {:?}: {}", timeout, self.stats());
                return false;
            }
            std::thread::sleep(Duration::from_millis(1));
        }
    }
}
