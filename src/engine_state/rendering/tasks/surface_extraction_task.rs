//! Second stage of the compute pipeline: extracting the centre chunk's surface.

use std::sync::Arc;

use crate::engine_state::{
    rendering::meshing::{
        surface::{extract_surface, LitCluster},
        ComputeWork,
    },
    task_management::{
        handle::TaskCompletion,
        task::{Task, TaskResult},
    },
    voxels::block::BlockRegistry,
};

/// Builds the mesh of a lit cluster's centre chunk on a worker thread.
pub struct SurfaceExtractionTask {
    work: ComputeWork,
    registry: Arc<BlockRegistry>,
    smooth_lighting: bool,
    completion: TaskCompletion<ComputeWork>,
}

impl SurfaceExtractionTask {
    /// Creates the surface stage for a cluster whose light buffer is filled.
    pub fn new(
        work: ComputeWork,
        registry: Arc<BlockRegistry>,
        smooth_lighting: bool,
        completion: TaskCompletion<ComputeWork>,
    ) -> Self {
        SurfaceExtractionTask {
            work,
            registry,
            smooth_lighting,
            completion,
        }
    }
}

impl Task for SurfaceExtractionTask {
    fn process(self: Box<Self>) -> Box<dyn TaskResult + Send> {
        let SurfaceExtractionTask {
            mut work,
            registry,
            smooth_lighting,
            completion,
        } = *self;

        let ComputeWork {
            cluster,
            light,
            mesh,
            ..
        } = &mut work;
        let lit = LitCluster {
            voxels: cluster,
            light,
            registry: &registry,
        };
        let faces = extract_surface(&lit, smooth_lighting, mesh);

        Box::new(SurfaceExtractionTaskResult {
            work,
            completion,
            faces,
        })
    }
}

/// A finished mesh on its way back to the streaming pool.
pub struct SurfaceExtractionTaskResult {
    work: ComputeWork,
    completion: TaskCompletion<ComputeWork>,
    faces: usize,
}

impl TaskResult for SurfaceExtractionTaskResult {
    /// Delivers the work. The chain ends here.
    fn handle_result(self: Box<Self>) -> Vec<Box<dyn Task + Send>> {
        log::trace!("Meshed chunk {} ({} faces)", self.work.coord, self.faces);
        self.completion.complete(self.work);
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_state::{
        rendering::tasks::light_propagation_task::LightPropagationTask,
        task_management::handle::task_handle,
        voxels::{
            block::block_type::BlockType,
            chunk::{cluster_index, ChunkCoord, CHUNK_SIZE},
        },
    };

    #[test]
    fn light_stage_chains_into_surface_stage() {
        let registry = Arc::new(BlockRegistry::default());
        let mut work = ComputeWork::new(ChunkCoord::new(2, -1));
        work.cluster[cluster_index(CHUNK_SIZE, 20, CHUNK_SIZE)] = BlockType::STONE.id();
        let (completion, handle) = task_handle();

        let light: Box<dyn Task + Send> =
            Box::new(LightPropagationTask::new(work, registry, false, completion));
        let mut next = light.process().handle_result();
        assert_eq!(next.len(), 1);
        assert_eq!(handle.try_take(), Ok(None));

        let surface = next.remove(0);
        assert!(surface.process().handle_result().is_empty());

        let work = handle.try_take().unwrap().unwrap();
        assert_eq!(work.coord, ChunkCoord::new(2, -1));
        assert_eq!(work.mesh.face_count(), 6);
        assert_eq!(work.light[cluster_index(CHUNK_SIZE, 21, CHUNK_SIZE)], 1.0);
    }
}
