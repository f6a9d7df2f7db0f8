//! First stage of the compute pipeline: lighting a cluster snapshot.

use std::sync::Arc;

use crate::engine_state::{
    rendering::meshing::{light::propagate_light, ComputeWork},
    task_management::{
        handle::TaskCompletion,
        task::{Task, TaskResult},
    },
    voxels::block::BlockRegistry,
};

use super::surface_extraction_task::SurfaceExtractionTask;

/// Computes the light buffer of a cluster on a worker thread.
///
/// The task owns the [`ComputeWork`] while it runs and passes it on to the
/// surface stage.
pub struct LightPropagationTask {
    /// Cluster snapshot, light buffer and output mesh
    work: ComputeWork,
    /// Transparency and light pass-through of every voxel id
    registry: Arc<BlockRegistry>,
    /// Forwarded to the surface stage
    smooth_lighting: bool,
    /// Receives the work once the whole chain is done
    completion: TaskCompletion<ComputeWork>,
}

impl LightPropagationTask {
    /// Creates the first stage of a render.
    ///
    /// # Arguments
    /// * `work` - Buffers with the cluster snapshot already copied in
    /// * `registry` - Shared block properties
    /// * `smooth_lighting` - Whether the surface stage averages corner light
    /// * `completion` - Where the finished work is delivered
    pub fn new(
        work: ComputeWork,
        registry: Arc<BlockRegistry>,
        smooth_lighting: bool,
        completion: TaskCompletion<ComputeWork>,
    ) -> Self {
        LightPropagationTask {
            work,
            registry,
            smooth_lighting,
            completion,
        }
    }
}

impl Task for LightPropagationTask {
    fn process(self: Box<Self>) -> Box<dyn TaskResult + Send> {
        let LightPropagationTask {
            mut work,
            registry,
            smooth_lighting,
            completion,
        } = *self;

        let ComputeWork { cluster, light, .. } = &mut work;
        let flooded = propagate_light(cluster, light, &registry);

        Box::new(LightPropagationTaskResult {
            work,
            registry,
            smooth_lighting,
            completion,
            flooded,
        })
    }
}

/// A lit cluster waiting for surface extraction.
pub struct LightPropagationTaskResult {
    work: ComputeWork,
    registry: Arc<BlockRegistry>,
    smooth_lighting: bool,
    completion: TaskCompletion<ComputeWork>,
    /// Voxels visited by the flood fill
    flooded: usize,
}

impl TaskResult for LightPropagationTaskResult {
    /// Chains the surface stage.
    fn handle_result(self: Box<Self>) -> Vec<Box<dyn Task + Send>> {
        log::trace!(
            "Lit cluster around {} ({} flood steps)",
            self.work.coord,
            self.flooded
        );

        vec![Box::new(SurfaceExtractionTask::new(
            self.work,
            self.registry,
            self.smooth_lighting,
            self.completion,
        ))]
    }
}
