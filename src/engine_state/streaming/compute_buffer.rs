//! Per-chunk compute slot of the streaming pool.

use crate::{
    engine_state::{
        rendering::meshing::ComputeWork, task_management::handle::TaskHandle,
        voxels::chunk::ChunkCoord,
    },
    error::TaskError,
};

/// The compute side of one pool slot.
///
/// While passive the slot holds the [`ComputeWork`] its next pipeline will
/// fill. While in flight the work belongs to the running task and the slot
/// only keeps the handle it comes back through.
#[derive(Debug, Default)]
pub struct ComputeBuffer {
    work: Option<ComputeWork>,
    pending: Option<TaskHandle<ComputeWork>>,
}

impl ComputeBuffer {
    /// Makes sure the slot holds work buffers for `coord`.
    ///
    /// `spare` is only called when the slot has none yet.
    pub fn prepare(&mut self, coord: ChunkCoord, spare: impl FnOnce() -> ComputeWork) {
        let work = self.work.get_or_insert_with(spare);
        work.reset(coord);
    }

    /// Lends the work to a pipeline and remembers where it comes back.
    ///
    /// Returns `None` if the slot was never prepared.
    pub fn launch(&mut self, pending: TaskHandle<ComputeWork>) -> Option<ComputeWork> {
        self.pending = Some(pending);
        self.work.take()
    }

    /// Whether a pipeline holds the work.
    pub fn is_in_flight(&self) -> bool {
        self.pending.is_some()
    }

    /// Polls the running pipeline without blocking.
    ///
    /// `None` means still running or nothing to wait for. A delivered or lost
    /// result ends the wait.
    pub fn poll(&mut self) -> Option<Result<ComputeWork, TaskError>> {
        let pending = self.pending.as_ref()?;
        let outcome = match pending.try_take() {
            Ok(None) => return None,
            Ok(Some(work)) => Ok(work),
            Err(err) => Err(err),
        };
        self.pending = None;
        Some(outcome)
    }

    /// Takes the idle work buffers out of the slot.
    pub fn take_work(&mut self) -> Option<ComputeWork> {
        self.work.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_state::task_management::handle::task_handle;

    #[test]
    fn work_travels_out_and_back() {
        let coord = ChunkCoord::new(1, 1);
        let mut buffer = ComputeBuffer::default();
        assert!(!buffer.is_in_flight());

        buffer.prepare(coord, || ComputeWork::new(ChunkCoord::default()));
        let (completion, handle) = task_handle();
        let work = buffer.launch(handle).unwrap();
        assert_eq!(work.coord, coord);
        assert!(buffer.is_in_flight());
        assert!(buffer.poll().is_none());

        completion.complete(work);
        let work = buffer.poll().unwrap().unwrap();
        assert_eq!(work.coord, coord);
        assert!(!buffer.is_in_flight());
        assert!(buffer.poll().is_none());
    }

    #[test]
    fn lost_pipelines_end_the_wait() {
        let mut buffer = ComputeBuffer::default();
        buffer.prepare(ChunkCoord::new(0, 0), || ComputeWork::new(ChunkCoord::default()));
        let (completion, handle) = task_handle();
        buffer.launch(handle).unwrap();
        drop(completion);

        assert_eq!(buffer.poll(), Some(Err(TaskError::Lost)));
        assert!(!buffer.is_in_flight());
    }
}
