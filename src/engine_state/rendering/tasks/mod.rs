//! Background tasks for the compute pipeline.
//!
//! A render of one chunk is a two-task chain on the worker pool:
//! - `LightPropagationTask`: lights the cluster snapshot
//! - `SurfaceExtractionTask`: extracts the centre chunk's faces
//!
//! The light result publishes the surface task from the main thread; the
//! surface result hands the buffers back through a [`TaskCompletion`](crate::engine_state::task_management::handle::TaskCompletion).

pub mod light_propagation_task;
pub mod surface_extraction_task;
