//! # Task System Core Traits
//!
//! This module defines the fundamental building blocks of the task system,
//! which provides a framework for executing work asynchronously across multiple threads.
//!
//! ## Core Components
//! - `Task`: Represents a unit of work that can be executed asynchronously
//! - `TaskResult`: Represents the result of a completed task
//!
//! ## Task Lifecycle
//! 1. A `Task` is created and scheduled via `TaskManager::publish_task()`
//! 2. The task's `process()` method is called on a worker thread
//! 3. The task returns a boxed `TaskResult`
//! 4. The result's `handle_result()` is called on the main thread
//! 5. The result can publish follow-up tasks, which is how pipeline stages chain
//!
//! ## Ownership
//! Tasks are consumed by `process()`. Buffers handed to a task travel with it
//! to the worker and back through its result, so no two threads ever hold the
//! same buffer.

/// A unit of work that runs on a worker thread.
///
/// Tasks must own everything they touch. They should be coarse enough to
/// amortize the channel round trip.
pub trait Task: Send {
    /// Performs the work and returns a result for the main thread.
    ///
    /// # Implementation Notes
    /// - Runs on a background thread; must not touch thread-local state
    /// - Should handle errors internally and encode them in its result
    fn process(self: Box<Self>) -> Box<dyn TaskResult + Send>;
}

/// The result of processing a `Task`, handled on the main thread.
pub trait TaskResult: Send {
    /// Handles the result and returns follow-up tasks to publish (possibly none).
    ///
    /// Called from `TaskManager::process_completed_tasks()`; keep it cheap.
    fn handle_result(self: Box<Self>) -> Vec<Box<dyn Task + Send>>;
}
