//! # Task Management System
//!
//! This module provides the worker pool that runs the light and mesh stages of
//! the streaming pipeline off the main thread.
//!
//! ## Architecture Overview
//!
//! - `TaskManager`: Central coordinator for task distribution and worker management
//! - `Task`: A unit of work that can be executed asynchronously
//! - `TaskResult`: The result of a completed task, which can spawn additional tasks
//! - `TaskChannel`: Communication channel between the main thread and one worker thread
//! - `TaskHandle`: One-shot, non-blocking delivery of a task chain's final output
//!
//! Each worker owns a dedicated pair of `std::sync::mpsc` channels. Tasks are
//! handed out round-robin, at most `MAX_TASKS_IN_FLIGHT` per worker; everything
//! else waits in a FIFO queue.
//!
//! ## Task Lifecycle
//! 1. Tasks are created and published via `TaskManager::publish_task()`
//! 2. The manager distributes tasks to available worker channels using round-robin
//! 3. Workers process tasks and send their results back
//! 4. Results are handled on the main thread in `process_completed_tasks()`
//! 5. Results can spawn new tasks (the next pipeline stage)
//! 6. The cycle continues until all work is complete
//!
//! ## Example Usage
//! ```ignore
//! let mut task_manager = TaskManager::new(num_workers);
//!
//! // Publish a task for background processing
//! task_manager.publish_task(Box::new(MyTask::new(...)));
//!
//! // Once per tick:
//! task_manager.process_completed_tasks();
//! task_manager.process_queued_tasks();
//! ```

pub mod handle;
pub mod task;

use log::{error, info};
use std::collections::VecDeque;
use std::sync::mpsc::{channel, Receiver, Sender, TryRecvError};
use std::thread::{self, JoinHandle};
use task::{Task, TaskResult};

/// A communication channel between the main thread and a worker thread.
///
/// # Fields
/// - `task_sender`: Sends tasks from main thread to worker
/// - `result_receiver`: Receives task results from worker
/// - `num_tasks_in_flight`: Tracks number of tasks currently being processed
/// - `disconnected`: Set once the worker is gone (a task panicked)
/// - `_worker`: Handle to the worker thread (kept alive by this struct)
#[derive(Debug)]
pub struct TaskChannel {
    task_sender: Sender<Box<dyn Task + Send>>,
    result_receiver: Receiver<Box<dyn TaskResult + Send>>,
    num_tasks_in_flight: usize,
    disconnected: bool,
    _worker: JoinHandle<()>,
}

impl TaskChannel {
    fn accepts_tasks(&self) -> bool {
        !self.disconnected && self.num_tasks_in_flight < MAX_TASKS_IN_FLIGHT
    }
}

/// Manages a pool of worker threads and coordinates task execution.
///
/// # Fields
/// - `channels`: Set of worker channels
/// - `queued_tasks`: Tasks waiting for an available worker
/// - `current_channel`: Index for round-robin scheduling
///
/// Worker threads exit once the manager is dropped and their task queue closes.
pub struct TaskManager {
    channels: Vec<TaskChannel>,
    queued_tasks: VecDeque<Box<dyn Task + Send>>,
    current_channel: usize,
}

/// Maximum number of tasks that can be in flight per worker channel.
///
/// With 1, a busy worker never has a backlog, so a freshly published task always
/// goes to an idle worker if there is one.
pub const MAX_TASKS_IN_FLIGHT: usize = 1;

impl TaskManager {
    /// Creates a new `TaskManager` with the specified number of worker threads.
    ///
    /// # Arguments
    /// * `num_workers` - Number of worker threads to create
    ///
    /// # Panics
    /// Panics if the underlying thread creation fails.
    pub fn new(num_workers: usize) -> Self {
        let mut channels = Vec::with_capacity(num_workers);

        info!(
            "Starting {} task workers (available parallelism: {:?})",
            num_workers,
            thread::available_parallelism()
        );

        for worker_idx in 0..num_workers {
            let (task_tx, task_rx) = channel::<Box<dyn Task + Send>>();
            let (result_tx, result_rx) = channel::<Box<dyn TaskResult + Send>>();

            let task_closure = move || {
                while let Ok(task) = task_rx.recv() {
                    let result = task.process();
                    if result_tx.send(result).is_err() {
                        break;
                    }
                }
            };

            let worker = thread::Builder::new()
                .name(format!("task-worker-{worker_idx}"))
                .spawn(task_closure)
                .unwrap_or_else(|err| panic!("failed to spawn task worker {worker_idx}: {err}"));

            channels.push(TaskChannel {
                task_sender: task_tx,
                result_receiver: result_rx,
                num_tasks_in_flight: 0,
                disconnected: false,
                _worker: worker,
            });
        }

        TaskManager {
            channels,
            queued_tasks: VecDeque::new(),
            current_channel: 0,
        }
    }

    /// Attempts to send a task to a specific worker channel.
    ///
    /// # Returns
    /// - `Ok(())` if the task was successfully sent to the worker
    /// - `Err(task)` if the worker is gone, handing the task back for requeueing
    fn try_send_task(
        &mut self,
        task: Box<dyn Task + Send>,
        channel_idx: usize,
    ) -> Result<(), Box<dyn Task + Send>> {
        let channel = &mut self.channels[channel_idx];
        match channel.task_sender.send(task) {
            Ok(_) => {
                channel.num_tasks_in_flight += 1;
                Ok(())
            }
            Err(task) => {
                error!("Task worker {channel_idx} is disconnected");
                channel.disconnected = true;
                Err(task.0)
            }
        }
    }

    /// Finds an available worker channel, round-robin from the last used one.
    ///
    /// # Returns
    /// - `Some(usize)` index of a channel that can accept a new task
    /// - `None` if all channels are busy or there are no channels available
    fn find_available_channel(&self) -> Option<usize> {
        let count = self.channels.len();
        (0..count)
            .map(|step| (self.current_channel + step) % count)
            .find(|&idx| self.channels[idx].accepts_tasks())
    }

    /// Publishes a new task for execution.
    ///
    /// The task runs as soon as a worker becomes available, or is queued if all
    /// workers are busy.
    ///
    /// # Returns
    /// - `true` if the task was immediately scheduled on an available worker
    /// - `false` if the task was queued
    pub fn publish_task(&mut self, task: Box<dyn Task + Send>) -> bool {
        if !self.queued_tasks.is_empty() {
            self.queued_tasks.push_back(task);
            return false;
        }

        match self.find_available_channel() {
            Some(channel_idx) => match self.try_send_task(task, channel_idx) {
                Ok(_) => {
                    self.current_channel = (channel_idx + 1) % self.channels.len();
                    true
                }
                Err(task) => {
                    self.queued_tasks.push_back(task);
                    false
                }
            },
            None => {
                self.queued_tasks.push_back(task);
                false
            }
        }
    }

    /// Hands queued tasks to workers until the queue is empty or all workers are busy.
    ///
    /// Tasks leave the queue in FIFO order. Call once per tick.
    pub fn process_queued_tasks(&mut self) {
        while !self.queued_tasks.is_empty() {
            let Some(channel_idx) = self.find_available_channel() else {
                break;
            };
            let Some(task) = self.queued_tasks.pop_front() else {
                break;
            };
            match self.try_send_task(task, channel_idx) {
                Ok(_) => self.current_channel = (channel_idx + 1) % self.channels.len(),
                Err(task) => self.queued_tasks.push_front(task),
            }
        }
    }

    /// Handles every result the workers have sent back and publishes the
    /// follow-up tasks they return.
    ///
    /// Must be called from the thread that owns the manager. Never blocks.
    pub fn process_completed_tasks(&mut self) {
        let mut tasks_to_queue = Vec::new();
        for (channel_idx, channel) in self.channels.iter_mut().enumerate() {
            loop {
                match channel.result_receiver.try_recv() {
                    Ok(result) => {
                        channel.num_tasks_in_flight -= 1;
                        tasks_to_queue.extend(result.handle_result());
                    }
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => {
                        if !channel.disconnected {
                            error!(
                                "Task worker {channel_idx} stopped with {} task(s) in flight",
                                channel.num_tasks_in_flight
                            );
                            channel.disconnected = true;
                        }
                        break;
                    }
                }
            }
        }

        for task in tasks_to_queue {
            self.publish_task(task);
        }
    }

    /// Number of tasks waiting for a worker.
    pub fn queued_count(&self) -> usize {
        self.queued_tasks.len()
    }

    /// Number of tasks currently running on live workers.
    pub fn in_flight_count(&self) -> usize {
        self.channels
            .iter()
            .filter(|channel| !channel.disconnected)
            .map(|channel| channel.num_tasks_in_flight)
            .sum()
    }

    /// Whether no task is queued or running.
    pub fn is_idle(&self) -> bool {
        self.queued_tasks.is_empty() && self.in_flight_count() == 0
    }

    /// Number of workers still accepting work.
    pub fn live_worker_count(&self) -> usize {
        self.channels.iter().filter(|c| !c.disconnected).count()
    }
}
