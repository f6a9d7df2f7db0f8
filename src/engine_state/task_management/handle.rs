//! # Task Handles
//!
//! A one-shot completion channel between the last stage of a task chain and
//! whoever is waiting for its output. The waiting side polls without blocking.

use std::sync::mpsc::{channel, Receiver, Sender, TryRecvError};

use crate::error::TaskError;

/// Creates a connected completion/handle pair.
pub fn task_handle<T>() -> (TaskCompletion<T>, TaskHandle<T>) {
    let (sender, receiver) = channel();
    (TaskCompletion { sender }, TaskHandle { receiver })
}

/// The producing side. Consumed when the value is delivered.
#[derive(Debug)]
pub struct TaskCompletion<T> {
    sender: Sender<T>,
}

impl<T> TaskCompletion<T> {
    /// Delivers the value. A handle that was dropped in the meantime is ignored.
    pub fn complete(self, value: T) {
        let _ = self.sender.send(value);
    }
}

/// The polling side.
#[derive(Debug)]
pub struct TaskHandle<T> {
    receiver: Receiver<T>,
}

impl<T> TaskHandle<T> {
    /// Takes the value if it has been delivered.
    ///
    /// Returns `Ok(None)` while the task is still running and
    /// [`TaskError::Lost`] if the completion was dropped without a value.
    pub fn try_take(&self) -> Result<Option<T>, TaskError> {
        match self.receiver.try_recv() {
            Ok(value) => Ok(Some(value)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(TaskError::Lost),
        }
    }
}
