//! Shared queue of in-flight attachment tasks.

use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};

use futures_util::future::join_all;
use tokio::task::JoinHandle;

use crate::Attachment;

/// Append-only collection of spawned attachment tasks for one request.
///
/// The dispatcher appends; the request owner awaits everything with [`drain`] before
/// finalizing its response. Every task resolves to `None` on failure, so draining never
/// fails because of one artifact.
///
/// [`drain`]: PendingResults::drain
#[derive(Debug, Default)]
pub struct PendingResults {
    tasks: Mutex<Vec<JoinHandle<Option<Attachment>>>>,
}

impl PendingResults {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawns `task` on the current tokio runtime and records its handle.
    pub fn spawn<F>(&self, task: F)
    where
        F: Future<Output = Option<Attachment>> + Send + 'static,
    {
        let handle = tokio::spawn(task);
        self.tasks().push(handle);
    }

    pub fn len(&self) -> usize {
        self.tasks().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Awaits every queued task, including tasks appended while draining, and returns the
    /// attachments that were produced.
    pub async fn drain(&self) -> Vec<Attachment> {
        let mut attachments = Vec::new();
        loop {
            let batch = std::mem::take(&mut *self.tasks());
            if batch.is_empty() {
                return attachments;
            }

            for joined in join_all(batch).await {
                match joined {
                    Ok(Some(attachment)) => attachments.push(attachment),
                    Ok(None) => {}
                    Err(error) => {
                        tracing::error!(
                            phase = "dispatch",
                            event = "task_join_failure",
                            error = %error
                        );
                    }
                }
            }
        }
    }

    fn tasks(&self) -> MutexGuard<'_, Vec<JoinHandle<Option<Attachment>>>> {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
