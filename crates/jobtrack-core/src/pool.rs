// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Bounded worker pool for job execution.
//!
//! Submissions land in a bounded queue; a dispatcher task pulls them off and
//! spawns each one gated on a semaphore permit, so at most `workers` jobs run
//! concurrently. `try_submit` is fire-and-forget and never blocks: it fails
//! fast when the queue is full or the pool is shutting down, which is the
//! signal the engine uses to roll back an enqueue.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{Semaphore, mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info};

type Job = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// Why a submission was refused.
#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    /// The submission queue is full.
    #[error("worker pool saturated")]
    Saturated,

    /// The pool is shutting down and no longer accepts work.
    #[error("worker pool shutting down")]
    ShuttingDown,
}

/// Fixed-size worker pool with a bounded submission queue.
pub struct WorkerPool {
    queue_tx: mpsc::Sender<Job>,
    shutdown_tx: watch::Sender<bool>,
    dispatcher: Mutex<Option<JoinHandle<()>>>,
}

impl WorkerPool {
    /// Start a pool with `workers` concurrent slots and a submission queue
    /// of `queue_depth` entries.
    ///
    /// Must be called within a Tokio runtime: the dispatcher task is spawned
    /// immediately.
    pub fn start(workers: usize, queue_depth: usize) -> Self {
        let (queue_tx, queue_rx) = mpsc::channel(queue_depth);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let semaphore = Arc::new(Semaphore::new(workers));

        let handle = tokio::spawn(run_dispatcher(
            queue_rx,
            semaphore,
            shutdown_rx,
            workers as u32,
        ));

        info!(workers, queue_depth, "worker pool started");

        Self {
            queue_tx,
            shutdown_tx,
            dispatcher: Mutex::new(Some(handle)),
        }
    }

    /// Submit a job for asynchronous execution (fire-and-forget).
    pub fn try_submit<F>(&self, job: F) -> Result<(), SubmitError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.queue_tx
            .try_send(Box::pin(job))
            .map_err(|e| match e {
                TrySendError::Full(_) => SubmitError::Saturated,
                TrySendError::Closed(_) => SubmitError::ShuttingDown,
            })
    }

    /// Shut the pool down: stop accepting submissions, drop queued jobs that
    /// have not started, and wait for in-flight jobs to finish.
    ///
    /// A submission the dispatcher has already pulled from the queue is
    /// executed before shutdown completes.
    pub async fn shutdown(&self) -> Result<(), tokio::task::JoinError> {
        let _ = self.shutdown_tx.send(true);

        let handle = self
            .dispatcher
            .lock()
            .expect("dispatcher handle mutex poisoned")
            .take();

        if let Some(handle) = handle {
            handle.await?;
        }
        Ok(())
    }
}

async fn run_dispatcher(
    mut queue_rx: mpsc::Receiver<Job>,
    semaphore: Arc<Semaphore>,
    mut shutdown_rx: watch::Receiver<bool>,
    workers: u32,
) {
    loop {
        tokio::select! {
            biased;

            _ = shutdown_rx.changed() => {
                if *shutdown_rx.borrow() {
                    info!("worker pool received shutdown signal");
                    break;
                }
            }

            job = queue_rx.recv() => {
                match job {
                    Some(job) => {
                        let permit = match semaphore.clone().acquire_owned().await {
                            Ok(permit) => permit,
                            Err(_) => break,
                        };
                        tokio::spawn(async move {
                            job.await;
                            drop(permit);
                        });
                    }
                    None => break,
                }
            }
        }
    }

    // Close the queue before draining so late submissions are rejected
    // instead of landing in a channel nobody reads.
    drop(queue_rx);

    let _ = semaphore.acquire_many(workers).await;
    debug!("worker pool drained");
}
