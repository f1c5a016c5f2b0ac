//! Background execution of deferred callbacks.
//!
//! Deferred dispatch is message passing, not fire-and-forget spawning: jobs go
//! through a bounded channel to one long-lived worker thread. A full queue
//! blocks the sender, which is the back-pressure the dispatching write sees.

use std::sync::mpsc::{self, SyncSender};
use std::sync::Mutex;
use std::thread::{self, JoinHandle};

use super::{run_callback, EventCallback, SubscriptionId, TripleEvent};

pub(crate) struct DeferredJob {
    pub subscription: SubscriptionId,
    pub callback: EventCallback,
    pub event: TripleEvent,
}

pub(crate) struct DeferredWorker {
    sender: Mutex<Option<SyncSender<DeferredJob>>>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl DeferredWorker {
    pub fn start(queue_capacity: usize) -> Self {
        let (sender, receiver) = mpsc::sync_channel::<DeferredJob>(queue_capacity);
        let handle = thread::spawn(move || {
            // Exits once every sender is gone and the queue is drained.
            while let Ok(job) = receiver.recv() {
                run_callback(job.subscription, &job.callback, &job.event);
            }
        });
        Self {
            sender: Mutex::new(Some(sender)),
            handle: Mutex::new(Some(handle)),
        }
    }

    /// Queues a job, blocking while the queue is full. Returns `false` when
    /// the worker has been shut down.
    pub fn submit(&self, job: DeferredJob) -> bool {
        let sender = self.sender.lock().unwrap();
        match sender.as_ref() {
            Some(tx) => tx.send(job).is_ok(),
            None => false,
        }
    }

    /// Drops the sender so the worker drains whatever is queued and exits,
    /// then joins it. Idempotent.
    pub fn shutdown(&self) {
        let sender = self.sender.lock().unwrap().take();
        drop(sender);
        if let Some(handle) = self.handle.lock().unwrap().take() {
            let _ = handle.join();
        }
    }
}
