//! Worker thread for deferred (non-RT) engine work.

use std::thread::{self, JoinHandle};

use crossbeam_channel::{unbounded, Sender};

enum Job {
    Run(Box<dyn FnOnce() + Send>),
    Shutdown,
}

/// A single worker thread draining queued jobs in order.
///
/// Scripted callbacks run here, off the RT thread; dropping the worker
/// blocks until outstanding jobs have completed, which is what lets the
/// engine quiesce async work before its state goes away.
pub struct AsyncWorker {
    tx: Sender<Job>,
    handle: Option<JoinHandle<()>>,
}

impl AsyncWorker {
    pub fn spawn() -> Self {
        let (tx, rx) = unbounded();
        let handle = thread::Builder::new()
            .name("segue-worker".to_string())
            .spawn(move || {
                while let Ok(job) = rx.recv() {
                    match job {
                        Job::Run(f) => f(),
                        Job::Shutdown => break,
                    }
                }
            })
            .expect("failed to spawn worker thread");
        Self {
            tx,
            handle: Some(handle),
        }
    }

    /// Queue a job. Returns `false` if the worker has already shut down.
    pub fn request(&self, job: impl FnOnce() + Send + 'static) -> bool {
        self.tx.send(Job::Run(Box::new(job))).is_ok()
    }
}

impl Drop for AsyncWorker {
    fn drop(&mut self) {
        let _ = self.tx.send(Job::Shutdown);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
