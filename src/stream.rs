//! Execution streams: ordered queues of device work.
//!
//! The default stream runs every job inline, so a call returns once its work
//! is done. A created stream owns a worker thread that drains its queue in
//! FIFO order; calls return right after enqueueing and completion is observed
//! through [`Stream::synchronize`] or [`Stream::query`].

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{unbounded, Receiver, Sender};
use log::{debug, error};

use crate::error::{Result, SortError};

pub(crate) type Job = Box<dyn FnOnce() -> Result<()> + Send + 'static>;

enum Command {
    Run(Job),
    Fence(Sender<()>),
}

#[derive(Default)]
struct QueueState {
    pending: AtomicUsize,
    failures: Mutex<Vec<SortError>>,
}

struct Queue {
    sender: Option<Sender<Command>>,
    worker: Option<JoinHandle<()>>,
    state: Arc<QueueState>,
}

#[derive(Default)]
pub struct Stream {
    queue: Option<Queue>,
}

impl Stream {
    /// A stream with its own ordered queue, asynchronous to the host.
    pub fn new() -> Result<Stream> {
        let (sender, receiver) = unbounded();
        let state = Arc::new(QueueState::default());
        let worker_state = Arc::clone(&state);
        let worker = thread::Builder::new()
            .name("devicesort-stream".to_string())
            .spawn(move || drain(receiver, worker_state))
            .map_err(|e| SortError::DeviceUnavailable(e.to_string()))?;
        Ok(Stream {
            queue: Some(Queue {
                sender: Some(sender),
                worker: Some(worker),
                state,
            }),
        })
    }

    pub fn is_default(&self) -> bool {
        self.queue.is_none()
    }

    /// Runs `job` inline on the default stream, otherwise queues it.
    pub(crate) fn enqueue(&self, job: Job) -> Result<()> {
        let queue = match &self.queue {
            None => return job(),
            Some(queue) => queue,
        };
        let sender = queue.sender.as_ref().ok_or(SortError::StreamClosed)?;
        queue.state.pending.fetch_add(1, Ordering::SeqCst);
        if sender.send(Command::Run(job)).is_err() {
            queue.state.pending.fetch_sub(1, Ordering::SeqCst);
            return Err(SortError::StreamClosed);
        }
        Ok(())
    }

    /// Blocks until every job queued so far has finished. Returns the first
    /// failure among them; later failures are logged and dropped.
    pub fn synchronize(&self) -> Result<()> {
        let queue = match &self.queue {
            None => return Ok(()),
            Some(queue) => queue,
        };
        let sender = queue.sender.as_ref().ok_or(SortError::StreamClosed)?;
        let (ack, done) = crossbeam_channel::bounded(1);
        sender.send(Command::Fence(ack)).map_err(|_| SortError::StreamClosed)?;
        done.recv().map_err(|_| SortError::StreamClosed)?;

        let mut failures = queue
            .state
            .failures
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut drained = failures.drain(..);
        match drained.next() {
            None => Ok(()),
            Some(first) => {
                for other in drained {
                    error!("Dropping additional stream failure: {other}");
                }
                Err(first)
            }
        }
    }

    /// True when no queued job is outstanding.
    pub fn query(&self) -> bool {
        match &self.queue {
            None => true,
            Some(queue) => queue.state.pending.load(Ordering::SeqCst) == 0,
        }
    }
}

impl Drop for Stream {
    fn drop(&mut self) {
        if let Some(queue) = &mut self.queue {
            // closing the channel lets the worker finish the backlog and exit
            queue.sender.take();
            if let Some(worker) = queue.worker.take() {
                if worker.join().is_err() {
                    error!("Stream worker panicked outside a job");
                }
            }
        }
    }
}

impl fmt::Debug for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.queue {
            None => f.write_str("Stream(default)"),
            Some(queue) => f
                .debug_struct("Stream")
                .field("pending", &queue.state.pending.load(Ordering::SeqCst))
                .finish(),
        }
    }
}

fn drain(receiver: Receiver<Command>, state: Arc<QueueState>) {
    for command in receiver {
        match command {
            Command::Run(job) => {
                let outcome = panic::catch_unwind(AssertUnwindSafe(job))
                    .unwrap_or_else(|payload| Err(SortError::Kernel(panic_message(payload))));
                if let Err(e) = outcome {
                    debug!("Stream job failed: {e}");
                    state
                        .failures
                        .lock()
                        .unwrap_or_else(|poisoned| poisoned.into_inner())
                        .push(e);
                }
                state.pending.fetch_sub(1, Ordering::SeqCst);
            }
            Command::Fence(ack) => {
                let _ = ack.send(());
            }
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;

    #[test]
    fn default_stream_runs_inline() {
        let stream = Stream::default();
        assert!(stream.is_default());
        let ran = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&ran);
        stream
            .enqueue(Box::new(move || {
                flag.store(true, Ordering::SeqCst);
                Ok(())
            }))
            .unwrap();
        assert!(ran.load(Ordering::SeqCst));
        assert!(stream.query());
    }

    #[test]
    fn default_stream_returns_job_error() {
        let stream = Stream::default();
        let result = stream.enqueue(Box::new(|| Err(SortError::AliasedBuffers)));
        assert_eq!(result, Err(SortError::AliasedBuffers));
    }

    #[test]
    fn queued_jobs_run_in_order() {
        let stream = Stream::new().unwrap();
        let log = Arc::new(Mutex::new(Vec::new()));
        for i in 0..16 {
            let log = Arc::clone(&log);
            stream
                .enqueue(Box::new(move || {
                    log.lock().unwrap().push(i);
                    Ok(())
                }))
                .unwrap();
        }
        stream.synchronize().unwrap();
        assert!(stream.query());
        assert_eq!(*log.lock().unwrap(), (0..16).collect::<Vec<_>>());
    }

    #[test]
    fn synchronize_reports_first_failure() {
        let stream = Stream::new().unwrap();
        stream.enqueue(Box::new(|| Ok(()))).unwrap();
        stream.enqueue(Box::new(|| Err(SortError::StreamClosed))).unwrap();
        stream.enqueue(Box::new(|| panic!("kernel fault"))).unwrap();
        assert_eq!(stream.synchronize(), Err(SortError::StreamClosed));
        // failures are consumed by the synchronize that reported them
        assert_eq!(stream.synchronize(), Ok(()));
    }

    #[test]
    fn panicking_job_becomes_kernel_error() {
        let stream = Stream::new().unwrap();
        stream.enqueue(Box::new(|| panic!("boom"))).unwrap();
        assert_eq!(stream.synchronize(), Err(SortError::Kernel("boom".to_string())));
    }
}
