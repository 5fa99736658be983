//! Synchronous hand-off of work to the main thread.
//!
//! Accessibility queries are only safe on the main thread, but the key tap
//! runs on its own thread. [`MainThreadHandle::run_sync`] ships a closure
//! to the main loop and blocks for the answer, up to a timeout. A main loop
//! that is itself stuck therefore costs at most one timeout per keystroke.

use crossbeam_channel::{bounded, unbounded, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, ThreadId};
use std::time::Duration;

type Job = Box<dyn FnOnce() + Send>;

/// Cloneable handle used by other threads to submit work.
#[derive(Clone)]
pub struct MainThreadHandle {
    sender: Sender<Job>,
    main_thread: ThreadId,
}

/// Receiving end, drained by the main loop.
pub struct MainThreadQueue {
    receiver: Receiver<Job>,
}

/// Create a queue bound to the calling thread.
pub fn main_thread_channel() -> (MainThreadHandle, MainThreadQueue) {
    let (sender, receiver) = unbounded();
    (
        MainThreadHandle {
            sender,
            main_thread: thread::current().id(),
        },
        MainThreadQueue { receiver },
    )
}

impl MainThreadHandle {
    pub fn is_main_thread(&self) -> bool {
        thread::current().id() == self.main_thread
    }

    /// Run `work` on the main thread and wait for its result.
    ///
    /// Runs inline when already on the main thread. Returns `None` if the
    /// main loop is gone or does not answer within `timeout`.
    pub fn run_sync<T, F>(&self, work: F, timeout: Duration) -> Option<T>
    where
        T: Send + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        if self.is_main_thread() {
            return Some(work());
        }

        let (reply_tx, reply_rx) = bounded(1);
        let job: Job = Box::new(move || {
            // The waiter may have timed out already.
            let _ = reply_tx.send(work());
        });
        if self.sender.send(job).is_err() {
            tracing::debug!("Main thread queue closed");
            return None;
        }

        match reply_rx.recv_timeout(timeout) {
            Ok(value) => Some(value),
            Err(RecvTimeoutError::Timeout) => {
                tracing::warn!("Main thread did not answer within {:?}", timeout);
                None
            }
            Err(RecvTimeoutError::Disconnected) => None,
        }
    }
}

impl MainThreadQueue {
    pub fn receiver(&self) -> &Receiver<Box<dyn FnOnce() + Send>> {
        &self.receiver
    }

    /// Run every queued job without blocking. Returns how many ran.
    pub fn run_pending(&self) -> usize {
        let mut ran = 0;
        while let Ok(job) = self.receiver.try_recv() {
            job();
            ran += 1;
        }
        ran
    }

    /// Wait up to `timeout` for one job, run it, then drain the rest.
    pub fn run_for(&self, timeout: Duration) -> usize {
        match self.receiver.recv_timeout(timeout) {
            Ok(job) => {
                job();
                1 + self.run_pending()
            }
            Err(_) => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_inline_on_main_thread() {
        let (handle, _queue) = main_thread_channel();
        assert!(handle.is_main_thread());
        assert_eq!(handle.run_sync(|| 7, Duration::from_millis(1)), Some(7));
    }

    #[test]
    fn test_round_trip_from_worker() {
        let (handle, queue) = main_thread_channel();
        let worker = thread::spawn(move || {
            assert!(!handle.is_main_thread());
            handle.run_sync(|| thread::current().id(), Duration::from_secs(5))
        });

        let main_id = thread::current().id();
        let mut served = 0;
        while served == 0 {
            served = queue.run_for(Duration::from_millis(10));
        }
        assert_eq!(worker.join().unwrap(), Some(main_id));
    }

    #[test]
    fn test_timeout_when_main_thread_is_busy() {
        let (handle, queue) = main_thread_channel();
        let result = thread::spawn(move || handle.run_sync(|| 1, Duration::from_millis(20)))
            .join()
            .unwrap();
        assert_eq!(result, None);

        // The late job still runs harmlessly.
        assert_eq!(queue.run_pending(), 1);
    }

    #[test]
    fn test_closed_queue_returns_none() {
        let (handle, queue) = main_thread_channel();
        drop(queue);
        let ran = Arc::new(AtomicBool::new(false));
        let flag = ran.clone();
        let result = thread::spawn(move || {
            handle.run_sync(
                move || flag.store(true, Ordering::SeqCst),
                Duration::from_millis(20),
            )
        })
        .join()
        .unwrap();
        assert_eq!(result, None);
        assert!(!ran.load(Ordering::SeqCst));
    }
}
