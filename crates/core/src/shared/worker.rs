use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::Receiver;

/// A background thread that signals completion over a channel, so its owner
/// can wait with a bounded timeout before joining.
///
/// `std` offers no join-with-timeout; the completion message stands in for
/// one. Once the message has arrived the real join is immediate. A worker
/// that overruns the timeout is left detached; it still runs its own cleanup
/// when it eventually observes its stop flag.
pub struct Worker {
    handle: Option<JoinHandle<()>>,
    done_rx: Receiver<()>,
}

impl Worker {
    pub fn spawn<F>(name: &str, body: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        let (done_tx, done_rx) = crossbeam_channel::bounded::<()>(1);
        let handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                body();
                let _ = done_tx.send(());
            })
            .expect("failed to spawn worker thread");
        Self {
            handle: Some(handle),
            done_rx,
        }
    }

    /// Waits up to `timeout` for the worker to finish, then joins it.
    ///
    /// Returns `false` when the worker is still running after the timeout;
    /// the thread is detached in that case.
    pub fn join_timeout(mut self, timeout: Duration) -> bool {
        if self.done_rx.recv_timeout(timeout).is_err() {
            return false;
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_join_after_completion() {
        let ran = Arc::new(AtomicBool::new(false));
        let flag = ran.clone();
        let worker = Worker::spawn("test", move || flag.store(true, Ordering::Relaxed));
        assert!(worker.join_timeout(Duration::from_secs(2)));
        assert!(ran.load(Ordering::Relaxed));
    }

    #[test]
    fn test_timeout_detaches_slow_worker() {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_clone = stop.clone();
        let worker = Worker::spawn("slow", move || {
            while !stop_clone.load(Ordering::Relaxed) {
                thread::sleep(Duration::from_millis(10));
            }
        });
        assert!(!worker.join_timeout(Duration::from_millis(50)));
        stop.store(true, Ordering::Relaxed);
    }
}
