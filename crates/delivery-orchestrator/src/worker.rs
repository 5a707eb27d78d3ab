use std::thread;

use crossbeam_channel::{bounded, Receiver};

/// A single background task whose result is polled, never awaited. Models
/// the "cooperatively scheduled worker task reporting through a
/// completion flag" shape the tick loop depends on for anything that
/// might block (navigation, QR capture): the calling thread can `poll()`
/// as often as it likes without ever stalling on the worker.
pub struct Worker<T> {
    receiver: Receiver<T>,
}

impl<T: Send + 'static> Worker<T> {
    pub fn spawn<F>(task: F) -> Self
    where
        F: FnOnce() -> T + Send + 'static,
    {
        let (sender, receiver) = bounded(1);
        thread::spawn(move || {
            let _ = sender.send(task());
        });
        Self { receiver }
    }

    /// `None` while the task is still running; `Some(result)` exactly once,
    /// the first poll after it finishes.
    pub fn poll(&self) -> Option<T> {
        self.receiver.try_recv().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn poll_returns_none_until_the_task_completes() {
        let worker = Worker::spawn(|| {
            thread::sleep(Duration::from_millis(20));
            42
        });
        assert!(worker.poll().is_none());
        thread::sleep(Duration::from_millis(60));
        assert_eq!(worker.poll(), Some(42));
    }
}
