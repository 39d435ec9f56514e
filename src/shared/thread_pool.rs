use std::sync::{mpsc, Arc, Mutex};
use std::thread;

/// A fixed-size pool of OS threads consuming jobs (boxed `FnOnce` closures)
/// from a shared channel. Threads are spawned in the [ThreadPool::new]
/// constructor and joined when the pool is dropped.
pub struct ThreadPool {
    label: String,
    handles: Vec<thread::JoinHandle<()>>,
    sender: mpsc::Sender<PoolMessage>,
}

enum PoolMessage {
    Job(Box<dyn FnOnce() + Send + 'static>),
    Stop,
}

impl ThreadPool {
    /// Creates and returns a new [`ThreadPool`] with `size` threads,
    /// all spawned before the function returns. `size` must be > 0.
    pub fn new(size: usize, label: &str) -> ThreadPool {
        assert!(size > 0);
        let (sender, receiver) = mpsc::channel();
        let receiver = Arc::new(Mutex::new(receiver));
        let mut handles = Vec::with_capacity(size);
        for _ in 0..size {
            let receiver = Arc::clone(&receiver);
            handles.push(thread::spawn(move || worker_loop(receiver)));
        }
        ThreadPool {
            label: label.to_string(),
            handles,
            sender,
        }
    }

    /// Enqueue a job for the pool. Jobs are executed in FIFO order
    /// as soon as a thread becomes free.
    pub fn execute<F: FnOnce() + Send + 'static>(&self, function: F) {
        let job = PoolMessage::Job(Box::new(function));
        self.sender.send(job).unwrap();
    }
}

fn worker_loop(receiver: Arc<Mutex<mpsc::Receiver<PoolMessage>>>) {
    loop {
        let receiver_guard = receiver.lock().unwrap();
        let message = receiver_guard.recv().unwrap();
        drop(receiver_guard);
        match message {
            PoolMessage::Stop => return,
            PoolMessage::Job(job_fn) => job_fn(),
        }
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        log::warn!("Shutting down '{}' thread pool.", self.label);
        for _ in &self.handles {
            self.sender.send(PoolMessage::Stop).unwrap();
        }
        for handle in self.handles.drain(..) {
            handle.join().unwrap();
        }
        log::warn!("Thread pool '{}' shut down.", self.label);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_jobs_all_run() {
        let counter = Arc::new(AtomicUsize::new(0));
        let pool = ThreadPool::new(4, "test");
        for _ in 0..100 {
            let counter = Arc::clone(&counter);
            pool.execute(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            });
        }
        drop(pool);
        assert_eq!(counter.load(Ordering::SeqCst), 100);
    }
}
