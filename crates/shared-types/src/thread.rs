//! # Managed Threads
//!
//! A named OS thread with a cooperative stop flag, an interruptible sleep and
//! the ability to detach itself. Long-lived loops (the shutdown coordinator,
//! the message listener) run on top of it.

use parking_lot::{Condvar, Mutex};
use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::debug;

#[derive(Default)]
struct Shared {
    stop_requested: Mutex<bool>,
    wake: Condvar,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl Shared {
    fn request_stop(&self) {
        *self.stop_requested.lock() = true;
        self.wake.notify_all();
    }
}

/// Owner-side handle of a running thread.
pub struct ManagedThread {
    name: String,
    shared: Arc<Shared>,
}

/// Thread-side view handed to the running body.
pub struct ThreadContext {
    name: String,
    shared: Arc<Shared>,
}

impl ManagedThread {
    /// Spawn `body` on a new thread called `name`.
    pub fn start<F>(name: impl Into<String>, body: F) -> io::Result<Self>
    where
        F: FnOnce(ThreadContext) + Send + 'static,
    {
        let name = name.into();
        let shared = Arc::new(Shared::default());
        let context = ThreadContext {
            name: name.clone(),
            shared: Arc::clone(&shared),
        };

        // Held across spawn so a body that detaches immediately finds the handle.
        let mut slot = shared.handle.lock();
        let handle = thread::Builder::new()
            .name(name.clone())
            .spawn(move || body(context))?;
        *slot = Some(handle);
        drop(slot);

        debug!("[Thread] Started {}", name);
        Ok(Self { name, shared })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Ask the body to stop and wake it if it is sleeping.
    pub fn stop(&self) {
        self.shared.request_stop();
    }

    /// Give up the join handle; the thread keeps running on its own.
    pub fn detach(&self) {
        self.shared.handle.lock().take();
    }

    /// Wait for the thread to exit. Returns false if it was already detached
    /// or if called from the thread itself.
    pub fn join(&self) -> bool {
        let Some(handle) = self.shared.handle.lock().take() else {
            return false;
        };
        if handle.thread().id() == thread::current().id() {
            return false;
        }
        handle.join().is_ok()
    }

    /// Whether the thread is still attached and running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.shared
            .handle
            .lock()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}

impl ThreadContext {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn is_stop_requested(&self) -> bool {
        *self.shared.stop_requested.lock()
    }

    /// Sleep for `duration` or until a stop is requested.
    ///
    /// Returns true if a stop was requested.
    pub fn sleep(&self, duration: Duration) -> bool {
        let deadline = Instant::now() + duration;
        let mut stop = self.shared.stop_requested.lock();
        while !*stop {
            if self.shared.wake.wait_until(&mut stop, deadline).timed_out() {
                break;
            }
        }
        *stop
    }

    /// Detach the running thread from its owner.
    pub fn detach(&self) {
        if self.shared.handle.lock().take().is_some() {
            debug!("[Thread] {} detached", self.name);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::mpsc;

    #[test]
    fn test_stop_wakes_sleep() {
        let (tx, rx) = mpsc::channel();
        let worker = ManagedThread::start("sleeper", move |ctx| {
            let stopped = ctx.sleep(Duration::from_secs(30));
            tx.send(stopped).unwrap();
        })
        .unwrap();

        worker.stop();
        assert!(rx.recv_timeout(Duration::from_secs(5)).unwrap());
        assert!(worker.join());
    }

    #[test]
    fn test_sleep_times_out_without_stop() {
        let worker = ManagedThread::start("short", |ctx| {
            assert!(!ctx.sleep(Duration::from_millis(10)));
            assert!(!ctx.is_stop_requested());
        })
        .unwrap();
        assert!(worker.join());
    }

    #[test]
    fn test_self_detach() {
        let done = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&done);
        let (tx, rx) = mpsc::channel();
        let worker = ManagedThread::start("detacher", move |ctx| {
            ctx.detach();
            flag.store(true, Ordering::SeqCst);
            tx.send(()).unwrap();
        })
        .unwrap();

        rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert!(done.load(Ordering::SeqCst));
        assert!(!worker.join());
        assert!(!worker.is_running());
    }
}
