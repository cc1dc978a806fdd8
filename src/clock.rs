//! Periodic-callback primitive for the stepping engine.
//!
//! A [`Ticker`] fires a callback at a fixed period from a dedicated thread
//! until dropped. Timing is best-effort: the period is honored against
//! absolute deadlines so individual late ticks do not accumulate drift,
//! but resolution is bounded by the host scheduler.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Handle to a running periodic callback. Dropping it stops the callback
/// thread and joins it, so no tick can fire after the drop returns.
pub struct Ticker {
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl Ticker {
    /// Start invoking `tick` every `period` until the returned handle is
    /// dropped. The first invocation happens one full period after start.
    pub fn start<F>(period: Duration, mut tick: F) -> Self
    where
        F: FnMut() + Send + 'static,
    {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = Arc::clone(&stop);

        let thread = thread::spawn(move || {
            let mut next = Instant::now() + period;
            loop {
                let now = Instant::now();
                if next > now {
                    thread::sleep(next - now);
                }
                if stop_flag.load(Ordering::Relaxed) {
                    break;
                }
                tick();
                next += period;
            }
        });

        Self {
            stop,
            thread: Some(thread),
        }
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
    }
}
