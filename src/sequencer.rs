//! Sequencer timer backend.
//!
//! Runs a callback on a dedicated thread at a fixed period. The looper
//! registers a closure that drives [`Engine::on_timer`](crate::engine::Engine::on_timer).
//! Stopping happens on drop and joins the thread, so the callback never runs
//! after the [`Sequencer`] is gone.

use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{Sender, TryRecvError};
use tracing::{debug, info, warn};

use crate::error::Error;

pub struct Sequencer {
    stop_tx: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
    interval: Duration,
}

impl Sequencer {
    /// Start calling `callback` every `interval`.
    ///
    /// Periods are measured from an absolute deadline, so a slow callback
    /// shortens the next sleep instead of pushing every later call back.
    pub fn spawn<F>(interval: Duration, mut callback: F) -> Result<Self, Error>
    where
        F: FnMut() + Send + 'static,
    {
        let (stop_tx, stop_rx) = crossbeam_channel::bounded::<()>(1);

        let handle = thread::Builder::new()
            .name("looper-sequencer".to_string())
            .spawn(move || {
                let mut deadline = Instant::now();
                loop {
                    match stop_rx.try_recv() {
                        Err(TryRecvError::Empty) => {}
                        Ok(()) | Err(TryRecvError::Disconnected) => break,
                    }
                    callback();

                    deadline += interval;
                    let now = Instant::now();
                    if deadline < now {
                        // Too far behind to catch up tick by tick
                        deadline = now;
                    }
                    spin_sleep::sleep(deadline.saturating_duration_since(now));
                }
                debug!("Sequencer thread exiting.");
            })
            .map_err(|source| Error::Spawn {
                name: "sequencer",
                source,
            })?;

        info!(interval_us = interval.as_micros() as u64, "Sequencer started.");
        Ok(Self {
            stop_tx: Some(stop_tx),
            handle: Some(handle),
            interval,
        })
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

impl Drop for Sequencer {
    fn drop(&mut self) {
        // Dropping the sender disconnects the channel and ends the loop
        self.stop_tx.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("Sequencer thread panicked.");
            }
        }
        info!("Sequencer stopped.");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_callback_runs_repeatedly() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let sequencer = Sequencer::spawn(Duration::from_millis(1), move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();

        thread::sleep(Duration::from_millis(50));
        drop(sequencer);
        assert!(calls.load(Ordering::SeqCst) >= 5);
    }

    #[test]
    fn test_no_calls_after_drop() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let sequencer = Sequencer::spawn(Duration::from_millis(1), move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();
        assert_eq!(sequencer.interval(), Duration::from_millis(1));

        thread::sleep(Duration::from_millis(10));
        drop(sequencer);
        let after_drop = calls.load(Ordering::SeqCst);
        thread::sleep(Duration::from_millis(20));
        assert_eq!(calls.load(Ordering::SeqCst), after_drop);
    }

    #[test]
    fn test_drop_after_callback_panics() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let sequencer = Sequencer::spawn(Duration::from_millis(1), move || {
            counter.fetch_add(1, Ordering::SeqCst);
            panic!("timer callback failed");
        })
        .unwrap();

        thread::sleep(Duration::from_millis(20));
        // The thread died on the first call; stopping still returns normally
        drop(sequencer);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
