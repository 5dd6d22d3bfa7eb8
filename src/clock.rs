//! Tick clock shared by every channel.
//!
//! This module handles:
//! - Mapping a monotonic time base onto an integer tick counter
//! - Exposing the fixed "ticks per second" rate used for loop lengths and display
//!
//! # Thread Safety
//! Both clocks are read from the MIDI input thread, the sequencer thread and
//! the GUI thread at the same time. [`TickClock`] is immutable after
//! construction; [`ManualClock`] keeps its counter in an atomic.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::error::Error;

/// The engine's integer time unit.
pub type Tick = u64;

/// Source of ticks for the engine.
pub trait Clock: Send + Sync {
    /// Current tick. Never decreases between calls, from any thread.
    fn now(&self) -> Tick;

    /// Fixed tick rate, established at construction.
    fn ticks_per_second(&self) -> u32;
}

/// Tick clock driven by the system's monotonic clock.
#[derive(Debug, Clone)]
pub struct TickClock {
    origin: Instant,
    ticks_per_second: u32,
}

impl TickClock {
    /// Create a clock starting at tick 0 now.
    pub fn new(ticks_per_second: u32) -> Result<Self, Error> {
        if ticks_per_second == 0 {
            return Err(Error::InvalidConfig(
                "ticks_per_second must be greater than zero".to_string(),
            ));
        }
        Ok(Self {
            origin: Instant::now(),
            ticks_per_second,
        })
    }

    /// Convert an instant into ticks since the clock's origin.
    pub fn tick_at(&self, instant: Instant) -> Tick {
        let nanos = instant.saturating_duration_since(self.origin).as_nanos();
        (nanos * self.ticks_per_second as u128 / 1_000_000_000) as Tick
    }
}

impl Clock for TickClock {
    fn now(&self) -> Tick {
        self.tick_at(Instant::now())
    }

    fn ticks_per_second(&self) -> u32 {
        self.ticks_per_second
    }
}

/// Clock that only moves when told to.
///
/// Cloning shares the counter, so a test (or an offline renderer) can keep a
/// handle and advance time after the engine has taken ownership of the clock.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<AtomicU64>,
    ticks_per_second: u32,
}

impl ManualClock {
    pub fn new(ticks_per_second: u32) -> Self {
        Self {
            now: Arc::new(AtomicU64::new(0)),
            ticks_per_second,
        }
    }

    /// Jump to `tick`. Moving backwards is ignored.
    pub fn set(&self, tick: Tick) {
        self.now.fetch_max(tick, Ordering::SeqCst);
    }

    pub fn advance(&self, ticks: Tick) {
        self.now.fetch_add(ticks, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Tick {
        self.now.load(Ordering::SeqCst)
    }

    fn ticks_per_second(&self) -> u32 {
        self.ticks_per_second
    }
}

/// Convert a tick count into seconds at the given rate.
pub fn ticks_to_seconds(ticks: Tick, ticks_per_second: u32) -> f64 {
    ticks as f64 / ticks_per_second as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_zero_rate_rejected() {
        assert!(TickClock::new(0).is_err());
    }

    #[test]
    fn test_tick_at_conversion() {
        let clock = TickClock::new(1000).unwrap();
        let later = clock.origin + Duration::from_millis(1500);
        assert_eq!(clock.tick_at(later), 1500);
        assert_eq!(clock.ticks_per_second(), 1000);
    }

    #[test]
    fn test_tick_before_origin_is_zero() {
        let earlier = Instant::now();
        let clock = TickClock::new(480).unwrap();
        assert_eq!(clock.tick_at(earlier), 0);
    }

    #[test]
    fn test_now_is_monotonic() {
        let clock = TickClock::new(1_000_000).unwrap();
        let mut last = clock.now();
        for _ in 0..1000 {
            let now = clock.now();
            assert!(now >= last);
            last = now;
        }
    }

    #[test]
    fn test_manual_clock_shares_counter() {
        let clock = ManualClock::new(960);
        let handle = clock.clone();
        handle.advance(100);
        assert_eq!(clock.now(), 100);
        handle.set(2000);
        assert_eq!(clock.now(), 2000);
    }

    #[test]
    fn test_manual_clock_never_goes_backwards() {
        let clock = ManualClock::new(960);
        clock.set(500);
        clock.set(200);
        assert_eq!(clock.now(), 500);
    }

    #[test]
    fn test_ticks_to_seconds() {
        assert_eq!(ticks_to_seconds(1500, 1000), 1.5);
        assert_eq!(ticks_to_seconds(0, 960), 0.0);
        assert_eq!(ticks_to_seconds(960, 960), 1.0);
    }
}
