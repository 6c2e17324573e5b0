//! Raw monotonic time for the transport clock

use std::cell::Cell;
use std::rc::Rc;
use std::time::Instant;

/// Something that reports monotonically non-decreasing seconds
///
/// The clock stamps scheduled events on this timeline, so an audio engine
/// reading the same source can play them at their ideal time.
pub trait TimeSource {
    fn now(&self) -> f64;
}

/// Wall-clock seconds since construction
#[derive(Debug, Clone, Copy)]
pub struct SystemTimeSource {
    origin: Instant,
}

impl SystemTimeSource {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemTimeSource {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for SystemTimeSource {
    fn now(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }
}

/// Hand-stepped time, shared between clones
///
/// Keep one clone to drive time while the clock owns another.
#[derive(Debug, Clone, Default)]
pub struct ManualTimeSource {
    seconds: Rc<Cell<f64>>,
}

impl ManualTimeSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Jump to an absolute time; earlier times are ignored
    pub fn set(&self, seconds: f64) {
        if seconds > self.seconds.get() {
            self.seconds.set(seconds);
        }
    }

    /// Move forward by `delta` seconds (negative deltas are ignored)
    pub fn advance(&self, delta: f64) {
        if delta > 0.0 {
            self.seconds.set(self.seconds.get() + delta);
        }
    }
}

impl TimeSource for ManualTimeSource {
    fn now(&self) -> f64 {
        self.seconds.get()
    }
}

impl<T: TimeSource + ?Sized> TimeSource for Box<T> {
    fn now(&self) -> f64 {
        (**self).now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_source_is_shared_between_clones() {
        let source = ManualTimeSource::new();
        let observer = source.clone();
        source.advance(0.25);
        source.advance(0.25);
        assert_eq!(observer.now(), 0.5);
    }

    #[test]
    fn manual_source_never_goes_backwards() {
        let source = ManualTimeSource::new();
        source.set(2.0);
        source.set(1.0);
        source.advance(-1.0);
        assert_eq!(source.now(), 2.0);
    }

    #[test]
    fn system_source_is_monotonic() {
        let source = SystemTimeSource::new();
        let a = source.now();
        let b = source.now();
        assert!(b >= a);
    }
}
