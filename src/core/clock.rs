//! Real-time cycle accounting.
//!
//! [`CycleClock`] turns elapsed host time into a count of emulated cycles that
//! are due. Each call to [`CycleClock::delta`] recomputes the absolute number of
//! cycles owed since the last [`CycleClock::reset`] and hands back only the
//! part not yet delivered, so rounding error never accumulates across calls no
//! matter how irregularly the caller fires.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Monotonic counter the clock measures elapsed time with.
pub trait TimeSource: Send {
    /// Current counter value. Never decreases.
    fn counter(&self) -> u64;

    /// Counter increments per second.
    fn frequency(&self) -> u64;
}

/// Host monotonic time at nanosecond resolution.
#[derive(Debug, Clone, Copy)]
pub struct HostTimeSource {
    origin: Instant,
}

impl HostTimeSource {
    pub const FREQUENCY: u64 = 1_000_000_000;

    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for HostTimeSource {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for HostTimeSource {
    fn counter(&self) -> u64 {
        // u64 nanoseconds lasts ~584 years of uptime
        self.origin.elapsed().as_nanos() as u64
    }

    fn frequency(&self) -> u64 {
        Self::FREQUENCY
    }
}

/// Time source that only moves when told to.
///
/// Clones share the same counter, so a test can keep one handle and give the
/// other to a [`CycleClock`].
#[derive(Debug, Clone, Default)]
pub struct ManualTimeSource {
    nanos: Arc<AtomicU64>,
}

impl ManualTimeSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move time forward by `by`.
    pub fn advance(&self, by: Duration) {
        self.nanos.fetch_add(by.as_nanos() as u64, Ordering::SeqCst);
    }
}

impl TimeSource for ManualTimeSource {
    fn counter(&self) -> u64 {
        self.nanos.load(Ordering::SeqCst)
    }

    fn frequency(&self) -> u64 {
        HostTimeSource::FREQUENCY
    }
}

/// Drift-free converter from elapsed time to due emulated cycles.
pub struct CycleClock {
    cycles_per_second: u64,
    frequency: u64,
    source: Box<dyn TimeSource>,
    reference: u64,
    emulated: u64,
}

impl CycleClock {
    /// Create a clock running at `cycles_per_second`, measured against `source`.
    ///
    /// The reference point is taken at construction; call [`reset`](Self::reset)
    /// to move it.
    pub fn new(cycles_per_second: u64, source: Box<dyn TimeSource>) -> Self {
        let frequency = source.frequency();
        let reference = source.counter();
        Self {
            cycles_per_second,
            frequency,
            source,
            reference,
            emulated: 0,
        }
    }

    /// Target rate in cycles per second.
    pub fn cycles_per_second(&self) -> u64 {
        self.cycles_per_second
    }

    /// Cycles handed out since the last reset.
    pub fn emulated(&self) -> u64 {
        self.emulated
    }

    /// Restart accounting from the current instant.
    pub fn reset(&mut self) {
        self.reference = self.source.counter();
        self.emulated = 0;
    }

    /// Number of cycles that became due since the previous call.
    pub fn delta(&mut self) -> u64 {
        let due = self.due_at(self.source.counter());
        let delta = due.saturating_sub(self.emulated);
        self.emulated = self.emulated.max(due);
        delta
    }

    fn due_at(&self, now: u64) -> u64 {
        if self.frequency == 0 {
            return 0;
        }
        let elapsed = now.saturating_sub(self.reference) as u128;
        let due = elapsed * self.cycles_per_second as u128 / self.frequency as u128;
        u64::try_from(due).unwrap_or(u64::MAX)
    }
}

impl std::fmt::Debug for CycleClock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CycleClock")
            .field("cycles_per_second", &self.cycles_per_second)
            .field("frequency", &self.frequency)
            .field("reference", &self.reference)
            .field("emulated", &self.emulated)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manual_clock(cycles_per_second: u64) -> (ManualTimeSource, CycleClock) {
        let time = ManualTimeSource::new();
        let mut clock = CycleClock::new(cycles_per_second, Box::new(time.clone()));
        clock.reset();
        (time, clock)
    }

    #[test]
    fn deltas_sum_to_elapsed_cycles() {
        let (time, mut clock) = manual_clock(1000);
        let mut total = 0;
        for step_ms in [0, 10, 10, 30] {
            time.advance(Duration::from_millis(step_ms));
            total += clock.delta();
        }
        assert_eq!(total, 50);
        assert_eq!(clock.emulated(), 50);
    }

    #[test]
    fn fractional_cycles_do_not_drift() {
        // 3 cycles/s sampled every 100ms: each step owes 0.3 cycles
        let (time, mut clock) = manual_clock(3);
        let mut total = 0;
        for _ in 0..100 {
            time.advance(Duration::from_millis(100));
            total += clock.delta();
        }
        assert_eq!(total, 30);
    }

    #[test]
    fn zero_rate_never_yields_cycles() {
        let (time, mut clock) = manual_clock(0);
        for _ in 0..5 {
            time.advance(Duration::from_secs(3600));
            assert_eq!(clock.delta(), 0);
        }
    }

    #[test]
    fn reset_discards_owed_cycles() {
        let (time, mut clock) = manual_clock(1000);
        time.advance(Duration::from_millis(250));
        clock.reset();
        assert_eq!(clock.delta(), 0);
        assert_eq!(clock.emulated(), 0);

        time.advance(Duration::from_millis(4));
        assert_eq!(clock.delta(), 4);
    }

    #[test]
    fn repeated_calls_without_time_passing_return_zero() {
        let (time, mut clock) = manual_clock(1_000_000);
        time.advance(Duration::from_micros(7));
        assert_eq!(clock.delta(), 7);
        assert_eq!(clock.delta(), 0);
        assert_eq!(clock.delta(), 0);
    }

    #[test]
    fn large_rates_do_not_overflow() {
        let (time, mut clock) = manual_clock(u64::MAX / 2);
        time.advance(Duration::from_secs(1));
        assert_eq!(clock.delta(), u64::MAX / 2);
    }

    #[test]
    fn host_source_is_monotonic() {
        let source = HostTimeSource::new();
        let a = source.counter();
        let b = source.counter();
        assert!(b >= a);
        assert_eq!(source.frequency(), HostTimeSource::FREQUENCY);
    }
}
