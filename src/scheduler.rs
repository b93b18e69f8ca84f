//! Periodic tick delivery.
//!
//! A [`PeriodicTimer`] owns a dedicated thread that wakes up every interval
//! and runs a callback. The emulator's callback locks the machine and calls
//! [`run_due_cycles`], which asks the [`CycleClock`] how many cycles became due
//! and ticks the chipset exactly that many times. A late wake-up simply yields
//! a bigger batch on the next fire; cycles are never dropped.

use std::io;
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use log::{debug, trace, warn};

use crate::chipset::Chipset;
use crate::core::CycleClock;

/// Deliver every cycle that is due, in order. Returns the batch size.
pub fn run_due_cycles(clock: &mut CycleClock, chipset: &mut dyn Chipset) -> u64 {
    let due = clock.delta();
    for _ in 0..due {
        chipset.tick();
    }
    trace!("delivered {due} ticks");
    due
}

/// Background thread firing a callback at a fixed interval until cancelled.
pub struct PeriodicTimer {
    cancel: Sender<()>,
    handle: Option<JoinHandle<()>>,
}

impl PeriodicTimer {
    /// Spawn the timer thread. The first fire happens one `interval` from now.
    pub fn start<F>(interval: Duration, mut callback: F) -> io::Result<Self>
    where
        F: FnMut() + Send + 'static,
    {
        let (cancel, cancelled) = mpsc::channel::<()>();
        let handle = thread::Builder::new()
            .name("tick-driver".into())
            .spawn(move || {
                let mut deadline = Instant::now() + interval;
                loop {
                    let wait = deadline.saturating_duration_since(Instant::now());
                    match cancelled.recv_timeout(wait) {
                        Err(RecvTimeoutError::Timeout) => {}
                        // explicit cancel or the owner went away
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }

                    callback();

                    deadline += interval;
                    let now = Instant::now();
                    if deadline < now {
                        debug!("tick driver overran its interval by {:?}", now - deadline);
                        deadline = now + interval;
                    }
                }
                debug!("tick driver stopped");
            })?;

        Ok(Self {
            cancel,
            handle: Some(handle),
        })
    }

    /// Ask the thread to stop after its current fire. Does not wait.
    pub fn cancel(&self) {
        // the thread may already be gone
        let _ = self.cancel.send(());
    }

    /// Cancel and wait for the thread to exit.
    pub fn join(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        self.cancel();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("tick driver thread panicked");
            }
        }
    }
}

impl Drop for PeriodicTimer {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ManualTimeSource;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct RecordingChipset {
        ticks: Vec<u64>,
    }

    impl Chipset for RecordingChipset {
        fn setup_internals(&mut self) {}

        fn reset(&mut self) {
            self.ticks.clear();
        }

        fn tick(&mut self) {
            let next = self.ticks.len() as u64 + 1;
            self.ticks.push(next);
        }
    }

    fn clock_at(cycles_per_second: u64) -> (ManualTimeSource, CycleClock) {
        let time = ManualTimeSource::new();
        let mut clock = CycleClock::new(cycles_per_second, Box::new(time.clone()));
        clock.reset();
        (time, clock)
    }

    #[test]
    fn delivers_exactly_the_due_batch_in_order() {
        let (time, mut clock) = clock_at(1000);
        let mut chip = RecordingChipset::default();

        time.advance(Duration::from_millis(5));
        assert_eq!(run_due_cycles(&mut clock, &mut chip), 5);
        assert_eq!(chip.ticks, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn late_fire_delivers_catch_up() {
        let (time, mut clock) = clock_at(1000);
        let mut chip = RecordingChipset::default();

        time.advance(Duration::from_millis(2));
        run_due_cycles(&mut clock, &mut chip);
        // host stalls for a second
        time.advance(Duration::from_secs(1));
        assert_eq!(run_due_cycles(&mut clock, &mut chip), 1000);
        assert_eq!(chip.ticks.len(), 1002);
    }

    #[test]
    fn nothing_due_means_no_ticks() {
        let (_time, mut clock) = clock_at(1000);
        let mut chip = RecordingChipset::default();
        assert_eq!(run_due_cycles(&mut clock, &mut chip), 0);
        assert!(chip.ticks.is_empty());
    }

    #[test]
    fn timer_fires_until_joined() {
        let fires = Arc::new(AtomicU64::new(0));
        let counter = fires.clone();
        let timer = PeriodicTimer::start(Duration::from_millis(2), move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();

        thread::sleep(Duration::from_millis(60));
        timer.join();
        let seen = fires.load(Ordering::SeqCst);
        assert!(seen > 0);

        thread::sleep(Duration::from_millis(20));
        assert_eq!(fires.load(Ordering::SeqCst), seen);
    }

    #[test]
    fn cancel_does_not_block_on_a_held_lock() {
        let shared = Arc::new(Mutex::new(0u64));
        let in_timer = shared.clone();
        let timer = PeriodicTimer::start(Duration::from_millis(1), move || {
            *in_timer.lock().unwrap() += 1;
        })
        .unwrap();

        thread::sleep(Duration::from_millis(10));
        {
            let _guard = shared.lock().unwrap();
            // must return while the callback may be waiting on us
            timer.cancel();
        }
        timer.join();
    }
}
