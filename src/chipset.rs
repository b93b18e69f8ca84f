//! Device contract driven by the host.
//!
//! The host never looks inside the device. It calls
//! [`Chipset::setup_internals`] once after the window exists,
//! [`Chipset::reset`] once the tick timer is armed, and then
//! [`Chipset::tick`] once per emulated cycle, always under the host's
//! exclusive lock.

use log::debug;

/// A simulated device the host can clock.
pub trait Chipset: Send {
    /// Build internal peripherals. Called exactly once, before `reset`.
    fn setup_internals(&mut self);

    /// Bring the device to its power-on state.
    fn reset(&mut self);

    /// Advance by one emulated cycle.
    fn tick(&mut self);
}

/// Device with no behaviour beyond counting the cycles it is given.
#[derive(Debug, Default)]
pub struct IdleChipset {
    ready: bool,
    cycles: u64,
}

impl IdleChipset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cycles ticked since the last reset.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }
}

impl Chipset for IdleChipset {
    fn setup_internals(&mut self) {
        debug!("idle chipset: setting up internals");
        self.ready = true;
    }

    fn reset(&mut self) {
        debug!("idle chipset: reset after {} cycles", self.cycles);
        self.cycles = 0;
    }

    fn tick(&mut self) {
        if self.ready {
            self.cycles += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_chipset_counts_after_setup() {
        let mut chip = IdleChipset::new();
        chip.tick();
        assert_eq!(chip.cycles(), 0);

        chip.setup_internals();
        chip.reset();
        for _ in 0..3 {
            chip.tick();
        }
        assert_eq!(chip.cycles(), 3);

        chip.reset();
        assert_eq!(chip.cycles(), 0);
    }
}
