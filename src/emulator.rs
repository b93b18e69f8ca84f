//! Main emulator host
//!
//! This module ties the pieces together: it brings up the Lua environment and
//! model definition, opens the frontend, prepares the chipset and arms the tick
//! driver, then tears everything down in reverse on drop. Everything that
//! touches the chipset, the cycle clock or the Lua state does so while holding
//! one process-wide lock, so tick batches and console commands never overlap.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::{info, warn};
use mlua::Lua;

use crate::chipset::Chipset;
use crate::config::EmulatorConfig;
use crate::console::CommandConsole;
use crate::core::{CycleClock, HostTimeSource, TimeSource};
use crate::error::{FatalError, ModelInfoError};
use crate::frontend::Frontend;
use crate::model::{InterfaceSpec, ModelDefinition};
use crate::scheduler::{self, PeriodicTimer};
use crate::script;

/// Flags shared between the host loop, the tick driver and Lua bindings.
///
/// These are plain atomics so they can be read without the machine lock.
#[derive(Debug)]
pub struct HostState {
    running: AtomicBool,
    paused: AtomicBool,
    ticks: AtomicU64,
}

impl HostState {
    pub fn new(paused: bool) -> Self {
        Self {
            running: AtomicBool::new(true),
            paused: AtomicBool::new(paused),
            ticks: AtomicU64::new(0),
        }
    }

    pub fn running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn shutdown(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    pub fn paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    pub fn set_paused(&self, paused: bool) {
        self.paused.store(paused, Ordering::SeqCst);
    }

    /// Ticks delivered to the chipset since start-up.
    pub fn ticks_delivered(&self) -> u64 {
        self.ticks.load(Ordering::SeqCst)
    }

    pub(crate) fn record_ticks(&self, count: u64) {
        self.ticks.fetch_add(count, Ordering::SeqCst);
    }
}

/// State guarded by the access lock.
struct Machine {
    lua: Lua,
    model: ModelDefinition,
    console: CommandConsole,
    clock: CycleClock,
    chipset: Box<dyn Chipset>,
}

impl Machine {
    fn run_due_cycles(&mut self) -> u64 {
        scheduler::run_due_cycles(&mut self.clock, self.chipset.as_mut())
    }

    /// Release the model handle, then the Lua state, then the device.
    fn teardown(self) {
        let Machine {
            lua,
            model,
            console,
            clock,
            chipset,
        } = self;
        if let Err(err) = model.release(&lua) {
            warn!("failed to release model definition: {err}");
        }
        drop(console);
        drop(clock);
        drop(lua);
        drop(chipset);
    }
}

type SharedMachine = Arc<Mutex<Option<Machine>>>;

fn access(machine: &Mutex<Option<Machine>>) -> MutexGuard<'_, Option<Machine>> {
    machine.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Emulator host for one chipset.
pub struct Emulator {
    config: EmulatorConfig,
    interface: InterfaceSpec,
    host: Arc<HostState>,
    machine: SharedMachine,
    frontend: Box<dyn Frontend>,
    timer: Option<PeriodicTimer>,
}

impl Emulator {
    /// Bring up the host against the real monotonic clock.
    pub fn new(
        config: EmulatorConfig,
        chipset: Box<dyn Chipset>,
        frontend: Box<dyn Frontend>,
    ) -> Result<Self, FatalError> {
        Self::with_time_source(config, chipset, frontend, Box::new(HostTimeSource::new()))
    }

    /// Bring up the host measuring time with `time`.
    pub fn with_time_source(
        config: EmulatorConfig,
        mut chipset: Box<dyn Chipset>,
        mut frontend: Box<dyn Frontend>,
        time: Box<dyn TimeSource>,
    ) -> Result<Self, FatalError> {
        config.validate()?;

        let shared: SharedMachine = Arc::new(Mutex::new(None));
        let mut slot = access(&shared);

        let host = Arc::new(HostState::new(config.paused));
        let lua = script::create_environment(host.clone())?;

        let model_path = config.model_file(ModelDefinition::SCRIPT_NAME);
        let model = ModelDefinition::load(&lua, &model_path)?;
        let interface = InterfaceSpec::from_model(&lua, &model, &config.model_dir)?;

        frontend.open_window(&interface.model_name, interface.width, interface.height)?;
        chipset.setup_internals();
        frontend.present_interface(&interface.image_path)?;

        let machine = slot.insert(Machine {
            lua,
            model,
            console: CommandConsole::new(),
            clock: CycleClock::new(config.cycles_per_second, time),
            chipset,
        });
        machine.clock.reset();

        let timer = PeriodicTimer::start(
            config.timer_interval,
            tick_callback(shared.clone(), host.clone()),
        )
        .map_err(FatalError::Timer)?;

        machine.chipset.reset();
        info!(
            "emulating '{}' from {} at {} cycles/s, tick interval {:?}",
            interface.model_name,
            machine.model.path().display(),
            machine.clock.cycles_per_second(),
            config.timer_interval
        );
        drop(slot);

        Ok(Self {
            config,
            interface,
            host,
            machine: shared,
            frontend,
            timer: Some(timer),
        })
    }

    pub fn config(&self) -> &EmulatorConfig {
        &self.config
    }

    /// Window geometry and artwork of the loaded model.
    pub fn interface(&self) -> &InterfaceSpec {
        &self.interface
    }

    /// Flags shared with the tick driver and the `emu` Lua table.
    pub fn host_state(&self) -> Arc<HostState> {
        self.host.clone()
    }

    pub fn running(&self) -> bool {
        self.host.running()
    }

    /// Ask the host loop to stop. Teardown happens on drop.
    pub fn shutdown(&self) {
        self.host.shutdown();
    }

    pub fn paused(&self) -> bool {
        self.host.paused()
    }

    pub fn set_paused(&self, paused: bool) {
        self.host.set_paused(paused);
    }

    /// Feed one fragment to the Lua console. See [`CommandConsole::execute`].
    pub fn execute_command(&self, fragment: &str) -> bool {
        let mut slot = access(&self.machine);
        match slot.as_mut() {
            Some(Machine { lua, console, .. }) => console.execute(lua, fragment),
            None => true,
        }
    }

    /// Whether the console is waiting for the rest of a statement.
    pub fn command_pending(&self) -> bool {
        access(&self.machine)
            .as_ref()
            .is_some_and(|machine| !machine.console.is_empty())
    }

    /// String value of a model field.
    pub fn model_string(&self, key: &str) -> Result<String, ModelInfoError> {
        let slot = access(&self.machine);
        match slot.as_ref() {
            Some(machine) => machine.model.info(&machine.lua, key).as_string(),
            None => Err(ModelInfoError::Undefined { key: key.to_owned() }),
        }
    }

    /// Integer value of a model field.
    pub fn model_int(&self, key: &str) -> Result<i32, ModelInfoError> {
        let slot = access(&self.machine);
        match slot.as_ref() {
            Some(machine) => machine.model.info(&machine.lua, key).as_int(),
            None => Err(ModelInfoError::Undefined { key: key.to_owned() }),
        }
    }

    /// Process window events; a quit request shuts the host down.
    pub fn pump_frontend(&mut self) {
        if self.frontend.poll_quit() {
            info!("frontend requested quit");
            self.shutdown();
        }
    }

    /// Get current execution statistics
    pub fn stats(&self) -> EmulatorStats {
        EmulatorStats {
            ticks_delivered: self.host.ticks_delivered(),
            cycles_per_second: self.config.cycles_per_second,
            running: self.host.running(),
            paused: self.host.paused(),
        }
    }
}

fn tick_callback(machine: SharedMachine, host: Arc<HostState>) -> impl FnMut() + Send + 'static {
    move || {
        let mut slot = access(&machine);
        // empty once teardown has run
        if let Some(machine) = slot.as_mut() {
            let delivered = machine.run_due_cycles();
            host.record_ticks(delivered);
        }
    }
}

impl Drop for Emulator {
    fn drop(&mut self) {
        let mut slot = access(&self.machine);
        if let Some(timer) = &self.timer {
            timer.cancel();
        }
        self.frontend.close();
        if let Some(machine) = slot.take() {
            machine.teardown();
        }
        drop(slot);

        // joined outside the lock: the driver may be blocked on it
        if let Some(timer) = self.timer.take() {
            timer.join();
        }
        info!(
            "emulator stopped after {} ticks",
            self.host.ticks_delivered()
        );
    }
}

/// Emulator execution statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde-spec", derive(serde::Serialize))]
pub struct EmulatorStats {
    pub ticks_delivered: u64,
    pub cycles_per_second: u64,
    pub running: bool,
    pub paused: bool,
}
