// Copyright (C) 2025 Dayton Fishell
// casioemu host
// This file is part of casioemu.
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version. See the LICENSE file in the project root for details.
// SPDX-License-Identifier: GPL-3.0-or-later

//! casioemu host
//!
//! This library hosts a simulated calculator chipset and clocks it in real
//! time. A Lua model script describes the device variant, a periodic tick
//! driver delivers emulated cycles without drift, and an interactive Lua
//! console can inspect and steer the running host.

pub mod chipset;
pub mod config;
pub mod console;
pub mod core;
pub mod emulator;
pub mod error;
pub mod frontend;
pub mod model;
pub mod scheduler;
pub mod script;

pub use chipset::{Chipset, IdleChipset};
pub use config::EmulatorConfig;
pub use console::CommandConsole;
// Re-export commonly used types
pub use core::{CycleClock, HostTimeSource, ManualTimeSource, TimeSource};
pub use emulator::{Emulator, EmulatorStats, HostState};
pub use error::{FatalError, ModelInfoError};
pub use frontend::{Frontend, HeadlessFrontend};
pub use model::{InterfaceSpec, ModelDefinition, ModelInfo};
pub use scheduler::PeriodicTimer;
