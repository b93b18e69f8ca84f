//! Scripting environment setup.
//!
//! The Lua state gets the safe standard libraries plus an `emu` table through
//! which console commands can steer the host:
//!
//! ```lua
//! emu.set_paused(true)
//! print(emu.ticks())
//! emu.shutdown()
//! ```

use std::sync::Arc;

use mlua::{Lua, LuaOptions, StdLib};

use crate::emulator::HostState;
use crate::error::FatalError;

/// Create a Lua state with the host bindings installed.
pub fn create_environment(host: Arc<HostState>) -> Result<Lua, FatalError> {
    let lua = Lua::new_with(StdLib::ALL_SAFE, LuaOptions::default())
        .map_err(FatalError::ScriptInit)?;
    install_host_table(&lua, host).map_err(FatalError::ScriptInit)?;
    Ok(lua)
}

fn install_host_table(lua: &Lua, host: Arc<HostState>) -> mlua::Result<()> {
    let emu = lua.create_table()?;

    let state = host.clone();
    emu.set(
        "shutdown",
        lua.create_function(move |_, ()| {
            state.shutdown();
            Ok(())
        })?,
    )?;

    let state = host.clone();
    emu.set(
        "running",
        lua.create_function(move |_, ()| Ok(state.running()))?,
    )?;

    let state = host.clone();
    emu.set(
        "paused",
        lua.create_function(move |_, ()| Ok(state.paused()))?,
    )?;

    let state = host.clone();
    emu.set(
        "set_paused",
        lua.create_function(move |_, paused: bool| {
            state.set_paused(paused);
            Ok(())
        })?,
    )?;

    let state = host;
    emu.set(
        "ticks",
        lua.create_function(move |_, ()| Ok(state.ticks_delivered()))?,
    )?;

    lua.globals().set("emu", emu)
}
