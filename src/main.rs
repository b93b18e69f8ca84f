// Copyright (C) 2025 Dayton Fishell
// casioemu host
// This file is part of casioemu.
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version. See the LICENSE file in the project root for details.
// SPDX-License-Identifier: GPL-3.0-or-later

// Command-line host: runs a model in real time with a Lua console on stdin.
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Parser;
use log::{error, info, warn};

use casioemu_core::{Emulator, EmulatorConfig, Frontend, HeadlessFrontend, IdleChipset};

/// How long the host loop waits for console input before pumping window events.
const HOST_POLL: Duration = Duration::from_millis(16);

#[derive(Debug, Parser)]
#[command(name = "casioemu", version, about = "Run a calculator model in real time")]
struct Cli {
    /// Directory containing model.lua
    model_dir: Option<PathBuf>,

    /// Host config file (YAML, or JSON by extension); needs the serde-spec feature
    #[arg(long)]
    config: Option<PathBuf>,

    /// Tick driver period in milliseconds
    #[arg(long)]
    timer_interval_ms: Option<u64>,

    /// Emulated cycles per real second
    #[arg(long)]
    cycles_per_second: Option<u64>,

    /// Start with the paused flag set
    #[arg(long)]
    paused: bool,

    /// Do not open a window
    #[arg(long)]
    headless: bool,
}

impl Cli {
    fn emulator_config(&self) -> Result<EmulatorConfig> {
        let mut config = match (&self.config, &self.model_dir) {
            (Some(path), _) => read_config_file(path)?,
            (None, Some(dir)) => EmulatorConfig::new(dir),
            (None, None) => bail!("a model directory or --config file is required"),
        };
        if let Some(dir) = &self.model_dir {
            config.model_dir = dir.clone();
        }
        if let Some(ms) = self.timer_interval_ms {
            config.timer_interval = Duration::from_millis(ms);
        }
        if let Some(rate) = self.cycles_per_second {
            config.cycles_per_second = rate;
        }
        if self.paused {
            config.paused = true;
        }
        Ok(config)
    }
}

#[cfg(feature = "serde-spec")]
fn read_config_file(path: &Path) -> Result<EmulatorConfig> {
    let file = casioemu_core::config::ConfigFile::read(path)?;
    Ok(file.into_config())
}

#[cfg(not(feature = "serde-spec"))]
fn read_config_file(path: &Path) -> Result<EmulatorConfig> {
    bail!(
        "cannot read {}: built without the serde-spec feature",
        path.display()
    )
}

#[cfg(feature = "sdl")]
fn windowed_frontend() -> Result<Box<dyn Frontend>> {
    Ok(Box::new(casioemu_core::frontend::SdlFrontend::new()?))
}

#[cfg(not(feature = "sdl"))]
fn windowed_frontend() -> Result<Box<dyn Frontend>> {
    warn!("built without the sdl feature, running headless");
    Ok(Box::new(HeadlessFrontend::new()))
}

fn spawn_console_reader() -> Result<Receiver<String>> {
    let (lines, input) = mpsc::channel();
    thread::Builder::new()
        .name("console".into())
        .spawn(move || forward_lines(io::stdin().lock(), &lines))
        .context("spawning console reader")?;
    Ok(input)
}

/// Send each input line, lossily decoded, until EOF or the receiver goes away.
fn forward_lines(mut reader: impl BufRead, lines: &Sender<String>) {
    let mut raw = Vec::new();
    loop {
        raw.clear();
        match reader.read_until(b'\n', &mut raw) {
            Ok(0) => break,
            Ok(_) => {
                while matches!(raw.last(), Some(b'\n' | b'\r')) {
                    raw.pop();
                }
                let line = String::from_utf8_lossy(&raw).into_owned();
                if lines.send(line).is_err() {
                    break;
                }
            }
            Err(err) => {
                warn!("console input failed: {err}");
                break;
            }
        }
    }
}

fn prompt(continuation: bool) {
    print!("{}", if continuation { ">> " } else { "> " });
    // a failed flush only loses the prompt
    let _ = io::stdout().flush();
}

fn run(cli: Cli) -> Result<()> {
    let config = cli.emulator_config()?;
    let headless = cli.headless || cfg!(not(feature = "sdl"));
    let frontend: Box<dyn Frontend> = if cli.headless {
        Box::new(HeadlessFrontend::new())
    } else {
        windowed_frontend()?
    };

    let mut emulator = Emulator::new(config, Box::new(IdleChipset::new()), frontend)
        .context("starting emulator")?;
    info!(
        "console ready for {}",
        emulator.config().model_dir.display()
    );

    let mut console = Some(spawn_console_reader()?);
    prompt(false);

    while emulator.running() {
        emulator.pump_frontend();

        let Some(input) = &console else {
            thread::sleep(HOST_POLL);
            continue;
        };
        match input.recv_timeout(HOST_POLL) {
            Ok(line) => {
                emulator.execute_command(&line);
                prompt(emulator.command_pending());
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => {
                info!("console input closed");
                console = None;
                if headless {
                    emulator.shutdown();
                }
            }
        }
    }

    let stats = emulator.stats();
    info!("delivered {} ticks", stats.ticks_delivered);
    Ok(())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_utf8_line_does_not_end_console() {
        let input: &[u8] = b"x = 1\nprint('caf\xe9')\r\ny = 2\n";
        let (lines, received) = mpsc::channel();
        forward_lines(input, &lines);
        drop(lines);

        let got: Vec<String> = received.iter().collect();
        assert_eq!(got, vec!["x = 1", "print('caf\u{fffd}')", "y = 2"]);
    }

    #[test]
    fn cli_flags_override_defaults() {
        let cli = Cli::parse_from([
            "casioemu",
            "models/sample",
            "--cycles-per-second",
            "1000",
            "--timer-interval-ms",
            "5",
            "--paused",
        ]);
        let config = cli.emulator_config().unwrap();
        assert_eq!(config.model_dir, PathBuf::from("models/sample"));
        assert_eq!(config.cycles_per_second, 1000);
        assert_eq!(config.timer_interval, Duration::from_millis(5));
        assert!(config.paused);
    }
}
