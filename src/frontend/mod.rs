// Copyright (C) 2025 Dayton Fishell
// casioemu host
// This file is part of casioemu.
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version. See the LICENSE file in the project root for details.
// SPDX-License-Identifier: GPL-3.0-or-later

//! Display surfaces the emulator can present its interface on.
//!
//! The host only needs a window of the model's size with the interface image
//! blitted onto it once, plus a way to notice the user closing that window.

#[cfg(feature = "sdl")]
pub mod sdl;

use std::path::{Path, PathBuf};

use log::info;

use crate::error::FatalError;

#[cfg(feature = "sdl")]
pub use sdl::SdlFrontend;

/// Window owner. Lives on the host thread only.
pub trait Frontend {
    /// Create the window. Failure is fatal.
    fn open_window(&mut self, title: &str, width: u32, height: u32) -> Result<(), FatalError>;

    /// Load the interface image and show it on a white background.
    fn present_interface(&mut self, image: &Path) -> Result<(), FatalError>;

    /// Drain pending window events; `true` if the user asked to quit.
    fn poll_quit(&mut self) -> bool;

    /// Free surfaces and destroy the window.
    fn close(&mut self);
}

/// Window geometry as recorded by [`HeadlessFrontend`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadlessWindow {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub interface: Option<PathBuf>,
}

/// Frontend with no display; used for servers, tests and `--headless`.
#[derive(Debug, Default)]
pub struct HeadlessFrontend {
    window: Option<HeadlessWindow>,
}

impl HeadlessFrontend {
    pub fn new() -> Self {
        Self::default()
    }

    /// The window that would be shown, if one is open.
    pub fn window(&self) -> Option<&HeadlessWindow> {
        self.window.as_ref()
    }
}

impl Frontend for HeadlessFrontend {
    fn open_window(&mut self, title: &str, width: u32, height: u32) -> Result<(), FatalError> {
        info!("headless window '{title}' ({width}x{height})");
        self.window = Some(HeadlessWindow {
            title: title.to_owned(),
            width,
            height,
            interface: None,
        });
        Ok(())
    }

    fn present_interface(&mut self, image: &Path) -> Result<(), FatalError> {
        let window = self
            .window
            .as_mut()
            .ok_or_else(|| FatalError::Frontend("no window to present on".into()))?;
        if !image.is_file() {
            return Err(FatalError::Frontend(format!(
                "interface image {} not found",
                image.display()
            )));
        }
        window.interface = Some(image.to_path_buf());
        Ok(())
    }

    fn poll_quit(&mut self) -> bool {
        false
    }

    fn close(&mut self) {
        self.window = None;
    }
}
