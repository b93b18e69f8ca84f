//! SDL2 window frontend.

use std::path::Path;

use log::debug;
use sdl2::event::Event;
use sdl2::image::{InitFlag, LoadSurface, Sdl2ImageContext};
use sdl2::pixels::Color;
use sdl2::surface::Surface;
use sdl2::video::Window;
use sdl2::{EventPump, Sdl, VideoSubsystem};

use super::Frontend;
use crate::error::FatalError;

struct Open {
    window: Window,
    interface: Option<Surface<'static>>,
}

/// Frontend backed by an SDL2 window.
pub struct SdlFrontend {
    _sdl: Sdl,
    video: VideoSubsystem,
    _image: Sdl2ImageContext,
    events: EventPump,
    open: Option<Open>,
}

impl SdlFrontend {
    /// Initialise SDL video and SDL_image.
    pub fn new() -> Result<Self, FatalError> {
        let sdl = sdl2::init().map_err(|e| FatalError::Frontend(format!("SDL_Init failed: {e}")))?;
        let video = sdl
            .video()
            .map_err(|e| FatalError::Frontend(format!("SDL video init failed: {e}")))?;
        let image = sdl2::image::init(InitFlag::PNG | InitFlag::JPG)
            .map_err(|e| FatalError::Frontend(format!("IMG_Init failed: {e}")))?;
        let events = sdl
            .event_pump()
            .map_err(|e| FatalError::Frontend(format!("SDL event pump failed: {e}")))?;

        Ok(Self {
            _sdl: sdl,
            video,
            _image: image,
            events,
            open: None,
        })
    }
}

impl Frontend for SdlFrontend {
    fn open_window(&mut self, title: &str, width: u32, height: u32) -> Result<(), FatalError> {
        let window = self
            .video
            .window(title, width, height)
            .build()
            .map_err(|e| FatalError::Frontend(format!("SDL_CreateWindow failed: {e}")))?;
        self.open = Some(Open {
            window,
            interface: None,
        });
        Ok(())
    }

    fn present_interface(&mut self, image: &Path) -> Result<(), FatalError> {
        let open = self
            .open
            .as_mut()
            .ok_or_else(|| FatalError::Frontend("no window to present on".into()))?;

        let loaded = Surface::from_file(image)
            .map_err(|e| FatalError::Frontend(format!("IMG_Load failed: {e}")))?;

        let mut window_surface = open
            .window
            .surface(&self.events)
            .map_err(|e| FatalError::Frontend(format!("SDL_GetWindowSurface failed: {e}")))?;
        let interface = loaded
            .convert(&window_surface.pixel_format())
            .map_err(|e| FatalError::Frontend(format!("SDL_ConvertSurface failed: {e}")))?;

        window_surface
            .fill_rect(None, Color::RGB(255, 255, 255))
            .map_err(FatalError::Frontend)?;
        interface
            .blit(None, &mut window_surface, None)
            .map_err(FatalError::Frontend)?;
        window_surface
            .update_window()
            .map_err(FatalError::Frontend)?;

        debug!("presented interface image {}", image.display());
        open.interface = Some(interface);
        Ok(())
    }

    fn poll_quit(&mut self) -> bool {
        let mut quit = false;
        for event in self.events.poll_iter() {
            if let Event::Quit { .. } = event {
                quit = true;
            }
        }
        quit
    }

    fn close(&mut self) {
        // surface goes before the window it was converted for
        if let Some(mut open) = self.open.take() {
            open.interface = None;
            drop(open.window);
        }
    }
}
