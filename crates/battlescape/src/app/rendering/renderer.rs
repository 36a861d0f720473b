use std::sync::Arc;

use pixels::{Error, Pixels, SurfaceTexture, TextureError};
use tracing::warn;
use winit::window::Window;

use crate::map::{MapView, Viewport};
use crate::world::Battlefield;

use super::{FrameSurface, SpriteBank};

/// Owns the pixel buffer. The buffer keeps the logical viewport size and is
/// scaled onto the window surface, so map drawing never sees window pixels.
pub struct Renderer {
    pixels: Pixels<'static>,
    logical: Viewport,
    window_width: u32,
    window_height: u32,
}

impl Renderer {
    pub fn new(window: Arc<Window>, logical: Viewport) -> Result<Self, Error> {
        let size = window.inner_size();
        let surface = SurfaceTexture::new(size.width, size.height, window);
        let pixels = Pixels::new(buffer_dim(logical.width), buffer_dim(logical.height), surface)?;
        Ok(Self {
            pixels,
            logical,
            window_width: size.width,
            window_height: size.height,
        })
    }

    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), TextureError> {
        if width == 0 || height == 0 {
            return Ok(());
        }
        self.pixels.resize_surface(width, height)?;
        self.window_width = width;
        self.window_height = height;
        Ok(())
    }

    /// Window pixels per logical pixel on each axis.
    pub fn pointer_scale(&self) -> (f64, f64) {
        pointer_scale(self.window_width, self.window_height, self.logical)
    }

    /// Recomposes the map into the pixel buffer.
    pub fn compose(&mut self, view: &mut MapView, battlefield: &Battlefield, sprites: &SpriteBank) {
        let width = buffer_dim(self.logical.width);
        let height = buffer_dim(self.logical.height);
        match FrameSurface::new(self.pixels.frame_mut(), width, height) {
            Some(mut surface) => view.draw(battlefield, sprites, &mut surface),
            None => warn!(width, height, "frame_buffer_size_mismatch"),
        }
    }

    /// Presents the current buffer, recomposed or not.
    pub fn present(&self) -> Result<(), Error> {
        self.pixels.render()
    }
}

fn buffer_dim(value: i32) -> u32 {
    value.max(1) as u32
}

fn pointer_scale(window_width: u32, window_height: u32, logical: Viewport) -> (f64, f64) {
    let scale = |window: u32, logical: i32| {
        if window == 0 || logical <= 0 {
            1.0
        } else {
            window as f64 / logical as f64
        }
    };
    (
        scale(window_width, logical.width),
        scale(window_height, logical.height),
    )
}
