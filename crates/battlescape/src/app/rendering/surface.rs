use super::sprites::Sprite;

/// A blit target. The map only ever clears it and copies sprites onto it.
pub trait Surface {
    fn clear(&mut self);
    fn blit(&mut self, sprite: &Sprite, x: i32, y: i32);
}

pub const CLEAR_COLOR: [u8; 4] = [0, 0, 0, 255];

/// Surface over a borrowed RGBA8 frame, such as the `pixels` back buffer.
/// Blits are clipped to the frame; transparent sprite pixels are skipped.
pub struct FrameSurface<'a> {
    frame: &'a mut [u8],
    width: u32,
    height: u32,
}

impl<'a> FrameSurface<'a> {
    /// Returns `None` when `frame` is smaller than `width` x `height` pixels.
    pub fn new(frame: &'a mut [u8], width: u32, height: u32) -> Option<Self> {
        let needed = (width as usize)
            .checked_mul(height as usize)?
            .checked_mul(4)?;
        if frame.len() < needed {
            return None;
        }
        Some(Self {
            frame,
            width,
            height,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }
}

impl Surface for FrameSurface<'_> {
    fn clear(&mut self) {
        for pixel in self.frame.chunks_exact_mut(4) {
            pixel.copy_from_slice(&CLEAR_COLOR);
        }
    }

    fn blit(&mut self, sprite: &Sprite, x: i32, y: i32) {
        let (sprite_w, sprite_h) = (sprite.width() as i32, sprite.height() as i32);
        let draw_left = x.max(0);
        let draw_top = y.max(0);
        let draw_right = (x + sprite_w).min(self.width as i32);
        let draw_bottom = (y + sprite_h).min(self.height as i32);
        if draw_left >= draw_right || draw_top >= draw_bottom {
            return;
        }

        let rgba = sprite.rgba();
        let frame_width = self.width as usize;
        for out_y in draw_top..draw_bottom {
            let src_row = (out_y - y) as usize * sprite_w as usize * 4;
            let dst_row = out_y as usize * frame_width * 4;
            for out_x in draw_left..draw_right {
                let src = src_row + (out_x - x) as usize * 4;
                if rgba[src + 3] == 0 {
                    continue;
                }
                let dst = dst_row + out_x as usize * 4;
                self.frame[dst..dst + 4].copy_from_slice(&rgba[src..src + 4]);
            }
        }
    }
}
