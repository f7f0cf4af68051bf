//! CPU-side atlas surface
//!
//! A flat RGBA8 pixel buffer with a known stride. `flipped` means memory row 0
//! is the bottom of the texture (GL convention). The dirty flag tells the host
//! the page needs to be re-uploaded.

use crate::constants::ATLAS_BYTES_PER_PIXEL;

/// Packed RGBA8 pixel surface backing one atlas page
#[derive(Debug, Clone)]
pub struct Surface {
    width: u32,
    height: u32,
    /// Bytes per row
    stride: usize,
    flipped: bool,
    srgb: bool,
    pixels: Vec<u8>,
    dirty: bool,
}

impl Surface {
    /// Transparent surface
    pub fn new(width: u32, height: u32, flipped: bool, srgb: bool) -> Self {
        let stride = width as usize * ATLAS_BYTES_PER_PIXEL;
        Self {
            width,
            height,
            stride,
            flipped,
            srgb,
            pixels: vec![0u8; stride * height as usize],
            dirty: false,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Memory row 0 is the bottom row in texture space
    pub fn is_flipped(&self) -> bool {
        self.flipped
    }

    /// Pixels are sRGB-encoded
    pub fn is_srgb(&self) -> bool {
        self.srgb
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn pixels_mut(&mut self) -> &mut [u8] {
        &mut self.pixels
    }

    /// RGBA at memory coordinates
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let i = y as usize * self.stride + x as usize * ATLAS_BYTES_PER_PIXEL;
        [
            self.pixels[i],
            self.pixels[i + 1],
            self.pixels[i + 2],
            self.pixels[i + 3],
        ]
    }

    /// Mark for GPU re-upload
    pub fn invalidate(&mut self) {
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub(crate) fn clear_dirty(&mut self) {
        self.dirty = false;
    }

    /// Rows in top-down texture order, packed (for image export)
    pub fn to_top_down_rgba(&self) -> Vec<u8> {
        let row_bytes = self.width as usize * ATLAS_BYTES_PER_PIXEL;
        let mut out = Vec::with_capacity(row_bytes * self.height as usize);
        for y in 0..self.height as usize {
            let src_y = if self.flipped {
                self.height as usize - 1 - y
            } else {
                y
            };
            let start = src_y * self.stride;
            out.extend_from_slice(&self.pixels[start..start + row_bytes]);
        }
        out
    }
}
