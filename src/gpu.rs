//! GL upload of atlas pages (feature `gl`)
//!
//! One RGBA texture per atlas page. Pages are uploaded as stored: memory row 0
//! becomes the first row GL receives, which is the bottom of the texture, so
//! faces meant for GL should use flipped atlases.

use anyhow::{anyhow, Result};
use glow::HasContext;
use log::{debug, info};

use crate::atlas::{AtlasId, Surface};
use crate::face::FontFace;
use crate::raster::Rasterizer;

/// GL textures mirroring a face's atlas pages
pub struct AtlasTextures {
    textures: Vec<glow::Texture>,
}

impl AtlasTextures {
    pub fn new() -> Self {
        Self {
            textures: Vec::new(),
        }
    }

    /// Texture backing page `id`, once uploaded
    pub fn texture(&self, id: AtlasId) -> Option<glow::Texture> {
        self.textures.get(id.index()).copied()
    }

    /// Re-upload every page the face has touched since the last call
    ///
    /// Returns the number of pages uploaded.
    pub fn upload_if_dirty<R: Rasterizer>(
        &mut self,
        gl: &glow::Context,
        face: &mut FontFace<R>,
    ) -> Result<usize> {
        let dirty = face.take_dirty();
        for (id, surface) in &dirty {
            // Pages are created in order, so a new page is always the next index
            while self.textures.len() <= id.index() {
                let texture = unsafe { create_texture(gl)? };
                info!("Atlas texture created for page {}", self.textures.len());
                self.textures.push(texture);
            }
            unsafe { upload(gl, self.textures[id.index()], surface) };
            debug!(
                "Atlas page {} re-uploaded ({}x{})",
                id.index(),
                surface.width(),
                surface.height()
            );
        }
        Ok(dirty.len())
    }

    /// Bind page `id` to a texture unit
    pub fn bind(&self, gl: &glow::Context, id: AtlasId, unit: u32) {
        unsafe {
            gl.active_texture(glow::TEXTURE0 + unit);
            gl.bind_texture(glow::TEXTURE_2D, self.texture(id));
        }
    }

    pub fn destroy(&mut self, gl: &glow::Context) {
        unsafe {
            for texture in self.textures.drain(..) {
                gl.delete_texture(texture);
            }
        }
    }
}

impl Default for AtlasTextures {
    fn default() -> Self {
        Self::new()
    }
}

unsafe fn create_texture(gl: &glow::Context) -> Result<glow::Texture> {
    let texture = gl
        .create_texture()
        .map_err(|e| anyhow!("Failed to create atlas texture: {}", e))?;
    gl.bind_texture(glow::TEXTURE_2D, Some(texture));
    gl.tex_parameter_i32(
        glow::TEXTURE_2D,
        glow::TEXTURE_MIN_FILTER,
        glow::LINEAR as i32,
    );
    gl.tex_parameter_i32(
        glow::TEXTURE_2D,
        glow::TEXTURE_MAG_FILTER,
        glow::LINEAR as i32,
    );
    gl.tex_parameter_i32(
        glow::TEXTURE_2D,
        glow::TEXTURE_WRAP_S,
        glow::CLAMP_TO_EDGE as i32,
    );
    gl.tex_parameter_i32(
        glow::TEXTURE_2D,
        glow::TEXTURE_WRAP_T,
        glow::CLAMP_TO_EDGE as i32,
    );
    gl.bind_texture(glow::TEXTURE_2D, None);
    Ok(texture)
}

unsafe fn upload(gl: &glow::Context, texture: glow::Texture, surface: &Surface) {
    // SRGB8_ALPHA8: linearized automatically when sampled
    let internal = if surface.is_srgb() {
        glow::SRGB8_ALPHA8
    } else {
        glow::RGBA8
    };
    gl.bind_texture(glow::TEXTURE_2D, Some(texture));
    gl.pixel_store_i32(
        glow::UNPACK_ROW_LENGTH,
        (surface.stride() / crate::constants::ATLAS_BYTES_PER_PIXEL) as i32,
    );
    gl.tex_image_2d(
        glow::TEXTURE_2D,
        0,
        internal as i32,
        surface.width() as i32,
        surface.height() as i32,
        0,
        glow::RGBA,
        glow::UNSIGNED_BYTE,
        Some(surface.pixels()),
    );
    gl.pixel_store_i32(glow::UNPACK_ROW_LENGTH, 0);
    gl.bind_texture(glow::TEXTURE_2D, None);
}
