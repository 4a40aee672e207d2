//
// Copyright 2022-Present (c) Raja Lehtihet & Wael El Oraiby
//
// Redistribution and use in source and binary forms, with or without
// modification, are permitted provided that the following conditions are met:
//
// 1. Redistributions of source code must retain the above copyright notice,
// this list of conditions and the following disclaimer.
//
// 2. Redistributions in binary form must reproduce the above copyright notice,
// this list of conditions and the following disclaimer in the documentation
// and/or other materials provided with the distribution.
//
// 3. Neither the name of the copyright holder nor the names of its contributors
// may be used to endorse or promote products derived from this software without
// specific prior written permission.
//
// THIS SOFTWARE IS PROVIDED BY THE COPYRIGHT HOLDERS AND CONTRIBUTORS "AS IS"
// AND ANY EXPRESS OR IMPLIED WARRANTIES, INCLUDING, BUT NOT LIMITED TO, THE
// IMPLIED WARRANTIES OF MERCHANTABILITY AND FITNESS FOR A PARTICULAR PURPOSE
// ARE DISCLAIMED. IN NO EVENT SHALL THE COPYRIGHT HOLDER OR CONTRIBUTORS BE
// LIABLE FOR ANY DIRECT, INDIRECT, INCIDENTAL, SPECIAL, EXEMPLARY, OR
// CONSEQUENTIAL DAMAGES (INCLUDING, BUT NOT LIMITED TO, PROCUREMENT OF
// SUBSTITUTE GOODS OR SERVICES; LOSS OF USE, DATA, OR PROFITS; OR BUSINESS
// INTERRUPTION) HOWEVER CAUSED AND ON ANY THEORY OF LIABILITY, WHETHER IN
// CONTRACT, STRICT LIABILITY, OR TORT (INCLUDING NEGLIGENCE OR OTHERWISE)
// ARISING IN ANY WAY OUT OF THE USE OF THIS SOFTWARE, EVEN IF ADVISED OF THE
// POSSIBILITY OF SUCH DAMAGE.
//
#![deny(missing_docs)]
//! `patchwork-ui` provides a retained-mode 2D user-interface layer: a tree of positioned,
//! clippable widgets owned by an explicit [`Scene`], fed with pointer events and rendered
//! through a host-supplied [`Surface`]. Scalable image widgets composite with the
//! nine-slice and tiled algorithms; hover enter/exit pairing is tracked across nested,
//! z-ordered canvases.

mod arena;
mod container;
mod image;
mod node;
mod render;
mod scene;
mod text;

pub use arena::WidgetRef;
pub use image::{DrawMode, SliceSpec, TileRate};
pub use node::EventHandler;
pub use render::ClipStack;
pub use rs_math3d::*;
pub use scene::Scene;
pub use text::Alignment;

use bitflags::*;

#[cfg(feature = "png_source")]
use std::io::Cursor;

#[cfg(feature = "png_source")]
use png::{ColorType, Decoder};

bitflags! {
    #[derive(Copy, Clone, Debug, PartialEq, Eq)]
    /// Mouse button state as reported by the host input system.
    pub struct MouseButton : u32 {
        /// Middle mouse button.
        const MIDDLE = 4;
        /// Right mouse button.
        const RIGHT = 2;
        /// Left mouse button.
        const LEFT = 1;
        /// No buttons pressed.
        const NONE = 0;
    }
}

impl MouseButton {
    /// Returns `true` if the middle mouse button is pressed.
    pub fn is_middle(&self) -> bool { self.intersects(Self::MIDDLE) }
    /// Returns `true` if the right mouse button is pressed.
    pub fn is_right(&self) -> bool { self.intersects(Self::RIGHT) }
    /// Returns `true` if the left mouse button is pressed.
    pub fn is_left(&self) -> bool { self.intersects(Self::LEFT) }
    /// Returns `true` if no mouse buttons are pressed.
    pub fn is_none(&self) -> bool { self.bits() == 0 }
}

#[derive(Copy, Clone, Debug)]
/// Discrete pointer event delivered by the host, in surface coordinates.
pub enum PointerEvent {
    /// The pointer moved to the given position.
    Moved(Vec2i),
    /// A button was pressed at the given position.
    ButtonDown(Vec2i, MouseButton),
    /// A button was released at the given position.
    ButtonUp(Vec2i, MouseButton),
}

impl PointerEvent {
    /// Returns the pointer position the event was delivered at.
    pub fn position(&self) -> Vec2i {
        match self {
            Self::Moved(pos) | Self::ButtonDown(pos, _) | Self::ButtonUp(pos, _) => *pos,
        }
    }
}

#[derive(Default, Copy, Clone, Debug, PartialEq, Eq)]
#[repr(C)]
/// Simple RGBA color stored with 8-bit components.
pub struct Color {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
    /// Alpha channel.
    pub a: u8,
}

#[derive(Default, Copy, Clone, Debug, PartialEq, Eq)]
/// Compositing mode applied when a rectangle is blitted onto the target.
pub enum BlendMode {
    #[default]
    /// Source pixels overwrite the target.
    Opaque,
    /// Straight-alpha blend of source over target.
    Alpha,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
/// Handle referencing a host-owned texture.
pub struct TextureId(u32);

impl TextureId {
    /// Creates a handle from a raw host identifier.
    pub fn new(raw: u32) -> Self { Self(raw) }

    /// Returns the raw numeric identifier stored inside the handle.
    pub fn raw(self) -> u32 { self.0 }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
/// Decoded image reference: a host texture plus its natural pixel size.
/// Immutable after creation.
pub struct Bitmap {
    /// Texture holding the pixels.
    pub texture: TextureId,
    /// Natural width/height of the texture in pixels.
    pub size: Dimensioni,
}

impl Bitmap {
    /// Creates a bitmap descriptor for an already-uploaded texture.
    pub fn new(texture: TextureId, width: i32, height: i32) -> Self {
        Self { texture, size: Dimensioni::new(width, height) }
    }

    /// Returns `true` if either dimension is non-positive.
    pub fn is_empty(&self) -> bool { self.size.width <= 0 || self.size.height <= 0 }
}

#[derive(Copy, Clone, Debug)]
/// Fixed-grid bitmap font: glyph cells of one size laid out row-major on a sheet,
/// covering consecutive characters starting at `first_char`.
pub struct FontSheet {
    /// Sheet texture and size.
    pub bitmap: Bitmap,
    /// Pixel size of a single glyph cell.
    pub glyph: Dimensioni,
    /// First character covered by the sheet (`b' '` for the classic ASCII strip).
    pub first_char: u8,
}

impl FontSheet {
    /// Creates a font sheet descriptor.
    pub fn new(bitmap: Bitmap, glyph: Dimensioni, first_char: u8) -> Self { Self { bitmap, glyph, first_char } }

    fn columns(&self) -> i32 { std::cmp::max(1, self.bitmap.size.width / std::cmp::max(1, self.glyph.width)) }

    fn rows(&self) -> i32 { std::cmp::max(1, self.bitmap.size.height / std::cmp::max(1, self.glyph.height)) }

    /// Returns the source cell for `c`, falling back to `'?'` for characters
    /// outside the sheet's range.
    pub fn glyph_rect(&self, c: char) -> Recti {
        let count = (self.columns() * self.rows()) as i64;
        let index_of = |c: char| -> Option<i32> {
            let idx = c as i64 - self.first_char as i64;
            if idx >= 0 && idx < count { Some(idx as i32) } else { None }
        };
        let idx = index_of(c).or_else(|| index_of('?')).unwrap_or(0);
        rect(
            (idx % self.columns()) * self.glyph.width,
            (idx / self.columns()) * self.glyph.height,
            self.glyph.width,
            self.glyph.height,
        )
    }
}

/// Drawing boundary implemented by the host. All scene rendering goes through these
/// calls; the scene never touches pixels itself.
///
/// Clipping is a single piece of surface state; `None` means unclipped. The scene
/// saves and restores it with a [`ClipStack`] so nested draws cannot leak clip state
/// to siblings.
pub trait Surface {
    /// Uploads RGBA8888 pixels and returns a texture handle.
    fn create_texture(&mut self, width: i32, height: i32, pixels: &[u8]) -> TextureId;
    /// Blits the `src` sub-rectangle of `texture` into `dst`, scaling as needed,
    /// modulated by `tint` and composited with `blend`.
    fn blit(&mut self, texture: TextureId, src: Recti, dst: Recti, tint: Color, blend: BlendMode);
    /// Fills a solid rectangle.
    fn fill_rect(&mut self, rect: Recti, color: Color);
    /// Draws a 1-pixel line between two points. Used for debug outlines.
    fn draw_line(&mut self, from: Vec2i, to: Vec2i, color: Color);
    /// Replaces the clip rectangle; `None` disables clipping.
    fn set_clip(&mut self, clip: Option<Recti>);
    /// Returns the current clip rectangle, `None` when unclipped.
    fn clip(&self) -> Option<Recti>;
    /// Redirects subsequent draw calls to a transparent scratch target of the given size.
    fn push_offscreen(&mut self, size: Dimensioni);
    /// Restores the previous target and composites the `src` region of the scratch
    /// target into `dst` on it, modulated by `tint` and composited with `blend`.
    fn pop_offscreen(&mut self, src: Recti, dst: Recti, tint: Color, blend: BlendMode);
}

/// Describes image bytes that can be uploaded to a texture.
#[derive(Copy, Clone)]
pub enum ImageSource<'a> {
    /// Raw RGBA pixels laid out as width × height × 4 bytes.
    Raw {
        /// Width in pixels.
        width: i32,
        /// Height in pixels.
        height: i32,
        /// Pixel buffer in RGBA8888 format.
        pixels: &'a [u8],
    },
    #[cfg(feature = "png_source")]
    /// PNG-compressed byte slice (requires the `png_source` feature).
    /// Grayscale and RGB images are expanded to opaque RGBA (alpha = 255).
    Png {
        /// Compressed PNG payload.
        bytes: &'a [u8],
    },
}

/// Uploads image data described by `source` through the surface and returns a
/// [`Bitmap`] descriptor for it. Decoding failures are reported as `Err`, never
/// as a panic.
pub fn load_bitmap(surface: &mut dyn Surface, source: ImageSource<'_>) -> Result<Bitmap, String> {
    match source {
        ImageSource::Raw { width, height, pixels } => {
            check_rgba_len(width, height, pixels.len())?;
            let texture = surface.create_texture(width, height, pixels);
            Ok(Bitmap::new(texture, width, height))
        }
        #[cfg(feature = "png_source")]
        ImageSource::Png { bytes } => {
            let (width, height, rgba) = decode_png(bytes)?;
            let texture = surface.create_texture(width, height, &rgba);
            Ok(Bitmap::new(texture, width, height))
        }
    }
}

fn check_rgba_len(width: i32, height: i32, len: usize) -> Result<(), String> {
    if width <= 0 || height <= 0 {
        return Err(String::from("Image dimensions must be positive"));
    }
    let expected = width as usize * height as usize * 4;
    if len != expected {
        return Err(format!("Expected {} RGBA bytes, received {}", expected, len));
    }
    Ok(())
}

#[cfg(feature = "png_source")]
fn decode_png(bytes: &[u8]) -> Result<(i32, i32, Vec<u8>), String> {
    let decoder = Decoder::new(Cursor::new(bytes));
    let mut reader = decoder.read_info().map_err(|e| e.to_string())?;
    let buf_size = reader
        .output_buffer_size()
        .ok_or_else(|| "PNG decoder did not report output size".to_string())?;
    let mut buf = vec![0; buf_size];
    let info = reader.next_frame(&mut buf).map_err(|e| e.to_string())?;
    let raw = &buf[..info.buffer_size()];
    let mut rgba = Vec::with_capacity(info.width as usize * info.height as usize * 4);
    match info.color_type {
        ColorType::Rgba => rgba.extend_from_slice(raw),
        ColorType::Rgb => {
            for px in raw.chunks(3) {
                rgba.extend_from_slice(px);
                rgba.push(0xFF);
            }
        }
        ColorType::Grayscale => {
            for &v in raw {
                rgba.extend_from_slice(&[v, v, v, 0xFF]);
            }
        }
        ColorType::GrayscaleAlpha => {
            for px in raw.chunks(2) {
                rgba.extend_from_slice(&[px[0], px[0], px[0], px[1]]);
            }
        }
        _ => return Err("Unsupported PNG color type".into()),
    }
    Ok((info.width as i32, info.height as i32, rgba))
}

/// Convenience constructor for [`Vec2i`].
pub fn vec2(x: i32, y: i32) -> Vec2i { Vec2i { x, y } }

/// Convenience constructor for [`Recti`].
pub fn rect(x: i32, y: i32, w: i32, h: i32) -> Recti { Recti { x, y, width: w, height: h } }

/// Convenience constructor for [`Color`].
pub fn color(r: u8, g: u8, b: u8, a: u8) -> Color { Color { r, g, b, a } }

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn glyph_rect_maps_grid_cells() {
        let sheet = FontSheet::new(Bitmap::new(TextureId::new(1), 128, 96), Dimensioni::new(8, 16), 32);
        // 16 columns; 'A' is 33 cells past space.
        let r = sheet.glyph_rect('A');
        assert_eq!((r.x, r.y, r.width, r.height), ((33 % 16) * 8, (33 / 16) * 16, 8, 16));
    }

    #[test]
    fn glyph_rect_falls_back_to_question_mark() {
        let sheet = FontSheet::new(Bitmap::new(TextureId::new(1), 128, 96), Dimensioni::new(8, 16), 32);
        let fallback = sheet.glyph_rect('\u{1F600}');
        let question = sheet.glyph_rect('?');
        assert_eq!((fallback.x, fallback.y), (question.x, question.y));
    }

    #[test]
    fn rgba_length_is_validated() {
        assert!(check_rgba_len(2, 2, 16).is_ok());
        assert!(check_rgba_len(2, 2, 15).is_err());
        assert!(check_rgba_len(0, 2, 0).is_err());
    }

    #[cfg(feature = "png_source")]
    fn encode_png(color_type: ColorType, data: &[u8], width: u32, height: u32) -> Vec<u8> {
        use png::{BitDepth, Encoder};
        let mut buffer = Vec::new();
        {
            let mut encoder = Encoder::new(&mut buffer, width, height);
            encoder.set_color(color_type);
            encoder.set_depth(BitDepth::Eight);
            let mut writer = encoder.write_header().unwrap();
            writer.write_image_data(data).unwrap();
        }
        buffer
    }

    #[cfg(feature = "png_source")]
    #[test]
    fn png_decode_error_returns_err() {
        assert!(decode_png(&[]).is_err());
    }

    #[cfg(feature = "png_source")]
    #[test]
    fn png_decode_rgb_expands_alpha() {
        let bytes = encode_png(ColorType::Rgb, &[10, 20, 30], 1, 1);
        let (width, height, rgba) = decode_png(&bytes).unwrap();
        assert_eq!((width, height), (1, 1));
        assert_eq!(rgba, vec![10, 20, 30, 0xFF]);
    }

    #[cfg(feature = "png_source")]
    #[test]
    fn png_decode_grayscale_expands_channels() {
        let bytes = encode_png(ColorType::Grayscale, &[7], 1, 1);
        let (_, _, rgba) = decode_png(&bytes).unwrap();
        assert_eq!(rgba, vec![7, 7, 7, 0xFF]);
    }
}
