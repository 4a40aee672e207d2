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
use super::*;

/// Save/restore stack for the surface clip rectangle.
///
/// `push` records whatever clip the surface currently has; `pop` puts it back.
/// The unclipped state is the explicit `None` sentinel, never a zero-size
/// rectangle, so "no clipping" and "clip everything away" stay distinguishable.
/// Nested canvas draws and offscreen sub-passes bracket themselves with a
/// push/pop pair so sibling draws never observe leaked clip state.
#[derive(Default)]
pub struct ClipStack {
    saved: Vec<Option<Recti>>,
}

impl ClipStack {
    /// Creates an empty stack.
    pub fn new() -> Self { Self { saved: Vec::new() } }

    /// Saves the surface's current clip rectangle.
    pub fn push(&mut self, surface: &mut dyn Surface) { self.saved.push(surface.clip()); }

    /// Restores the most recently saved clip rectangle. Popping an empty stack
    /// leaves the surface untouched.
    pub fn pop(&mut self, surface: &mut dyn Surface) {
        if let Some(clip) = self.saved.pop() {
            surface.set_clip(clip);
        }
    }

    /// Returns the number of saved entries.
    pub fn depth(&self) -> usize { self.saved.len() }
}

/// Computes the clipped destination rectangle and the proportionally cropped
/// source rectangle for a scaled blit. Returns `None` when nothing is visible.
pub(crate) fn clip_blit(dst_r: Recti, src_r: Recti, clip_r: Recti) -> Option<(Recti, Recti)> {
    match dst_r.intersect(&clip_r) {
        Some(rect) if rect.width == dst_r.width && rect.height == dst_r.height => Some((dst_r, src_r)),
        Some(rect) if rect.width != 0 && rect.height != 0 => {
            let dx = dst_r.x as f32;
            let dy = dst_r.y as f32;
            let dw = dst_r.width as f32;
            let dh = dst_r.height as f32;

            let tx = (rect.x as f32 - dx) / dw;
            let ty = (rect.y as f32 - dy) / dh;
            let tw = ((rect.x + rect.width) as f32 - dx) / dw;
            let th = ((rect.y + rect.height) as f32 - dy) / dh;

            let sx = src_r.x as f32;
            let sy = src_r.y as f32;
            let sw = src_r.width as f32;
            let sh = src_r.height as f32;

            let st_x = sx + tx * sw;
            let st_y = sy + ty * sh;
            let st_w = sx + tw * sw - st_x;
            let st_h = sy + th * sh - st_y;

            Some((rect, Recti::new(st_x as _, st_y as _, st_w as _, st_h as _)))
        }
        _ => None,
    }
}

/// Paints the debug outline: a 1-pixel box plus both diagonals, white while the
/// widget is enabled and red while disabled.
pub(crate) fn draw_outline(surface: &mut dyn Surface, r: Recti, enabled: bool) {
    if r.width <= 0 || r.height <= 0 {
        return;
    }
    let c = if enabled { color(255, 255, 255, 255) } else { color(255, 0, 0, 255) };
    surface.fill_rect(rect(r.x + 1, r.y, r.width - 2, 1), c);
    surface.fill_rect(rect(r.x + 1, r.y + r.height - 1, r.width - 2, 1), c);
    surface.fill_rect(rect(r.x, r.y, 1, r.height), c);
    surface.fill_rect(rect(r.x + r.width - 1, r.y, 1, r.height), c);
    surface.draw_line(vec2(r.x, r.y), vec2(r.x + r.width - 1, r.y + r.height - 1), c);
    surface.draw_line(vec2(r.x, r.y + r.height - 1), vec2(r.x + r.width - 1, r.y), c);
}
