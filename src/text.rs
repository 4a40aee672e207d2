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
use crate::render::ClipStack;

#[derive(Default, Copy, Clone, Debug, PartialEq, Eq)]
/// Horizontal alignment of text lines inside the widget rectangle.
pub enum Alignment {
    #[default]
    /// Lines start at the left edge.
    Left,
    /// Short lines are centered against the longest line.
    Center,
    /// Lines end at the right edge.
    Right,
}

/// State of a text widget: the string split into lines plus the presentation
/// attributes. The widget rectangle is derived from the measured text, so the
/// scene resizes the node whenever text or scale change.
pub(crate) struct TextState {
    text: String,
    lines: Vec<String>,
    max_chars: usize,
    pub color: Color,
    pub scale: i32,
    pub align: Alignment,
}

impl TextState {
    pub fn new(text: &str) -> Self {
        let mut state = Self {
            text: String::new(),
            lines: Vec::new(),
            max_chars: 0,
            color: color(255, 255, 255, 255),
            scale: 1,
            align: Alignment::Left,
        };
        state.set_text(text);
        state
    }

    pub fn text(&self) -> &str { &self.text }

    pub fn set_text(&mut self, text: &str) {
        self.text = text.to_string();
        self.lines = self.text.lines().map(String::from).collect();
        self.max_chars = self.lines.iter().map(|l| l.chars().count()).max().unwrap_or(0);
    }

    pub fn set_scale(&mut self, scale: i32) { self.scale = scale.clamp(1, 255); }

    /// Pixel size of the rendered block for the given glyph cell size.
    pub fn measure(&self, glyph: Dimensioni) -> Dimensioni {
        Dimensioni::new(
            self.max_chars as i32 * glyph.width * self.scale,
            self.lines.len() as i32 * glyph.height * self.scale,
        )
    }

    pub fn draw(&self, surface: &mut dyn Surface, clips: &mut ClipStack, sheet: &FontSheet, abs: Recti) {
        if abs.width <= 0 || abs.height <= 0 {
            return;
        }
        clips.push(surface);
        let merged = match surface.clip() {
            Some(clip) => clip.intersect(&abs).unwrap_or(rect(abs.x, abs.y, 0, 0)),
            None => abs,
        };
        surface.set_clip(Some(merged));

        let gw = sheet.glyph.width * self.scale;
        let gh = sheet.glyph.height * self.scale;
        let mut oy = abs.y;
        for line in &self.lines {
            let len = line.chars().count() as i32;
            let pad = (self.max_chars as i32 - len) * gw;
            let mut ox = abs.x
                + match self.align {
                    Alignment::Left => 0,
                    Alignment::Center => pad / 2,
                    Alignment::Right => pad,
                };
            for c in line.chars() {
                surface.blit(sheet.bitmap.texture, sheet.glyph_rect(c), rect(ox, oy, gw, gh), self.color, BlendMode::Alpha);
                ox += gw;
            }
            oy += gh;
        }
        clips.pop(surface);
    }
}
