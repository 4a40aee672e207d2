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
use crate::render::{ClipStack, clip_blit};
use std::cmp::max;

#[derive(Default, Copy, Clone, Debug, PartialEq, Eq)]
/// How an image widget fills its rectangle.
pub enum DrawMode {
    #[default]
    /// One scaled blit of the whole image.
    Normal,
    /// Nine-slice: fixed-size corners, stretched edges and center.
    Sliced,
    /// Regular grid of cells covering the rectangle, partial cells clipped.
    Tiled,
}

#[derive(Default, Copy, Clone, Debug, PartialEq, Eq)]
/// Nine-slice boundaries in source-image pixel space. `left`/`top` and
/// `right`/`bottom` are absolute pixel coordinates of the inner grid lines;
/// the center band keeps the boundary column/row at `right`/`bottom`.
pub struct SliceSpec {
    /// Inner-left boundary.
    pub left: i32,
    /// Inner-top boundary.
    pub top: i32,
    /// Inner-right boundary; negative values are measured from the far edge.
    pub right: i32,
    /// Inner-bottom boundary; negative values are measured from the far edge.
    pub bottom: i32,
}

impl SliceSpec {
    /// Creates a slice specification from the four inner boundaries.
    pub fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self { Self { left, top, right, bottom } }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
/// Tiling rate: how many grid columns and rows cover the destination.
pub struct TileRate {
    /// Column count, at least 1.
    pub cols: i32,
    /// Row count, at least 1.
    pub rows: i32,
}

impl TileRate {
    /// Creates a tiling rate.
    pub fn new(cols: i32, rows: i32) -> Self { Self { cols, rows } }
}

/// State of an image widget. The nine-slice fragment table is cached and
/// recomputed lazily at draw time whenever the slice spec, the destination
/// rectangle, or the draw mode changed since the last draw.
pub(crate) struct ImageState {
    pub bitmap: Bitmap,
    pub mode: DrawMode,
    pub color: Color,
    pub blend: BlendMode,
    slice: Option<SliceSpec>,
    tile: TileRate,
    fragments: [(Recti, Recti); 9],
    dirty: bool,
}

impl ImageState {
    pub fn new(bitmap: Bitmap) -> Self {
        Self {
            bitmap,
            mode: DrawMode::Normal,
            color: color(255, 255, 255, 255),
            blend: BlendMode::Opaque,
            slice: None,
            tile: TileRate::new(1, 1),
            fragments: [(Recti::default(), Recti::default()); 9],
            dirty: true,
        }
    }

    pub fn mark_dirty(&mut self) { self.dirty = true; }

    pub fn slice(&self) -> Option<SliceSpec> { self.slice }

    /// Stores the resolved slice spec. An all-zero spec clears it, which drops
    /// the widget back to a whole-image blit.
    pub fn set_slice(&mut self, raw: SliceSpec) {
        self.slice = resolve_slice_spec(raw, self.bitmap.size);
        self.dirty = true;
    }

    pub fn tile(&self) -> TileRate { self.tile }

    /// Clamps the rate to at least one cell and at most one cell per destination
    /// pixel on each axis.
    pub fn set_tile(&mut self, rate: TileRate, dst: Dimensioni) {
        self.tile = TileRate::new(rate.cols.clamp(1, max(1, dst.width)), rate.rows.clamp(1, max(1, dst.height)));
        self.dirty = true;
    }

    pub fn draw(&mut self, surface: &mut dyn Surface, clips: &mut ClipStack, abs: Recti) {
        if abs.width <= 0 || abs.height <= 0 {
            return;
        }
        match self.mode {
            DrawMode::Normal => self.draw_normal(surface, abs),
            DrawMode::Sliced => match self.slice {
                Some(spec) => self.draw_sliced(surface, spec, abs),
                // Sliced mode without a configured spec degrades to a plain blit.
                None => self.draw_normal(surface, abs),
            },
            DrawMode::Tiled => self.draw_tiled(surface, clips, abs),
        }
    }

    fn draw_normal(&self, surface: &mut dyn Surface, abs: Recti) {
        let src = rect(0, 0, self.bitmap.size.width, self.bitmap.size.height);
        surface.blit(self.bitmap.texture, src, abs, self.color, self.blend);
    }

    fn draw_sliced(&mut self, surface: &mut dyn Surface, spec: SliceSpec, abs: Recti) {
        if self.dirty {
            self.fragments = nine_slice(self.bitmap.size, spec, abs);
            self.dirty = false;
        }
        for (src, dst) in self.fragments {
            if src.width > 0 && src.height > 0 && dst.width > 0 && dst.height > 0 {
                surface.blit(self.bitmap.texture, src, dst, self.color, self.blend);
            }
        }
    }

    /// Tiles are laid into an offscreen scratch buffer the size of the
    /// destination and composited back in a single blit, so the partial edge
    /// cells clip at the rectangle boundary and tint/alpha applies to the fill
    /// as a whole. The clip stack brackets the sub-pass.
    fn draw_tiled(&mut self, surface: &mut dyn Surface, clips: &mut ClipStack, abs: Recti) {
        let step = Dimensioni::new(max(1, abs.width / self.tile.cols), max(1, abs.height / self.tile.rows));
        let area = Dimensioni::new(abs.width, abs.height);

        clips.push(surface);
        surface.push_offscreen(area);
        surface.set_clip(Some(rect(0, 0, area.width, area.height)));
        for (src, dst) in tile_fragments(area, self.bitmap.size, step) {
            surface.blit(self.bitmap.texture, src, dst, color(255, 255, 255, 255), BlendMode::Opaque);
        }
        clips.pop(surface);
        surface.pop_offscreen(rect(0, 0, area.width, area.height), abs, self.color, self.blend);
    }
}

/// Resolves a raw slice spec against the image size: an all-zero spec means
/// "not sliced", negative right/bottom are measured from the far edge, every
/// boundary is clamped into the image, and right/bottom snap up to left/top
/// when the clamped values would cross.
pub(crate) fn resolve_slice_spec(raw: SliceSpec, img: Dimensioni) -> Option<SliceSpec> {
    if raw == SliceSpec::default() {
        return None;
    }
    let mut s = raw;
    if s.right < 0 {
        s.right += img.width;
    }
    if s.bottom < 0 {
        s.bottom += img.height;
    }
    s.left = s.left.clamp(0, img.width);
    s.top = s.top.clamp(0, img.height);
    s.right = s.right.clamp(0, img.width);
    s.bottom = s.bottom.clamp(0, img.height);
    if s.right < s.left {
        s.right = s.left;
    }
    if s.bottom < s.top {
        s.bottom = s.top;
    }
    Some(s)
}

/// Computes the nine (source, destination) rectangle pairs for a sliced blit.
///
/// Source columns split at `{0, left, right+1, width}`: the slice boundaries are
/// absolute pixel coordinates, so the center band is widened by one unit to keep
/// the boundary column/row and avoid a one-pixel seam against the right/bottom
/// strips. Corner destinations keep their source size; the middle spans absorb
/// the remaining destination extent, clamped at zero when the destination is
/// smaller than the combined corners. Fragment order is row-major from the
/// top-left.
pub(crate) fn nine_slice(img: Dimensioni, s: SliceSpec, dst: Recti) -> [(Recti, Recti); 9] {
    let sx = [0, s.left, (s.right + 1).min(img.width), img.width];
    let sy = [0, s.top, (s.bottom + 1).min(img.height), img.height];
    let sw = [sx[1] - sx[0], sx[2] - sx[1], sx[3] - sx[2]];
    let sh = [sy[1] - sy[0], sy[2] - sy[1], sy[3] - sy[2]];

    let dw = [sw[0], (dst.width - sw[0] - sw[2]).max(0), sw[2]];
    let dh = [sh[0], (dst.height - sh[0] - sh[2]).max(0), sh[2]];
    let dx = [dst.x, dst.x + dw[0], dst.x + dst.width - dw[2]];
    let dy = [dst.y, dst.y + dh[0], dst.y + dst.height - dh[2]];

    let mut out = [(Recti::default(), Recti::default()); 9];
    for row in 0..3 {
        for col in 0..3 {
            out[row * 3 + col] = (
                rect(sx[col], sy[row], sw[col], sh[row]),
                rect(dx[col], dy[row], dw[col], dh[row]),
            );
        }
    }
    out
}

/// Computes the (source, destination) pairs of a tile grid over `area`
/// (destination-local coordinates). Cells step from the top-left; the partial
/// cells on the right/bottom edge are clipped against the area, cropping their
/// source proportionally.
pub(crate) fn tile_fragments(area: Dimensioni, src: Dimensioni, step: Dimensioni) -> Vec<(Recti, Recti)> {
    let mut cells = Vec::new();
    if area.width <= 0 || area.height <= 0 || step.width <= 0 || step.height <= 0 {
        return cells;
    }
    let bounds = rect(0, 0, area.width, area.height);
    let full = rect(0, 0, src.width, src.height);
    let mut y = 0;
    while y < area.height {
        let mut x = 0;
        while x < area.width {
            if let Some((dst, src)) = clip_blit(rect(x, y, step.width, step.height), full, bounds) {
                cells.push((src, dst));
            }
            x += step.width;
        }
        y += step.height;
    }
    cells
}

#[cfg(test)]
mod tests {
    use super::*;

    fn img() -> Dimensioni { Dimensioni::new(30, 30) }

    #[test]
    fn all_zero_slice_spec_means_unset() {
        assert_eq!(resolve_slice_spec(SliceSpec::default(), img()), None);
    }

    #[test]
    fn negative_slice_boundaries_measure_from_far_edge() {
        let s = resolve_slice_spec(SliceSpec::new(6, 6, -5, -5), img()).unwrap();
        assert_eq!((s.right, s.bottom), (25, 25));
    }

    #[test]
    fn slice_boundaries_clamp_and_snap() {
        let s = resolve_slice_spec(SliceSpec::new(-3, 40, 99, 5), img()).unwrap();
        assert_eq!((s.left, s.top, s.right, s.bottom), (0, 30, 30, 30));

        let crossed = resolve_slice_spec(SliceSpec::new(20, 20, 10, 10), img()).unwrap();
        assert!(crossed.right >= crossed.left);
        assert!(crossed.bottom >= crossed.top);
        assert_eq!((crossed.right, crossed.bottom), (20, 20));
    }

    #[test]
    fn nine_slice_widths_sum_to_destination_width() {
        let spec = SliceSpec::new(10, 10, 20, 20);
        for w in 20..=60 {
            let frags = nine_slice(img(), spec, rect(5, 7, w, 40));
            let total: i32 = frags[..3].iter().map(|(_, d)| d.width).sum();
            assert_eq!(total, w, "width {}", w);
            // fragments are contiguous: no gap, no overlap
            assert_eq!(frags[0].1.x + frags[0].1.width, frags[1].1.x);
            assert_eq!(frags[1].1.x + frags[1].1.width, frags[2].1.x);
        }
    }

    #[test]
    fn nine_slice_corners_keep_source_size() {
        let frags = nine_slice(img(), SliceSpec::new(10, 10, 20, 20), rect(0, 0, 100, 100));
        // left corner strip is 10 wide, right corner strip is 30-(20+1)=9 wide
        assert_eq!(frags[0].1.width, 10);
        assert_eq!(frags[2].1.width, 9);
        assert_eq!(frags[0].1.height, 10);
        assert_eq!(frags[6].1.height, 9);
        // center band keeps the boundary column: source x spans [10, 21)
        assert_eq!((frags[4].0.x, frags[4].0.width), (10, 11));
        assert_eq!((frags[5].0.x, frags[5].0.width), (21, 9));
    }

    #[test]
    fn nine_slice_is_idempotent() {
        let spec = SliceSpec::new(6, 6, 25, 25);
        let a = nine_slice(img(), spec, rect(10, 10, 32, 32));
        let b = nine_slice(img(), spec, rect(10, 10, 32, 32));
        for i in 0..9 {
            assert_eq!((a[i].0.x, a[i].0.y, a[i].0.width, a[i].0.height), (b[i].0.x, b[i].0.y, b[i].0.width, b[i].0.height));
            assert_eq!((a[i].1.x, a[i].1.y, a[i].1.width, a[i].1.height), (b[i].1.x, b[i].1.y, b[i].1.width, b[i].1.height));
        }
    }

    #[test]
    fn tile_grid_covers_every_pixel_exactly_once() {
        // 97 / 3 -> step 32, a 1-pixel partial column and row at the far edge
        let area = Dimensioni::new(97, 97);
        let cells = tile_fragments(area, Dimensioni::new(10, 10), Dimensioni::new(32, 32));
        assert_eq!(cells.len(), 16);

        let mut covered = vec![0u8; 97 * 97];
        for (_, d) in &cells {
            assert!(d.x >= 0 && d.y >= 0 && d.x + d.width <= 97 && d.y + d.height <= 97);
            for y in d.y..d.y + d.height {
                for x in d.x..d.x + d.width {
                    covered[(y * 97 + x) as usize] += 1;
                }
            }
        }
        assert!(covered.iter().all(|&c| c == 1));
    }

    #[test]
    fn tile_grid_exact_fit_has_no_partial_cells() {
        let cells = tile_fragments(Dimensioni::new(96, 96), Dimensioni::new(10, 10), Dimensioni::new(32, 32));
        assert_eq!(cells.len(), 9);
        assert!(cells.iter().all(|(_, d)| d.width == 32 && d.height == 32));
    }

    #[test]
    fn tile_grid_rejects_degenerate_inputs() {
        assert!(tile_fragments(Dimensioni::new(0, 50), Dimensioni::new(10, 10), Dimensioni::new(8, 8)).is_empty());
        assert!(tile_fragments(Dimensioni::new(50, 50), Dimensioni::new(10, 10), Dimensioni::new(0, 8)).is_empty());
    }

    #[test]
    fn tile_rate_clamps_to_destination_size() {
        let mut state = ImageState::new(Bitmap::new(TextureId::new(1), 10, 10));
        state.set_tile(TileRate::new(500, 0), Dimensioni::new(100, 50));
        assert_eq!(state.tile(), TileRate::new(100, 1));
        state.set_tile(TileRate::new(3, 3), Dimensioni::new(0, 0));
        assert_eq!(state.tile(), TileRate::new(1, 1));
    }
}
