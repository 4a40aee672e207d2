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
use crate::arena::Arena;

/// Canvas payload: owns the child list and tracks which child currently claims
/// pointer focus. Insertion order is z-order: the last added child draws on
/// top and wins hit-testing.
pub(crate) struct CanvasState {
    pub children: Vec<WidgetRef>,
    /// Child currently receiving pointer events, if any.
    pub top_child: Option<WidgetRef>,
    /// Optional background fill painted before the children.
    pub background: Option<Color>,
}

impl CanvasState {
    pub fn new() -> Self {
        Self { children: Vec::new(), top_child: None, background: None }
    }
}

/// Scans `children` from topmost-inserted to bottommost and returns the first
/// enabled, visible child whose clipped hit test passes.
pub(crate) fn pick_top_child(arena: &Arena, canvas_abs: Recti, children: &[WidgetRef], pos: Vec2i) -> Option<WidgetRef> {
    children
        .iter()
        .rev()
        .copied()
        .find(|child| arena.get(*child).is_some_and(|w| w.is_interactive() && w.hit(pos, Some(canvas_abs))))
}
