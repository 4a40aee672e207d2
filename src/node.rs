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
use crate::container::CanvasState;
use crate::image::ImageState;
use crate::text::TextState;
use std::rc::Rc;

/// Callback invoked with the handle of the widget that raised the event.
///
/// Handlers receive the handle only; they run after the scene has finished the
/// state transition that triggered them, so captured state (counters, queues)
/// can be applied back to the scene by the caller between events.
pub type EventHandler = Rc<dyn Fn(WidgetRef)>;

/// The five subscription slots of a widget. An empty slot is `None`; there is no
/// runtime introspection of callables.
#[derive(Default, Clone)]
pub(crate) struct Handlers {
    pub over: Option<EventHandler>,
    pub out: Option<EventHandler>,
    pub moved: Option<EventHandler>,
    pub down: Option<EventHandler>,
    pub up: Option<EventHandler>,
}

/// Closed set of widget kinds. Dispatch over this enum replaces a virtual
/// base-class hierarchy; the set is fixed and matched exhaustively.
pub(crate) enum WidgetKind {
    Canvas(CanvasState),
    Image(ImageState),
    Text(TextState),
}

/// A positioned node of the scene graph, leaf or canvas.
pub(crate) struct Widget {
    /// Monotonically increasing construction id, never reused.
    pub serial: u64,
    /// Owning canvas; `None` for top-level canvases and the screen canvas.
    pub owner: Option<WidgetRef>,
    /// Rectangle relative to the owner (equal to `absolute` when unowned).
    pub local: Recti,
    /// Derived rectangle in screen coordinates.
    pub absolute: Recti,
    pub enabled: bool,
    pub visible: bool,
    pub outline: bool,
    /// Hover state: `true` between an `over` and the matching `out`.
    pub pointer_inside: bool,
    pub handlers: Handlers,
    pub kind: WidgetKind,
}

impl Widget {
    pub fn new(serial: u64, owner: Option<WidgetRef>, local: Recti, kind: WidgetKind) -> Self {
        Self {
            serial,
            owner,
            local,
            absolute: local,
            enabled: true,
            visible: true,
            outline: false,
            pointer_inside: false,
            handlers: Handlers::default(),
            kind,
        }
    }

    pub fn is_interactive(&self) -> bool { self.enabled && self.visible }

    /// Callers of a mounted widget think in owner-relative coordinates, callers of
    /// an unowned one in absolute coordinates; for roots the two are equal.
    pub fn transform(&self) -> Recti {
        if self.owner.is_some() { self.local } else { self.absolute }
    }

    pub fn absolute_corners(&self) -> (Vec2i, Vec2i) {
        (
            vec2(self.absolute.x, self.absolute.y),
            vec2(self.absolute.x + self.absolute.width, self.absolute.y + self.absolute.height),
        )
    }

    /// Re-derives the absolute rectangle from the owner's. Invalidates the image
    /// fragment cache, which depends on the destination rectangle.
    pub fn update_absolute(&mut self, owner_abs: Option<Recti>) {
        self.absolute = match owner_abs {
            Some(o) => rect(o.x + self.local.x, o.y + self.local.y, self.local.width, self.local.height),
            None => self.local,
        };
        if let WidgetKind::Image(img) = &mut self.kind {
            img.mark_dirty();
        }
    }

    /// Clipping-aware hit test: the point must lie inside this widget's absolute
    /// rectangle and, when owned, inside the owner's absolute rectangle as well,
    /// so a child escaping its canvas stops hit-testing where the canvas ends.
    pub fn hit(&self, p: Vec2i, owner_abs: Option<Recti>) -> bool {
        let inside_owner = owner_abs.map_or(true, |o| point_in_rect(&o, p));
        inside_owner && point_in_rect(&self.absolute, p)
    }

    pub fn canvas(&self) -> Option<&CanvasState> {
        match &self.kind {
            WidgetKind::Canvas(c) => Some(c),
            _ => None,
        }
    }

    pub fn canvas_mut(&mut self) -> Option<&mut CanvasState> {
        match &mut self.kind {
            WidgetKind::Canvas(c) => Some(c),
            _ => None,
        }
    }
}

/// Half-open containment test: `[x, x+w) × [y, y+h)`. Shared borders between
/// adjacent siblings belong to exactly one of them, and zero-size rectangles
/// match nothing.
pub(crate) fn point_in_rect(r: &Recti, p: Vec2i) -> bool {
    p.x >= r.x && p.x < r.x + r.width && p.y >= r.y && p.y < r.y + r.height
}
