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
use crate::container::{CanvasState, pick_top_child};
use crate::image::ImageState;
use crate::node::{Widget, WidgetKind};
use crate::render;
use crate::text::TextState;

/// Explicit context object owning the whole widget tree.
///
/// All widgets live in a generation-checked arena inside the scene; factories
/// return [`WidgetRef`] handles and every operation takes the scene by
/// reference, so multiple independent scenes can coexist. A handle into a
/// destroyed subtree fails its validity check and the operation becomes a
/// warned no-op.
///
/// Event flow: [`Scene::handle_event`] gives the implicit full-screen backdrop
/// canvas first refusal; when nothing on it claims the event, explicit canvases
/// are scanned in reverse creation order. Draw flow: [`Scene::draw`] walks
/// explicit canvases in creation order and the screen canvas last, so the
/// backdrop's widgets render on top of everything, mirroring their event
/// priority.
pub struct Scene {
    arena: Arena,
    /// Explicit top-level canvases in creation order.
    roots: Vec<WidgetRef>,
    screen: WidgetRef,
    /// Canvas currently claiming pointer focus among the roots.
    top_canvas: Option<WidgetRef>,
    clips: ClipStack,
    font: Option<FontSheet>,
    serial: u64,
}

impl Scene {
    /// Creates a scene with an implicit screen-sized backdrop canvas.
    pub fn new(screen: Dimensioni) -> Self {
        let mut arena = Arena::new();
        let backdrop = Widget::new(1, None, rect(0, 0, screen.width, screen.height), WidgetKind::Canvas(CanvasState::new()));
        let screen_ref = arena.insert(backdrop);
        Self {
            arena,
            roots: Vec::new(),
            screen: screen_ref,
            top_canvas: None,
            clips: ClipStack::new(),
            font: None,
            serial: 1,
        }
    }

    /// Returns the handle of the implicit backdrop canvas. Widgets created with
    /// `canvas = None` attach to it.
    pub fn screen_canvas(&self) -> WidgetRef { self.screen }

    /// Installs the fixed-grid font used by every text widget.
    pub fn set_font_sheet(&mut self, sheet: FontSheet) { self.font = Some(sheet); }

    /// Returns the installed font sheet, if any.
    pub fn font_sheet(&self) -> Option<FontSheet> { self.font }

    fn next_serial(&mut self) -> u64 {
        self.serial += 1;
        self.serial
    }

    // =========================================================================
    //                              FACTORIES
    // =========================================================================

    /// Creates a top-level canvas. Later-created canvases draw above earlier
    /// ones and take event priority.
    pub fn create_canvas(&mut self, transform: Recti) -> WidgetRef {
        let serial = self.next_serial();
        let id = self.arena.insert(Widget::new(serial, None, transform, WidgetKind::Canvas(CanvasState::new())));
        self.roots.push(id);
        id
    }

    /// Creates a canvas owned by another canvas. Warned no-op returning `None`
    /// when `parent` is stale or not a canvas.
    pub fn create_nested_canvas(&mut self, parent: WidgetRef, transform: Recti) -> Option<WidgetRef> {
        self.create_child(Some(parent), transform, WidgetKind::Canvas(CanvasState::new()))
    }

    /// Creates an image widget. `canvas = None` attaches it to the screen
    /// canvas. Warned no-op returning `None` on a stale canvas handle or an
    /// empty backing image.
    pub fn create_image(&mut self, canvas: Option<WidgetRef>, transform: Recti, bitmap: Bitmap) -> Option<WidgetRef> {
        if bitmap.is_empty() {
            log::warn!("refusing to create an image widget with an empty backing image");
            return None;
        }
        self.create_child(canvas, transform, WidgetKind::Image(ImageState::new(bitmap)))
    }

    /// Creates a text widget at the given position. The rectangle size is
    /// derived from the measured text once a font sheet is installed.
    pub fn create_text(&mut self, canvas: Option<WidgetRef>, transform: Recti, text: &str) -> Option<WidgetRef> {
        let id = self.create_child(canvas, transform, WidgetKind::Text(TextState::new(text)))?;
        self.autosize_text(id);
        Some(id)
    }

    fn create_child(&mut self, canvas: Option<WidgetRef>, transform: Recti, kind: WidgetKind) -> Option<WidgetRef> {
        let owner = canvas.unwrap_or(self.screen);
        let owner_abs = match self.arena.get(owner) {
            Some(w) if w.canvas().is_some() => w.absolute,
            _ => {
                log::warn!("cannot attach a widget to {:?}: not a live canvas", owner);
                return None;
            }
        };
        let serial = self.next_serial();
        let mut widget = Widget::new(serial, Some(owner), transform, kind);
        widget.update_absolute(Some(owner_abs));
        let id = self.arena.insert(widget);
        if let Some(c) = self.arena.get_mut(owner).and_then(|w| w.canvas_mut()) {
            c.children.push(id);
        }
        Some(id)
    }

    /// Destroys a top-level canvas and its whole subtree. Every handle into the
    /// subtree fails validity checks afterwards. The screen canvas cannot be
    /// removed.
    pub fn remove_canvas(&mut self, canvas: WidgetRef) -> bool {
        if canvas == self.screen {
            log::warn!("the screen canvas cannot be removed");
            return false;
        }
        let Some(index) = self.roots.iter().position(|c| *c == canvas) else {
            log::warn!("remove_canvas called with a stale or non-root handle {:?}", canvas);
            return false;
        };
        self.roots.remove(index);
        if self.top_canvas == Some(canvas) {
            self.top_canvas = None;
        }
        self.remove_subtree(canvas);
        true
    }

    fn remove_subtree(&mut self, widget: WidgetRef) {
        let children = match self.arena.remove(widget) {
            Some(w) => match w.kind {
                WidgetKind::Canvas(c) => c.children,
                _ => Vec::new(),
            },
            None => Vec::new(),
        };
        for child in children {
            self.remove_subtree(child);
        }
    }

    // =========================================================================
    //                              ACCESSORS
    // =========================================================================

    /// Returns `true` while the handle refers to a live widget.
    pub fn is_valid(&self, widget: WidgetRef) -> bool { self.arena.contains(widget) }

    /// Returns the widget's monotonic construction id.
    pub fn id(&self, widget: WidgetRef) -> Option<u64> { self.arena.get(widget).map(|w| w.serial) }

    /// Returns the owner-relative rectangle for mounted widgets and the
    /// absolute rectangle for top-level canvases.
    pub fn transform(&self, widget: WidgetRef) -> Option<Recti> { self.arena.get(widget).map(|w| w.transform()) }

    /// Returns the absolute top-left and bottom-right corners.
    pub fn absolute_corners(&self, widget: WidgetRef) -> Option<(Vec2i, Vec2i)> {
        self.arena.get(widget).map(|w| w.absolute_corners())
    }

    /// Returns `true` if the widget is visible.
    pub fn is_visible(&self, widget: WidgetRef) -> bool { self.arena.get(widget).is_some_and(|w| w.visible) }

    /// Returns `true` if the widget is enabled.
    pub fn is_enabled(&self, widget: WidgetRef) -> bool { self.arena.get(widget).is_some_and(|w| w.enabled) }

    // =========================================================================
    //                              MUTATORS
    // =========================================================================

    /// Sets the owner-relative rectangle and immediately re-derives the
    /// absolute rectangle of the widget and of every descendant.
    pub fn set_transform(&mut self, widget: WidgetRef, transform: Recti) {
        match self.arena.get_mut(widget) {
            Some(w) => w.local = transform,
            None => {
                log::warn!("set_transform on stale handle {:?}", widget);
                return;
            }
        }
        self.refresh_transform(widget);
    }

    fn refresh_transform(&mut self, widget: WidgetRef) {
        let owner_abs = {
            let Some(w) = self.arena.get(widget) else { return };
            w.owner.and_then(|o| self.arena.get(o)).map(|o| o.absolute)
        };
        let children = {
            let Some(w) = self.arena.get_mut(widget) else { return };
            w.update_absolute(owner_abs);
            match w.canvas() {
                Some(c) => c.children.clone(),
                None => Vec::new(),
            }
        };
        for child in children {
            self.refresh_transform(child);
        }
    }

    /// Shows or hides the widget. Hiding a hovered widget (or subtree) fires
    /// the pending `out` events.
    pub fn set_visible(&mut self, widget: WidgetRef, visible: bool) {
        {
            let Some(w) = self.arena.get_mut(widget) else { return };
            if w.visible == visible {
                return;
            }
            w.visible = visible;
        }
        if !visible {
            self.force_exit_subtree(widget);
        }
    }

    /// Enables or disables the widget. Disabling a hovered widget (or subtree)
    /// fires the pending `out` events.
    pub fn set_enabled(&mut self, widget: WidgetRef, enabled: bool) {
        {
            let Some(w) = self.arena.get_mut(widget) else { return };
            if w.enabled == enabled {
                return;
            }
            w.enabled = enabled;
        }
        if !enabled {
            self.force_exit_subtree(widget);
        }
    }

    /// Toggles the debug outline painted over the widget.
    pub fn show_outline(&mut self, widget: WidgetRef, show: bool) {
        if let Some(w) = self.arena.get_mut(widget) {
            w.outline = show;
        }
    }

    /// Sets the background fill of a canvas; `None` leaves it transparent.
    pub fn set_background(&mut self, canvas: WidgetRef, background: Option<Color>) {
        match self.arena.get_mut(canvas).and_then(|w| w.canvas_mut()) {
            Some(c) => c.background = background,
            None => log::debug!("set_background ignored for non-canvas {:?}", canvas),
        }
    }

    /// Selects how an image widget fills its rectangle.
    pub fn set_draw_mode(&mut self, widget: WidgetRef, mode: DrawMode) {
        match self.arena.get_mut(widget).map(|w| &mut w.kind) {
            Some(WidgetKind::Image(img)) => {
                img.mode = mode;
                img.mark_dirty();
            }
            _ => log::debug!("set_draw_mode ignored for non-image {:?}", widget),
        }
    }

    /// Sets the nine-slice boundaries of an image widget. Negative right/bottom
    /// are measured from the far edge; an all-zero spec clears slicing.
    pub fn set_slice_spec(&mut self, widget: WidgetRef, spec: SliceSpec) {
        match self.arena.get_mut(widget).map(|w| &mut w.kind) {
            Some(WidgetKind::Image(img)) => img.set_slice(spec),
            _ => log::debug!("set_slice_spec ignored for non-image {:?}", widget),
        }
    }

    /// Returns the resolved slice spec of an image widget, `None` when unset.
    pub fn slice_spec(&self, widget: WidgetRef) -> Option<SliceSpec> {
        match self.arena.get(widget).map(|w| &w.kind) {
            Some(WidgetKind::Image(img)) => img.slice(),
            _ => None,
        }
    }

    /// Sets the tiling rate of an image widget, clamped to the widget size.
    pub fn set_tile_rate(&mut self, widget: WidgetRef, rate: TileRate) {
        let Some(w) = self.arena.get_mut(widget) else { return };
        let local = w.local;
        match &mut w.kind {
            WidgetKind::Image(img) => img.set_tile(rate, Dimensioni::new(local.width, local.height)),
            _ => log::debug!("set_tile_rate ignored for non-image {:?}", widget),
        }
    }

    /// Returns the clamped tiling rate of an image widget.
    pub fn tile_rate(&self, widget: WidgetRef) -> Option<TileRate> {
        match self.arena.get(widget).map(|w| &w.kind) {
            Some(WidgetKind::Image(img)) => Some(img.tile()),
            _ => None,
        }
    }

    /// Sets the modulation color of an image widget or the text color of a
    /// text widget.
    pub fn set_color(&mut self, widget: WidgetRef, color: Color) {
        match self.arena.get_mut(widget).map(|w| &mut w.kind) {
            Some(WidgetKind::Image(img)) => img.color = color,
            Some(WidgetKind::Text(txt)) => txt.color = color,
            _ => log::debug!("set_color ignored for {:?}", widget),
        }
    }

    /// Enables straight-alpha blending for an image widget.
    pub fn set_blending(&mut self, widget: WidgetRef, blending: bool) {
        match self.arena.get_mut(widget).map(|w| &mut w.kind) {
            Some(WidgetKind::Image(img)) => img.blend = if blending { BlendMode::Alpha } else { BlendMode::Opaque },
            _ => log::debug!("set_blending ignored for non-image {:?}", widget),
        }
    }

    /// Replaces the text of a text widget and resizes it to fit.
    pub fn set_text(&mut self, widget: WidgetRef, text: &str) {
        match self.arena.get_mut(widget).map(|w| &mut w.kind) {
            Some(WidgetKind::Text(txt)) => txt.set_text(text),
            _ => {
                log::debug!("set_text ignored for non-text {:?}", widget);
                return;
            }
        }
        self.autosize_text(widget);
    }

    /// Returns the current text of a text widget.
    pub fn text(&self, widget: WidgetRef) -> Option<String> {
        match self.arena.get(widget).map(|w| &w.kind) {
            Some(WidgetKind::Text(txt)) => Some(txt.text().to_string()),
            _ => None,
        }
    }

    /// Sets the line alignment of a text widget.
    pub fn set_alignment(&mut self, widget: WidgetRef, align: Alignment) {
        match self.arena.get_mut(widget).map(|w| &mut w.kind) {
            Some(WidgetKind::Text(txt)) => txt.align = align,
            _ => log::debug!("set_alignment ignored for non-text {:?}", widget),
        }
    }

    /// Sets the integer glyph scale of a text widget, clamped to `1..=255`, and
    /// resizes it to fit.
    pub fn set_text_scale(&mut self, widget: WidgetRef, scale: i32) {
        match self.arena.get_mut(widget).map(|w| &mut w.kind) {
            Some(WidgetKind::Text(txt)) => txt.set_scale(scale),
            _ => {
                log::debug!("set_text_scale ignored for non-text {:?}", widget);
                return;
            }
        }
        self.autosize_text(widget);
    }

    fn autosize_text(&mut self, widget: WidgetRef) {
        let Some(sheet) = self.font else { return };
        let measured = {
            let Some(w) = self.arena.get(widget) else { return };
            match &w.kind {
                WidgetKind::Text(txt) => txt.measure(sheet.glyph),
                _ => return,
            }
        };
        let local = match self.arena.get(widget) {
            Some(w) => w.local,
            None => return,
        };
        self.set_transform(widget, rect(local.x, local.y, measured.width, measured.height));
    }

    // =========================================================================
    //                           EVENT SUBSCRIPTION
    // =========================================================================

    /// Subscribes to the pointer entering the widget.
    pub fn on_mouse_over(&mut self, widget: WidgetRef, handler: impl Fn(WidgetRef) + 'static) {
        if let Some(w) = self.arena.get_mut(widget) {
            w.handlers.over = Some(std::rc::Rc::new(handler));
        }
    }

    /// Subscribes to the pointer leaving the widget.
    pub fn on_mouse_out(&mut self, widget: WidgetRef, handler: impl Fn(WidgetRef) + 'static) {
        if let Some(w) = self.arena.get_mut(widget) {
            w.handlers.out = Some(std::rc::Rc::new(handler));
        }
    }

    /// Subscribes to pointer motion inside the widget.
    pub fn on_mouse_move(&mut self, widget: WidgetRef, handler: impl Fn(WidgetRef) + 'static) {
        if let Some(w) = self.arena.get_mut(widget) {
            w.handlers.moved = Some(std::rc::Rc::new(handler));
        }
    }

    /// Subscribes to button presses over the widget.
    pub fn on_mouse_down(&mut self, widget: WidgetRef, handler: impl Fn(WidgetRef) + 'static) {
        if let Some(w) = self.arena.get_mut(widget) {
            w.handlers.down = Some(std::rc::Rc::new(handler));
        }
    }

    /// Subscribes to button releases over the widget.
    pub fn on_mouse_up(&mut self, widget: WidgetRef, handler: impl Fn(WidgetRef) + 'static) {
        if let Some(w) = self.arena.get_mut(widget) {
            w.handlers.up = Some(std::rc::Rc::new(handler));
        }
    }

    /// Empties all five subscription slots.
    pub fn clear_handlers(&mut self, widget: WidgetRef) {
        if let Some(w) = self.arena.get_mut(widget) {
            w.handlers = Default::default();
        }
    }

    // =========================================================================
    //                           EVENT DISPATCH
    // =========================================================================

    /// Feeds one pointer event through the scene. The screen canvas gets first
    /// refusal; explicit canvases are scanned only when nothing on the backdrop
    /// layer claims the event.
    pub fn handle_event(&mut self, event: PointerEvent) {
        self.dispatch_canvas(self.screen, event);
        let backdrop_claimed = self
            .arena
            .get(self.screen)
            .and_then(|w| w.canvas())
            .and_then(|c| c.top_child)
            .is_some();
        if backdrop_claimed {
            // a backdrop widget shadows the explicit canvases; the outgoing
            // top canvas still owes its exit events
            if let Some(old) = self.top_canvas.take() {
                self.force_exit_subtree(old);
            }
        } else {
            self.process_canvases(event);
        }
    }

    fn process_canvases(&mut self, event: PointerEvent) {
        let pos = event.position();
        let new_canvas = self
            .roots
            .iter()
            .rev()
            .copied()
            .find(|c| self.arena.get(*c).is_some_and(|w| w.is_interactive() && w.hit(pos, None)));
        if self.top_canvas != new_canvas {
            // the outgoing canvas still owes exit events for its top child and itself
            if let Some(old) = self.top_canvas {
                self.force_exit_subtree(old);
            }
            self.top_canvas = new_canvas;
        }
        if let Some(canvas) = self.top_canvas {
            self.dispatch_canvas(canvas, event);
        }
    }

    /// A disabled or hidden canvas short-circuits itself and every descendant.
    fn dispatch_canvas(&mut self, canvas: WidgetRef, event: PointerEvent) {
        if !self.arena.get(canvas).is_some_and(|w| w.is_interactive()) {
            return;
        }
        self.widget_event(canvas, event);

        let (canvas_abs, children) = match self.arena.get(canvas) {
            Some(w) => match w.canvas() {
                Some(c) => (w.absolute, c.children.clone()),
                None => return,
            },
            None => return,
        };
        let new_top = pick_top_child(&self.arena, canvas_abs, &children, event.position());
        let old_top = self.arena.get(canvas).and_then(|w| w.canvas()).and_then(|c| c.top_child);
        if old_top != new_top {
            // the outgoing top child exits before the new one sees the event, even
            // when the pointer jumped straight between overlapping siblings
            if let Some(old) = old_top {
                self.force_exit_subtree(old);
            }
            if let Some(c) = self.arena.get_mut(canvas).and_then(|w| w.canvas_mut()) {
                c.top_child = new_top;
            }
        }
        if let Some(top) = new_top {
            let nested = self.arena.get(top).is_some_and(|w| w.canvas().is_some());
            if nested {
                self.dispatch_canvas(top, event);
            } else {
                self.widget_event(top, event);
            }
        }
    }

    /// Runs the per-widget state machine for one event. Interior motion
    /// double-fires: the `over` transition (once) followed by `move` on every
    /// interior event. Button events fire iff the hit test passes right now;
    /// they are not gated by the hover state.
    fn widget_event(&mut self, widget: WidgetRef, event: PointerEvent) {
        let owner_abs = {
            let Some(w) = self.arena.get(widget) else { return };
            w.owner.and_then(|o| self.arena.get(o)).map(|o| o.absolute)
        };
        let mut fired: Vec<EventHandler> = Vec::new();
        {
            let Some(w) = self.arena.get_mut(widget) else { return };
            if !w.is_interactive() {
                return;
            }
            let inside = w.hit(event.position(), owner_abs);
            match event {
                PointerEvent::Moved(_) => {
                    if inside {
                        if !w.pointer_inside {
                            w.pointer_inside = true;
                            if let Some(h) = &w.handlers.over {
                                fired.push(h.clone());
                            }
                        }
                        if let Some(h) = &w.handlers.moved {
                            fired.push(h.clone());
                        }
                    } else if w.pointer_inside {
                        w.pointer_inside = false;
                        if let Some(h) = &w.handlers.out {
                            fired.push(h.clone());
                        }
                    }
                }
                PointerEvent::ButtonDown(_, _) => {
                    if inside {
                        if let Some(h) = &w.handlers.down {
                            fired.push(h.clone());
                        }
                    }
                }
                PointerEvent::ButtonUp(_, _) => {
                    if inside {
                        if let Some(h) = &w.handlers.up {
                            fired.push(h.clone());
                        }
                    }
                }
            }
        }
        for handler in fired {
            handler(widget);
        }
    }

    /// Leaves the hovered state, firing `out`. Every transition out of hover
    /// goes through here, whatever the cause.
    fn force_exit(&mut self, widget: WidgetRef) {
        let handler = {
            let Some(w) = self.arena.get_mut(widget) else { return };
            if !w.pointer_inside {
                return;
            }
            w.pointer_inside = false;
            w.handlers.out.clone()
        };
        if let Some(h) = handler {
            h(widget);
        }
    }

    /// Exits hovered descendants inner-first, then the node itself, and clears
    /// top-child tracking so no duplicate exit fires later.
    fn force_exit_subtree(&mut self, widget: WidgetRef) {
        let children = match self.arena.get_mut(widget) {
            Some(w) => match w.canvas_mut() {
                Some(c) => {
                    c.top_child = None;
                    c.children.clone()
                }
                None => Vec::new(),
            },
            None => Vec::new(),
        };
        for child in children {
            self.force_exit_subtree(child);
        }
        self.force_exit(widget);
    }

    // =========================================================================
    //                                DRAW
    // =========================================================================

    /// Renders the scene: explicit canvases in creation order, then the screen
    /// canvas on top. Runs strictly after the frame's events have been
    /// dispatched; the caller drives the frame loop.
    pub fn draw(&mut self, surface: &mut dyn Surface) {
        for canvas in self.roots.clone() {
            self.draw_canvas(canvas, surface);
        }
        self.draw_canvas(self.screen, surface);
    }

    fn draw_canvas(&mut self, canvas: WidgetRef, surface: &mut dyn Surface) {
        let (abs, background, children, outline) = {
            let Some(w) = self.arena.get(canvas) else { return };
            if !w.enabled || !w.visible {
                return;
            }
            let Some(c) = w.canvas() else { return };
            (w.absolute, c.background, c.children.clone(), w.outline)
        };
        self.clips.push(surface);
        let merged = match surface.clip() {
            Some(clip) => clip.intersect(&abs).unwrap_or(rect(abs.x, abs.y, 0, 0)),
            None => abs,
        };
        surface.set_clip(Some(merged));
        if let Some(bg) = background {
            surface.fill_rect(abs, bg);
        }
        for child in children {
            match self.arena.get(child).map(|w| w.canvas().is_some()) {
                Some(true) => self.draw_canvas(child, surface),
                Some(false) => self.draw_leaf(child, surface),
                None => (),
            }
        }
        if outline {
            render::draw_outline(surface, abs, true);
        }
        self.clips.pop(surface);
    }

    fn draw_leaf(&mut self, widget: WidgetRef, surface: &mut dyn Surface) {
        let Some(w) = self.arena.get_mut(widget) else { return };
        if !w.visible {
            return;
        }
        let abs = w.absolute;
        let outline = w.outline;
        let enabled = w.enabled;
        match &mut w.kind {
            WidgetKind::Image(img) => img.draw(surface, &mut self.clips, abs),
            WidgetKind::Text(txt) => {
                if let Some(sheet) = &self.font {
                    txt.draw(surface, &mut self.clips, sheet, abs);
                }
            }
            WidgetKind::Canvas(_) => return,
        }
        if outline {
            render::draw_outline(surface, abs, enabled);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Call {
        Blit { texture: u32, dst: (i32, i32, i32, i32) },
        Fill { dst: (i32, i32, i32, i32) },
        Line,
        PushOffscreen { size: (i32, i32) },
        PopOffscreen { dst: (i32, i32, i32, i32) },
    }

    #[derive(Default)]
    struct RecordingSurface {
        clip: Option<Recti>,
        next_texture: u32,
        offscreen_depth: i32,
        calls: Vec<Call>,
    }

    fn quad(r: Recti) -> (i32, i32, i32, i32) { (r.x, r.y, r.width, r.height) }

    impl RecordingSurface {
        fn blits(&self) -> Vec<&Call> {
            self.calls.iter().filter(|c| matches!(c, Call::Blit { .. })).collect()
        }
    }

    impl Surface for RecordingSurface {
        fn create_texture(&mut self, _width: i32, _height: i32, _pixels: &[u8]) -> TextureId {
            self.next_texture += 1;
            TextureId::new(self.next_texture)
        }
        fn blit(&mut self, texture: TextureId, _src: Recti, dst: Recti, _tint: Color, _blend: BlendMode) {
            self.calls.push(Call::Blit { texture: texture.raw(), dst: quad(dst) });
        }
        fn fill_rect(&mut self, rect: Recti, _color: Color) { self.calls.push(Call::Fill { dst: quad(rect) }); }
        fn draw_line(&mut self, _from: Vec2i, _to: Vec2i, _color: Color) { self.calls.push(Call::Line); }
        fn set_clip(&mut self, clip: Option<Recti>) { self.clip = clip; }
        fn clip(&self) -> Option<Recti> { self.clip }
        fn push_offscreen(&mut self, size: Dimensioni) {
            self.offscreen_depth += 1;
            self.calls.push(Call::PushOffscreen { size: (size.width, size.height) });
        }
        fn pop_offscreen(&mut self, _src: Recti, dst: Recti, _tint: Color, _blend: BlendMode) {
            self.offscreen_depth -= 1;
            self.calls.push(Call::PopOffscreen { dst: quad(dst) });
        }
    }

    type EventLog = Rc<RefCell<Vec<String>>>;

    fn recorder(log: &EventLog, tag: &str) -> impl Fn(WidgetRef) + 'static {
        let log = log.clone();
        let tag = tag.to_string();
        move |_| log.borrow_mut().push(tag.clone())
    }

    fn bitmap() -> Bitmap { Bitmap::new(TextureId::new(7), 30, 30) }

    fn moved(x: i32, y: i32) -> PointerEvent { PointerEvent::Moved(vec2(x, y)) }

    fn scene() -> Scene { Scene::new(Dimensioni::new(800, 800)) }

    fn taken(log: &EventLog) -> Vec<String> { log.borrow_mut().drain(..).collect() }

    #[test]
    fn child_transform_composes_and_cascades() {
        let mut scene = scene();
        let canvas = scene.create_canvas(rect(100, 50, 300, 300));
        let img = scene.create_image(Some(canvas), rect(10, 10, 50, 50), bitmap()).unwrap();

        let (lo, hi) = scene.absolute_corners(img).unwrap();
        assert_eq!((lo.x, lo.y, hi.x, hi.y), (110, 60, 160, 110));

        // moving the canvas re-derives every descendant without extra calls
        scene.set_transform(canvas, rect(0, 0, 300, 300));
        let (lo, hi) = scene.absolute_corners(img).unwrap();
        assert_eq!((lo.x, lo.y, hi.x, hi.y), (10, 10, 60, 60));

        let t = scene.transform(img).unwrap();
        assert_eq!((t.x, t.y), (10, 10));
    }

    #[test]
    fn construction_ids_are_monotonic() {
        let mut scene = scene();
        let canvas = scene.create_canvas(rect(0, 0, 10, 10));
        let img = scene.create_image(Some(canvas), rect(0, 0, 5, 5), bitmap()).unwrap();
        let a = scene.id(canvas).unwrap();
        let b = scene.id(img).unwrap();
        assert!(a > scene.id(scene.screen_canvas()).unwrap());
        assert!(b > a);
    }

    #[test]
    fn hover_pairing_alternates_over_then_out() {
        let mut scene = scene();
        let canvas = scene.create_canvas(rect(0, 0, 300, 300));
        let img = scene.create_image(Some(canvas), rect(10, 10, 50, 50), bitmap()).unwrap();
        let log: EventLog = Default::default();
        scene.on_mouse_over(img, recorder(&log, "over"));
        scene.on_mouse_out(img, recorder(&log, "out"));

        for _ in 0..3 {
            scene.handle_event(moved(30, 30));
            scene.handle_event(moved(500, 500));
        }
        assert_eq!(taken(&log), vec!["over", "out", "over", "out", "over", "out"]);
    }

    #[test]
    fn interior_motion_double_fires_over_then_move() {
        let mut scene = scene();
        let img = scene.create_image(None, rect(10, 10, 50, 50), bitmap()).unwrap();
        let log: EventLog = Default::default();
        scene.on_mouse_over(img, recorder(&log, "over"));
        scene.on_mouse_move(img, recorder(&log, "move"));

        scene.handle_event(moved(30, 30));
        assert_eq!(taken(&log), vec!["over", "move"]);
        scene.handle_event(moved(31, 31));
        assert_eq!(taken(&log), vec!["move"]);
    }

    #[test]
    fn z_order_switch_fires_one_out_before_over() {
        let mut scene = scene();
        let canvas = scene.create_canvas(rect(0, 0, 300, 300));
        let a = scene.create_image(Some(canvas), rect(10, 10, 100, 100), bitmap()).unwrap();
        let b = scene.create_image(Some(canvas), rect(50, 50, 100, 100), bitmap()).unwrap();
        let log: EventLog = Default::default();
        scene.on_mouse_over(a, recorder(&log, "a:over"));
        scene.on_mouse_out(a, recorder(&log, "a:out"));
        scene.on_mouse_over(b, recorder(&log, "b:over"));
        scene.on_mouse_out(b, recorder(&log, "b:out"));

        // inside both: the later-added sibling wins
        scene.handle_event(moved(60, 60));
        assert_eq!(taken(&log), vec!["b:over"]);

        // jump straight onto the region covered only by a
        scene.handle_event(moved(20, 20));
        assert_eq!(taken(&log), vec!["b:out", "a:over"]);

        scene.handle_event(moved(60, 60));
        assert_eq!(taken(&log), vec!["a:out", "b:over"]);
    }

    #[test]
    fn end_to_end_enter_exit_scenario() {
        let mut scene = scene();
        let canvas = scene.create_canvas(rect(0, 0, 300, 300));
        let img = scene.create_image(Some(canvas), rect(10, 10, 50, 50), bitmap()).unwrap();
        let log: EventLog = Default::default();
        scene.on_mouse_over(img, recorder(&log, "over"));
        scene.on_mouse_out(img, recorder(&log, "out"));
        scene.on_mouse_move(img, recorder(&log, "move"));
        scene.on_mouse_down(img, recorder(&log, "down"));
        scene.on_mouse_up(img, recorder(&log, "up"));

        scene.handle_event(moved(500, 500));
        scene.handle_event(moved(30, 30));
        scene.handle_event(moved(500, 500));
        assert_eq!(taken(&log), vec!["over", "move", "out"]);
    }

    #[test]
    fn buttons_fire_on_hit_without_hover_state() {
        let mut scene = scene();
        let img = scene.create_image(None, rect(10, 10, 50, 50), bitmap()).unwrap();
        let log: EventLog = Default::default();
        scene.on_mouse_over(img, recorder(&log, "over"));
        scene.on_mouse_down(img, recorder(&log, "down"));
        scene.on_mouse_up(img, recorder(&log, "up"));

        // no motion precedes the press; down still fires and over does not
        scene.handle_event(PointerEvent::ButtonDown(vec2(30, 30), MouseButton::LEFT));
        assert_eq!(taken(&log), vec!["down"]);
        scene.handle_event(PointerEvent::ButtonUp(vec2(500, 500), MouseButton::LEFT));
        assert_eq!(taken(&log), Vec::<String>::new());
    }

    #[test]
    fn disabling_a_canvas_mid_hover_fires_out_then_goes_silent() {
        let mut scene = scene();
        let canvas = scene.create_canvas(rect(0, 0, 300, 300));
        let img = scene.create_image(Some(canvas), rect(10, 10, 50, 50), bitmap()).unwrap();
        let log: EventLog = Default::default();
        scene.on_mouse_out(img, recorder(&log, "out"));
        scene.on_mouse_over(img, recorder(&log, "over"));

        scene.handle_event(moved(30, 30));
        assert_eq!(taken(&log), vec!["over"]);

        scene.set_enabled(canvas, false);
        assert_eq!(taken(&log), vec!["out"]);

        scene.handle_event(moved(31, 31));
        scene.handle_event(PointerEvent::ButtonDown(vec2(30, 30), MouseButton::LEFT));
        assert_eq!(taken(&log), Vec::<String>::new());

        // zero draw calls for the disabled subtree
        let mut surface = RecordingSurface::default();
        scene.draw(&mut surface);
        assert!(surface.blits().is_empty());
    }

    #[test]
    fn hiding_a_hovered_widget_fires_out_once() {
        let mut scene = scene();
        let img = scene.create_image(None, rect(10, 10, 50, 50), bitmap()).unwrap();
        let log: EventLog = Default::default();
        scene.on_mouse_over(img, recorder(&log, "over"));
        scene.on_mouse_out(img, recorder(&log, "out"));

        scene.handle_event(moved(30, 30));
        scene.set_visible(img, false);
        assert_eq!(taken(&log), vec!["over", "out"]);

        scene.handle_event(moved(30, 30));
        scene.handle_event(moved(500, 500));
        assert_eq!(taken(&log), Vec::<String>::new());

        scene.set_visible(img, true);
        scene.handle_event(moved(30, 30));
        assert_eq!(taken(&log), vec!["over"]);
    }

    #[test]
    fn screen_canvas_gets_first_refusal() {
        let mut scene = scene();
        let canvas = scene.create_canvas(rect(0, 0, 200, 200));
        let covered = scene.create_image(Some(canvas), rect(0, 0, 200, 200), bitmap()).unwrap();
        let backdrop = scene.create_image(None, rect(0, 0, 100, 100), bitmap()).unwrap();
        let log: EventLog = Default::default();
        scene.on_mouse_over(covered, recorder(&log, "c:over"));
        scene.on_mouse_out(covered, recorder(&log, "c:out"));
        scene.on_mouse_over(backdrop, recorder(&log, "s:over"));
        scene.on_mouse_out(backdrop, recorder(&log, "s:out"));

        // backdrop widget shadows the explicit canvas below it
        scene.handle_event(moved(50, 50));
        assert_eq!(taken(&log), vec!["s:over"]);

        // off the backdrop widget, the explicit canvas takes over
        scene.handle_event(moved(150, 150));
        assert_eq!(taken(&log), vec!["s:out", "c:over"]);

        // jumping back onto the backdrop widget exits the shadowed canvas
        scene.handle_event(moved(50, 50));
        assert_eq!(taken(&log), vec!["s:over", "c:out"]);
    }

    #[test]
    fn nested_canvas_dispatch_and_cascade() {
        let mut scene = scene();
        let outer = scene.create_canvas(rect(0, 0, 200, 200));
        let inner = scene.create_nested_canvas(outer, rect(50, 50, 100, 100)).unwrap();
        let img = scene.create_image(Some(inner), rect(10, 10, 50, 50), bitmap()).unwrap();
        let log: EventLog = Default::default();
        scene.on_mouse_over(img, recorder(&log, "over"));
        scene.on_mouse_out(img, recorder(&log, "out"));

        let (lo, _) = scene.absolute_corners(img).unwrap();
        assert_eq!((lo.x, lo.y), (60, 60));

        scene.handle_event(moved(70, 70));
        assert_eq!(taken(&log), vec!["over"]);
        scene.handle_event(moved(10, 10));
        assert_eq!(taken(&log), vec!["out"]);

        scene.set_transform(outer, rect(100, 0, 200, 200));
        let (lo, _) = scene.absolute_corners(img).unwrap();
        assert_eq!((lo.x, lo.y), (160, 60));
    }

    #[test]
    fn stale_handles_become_noops_after_remove() {
        let mut scene = scene();
        let canvas = scene.create_canvas(rect(0, 0, 100, 100));
        let img = scene.create_image(Some(canvas), rect(0, 0, 50, 50), bitmap()).unwrap();

        assert!(scene.remove_canvas(canvas));
        assert!(!scene.is_valid(canvas));
        assert!(!scene.is_valid(img));
        assert!(scene.transform(img).is_none());
        scene.set_transform(img, rect(1, 1, 1, 1));
        assert!(scene.create_image(Some(canvas), rect(0, 0, 10, 10), bitmap()).is_none());
        assert!(!scene.remove_canvas(canvas));
        assert!(!scene.remove_canvas(scene.screen_canvas()));
    }

    #[test]
    fn empty_bitmap_is_rejected() {
        let mut scene = scene();
        assert!(scene.create_image(None, rect(0, 0, 10, 10), Bitmap::new(TextureId::new(1), 0, 10)).is_none());
    }

    #[test]
    fn sliced_draw_emits_nine_fragments_and_falls_back_when_unset() {
        let mut scene = scene();
        let sliced = scene.create_image(None, rect(0, 0, 100, 100), bitmap()).unwrap();
        scene.set_draw_mode(sliced, DrawMode::Sliced);
        scene.set_slice_spec(sliced, SliceSpec::new(10, 10, 20, 20));

        let mut surface = RecordingSurface::default();
        scene.draw(&mut surface);
        assert_eq!(surface.blits().len(), 9);

        // clearing the spec drops back to one whole-image blit
        scene.set_slice_spec(sliced, SliceSpec::default());
        let mut surface = RecordingSurface::default();
        scene.draw(&mut surface);
        assert_eq!(surface.blits().len(), 1);
        assert_eq!(surface.blits()[0], &Call::Blit { texture: 7, dst: (0, 0, 100, 100) });
    }

    #[test]
    fn tiled_draw_runs_in_a_scoped_offscreen_pass() {
        let mut scene = scene();
        let img = scene.create_image(None, rect(0, 0, 97, 97), bitmap()).unwrap();
        scene.set_draw_mode(img, DrawMode::Tiled);
        scene.set_tile_rate(img, TileRate::new(3, 3));

        let mut surface = RecordingSurface::default();
        scene.draw(&mut surface);

        let push = surface.calls.iter().position(|c| matches!(c, Call::PushOffscreen { .. })).unwrap();
        let pop = surface.calls.iter().position(|c| matches!(c, Call::PopOffscreen { .. })).unwrap();
        assert_eq!(surface.calls[push], Call::PushOffscreen { size: (97, 97) });
        assert_eq!(surface.calls[pop], Call::PopOffscreen { dst: (0, 0, 97, 97) });
        // a 3x3 rate over 97px steps at 32px: 4x4 grid with clipped edge cells
        assert_eq!(surface.blits().len(), 16);
        assert_eq!(surface.offscreen_depth, 0);
        assert!(surface.clip.is_none(), "clip state must be restored after the frame");
    }

    #[test]
    fn tile_rate_is_clamped_to_the_widget_size() {
        let mut scene = scene();
        let img = scene.create_image(None, rect(0, 0, 10, 10), bitmap()).unwrap();
        scene.set_draw_mode(img, DrawMode::Tiled);
        scene.set_tile_rate(img, TileRate::new(300, 300));
        assert_eq!(scene.tile_rate(img), Some(TileRate::new(10, 10)));
    }

    #[test]
    fn canvas_background_paints_before_children() {
        let mut scene = scene();
        let canvas = scene.create_canvas(rect(0, 0, 100, 100));
        scene.set_background(canvas, Some(color(20, 20, 20, 255)));
        scene.create_image(Some(canvas), rect(0, 0, 50, 50), bitmap()).unwrap();

        let mut surface = RecordingSurface::default();
        scene.draw(&mut surface);
        let fill = surface.calls.iter().position(|c| matches!(c, Call::Fill { .. })).unwrap();
        let blit = surface.calls.iter().position(|c| matches!(c, Call::Blit { .. })).unwrap();
        assert!(fill < blit);
    }

    #[test]
    fn screen_canvas_draws_on_top_of_explicit_canvases() {
        let mut scene = scene();
        let canvas = scene.create_canvas(rect(0, 0, 200, 200));
        scene.create_image(Some(canvas), rect(0, 0, 50, 50), bitmap()).unwrap();
        let backdrop_img = Bitmap::new(TextureId::new(9), 10, 10);
        scene.create_image(None, rect(0, 0, 50, 50), backdrop_img).unwrap();

        let mut surface = RecordingSurface::default();
        scene.draw(&mut surface);
        let order: Vec<u32> = surface
            .calls
            .iter()
            .filter_map(|c| match c {
                Call::Blit { texture, .. } => Some(*texture),
                _ => None,
            })
            .collect();
        assert_eq!(order, vec![7, 9]);
    }

    #[test]
    fn text_widget_autosizes_and_draws_glyphs() {
        let mut scene = scene();
        let sheet = FontSheet::new(Bitmap::new(TextureId::new(3), 128, 96), Dimensioni::new(8, 16), 32);
        scene.set_font_sheet(sheet);
        let txt = scene.create_text(None, rect(5, 5, 0, 0), "ab\ncd").unwrap();

        let t = scene.transform(txt).unwrap();
        assert_eq!((t.width, t.height), (16, 32));

        let mut surface = RecordingSurface::default();
        scene.draw(&mut surface);
        assert_eq!(surface.blits().len(), 4);
        assert_eq!(surface.blits()[0], &Call::Blit { texture: 3, dst: (5, 5, 8, 16) });

        scene.set_text_scale(txt, 2);
        let t = scene.transform(txt).unwrap();
        assert_eq!((t.width, t.height), (32, 64));
    }

    #[test]
    fn text_widget_without_a_font_sheet_draws_nothing() {
        let mut scene = scene();
        let txt = scene.create_text(None, rect(5, 5, 0, 0), "hello").unwrap();
        assert_eq!(scene.text(txt).as_deref(), Some("hello"));

        let mut surface = RecordingSurface::default();
        scene.draw(&mut surface);
        assert!(surface.blits().is_empty());
    }
}
