//! Pointer and wheel handling over the canvas widget.
//!
//! Left click / drag paints, middle-drag (or Ctrl/Shift + left-drag) pans,
//! the wheel zooms around the cursor. egui's response tracking captures the
//! pointer for the lifetime of a drag, so a stroke keeps painting even when
//! the cursor briefly leaves the widget rect.

use egui::{PointerButton, Rect, Response, Ui};

use crate::render::CanvasView;

/// A paint request for the cell under the pointer. May point outside the
/// grid; the session performs the bounds check.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PaintRequest {
    pub gx: i64,
    pub gy: i64,
}

pub struct PointerController;

impl PointerController {
    pub fn new() -> Self {
        Self
    }

    /// Translate this frame's pointer/wheel state into viewport mutations
    /// and (at most one) paint request.
    pub fn handle(
        &mut self,
        ui: &Ui,
        response: &Response,
        rect: Rect,
        view: &mut CanvasView,
    ) -> Option<PaintRequest> {
        // Hover tracks every move, pressed or not.
        view.hover = response
            .hover_pos()
            .map(|pos| view.viewport.to_cell(pos - rect.min.to_vec2()));

        // Wheel zoom, anchored at the cursor.
        if response.hovered()
            && let Some(pos) = response.hover_pos()
        {
            let scroll = ui.input(|i| i.scroll_delta.y);
            if scroll != 0.0 {
                view.viewport.zoom_at(pos - rect.min.to_vec2(), scroll);
            }
        }

        let pan_modifier = ui.input(|i| i.modifiers.ctrl || i.modifiers.shift);

        // Pan: middle-drag, or modifier + left-drag.
        if response.dragged_by(PointerButton::Middle)
            || (pan_modifier && response.dragged_by(PointerButton::Primary))
        {
            view.viewport.pan(response.drag_delta());
            return None;
        }

        // Paint while the primary button is held down over the canvas.
        if response.is_pointer_button_down_on()
            && !pan_modifier
            && ui.input(|i| i.pointer.primary_down())
            && let Some(pos) = response.interact_pointer_pos()
        {
            let (gx, gy) = view.viewport.to_cell(pos - rect.min.to_vec2());
            return Some(PaintRequest { gx, gy });
        }
        None
    }
}

impl Default for PointerController {
    fn default() -> Self {
        Self::new()
    }
}
