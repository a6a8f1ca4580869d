//! Per-frame canvas compositing.
//!
//! Pure read path: the view walks the visible cell rectangle, fills
//! non-empty cells, then layers gridlines and the hover / last-paint
//! markers on top. Nothing here mutates the buffer, the pending edits, or
//! credit state.

use egui::{Color32, Painter, Pos2, Rect, Rounding, Stroke};

use crate::grid::GridBuffer;
use crate::palette::Palette;
use crate::settings::GridlineMode;
use crate::viewport::Viewport;

/// Canvas backdrop behind empty cells.
const BACKGROUND: Color32 = Color32::from_rgb(15, 18, 24);

/// On-screen cell size below which gridlines stop being legible.
const GRIDLINE_MIN_CELL_PX: f32 = 6.0;

/// Hard floor for forced-on gridlines; below this they would just dim the
/// canvas.
const GRIDLINE_ABS_MIN_CELL_PX: f32 = 2.0;

const GRIDLINE_COLOR: Color32 = Color32::from_rgba_premultiplied(255, 255, 255, 8);

/// Hover pad: proportional to cell size, clamped so the pop stays visible
/// when zoomed out and restrained when zoomed in.
fn hover_pad(cell_px: f32) -> f32 {
    (cell_px * 0.12).clamp(1.0, 6.0)
}

/// Whether separator lines are drawn at this zoom.
fn gridlines_visible(mode: GridlineMode, cell_px: f32) -> bool {
    match mode {
        GridlineMode::Auto => cell_px >= GRIDLINE_MIN_CELL_PX,
        GridlineMode::AlwaysOn => cell_px >= GRIDLINE_ABS_MIN_CELL_PX,
        GridlineMode::AlwaysOff => false,
    }
}

/// Viewport plus the interaction markers the compositor draws.
pub struct CanvasView {
    pub viewport: Viewport,
    /// Cell under the pointer, possibly outside the grid (validated at draw
    /// time, like paint time).
    pub hover: Option<(i64, i64)>,
    /// Last successfully painted cell — a persistent confirmation marker.
    pub last_paint: Option<(u32, u32)>,
}

impl CanvasView {
    pub fn new() -> Self {
        Self {
            viewport: Viewport::new(),
            hover: None,
            last_paint: None,
        }
    }

    /// Composite one frame into `rect`.
    pub fn draw(
        &self,
        painter: &Painter,
        rect: Rect,
        grid: &GridBuffer,
        palette: &Palette,
        gridline_mode: GridlineMode,
    ) {
        painter.rect_filled(rect, Rounding::ZERO, BACKGROUND);
        if grid.is_empty() {
            return;
        }

        let vp = &self.viewport;
        let cell_px = vp.cell_px();
        let origin = rect.min.to_vec2();

        // -- visible cells ------------------------------------------------
        let (start_x, start_y, end_x, end_y) =
            vp.visible_cells(rect.size(), grid.width(), grid.height());
        let cells = grid.cells();
        for gy in start_y..end_y {
            let row_base = gy as usize * grid.width() as usize;
            for gx in start_x..end_x {
                let index = cells[row_base + gx as usize];
                if Palette::is_empty_index(index) {
                    continue;
                }
                let cell = vp.cell_rect(gx as i64, gy as i64).translate(origin);
                painter.rect_filled(cell, Rounding::ZERO, palette.color(index));
            }
        }

        // -- gridlines, pixel-locked to cell boundaries --------------------
        if gridlines_visible(gridline_mode, cell_px) {
            let stroke = Stroke::new(1.0, GRIDLINE_COLOR);
            let mut x = (-vp.offset.x / cell_px).floor() * cell_px + vp.offset.x;
            while x <= rect.width() {
                let sx = rect.min.x + x.round() + 0.5;
                painter.line_segment(
                    [Pos2::new(sx, rect.min.y), Pos2::new(sx, rect.max.y)],
                    stroke,
                );
                x += cell_px;
            }
            let mut y = (-vp.offset.y / cell_px).floor() * cell_px + vp.offset.y;
            while y <= rect.height() {
                let sy = rect.min.y + y.round() + 0.5;
                painter.line_segment(
                    [Pos2::new(rect.min.x, sy), Pos2::new(rect.max.x, sy)],
                    stroke,
                );
                y += cell_px;
            }
        }

        // -- hover pop: enlarged translucent preview box -------------------
        if let Some((hx, hy)) = self.hover
            && grid.in_bounds(hx, hy)
        {
            let pad = hover_pad(cell_px);
            let cell = vp.cell_rect(hx, hy).translate(origin).expand(pad);
            painter.rect_filled(
                cell,
                Rounding::ZERO,
                Color32::from_rgba_premultiplied(255, 255, 255, 15),
            );
            // Two-tone double stroke so the box reads on any cell color:
            // bright inner line, dark outer line.
            painter.rect_stroke(
                cell.shrink(0.5),
                Rounding::ZERO,
                Stroke::new(2.0, Color32::from_rgba_premultiplied(230, 230, 230, 230)),
            );
            painter.rect_stroke(
                cell.expand(1.0).shrink(0.5),
                Rounding::ZERO,
                Stroke::new(1.0, Color32::from_rgba_premultiplied(0, 0, 0, 178)),
            );
        }

        // -- last painted cell: single subtle inset stroke -----------------
        if let Some((lx, ly)) = self.last_paint {
            let cell = vp
                .cell_rect(lx as i64, ly as i64)
                .translate(origin)
                .shrink(0.5);
            painter.rect_stroke(
                cell,
                Rounding::ZERO,
                Stroke::new(1.5, Color32::from_rgba_premultiplied(160, 160, 160, 160)),
            );
        }
    }
}

impl Default for CanvasView {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hover_pad_clamps_to_visible_range() {
        assert_eq!(hover_pad(1.2), 1.0); // zoomed far out
        assert_eq!(hover_pad(96.0), 6.0); // zoomed far in
        let mid = hover_pad(30.0);
        assert!((mid - 3.6).abs() < 1e-4);
    }

    #[test]
    fn gridline_visibility_per_mode() {
        assert!(!gridlines_visible(GridlineMode::Auto, 5.9));
        assert!(gridlines_visible(GridlineMode::Auto, 6.0));
        assert!(gridlines_visible(GridlineMode::AlwaysOn, 3.0));
        assert!(!gridlines_visible(GridlineMode::AlwaysOn, 1.5));
        assert!(!gridlines_visible(GridlineMode::AlwaysOff, 100.0));
    }
}
