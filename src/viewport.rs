use egui::{Pos2, Rect, Vec2};

/// Logical cell edge in points at scale 1.0.
pub const CELL_SIZE: f32 = 12.0;

/// Zoom bounds. Scale is clamped here no matter what the wheel delivers.
pub const MIN_SCALE: f32 = 0.1;
pub const MAX_SCALE: f32 = 8.0;

/// Wheel sensitivity: scroll delta → exponential zoom factor.
const WHEEL_ZOOM_SENSITIVITY: f32 = 0.0012;

/// Pan/zoom transform between canvas-local points and grid cells.
///
/// All positions passed in are canvas-local (the widget rect's min already
/// subtracted). The transform is `local = offset + cell * CELL_SIZE * scale`;
/// the grid is finite but the viewport is not — panning is unbounded and
/// out-of-range cells are simply never drawn.
#[derive(Clone, Copy, Debug)]
pub struct Viewport {
    pub scale: f32,
    pub offset: Vec2,
}

impl Viewport {
    pub fn new() -> Self {
        Self {
            scale: 1.0,
            offset: Vec2::ZERO,
        }
    }

    /// On-screen edge length of one cell.
    #[inline]
    pub fn cell_px(&self) -> f32 {
        CELL_SIZE * self.scale
    }

    /// Canvas-local point → grid cell. `floor` (not truncation) so positions
    /// left/above the origin resolve to the correct negative cell instead of
    /// collapsing onto cell 0.
    pub fn to_cell(&self, local: Pos2) -> (i64, i64) {
        let cell_px = self.cell_px();
        let gx = ((local.x - self.offset.x) / cell_px).floor() as i64;
        let gy = ((local.y - self.offset.y) / cell_px).floor() as i64;
        (gx, gy)
    }

    /// Canvas-local position of a cell's top-left corner.
    #[inline]
    pub fn cell_origin(&self, gx: i64, gy: i64) -> Pos2 {
        let cell_px = self.cell_px();
        Pos2::new(
            self.offset.x + gx as f32 * cell_px,
            self.offset.y + gy as f32 * cell_px,
        )
    }

    /// Canvas-local rect covering one cell.
    pub fn cell_rect(&self, gx: i64, gy: i64) -> Rect {
        let origin = self.cell_origin(gx, gy);
        Rect::from_min_size(origin, Vec2::splat(self.cell_px()))
    }

    /// Unbounded pan by a screen-space delta.
    pub fn pan(&mut self, delta: Vec2) {
        self.offset += delta;
    }

    /// Exponential wheel zoom anchored at `cursor` (canvas-local): the grid
    /// point under the cursor stays under the cursor after the scale change.
    /// `scroll_y` is egui's wheel delta — positive zooms in.
    pub fn zoom_at(&mut self, cursor: Pos2, scroll_y: f32) {
        let factor = (scroll_y * WHEEL_ZOOM_SENSITIVITY).exp();
        let new_scale = (self.scale * factor).clamp(MIN_SCALE, MAX_SCALE);

        // Grid-space point currently under the cursor, re-anchored post-scale.
        let pre_x = (cursor.x - self.offset.x) / self.scale;
        let pre_y = (cursor.y - self.offset.y) / self.scale;
        self.scale = new_scale;
        self.offset.x = cursor.x - pre_x * self.scale;
        self.offset.y = cursor.y - pre_y * self.scale;
    }

    /// Cell-index rectangle visible in a view of `size`, clamped to the
    /// grid. Returns `(start_x, start_y, end_x, end_y)` with exclusive ends;
    /// empty when the grid is entirely off-screen.
    pub fn visible_cells(&self, size: Vec2, grid_w: u32, grid_h: u32) -> (u32, u32, u32, u32) {
        let cell_px = self.cell_px();
        let start_x = ((-self.offset.x / cell_px).floor().max(0.0)) as u32;
        let start_y = ((-self.offset.y / cell_px).floor().max(0.0)) as u32;
        let end_x = (((size.x - self.offset.x) / cell_px).ceil().max(0.0) as u32).min(grid_w);
        let end_y = (((size.y - self.offset.y) / cell_px).ceil().max(0.0) as u32).min(grid_h);
        (start_x.min(end_x), start_y.min(end_y), end_x, end_y)
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_at_identity() {
        let vp = Viewport::new();
        for gx in 0..50i64 {
            for gy in 0..50i64 {
                let origin = vp.cell_origin(gx, gy);
                // Sample just inside the cell to avoid the shared boundary.
                let p = Pos2::new(origin.x + 0.5, origin.y + 0.5);
                assert_eq!(vp.to_cell(p), (gx, gy));
            }
        }
    }

    #[test]
    fn floor_resolves_negative_side_correctly() {
        let vp = Viewport::new();
        // Just left/above the origin must be cell (-1, -1), not (0, 0).
        assert_eq!(vp.to_cell(Pos2::new(-0.5, -0.5)), (-1, -1));
        assert_eq!(vp.to_cell(Pos2::new(0.5, 0.5)), (0, 0));
        assert_eq!(vp.to_cell(Pos2::new(-CELL_SIZE - 0.5, 3.0)), (-2, 0));
    }

    #[test]
    fn zoom_keeps_cursor_cell_anchored() {
        let deltas = [-240.0, -60.0, -3.0, 3.0, 60.0, 240.0];
        let cursors = [
            Pos2::new(0.0, 0.0),
            Pos2::new(321.5, 77.25),
            Pos2::new(1279.0, 719.0),
        ];
        for &cursor in &cursors {
            let mut vp = Viewport::new();
            vp.offset = Vec2::new(-37.5, 12.25);
            vp.scale = 1.7;
            for &delta in &deltas {
                // Compare grid-space coordinates (not cell indices) so the
                // assertion also holds when the cursor sits on a boundary.
                let before_x = (cursor.x - vp.offset.x) / vp.scale;
                let before_y = (cursor.y - vp.offset.y) / vp.scale;
                vp.zoom_at(cursor, delta);
                let after_x = (cursor.x - vp.offset.x) / vp.scale;
                let after_y = (cursor.y - vp.offset.y) / vp.scale;
                assert!(
                    (before_x - after_x).abs() < 1e-3 && (before_y - after_y).abs() < 1e-3,
                    "zoom jumped the anchor: delta {delta}, cursor {cursor:?}"
                );
            }
        }
    }

    #[test]
    fn zoom_scale_is_clamped() {
        let mut vp = Viewport::new();
        for _ in 0..200 {
            vp.zoom_at(Pos2::new(100.0, 100.0), 500.0);
        }
        assert!((vp.scale - MAX_SCALE).abs() < f32::EPSILON);
        for _ in 0..400 {
            vp.zoom_at(Pos2::new(100.0, 100.0), -500.0);
        }
        assert!((vp.scale - MIN_SCALE).abs() < f32::EPSILON);
    }

    #[test]
    fn pan_is_unbounded() {
        let mut vp = Viewport::new();
        vp.pan(Vec2::new(-1.0e6, 2.0e6));
        assert_eq!(vp.offset, Vec2::new(-1.0e6, 2.0e6));
    }

    #[test]
    fn visible_cells_clamp_to_grid() {
        let mut vp = Viewport::new();
        // Whole 10×10 grid fits in a large view.
        let (sx, sy, ex, ey) = vp.visible_cells(Vec2::new(1000.0, 1000.0), 10, 10);
        assert_eq!((sx, sy, ex, ey), (0, 0, 10, 10));

        // Panned right/down past the first two columns/rows.
        vp.offset = Vec2::new(-2.0 * CELL_SIZE, -2.0 * CELL_SIZE);
        let (sx, sy, _, _) = vp.visible_cells(Vec2::new(1000.0, 1000.0), 10, 10);
        assert_eq!((sx, sy), (2, 2));

        // Grid fully off-screen to the left yields an empty range.
        vp.offset = Vec2::new(-500.0, 0.0);
        let (sx, _, ex, _) = vp.visible_cells(Vec2::new(100.0, 100.0), 10, 10);
        assert!(sx >= ex);
    }
}
