use egui::Color32;

/// Number of palette slots. Cell values are raw `u8` indices into this table.
pub const PALETTE_LEN: usize = 256;

/// Quantization steps of the web-safe cube (6³ = 216 colors).
const WEB_SAFE_STEPS: [u8; 6] = [0, 51, 102, 153, 204, 255];

/// Fixed 256-color palette shared by every client of the canvas.
///
/// Layout:
///   index 0         — empty / transparent (never drawn)
///   indices 1..=216 — the web-safe color cube, red-major
///   indices 217..   — a grayscale ramp filling the remaining slots
///
/// The table is generated deterministically so two clients always agree on
/// what a cell value means without exchanging palette data.
pub struct Palette {
    colors: [Color32; PALETTE_LEN],
}

impl Palette {
    pub fn new() -> Self {
        let mut colors = [Color32::TRANSPARENT; PALETTE_LEN];
        let mut next = 1;

        for r in WEB_SAFE_STEPS {
            for g in WEB_SAFE_STEPS {
                for b in WEB_SAFE_STEPS {
                    colors[next] = Color32::from_rgb(r, g, b);
                    next += 1;
                }
            }
        }

        // Grayscale ramp over whatever slots remain (39 with the 216-cube).
        let remaining = PALETTE_LEN - next;
        for i in 0..remaining {
            let v = ((i as f32 / (remaining - 1) as f32) * 255.0).round() as u8;
            colors[next + i] = Color32::from_gray(v);
        }

        Self { colors }
    }

    /// Color for a palette index. Index 0 is fully transparent.
    #[inline]
    pub fn color(&self, index: u8) -> Color32 {
        self.colors[index as usize]
    }

    /// Whether the index draws nothing (the empty cell marker).
    #[inline]
    pub fn is_empty_index(index: u8) -> bool {
        index == 0
    }

    /// Human-readable label for the sidebar swatch tooltip.
    pub fn label(&self, index: u8) -> String {
        if index == 0 {
            "transparent".to_string()
        } else {
            let c = self.colors[index as usize];
            format!("rgb({}, {}, {})", c.r(), c.g(), c.b())
        }
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_zero_is_transparent() {
        let pal = Palette::new();
        assert_eq!(pal.color(0), Color32::TRANSPARENT);
        assert!(Palette::is_empty_index(0));
        assert!(!Palette::is_empty_index(1));
    }

    #[test]
    fn web_safe_cube_fills_first_216_slots() {
        let pal = Palette::new();
        // First cube entry is black, last is white.
        assert_eq!(pal.color(1), Color32::from_rgb(0, 0, 0));
        assert_eq!(pal.color(216), Color32::from_rgb(255, 255, 255));
        // Red-major ordering: index 2 bumps the blue channel first.
        assert_eq!(pal.color(2), Color32::from_rgb(0, 0, 51));
    }

    #[test]
    fn grayscale_ramp_spans_full_range() {
        let pal = Palette::new();
        assert_eq!(pal.color(217), Color32::from_gray(0));
        assert_eq!(pal.color(255), Color32::from_gray(255));
        // Ramp is monotonic.
        let mut prev = 0u8;
        for i in 217..=255u8 {
            let v = pal.color(i).r();
            assert!(v >= prev, "ramp decreased at index {i}");
            prev = v;
        }
    }

    #[test]
    fn labels() {
        let pal = Palette::new();
        assert_eq!(pal.label(0), "transparent");
        assert_eq!(pal.label(1), "rgb(0, 0, 0)");
    }
}
