//! Rasterize a hydrated cell buffer into an RGBA image (headless snapshot
//! mode). Rows are converted in parallel; empty cells stay transparent so
//! PNG output composites over any background.

use image::RgbaImage;
use rayon::prelude::*;

use crate::palette::Palette;

/// Render `cells` (row-major, `width * height`) at `cell_px` output pixels
/// per cell.
pub fn rasterize(
    cells: &[u8],
    width: u32,
    height: u32,
    palette: &Palette,
    cell_px: u32,
) -> RgbaImage {
    assert_eq!(cells.len(), width as usize * height as usize);
    let cell_px = cell_px.max(1) as usize;
    let (width, height) = (width as usize, height as usize);
    let out_w = width * cell_px;
    let out_h = height * cell_px;

    let mut raw = vec![0u8; out_w * out_h * 4];
    raw.par_chunks_mut(out_w * 4)
        .enumerate()
        .for_each(|(out_y, row)| {
            let gy = out_y / cell_px;
            for gx in 0..width {
                let index = cells[gy * width + gx];
                if Palette::is_empty_index(index) {
                    continue;
                }
                let color = palette.color(index);
                let rgba = [color.r(), color.g(), color.b(), 255];
                let start = gx * cell_px * 4;
                for px in 0..cell_px {
                    row[start + px * 4..start + px * 4 + 4].copy_from_slice(&rgba);
                }
            }
        });

    RgbaImage::from_raw(out_w as u32, out_h as u32, raw)
        .expect("raster buffer matches its dimensions")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_cells_are_transparent_and_colors_land_scaled() {
        let palette = Palette::new();
        // 2×2 grid: transparent, black, white, gray ramp start.
        let cells = [0u8, 1, 216, 217];
        let img = rasterize(&cells, 2, 2, &palette, 2);
        assert_eq!(img.dimensions(), (4, 4));

        // Top-left cell: transparent.
        assert_eq!(img.get_pixel(0, 0).0, [0, 0, 0, 0]);
        assert_eq!(img.get_pixel(1, 1).0, [0, 0, 0, 0]);
        // Top-right cell: palette index 1 = black, opaque; covers 2×2 pixels.
        assert_eq!(img.get_pixel(2, 0).0, [0, 0, 0, 255]);
        assert_eq!(img.get_pixel(3, 1).0, [0, 0, 0, 255]);
        // Bottom-left: white.
        assert_eq!(img.get_pixel(0, 2).0, [255, 255, 255, 255]);
        // Bottom-right: first grayscale ramp entry (black, opaque).
        assert_eq!(img.get_pixel(2, 2).0, [0, 0, 0, 255]);
    }

    #[test]
    fn cell_px_one_maps_cells_to_pixels() {
        let palette = Palette::new();
        let cells = [216u8, 0, 0, 216];
        let img = rasterize(&cells, 2, 2, &palette, 1);
        assert_eq!(img.dimensions(), (2, 2));
        assert_eq!(img.get_pixel(0, 0).0, [255, 255, 255, 255]);
        assert_eq!(img.get_pixel(1, 0).0, [0, 0, 0, 0]);
        assert_eq!(img.get_pixel(1, 1).0, [255, 255, 255, 255]);
    }
}
