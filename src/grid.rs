/// Dense local copy of the remote canvas.
///
/// One byte per cell (a palette index, 0 = empty), row-major. The buffer is
/// owned by the UI thread; hydration tasks hand completed chunks over a
/// channel and the session copies them in, so readers never observe a torn
/// reference — only possibly-stale content.
///
/// `version` is bumped exactly once per fully successful hydration pass. It
/// is a readiness signal for consumers that cache derived data, not a dirty
/// flag for individual cell writes (local paints and partial hydrations leave
/// it untouched).
pub struct GridBuffer {
    width: u32,
    height: u32,
    cells: Vec<u8>,
    version: u64,
}

impl GridBuffer {
    /// An empty 0×0 buffer, used before the first metadata fetch completes.
    pub fn empty() -> Self {
        Self {
            width: 0,
            height: 0,
            cells: Vec::new(),
            version: 0,
        }
    }

    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            cells: vec![0; width as usize * height as usize],
            version: 0,
        }
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn version(&self) -> u64 {
        self.version
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Raw cell slice for rendering. `debug_assert` guards the length
    /// invariant — a mismatch is a programming error, not a runtime
    /// condition to recover from.
    #[inline]
    pub fn cells(&self) -> &[u8] {
        debug_assert_eq!(self.cells.len(), self.width as usize * self.height as usize);
        &self.cells
    }

    #[inline]
    pub fn in_bounds(&self, gx: i64, gy: i64) -> bool {
        gx >= 0 && gy >= 0 && (gx as u64) < self.width as u64 && (gy as u64) < self.height as u64
    }

    #[inline]
    pub fn get(&self, gx: u32, gy: u32) -> u8 {
        self.cells[gy as usize * self.width as usize + gx as usize]
    }

    /// Overwrite a single cell. Callers are responsible for bounds checks;
    /// used for the optimistic local paint overlay.
    #[inline]
    pub fn set(&mut self, gx: u32, gy: u32, color: u8) {
        let idx = gy as usize * self.width as usize + gx as usize;
        self.cells[idx] = color;
    }

    /// Adopt remote dimensions. Reallocates (zeroed) only when the size
    /// actually changed; otherwise prior content is kept so a failed
    /// re-hydration still shows the last known canvas.
    pub fn ensure_size(&mut self, width: u32, height: u32) {
        if self.width != width || self.height != height {
            self.width = width;
            self.height = height;
            self.cells = vec![0; width as usize * height as usize];
        }
    }

    /// Copy a hydration chunk into its precomputed destination range.
    /// Out-of-date chunks (from a pass issued before a resize) are dropped.
    pub fn write_chunk(&mut self, offset: usize, data: &[u8]) {
        let end = offset + data.len();
        if end <= self.cells.len() {
            self.cells[offset..end].copy_from_slice(data);
        }
    }

    /// Mark the buffer contents as one consistent remote snapshot.
    pub fn bump_version(&mut self) {
        self.version += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_buffer_is_zeroed_with_invariant_length() {
        let g = GridBuffer::new(10, 7);
        assert_eq!(g.cells().len(), 70);
        assert!(g.cells().iter().all(|&c| c == 0));
        assert_eq!(g.version(), 0);
    }

    #[test]
    fn set_get_roundtrip_row_major() {
        let mut g = GridBuffer::new(4, 3);
        g.set(2, 1, 9);
        assert_eq!(g.get(2, 1), 9);
        assert_eq!(g.cells()[1 * 4 + 2], 9);
    }

    #[test]
    fn ensure_size_keeps_content_when_dimensions_match() {
        let mut g = GridBuffer::new(5, 5);
        g.set(3, 3, 7);
        g.ensure_size(5, 5);
        assert_eq!(g.get(3, 3), 7);

        g.ensure_size(6, 5);
        assert_eq!(g.cells().len(), 30);
        assert!(g.cells().iter().all(|&c| c == 0));
    }

    #[test]
    fn write_chunk_copies_into_destination_and_drops_stale_ranges() {
        let mut g = GridBuffer::new(4, 2);
        g.write_chunk(3, &[1, 2, 3]);
        assert_eq!(g.cells(), &[0, 0, 0, 1, 2, 3, 0, 0]);
        // A chunk that no longer fits (e.g. issued before a shrink) is dropped.
        g.write_chunk(7, &[9, 9]);
        assert_eq!(g.cells(), &[0, 0, 0, 1, 2, 3, 0, 0]);
    }

    #[test]
    fn in_bounds_rejects_negatives_and_edges() {
        let g = GridBuffer::new(8, 4);
        assert!(g.in_bounds(0, 0));
        assert!(g.in_bounds(7, 3));
        assert!(!g.in_bounds(-1, 0));
        assert!(!g.in_bounds(0, -1));
        assert!(!g.in_bounds(8, 0));
        assert!(!g.in_bounds(0, 4));
    }

    #[test]
    fn version_bumps_are_monotonic() {
        let mut g = GridBuffer::new(2, 2);
        g.bump_version();
        g.bump_version();
        assert_eq!(g.version(), 2);
    }
}
