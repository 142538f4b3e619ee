//! Viewport windowing: which rows and columns must be materialized for a
//! given scroll offset and viewport size.

use std::collections::BTreeMap;
use std::ops::Range;

use crate::config::EngineConfig;

/// Sizes along one axis: a default plus per-index overrides.
#[derive(Clone, Debug, PartialEq)]
pub struct SizeMap {
    pub default: f64,
    pub overrides: BTreeMap<usize, f64>,
    pub count: usize,
}

impl SizeMap {
    pub fn new(default: f64, count: usize) -> Self {
        SizeMap {
            default,
            overrides: BTreeMap::new(),
            count,
        }
    }

    pub fn set(&mut self, index: usize, size: f64) {
        self.overrides.insert(index, size.max(0.0));
    }

    pub fn size_of(&self, index: usize) -> f64 {
        self.overrides.get(&index).copied().unwrap_or(self.default)
    }

    /// `prefix[i]` is the offset where index `i` starts; `prefix[count]` is the total.
    pub fn prefix_sums(&self) -> Vec<f64> {
        let mut prefix = Vec::with_capacity(self.count + 1);
        let mut acc = 0.0;
        prefix.push(acc);
        for i in 0..self.count {
            acc += self.size_of(i);
            prefix.push(acc);
        }
        prefix
    }

    pub fn total(&self) -> f64 {
        self.default * self.count as f64
            + self
                .overrides
                .iter()
                .filter(|(i, _)| **i < self.count)
                .map(|(_, s)| s - self.default)
                .sum::<f64>()
    }

    /// Index window for a viewport of `viewport` pixels scrolled to `offset`.
    pub fn window(&self, offset: f64, viewport: f64, buffer: usize) -> Range<usize> {
        visible_window(&self.prefix_sums(), offset, viewport, buffer)
    }
}

/// Window over an axis described by its prefix sums (see [`SizeMap::prefix_sums`]).
///
/// The first index is the first whose end lies past `offset`; the last is
/// the one just past the first index ending after `offset + viewport`. Both
/// edges are padded by `buffer` and clamped to `[0, count)`.
pub fn visible_window(prefix: &[f64], offset: f64, viewport: f64, buffer: usize) -> Range<usize> {
    let count = prefix.len().saturating_sub(1);
    if count == 0 {
        return 0..0;
    }
    let ends = &prefix[1..];
    let offset = offset.max(0.0);

    let start = ends.partition_point(|&e| e <= offset).min(count);
    let last = ends.partition_point(|&e| e <= offset + viewport.max(0.0));
    let end = if last < count { last + 1 } else { count };

    start.saturating_sub(buffer)..(end + buffer).min(count)
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VisibleWindow {
    pub rows: Range<usize>,
    pub cols: Range<usize>,
}

impl VisibleWindow {
    pub fn contains(&self, row: usize, col: usize) -> bool {
        self.rows.contains(&row) && self.cols.contains(&col)
    }
}

/// Both axes of the grid plus the buffer margin.
#[derive(Clone, Debug, PartialEq)]
pub struct Viewport {
    pub rows: SizeMap,
    pub cols: SizeMap,
    pub buffer: usize,
}

impl Viewport {
    pub fn from_config(config: &EngineConfig) -> Self {
        Viewport {
            rows: SizeMap::new(config.default_row_height, config.row_count),
            cols: SizeMap::new(config.default_col_width, config.col_count),
            buffer: config.buffer,
        }
    }

    pub fn visible(
        &self,
        scroll_top: f64,
        scroll_left: f64,
        height: f64,
        width: f64,
    ) -> VisibleWindow {
        VisibleWindow {
            rows: self.rows.window(scroll_top, height, self.buffer),
            cols: self.cols.window(scroll_left, width, self.buffer),
        }
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Viewport::from_config(&EngineConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_uniform_rows() {
        let rows = SizeMap::new(25.0, 100);
        assert_eq!(rows.window(200.0, 100.0, 5), 3..18);
        assert_eq!(rows.window(0.0, 100.0, 5), 0..10);
    }

    #[test]
    fn test_window_clamps_at_end() {
        let rows = SizeMap::new(25.0, 100);
        assert_eq!(rows.window(2400.0, 500.0, 5), 91..100);
        assert_eq!(rows.window(1.0e9, 100.0, 5), 95..100);
    }

    #[test]
    fn test_overrides_shift_window() {
        let mut rows = SizeMap::new(25.0, 100);
        rows.set(0, 200.0);
        assert_eq!(rows.total(), 2675.0);
        // Row 0 spans [0, 200); rows 1.. start at 200.
        assert_eq!(rows.window(200.0, 100.0, 0), 1..6);
        assert_eq!(rows.window(50.0, 100.0, 0), 0..1);
    }

    #[test]
    fn test_empty_axis() {
        assert_eq!(SizeMap::new(25.0, 0).window(0.0, 100.0, 5), 0..0);
    }

    #[test]
    fn test_viewport_combines_axes() {
        let vp = Viewport::default();
        let win = vp.visible(200.0, 0.0, 100.0, 240.0);
        assert_eq!(win.rows, 3..18);
        assert_eq!(win.cols, 0..8);
        assert!(win.contains(10, 2));
    }

    proptest! {
        #[test]
        fn prop_window_covers_viewport(
            sizes in proptest::collection::vec(1.0f64..80.0, 1..200),
            offset in 0.0f64..5000.0,
            viewport in 0.0f64..1000.0,
        ) {
            let mut map = SizeMap::new(25.0, sizes.len());
            for (i, s) in sizes.iter().enumerate() {
                map.set(i, *s);
            }
            let prefix = map.prefix_sums();
            let win = map.window(offset, viewport, 0);
            prop_assert!(win.start <= win.end && win.end <= sizes.len());
            for i in 0..sizes.len() {
                let (lo, hi) = (prefix[i], prefix[i + 1]);
                if hi > offset && lo < offset + viewport {
                    prop_assert!(win.contains(&i), "index {} visible but outside {:?}", i, win);
                }
            }
        }
    }
}
