//! Immutable grid snapshots and the textual-maze parser.
//!
//! A fresh [`GridModel`] is built wholesale from `width`/`height`/`rows`
//! every time the maze changes; it is never mutated in place. [`GridStore`]
//! is the small concurrency wrapper the coordinator holds: event callbacks
//! publish a new snapshot, the driver thread reads whichever snapshot was
//! current at the start of its tick.

use std::sync::{Arc, RwLock};

use crate::error::GridError;

/// Cell characters that block movement regardless of stride detection.
const BLOCK_CHARS: [char; 9] = ['#', 'X', 'W', '?', 'O', 'o', '1', '█', '■'];

/// An immutable walkable-cell snapshot. Row-major, size `width * height`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridModel {
    width: u32,
    height: u32,
    walkable: Vec<bool>,
}

impl GridModel {
    /// Parse a textual maze snapshot: one row per y, top-down. Rows may be
    /// encoded with any per-cell stride detectable from their length versus
    /// `width` (see module docs and the design ledger for the exact rule).
    pub fn parse(width: u32, height: u32, rows: &[impl AsRef<str>]) -> Result<Self, GridError> {
        Self::parse_with_strict(width, height, rows, false)
    }

    /// As [`Self::parse`], but in strict mode any non-'.' character blocks
    /// the cell, rather than only the fixed block-character set.
    pub fn parse_with_strict(
        width: u32,
        height: u32,
        rows: &[impl AsRef<str>],
        strict: bool,
    ) -> Result<Self, GridError> {
        if width == 0 || height == 0 {
            return Err(GridError::ZeroDimension { width, height });
        }
        if rows.len() as u32 != height {
            return Err(GridError::RowCountMismatch {
                expected: height,
                got: rows.len() as u32,
            });
        }

        let mut walkable = Vec::with_capacity((width * height) as usize);
        for (row_idx, row) in rows.iter().enumerate() {
            let row = row.as_ref();
            let chars: Vec<char> = row.chars().collect();
            if chars.is_empty() {
                return Err(GridError::EmptyRow {
                    row: row_idx as u32,
                    width,
                });
            }
            let stride = cell_stride(chars.len() as u32, width);
            for x in 0..width {
                let idx = ((x * stride) as usize).min(chars.len() - 1);
                let ch = chars[idx];
                walkable.push(is_walkable_char(ch, strict));
            }
        }

        Ok(GridModel {
            width,
            height,
            walkable,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn in_bounds(&self, x: i64, y: i64) -> bool {
        x >= 0 && y >= 0 && (x as u32) < self.width && (y as u32) < self.height
    }

    /// Returns false for any out-of-bounds query, never panics.
    pub fn walkable(&self, x: i64, y: i64) -> bool {
        if !self.in_bounds(x, y) {
            return false;
        }
        let idx = (y as u32 * self.width + x as u32) as usize;
        self.walkable[idx]
    }
}

/// Stride rule from the grid spec: how many characters make up one cell.
fn cell_stride(row_len: u32, width: u32) -> u32 {
    if row_len == width {
        1
    } else if row_len == 2 * width || row_len + 1 == 2 * width {
        2
    } else if width != 0 && row_len % width == 0 {
        row_len / width
    } else {
        1
    }
}

fn is_walkable_char(ch: char, strict: bool) -> bool {
    if ch == '.' {
        return true;
    }
    if strict {
        return false;
    }
    !BLOCK_CHARS.contains(&ch)
}

/// Concurrency wrapper around the current [`GridModel`]: writers (the maze
/// event callback) publish wholesale replacements, readers take a cheap
/// `Arc` clone at tick start and use it for the rest of that tick.
#[derive(Debug, Default)]
pub struct GridStore {
    current: RwLock<Option<Arc<GridModel>>>,
}

impl GridStore {
    pub fn new() -> Self {
        Self {
            current: RwLock::new(None),
        }
    }

    pub fn update(&self, model: GridModel) {
        let mut guard = self.current.write().expect("grid store lock poisoned");
        *guard = Some(Arc::new(model));
    }

    /// A point-in-time snapshot, or `None` if no maze has been seen yet.
    pub fn snapshot(&self) -> Option<Arc<GridModel>> {
        self.current
            .read()
            .expect("grid store lock poisoned")
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn rows(strs: &[&str]) -> Vec<String> {
        strs.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn parses_simple_open_room() {
        let model = GridModel::parse(3, 3, &rows(&["...", "...", "..."])).unwrap();
        assert_eq!(model.width(), 3);
        assert_eq!(model.height(), 3);
        for y in 0..3 {
            for x in 0..3 {
                assert!(model.walkable(x, y));
            }
        }
    }

    #[test]
    fn blocks_fixed_block_chars() {
        let model = GridModel::parse(3, 3, &rows(&["###", "#.#", "###"])).unwrap();
        assert!(model.walkable(1, 1));
        assert!(!model.walkable(0, 0));
        assert!(!model.walkable(2, 2));
    }

    #[test]
    fn out_of_bounds_is_never_walkable() {
        let model = GridModel::parse(2, 2, &rows(&["..", ".."])).unwrap();
        assert!(!model.walkable(-1, 0));
        assert!(!model.walkable(0, -1));
        assert!(!model.walkable(2, 0));
        assert!(!model.walkable(0, 2));
    }

    #[test]
    fn detects_double_width_stride() {
        // Each cell encoded as two characters, e.g. ". ", "# ".
        let row = ". . . ".to_string(); // len 6 for width 3 (2*3)
        let model = GridModel::parse(3, 1, &[row]).unwrap();
        assert!(model.walkable(0, 0));
        assert!(model.walkable(1, 0));
        assert!(model.walkable(2, 0));
    }

    #[test]
    fn detects_generic_multiple_stride() {
        // width=2, stride=3 => row_len=6
        let row = "...###".to_string();
        let model = GridModel::parse(2, 1, &[row]).unwrap();
        // x=0 -> idx 0 '.', x=1 -> idx 3 '#'
        assert!(model.walkable(0, 0));
        assert!(!model.walkable(1, 0));
    }

    #[test]
    fn rejects_zero_dimension() {
        let err = GridModel::parse(0, 3, &rows(&["", "", ""])).unwrap_err();
        assert_eq!(
            err,
            GridError::ZeroDimension {
                width: 0,
                height: 3
            }
        );
    }

    #[test]
    fn rejects_row_count_mismatch() {
        let err = GridModel::parse(2, 3, &rows(&["..", ".."])).unwrap_err();
        assert_eq!(
            err,
            GridError::RowCountMismatch {
                expected: 3,
                got: 2
            }
        );
    }

    #[test]
    fn strict_mode_blocks_any_non_dot() {
        let model = GridModel::parse_with_strict(3, 1, &[" .G".to_string()], true).unwrap();
        assert!(!model.walkable(0, 0));
        assert!(model.walkable(1, 0));
        assert!(!model.walkable(2, 0));
    }

    #[test]
    fn store_reader_keeps_prior_snapshot_consistent() {
        let store = GridStore::new();
        store
            .update(GridModel::parse(2, 2, &rows(&["..", ".."])).unwrap());
        let snap1 = store.snapshot().unwrap();
        store
            .update(GridModel::parse(3, 3, &rows(&["...", "...", "..."])).unwrap());
        // snap1 still reflects the old 2x2 grid.
        assert_eq!(snap1.width(), 2);
        let snap2 = store.snapshot().unwrap();
        assert_eq!(snap2.width(), 3);
    }
}
