use thiserror::Error;

/// Errors from turning a textual maze snapshot into a [`crate::GridModel`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GridError {
    #[error("grid has zero width or height ({width}x{height})")]
    ZeroDimension { width: u32, height: u32 },

    #[error("expected {expected} rows, got {got}")]
    RowCountMismatch { expected: u32, got: u32 },

    #[error("row {row} is empty, cannot infer a cell stride for width {width}")]
    EmptyRow { row: u32, width: u32 },
}

/// Errors from [`crate::BaitRegistry`] operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BaitError {
    #[error("coordinate ({x}, {y}) is outside any maze bounds seen so far")]
    InvalidCoordinate { x: u32, y: u32 },
}
