// src/utils/error.rs

use thiserror::Error;

/// The error type for the few operations in this crate that can fail.
///
/// Transparency reduction itself never fails: a tile that cannot be
/// rasterized is skipped. Errors are reserved for misuse at construction
/// time and for I/O while dumping images.
#[derive(Error, Debug)]
pub enum FlattenError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid argument: {0}")]
    InvalidArg(String),

    #[error("Fraction denominator cannot be zero")]
    ZeroDenominator,

    #[error("Device resolution must be non-zero, got {x}x{y} DPI")]
    InvalidResolution { x: u32, y: u32 },

    #[error("Dimension mismatch: expected {expected} pixels, but got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

/// A specialized `Result` type for this crate.
pub type Result<T> = std::result::Result<T, FlattenError>;
