//! The drawing-program data model consumed and produced by the reducer.

pub mod action;
pub mod metafile;

pub use action::{Action, Gradient, LineInfo, PolyPolygon, Polygon};
pub use metafile::Metafile;
