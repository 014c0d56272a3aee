//! Transparency reduction for output devices that cannot composite.

pub mod background;
pub mod bounds;
pub mod classify;
pub mod components;
pub mod config;
pub mod convert;
pub mod flatten;
pub mod reducer;

pub use background::BackgroundRun;
pub use classify::TransparencyClass;
pub use components::{Component, ComponentId, ComponentSet};
pub use config::ReductionConfig;
pub use flatten::{BitmapFlattener, TRANSPARENT_BITMAP_BEGIN, TRANSPARENT_BITMAP_END};
pub use reducer::{Reduction, ReductionStats, TransparencyReducer, remove_transparencies};
